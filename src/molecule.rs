//! Decoding of Tripos mol2 molecule files.
//!
//! Only the `@<TRIPOS>ATOM` and `@<TRIPOS>BOND` record blocks are
//! consumed: the renderer needs atom positions and the bond topology,
//! nothing else. Molecule actors are assembled from these tables by the
//! scene loader.

use std::fs;
use std::path::Path;

use glam::DVec3;
use thiserror::Error;

/// Errors raised while decoding a mol2 file.
#[derive(Debug, Error)]
pub enum MoleculeError {
    /// The file could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A record line does not have the expected shape.
    #[error("line {line}: malformed {section} record")]
    Malformed {
        /// Record block the line belongs to.
        section: &'static str,
        /// 1-based line number.
        line: usize,
    },

    /// The file holds no atom records.
    #[error("no atoms found")]
    NoAtoms,

    /// A bond references an atom index that does not exist.
    #[error("bond references atom {index} but only {natoms} atoms are present")]
    BondIndex {
        /// 1-based atom index from the bond record.
        index: usize,
        /// Number of atoms actually present.
        natoms: usize,
    },

    /// Two bonded atoms share a position, so the bond has no direction.
    #[error("bond {index} connects two atoms at the same position")]
    DegenerateBond {
        /// 0-based index of the offending bond.
        index: usize,
    },
}

/// Atom positions and bond topology of one molecule.
#[derive(Debug, Clone)]
pub struct Molecule {
    /// Atom positions in file order.
    pub positions: Vec<DVec3>,
    /// Bonds as 0-based atom index pairs.
    pub bonds: Vec<(usize, usize)>,
}

impl Molecule {
    /// Parse mol2 text into atom and bond tables.
    pub fn parse(text: &str) -> Result<Self, MoleculeError> {
        #[derive(PartialEq)]
        enum Section {
            Skip,
            Atoms,
            Bonds,
        }

        let mut section = Section::Skip;
        let mut positions = Vec::new();
        let mut bonds = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.starts_with("@<TRIPOS>") {
                section = match line {
                    "@<TRIPOS>ATOM" => Section::Atoms,
                    "@<TRIPOS>BOND" => Section::Bonds,
                    _ => Section::Skip,
                };
                continue;
            }
            if line.is_empty() || section == Section::Skip {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            match section {
                Section::Atoms => {
                    // atom_id atom_name x y z atom_type ...
                    let coords: Option<Vec<f64>> = fields
                        .get(2..5)
                        .map(|f| f.iter().filter_map(|v| v.parse().ok()).collect());
                    match coords.as_deref() {
                        Some([x, y, z]) => positions.push(DVec3::new(*x, *y, *z)),
                        _ => {
                            return Err(MoleculeError::Malformed {
                                section: "atom",
                                line: index + 1,
                            })
                        }
                    }
                }
                Section::Bonds => {
                    // bond_id origin_atom target_atom bond_type
                    let pair: Option<Vec<usize>> = fields
                        .get(1..3)
                        .map(|f| f.iter().filter_map(|v| v.parse().ok()).collect());
                    match pair.as_deref() {
                        Some([origin, target]) => bonds.push((*origin, *target)),
                        _ => {
                            return Err(MoleculeError::Malformed {
                                section: "bond",
                                line: index + 1,
                            })
                        }
                    }
                }
                Section::Skip => unreachable!(),
            }
        }

        if positions.is_empty() {
            return Err(MoleculeError::NoAtoms);
        }

        // Bond records are 1-based; validate and rebase them.
        let bonds = bonds
            .into_iter()
            .map(|(origin, target)| {
                for index in [origin, target] {
                    if index == 0 || index > positions.len() {
                        return Err(MoleculeError::BondIndex {
                            index,
                            natoms: positions.len(),
                        });
                    }
                }
                Ok((origin - 1, target - 1))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { positions, bonds })
    }

    /// Read and parse a mol2 file.
    pub fn open(path: &Path) -> Result<Self, MoleculeError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Centroid of the atom positions.
    pub fn centroid(&self) -> DVec3 {
        self.positions.iter().sum::<DVec3>() / self.positions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANE_FRAGMENT: &str = "\
@<TRIPOS>MOLECULE
ethane-fragment
 2 1 0 0 0
SMALL
NO_CHARGES

@<TRIPOS>ATOM
      1 C1          0.0000    0.0000    0.0000 C.3     1  LIG1
      2 C2          1.5400    0.0000    0.0000 C.3     1  LIG1
@<TRIPOS>BOND
     1    1    2 1
";

    #[test]
    fn parses_atoms_and_bonds() {
        let mol = Molecule::parse(ETHANE_FRAGMENT).unwrap();
        assert_eq!(mol.positions.len(), 2);
        assert_eq!(mol.bonds, vec![(0, 1)]);
        assert!((mol.positions[1] - DVec3::new(1.54, 0.0, 0.0)).length() < 1e-12);
        assert!((mol.centroid() - DVec3::new(0.77, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn rejects_empty_molecule() {
        let err = Molecule::parse("@<TRIPOS>MOLECULE\nempty\n").unwrap_err();
        assert!(matches!(err, MoleculeError::NoAtoms));
    }

    #[test]
    fn rejects_out_of_range_bond() {
        let text = "\
@<TRIPOS>ATOM
 1 C1 0.0 0.0 0.0 C.3
@<TRIPOS>BOND
 1 1 7 1
";
        let err = Molecule::parse(text).unwrap_err();
        assert!(matches!(err, MoleculeError::BondIndex { index: 7, .. }));
    }

    #[test]
    fn rejects_malformed_atom_record() {
        let text = "\
@<TRIPOS>ATOM
 1 C1 bogus 0.0 0.0 C.3
";
        let err = Molecule::parse(text).unwrap_err();
        assert!(matches!(
            err,
            MoleculeError::Malformed {
                section: "atom",
                line: 2
            }
        ));
    }
}
