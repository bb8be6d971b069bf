//! Scene description loading.
//!
//! Scene files are TOML: one `[camera]` table, one `[light]` table and
//! any number of `[[plane]]`, `[[sphere]]`, `[[cylinder]]`,
//! `[[triangle]]`, `[[cube]]` and `[[molecule]]` tables. The serde
//! structs below mirror the file format; `build` validates them and
//! lowers everything to the scene model, decomposing composite kinds
//! into primitive actors.

use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

use crate::actor::{Actor, Surface, TextureBinding};
use crate::basis::LocalBasis;
use crate::camera::Camera;
use crate::molecule::{Molecule, MoleculeError};
use crate::scene::{Light, Scene};
use crate::texture::{TextureError, TextureStore};

/// Errors raised while loading a scene description.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene file could not be read.
    #[error("cannot read scene file {path}: {source}")]
    Io {
        /// Scene file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The scene file is not valid TOML or has unknown/mistyped fields.
    #[error("{path}: {source}")]
    Parse {
        /// Scene file path.
        path: String,
        /// TOML deserialization error.
        source: Box<toml::de::Error>,
    },

    /// No `[camera]` table.
    #[error("scene defines no camera")]
    MissingCamera,

    /// No `[light]` table.
    #[error("scene defines no light")]
    MissingLight,

    /// The scene has no actors at all.
    #[error("scene contains no actors")]
    NoActors,

    /// A vector field that must be non-zero is zero.
    #[error("{kind}: {field} must be a non-zero vector")]
    ZeroVector {
        /// Actor kind.
        kind: &'static str,
        /// Offending field.
        field: &'static str,
    },

    /// A scalar field that must be positive is not.
    #[error("{kind}: {field} must be positive")]
    NonPositive {
        /// Actor kind.
        kind: &'static str,
        /// Offending field.
        field: &'static str,
    },

    /// A reflection coefficient lies outside [0, 1].
    #[error("{kind}: reflect must lie in [0, 1]")]
    ReflectRange {
        /// Actor kind.
        kind: &'static str,
    },

    /// An actor must take exactly one of `texture` or `color`.
    #[error("{kind}: give exactly one of texture or color")]
    SurfaceChoice {
        /// Actor kind.
        kind: &'static str,
    },

    /// A texture file failed to load.
    #[error(transparent)]
    Texture(#[from] TextureError),

    /// A molecule file failed to load or decode.
    #[error("molecule {path}: {source}")]
    Molecule {
        /// mol2 file path.
        path: String,
        /// Underlying decode error.
        source: MoleculeError,
    },
}

fn vec3(v: [f64; 3]) -> DVec3 {
    DVec3::from(v)
}

fn default_radius() -> f64 {
    1.0
}

fn default_span() -> f64 {
    -1.0
}

fn default_plane_scale() -> f64 {
    0.15
}

fn default_unit_scale() -> f64 {
    1.0
}

fn default_bond_scale() -> f64 {
    0.5
}

fn default_sphere_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CameraSpec {
    position: [f64; 3],
    target: [f64; 3],
    #[serde(default)]
    roll: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LightSpec {
    position: [f64; 3],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlaneSpec {
    center: [f64; 3],
    normal: [f64; 3],
    texture: Option<String>,
    color: Option<[f64; 3]>,
    #[serde(default = "default_plane_scale")]
    scale: f64,
    #[serde(default)]
    reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SphereSpec {
    center: [f64; 3],
    #[serde(default = "default_sphere_axis")]
    axis: [f64; 3],
    #[serde(default = "default_radius")]
    radius: f64,
    texture: Option<String>,
    color: Option<[f64; 3]>,
    #[serde(default)]
    reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CylinderSpec {
    center: [f64; 3],
    direction: [f64; 3],
    #[serde(default = "default_radius")]
    radius: f64,
    #[serde(default = "default_span")]
    span: f64,
    texture: Option<String>,
    color: Option<[f64; 3]>,
    #[serde(default)]
    reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TriangleSpec {
    #[serde(rename = "A")]
    a: [f64; 3],
    #[serde(rename = "B")]
    b: [f64; 3],
    #[serde(rename = "C")]
    c: [f64; 3],
    color: [f64; 3],
    #[serde(default)]
    reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CubeSpec {
    center: [f64; 3],
    direction: [f64; 3],
    #[serde(default = "default_unit_scale")]
    scale: f64,
    #[serde(default)]
    angle_x: f64,
    #[serde(default)]
    angle_y: f64,
    #[serde(default)]
    angle_z: f64,
    color: [f64; 3],
    #[serde(default)]
    reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MoleculeSpec {
    mol2file: String,
    center: [f64; 3],
    #[serde(default = "default_unit_scale")]
    scale: f64,
    #[serde(default = "default_unit_scale")]
    atom_scale: f64,
    #[serde(default = "default_bond_scale")]
    bond_scale: f64,
    #[serde(default)]
    angle_x: f64,
    #[serde(default)]
    angle_y: f64,
    #[serde(default)]
    angle_z: f64,
    atom_color: [f64; 3],
    #[serde(default)]
    atom_reflect: f64,
    bond_color: [f64; 3],
    #[serde(default)]
    bond_reflect: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneFile {
    camera: Option<CameraSpec>,
    light: Option<LightSpec>,
    #[serde(default)]
    plane: Vec<PlaneSpec>,
    #[serde(default)]
    sphere: Vec<SphereSpec>,
    #[serde(default)]
    cylinder: Vec<CylinderSpec>,
    #[serde(default)]
    triangle: Vec<TriangleSpec>,
    #[serde(default)]
    cube: Vec<CubeSpec>,
    #[serde(default)]
    molecule: Vec<MoleculeSpec>,
}

/// Load a scene description from a file.
///
/// Texture and molecule paths inside the description are resolved
/// relative to the scene file's directory.
pub fn load_scene(path: &Path) -> Result<Scene, SceneError> {
    let text = fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_scene(&text, base_dir).map_err(|error| match error {
        SceneError::Parse { source, .. } => SceneError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parse scene description text; asset paths resolve against `base_dir`.
pub fn parse_scene(text: &str, base_dir: &Path) -> Result<Scene, SceneError> {
    let file: SceneFile = toml::from_str(text).map_err(|source| SceneError::Parse {
        path: String::from("scene"),
        source: Box::new(source),
    })?;

    let mut textures = TextureStore::new();
    let mut builder = SceneBuilder {
        base_dir: base_dir.to_path_buf(),
        textures: &mut textures,
        actors: Vec::new(),
    };
    builder.build(file)
}

struct SceneBuilder<'a> {
    base_dir: PathBuf,
    textures: &'a mut TextureStore,
    actors: Vec<Actor>,
}

impl SceneBuilder<'_> {
    fn build(mut self, file: SceneFile) -> Result<Scene, SceneError> {
        let camera_spec = file.camera.ok_or(SceneError::MissingCamera)?;
        let light_spec = file.light.ok_or(SceneError::MissingLight)?;

        let eye = vec3(camera_spec.position);
        let target = vec3(camera_spec.target);
        if (target - eye).length_squared() == 0.0 {
            return Err(SceneError::ZeroVector {
                kind: "camera",
                field: "target",
            });
        }
        let camera = Camera::new(eye, target, camera_spec.roll);
        let light = Light::new(vec3(light_spec.position));

        for plane in file.plane {
            self.add_plane(plane)?;
        }
        for sphere in file.sphere {
            self.add_sphere(sphere)?;
        }
        for cylinder in file.cylinder {
            self.add_cylinder(cylinder)?;
        }
        for triangle in file.triangle {
            self.add_triangle(triangle)?;
        }
        for cube in file.cube {
            self.add_cube(cube)?;
        }
        for molecule in file.molecule {
            self.add_molecule(molecule)?;
        }

        if self.actors.is_empty() {
            return Err(SceneError::NoActors);
        }

        log::info!(
            "scene loaded: {} actors, {} distinct textures",
            self.actors.len(),
            self.textures.len()
        );
        Ok(Scene::new(camera, light, self.actors))
    }

    /// Resolve the texture-or-color choice into a surface binding.
    fn surface(
        &mut self,
        kind: &'static str,
        texture: Option<String>,
        color: Option<[f64; 3]>,
        reflect: f64,
        scale: f64,
    ) -> Result<Surface, SceneError> {
        if !(0.0..=1.0).contains(&reflect) {
            return Err(SceneError::ReflectRange { kind });
        }
        match (texture, color) {
            (Some(texture), None) => {
                let image = self.textures.load(&self.resolve(&texture))?;
                Ok(Surface::Textured(TextureBinding {
                    image,
                    reflect,
                    scale,
                }))
            }
            (None, Some(color)) => Ok(Surface::Flat {
                color: vec3(color),
                reflect,
            }),
            _ => Err(SceneError::SurfaceChoice { kind }),
        }
    }

    fn flat(
        &self,
        kind: &'static str,
        color: [f64; 3],
        reflect: f64,
    ) -> Result<Surface, SceneError> {
        if !(0.0..=1.0).contains(&reflect) {
            return Err(SceneError::ReflectRange { kind });
        }
        Ok(Surface::Flat {
            color: vec3(color),
            reflect,
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn require_nonzero(
        kind: &'static str,
        field: &'static str,
        v: [f64; 3],
    ) -> Result<DVec3, SceneError> {
        let v = vec3(v);
        if v.length_squared() == 0.0 {
            return Err(SceneError::ZeroVector { kind, field });
        }
        Ok(v)
    }

    fn require_positive(
        kind: &'static str,
        field: &'static str,
        value: f64,
    ) -> Result<f64, SceneError> {
        if value <= 0.0 {
            return Err(SceneError::NonPositive { kind, field });
        }
        Ok(value)
    }

    fn add_plane(&mut self, spec: PlaneSpec) -> Result<(), SceneError> {
        let normal = Self::require_nonzero("plane", "normal", spec.normal)?;
        let scale = Self::require_positive("plane", "scale", spec.scale)?;
        let surface = self.surface("plane", spec.texture, spec.color, spec.reflect, scale)?;
        self.actors
            .push(Actor::plane(vec3(spec.center), normal, surface));
        Ok(())
    }

    fn add_sphere(&mut self, spec: SphereSpec) -> Result<(), SceneError> {
        let axis = Self::require_nonzero("sphere", "axis", spec.axis)?;
        let radius = Self::require_positive("sphere", "radius", spec.radius)?;
        let surface = self.surface("sphere", spec.texture, spec.color, spec.reflect, 1.0)?;
        self.actors
            .push(Actor::sphere(vec3(spec.center), axis, radius, surface));
        Ok(())
    }

    fn add_cylinder(&mut self, spec: CylinderSpec) -> Result<(), SceneError> {
        let direction = Self::require_nonzero("cylinder", "direction", spec.direction)?;
        let radius = Self::require_positive("cylinder", "radius", spec.radius)?;
        let surface = self.surface("cylinder", spec.texture, spec.color, spec.reflect, 1.0)?;
        self.actors.push(Actor::cylinder(
            vec3(spec.center),
            direction,
            radius,
            spec.span,
            surface,
        ));
        Ok(())
    }

    fn add_triangle(&mut self, spec: TriangleSpec) -> Result<(), SceneError> {
        let a = vec3(spec.a);
        let b = vec3(spec.b);
        let c = vec3(spec.c);
        // A zero-area triangle has no usable frame.
        if (b - a).cross(c - a).length_squared() == 0.0 {
            return Err(SceneError::ZeroVector {
                kind: "triangle",
                field: "vertices",
            });
        }
        let surface = self.flat("triangle", spec.color, spec.reflect)?;
        self.actors.push(Actor::triangle(a, b, c, surface));
        Ok(())
    }

    fn add_cube(&mut self, spec: CubeSpec) -> Result<(), SceneError> {
        let direction = Self::require_nonzero("cube", "direction", spec.direction)?;
        let scale = Self::require_positive("cube", "scale", spec.scale)?;
        let surface = self.flat("cube", spec.color, spec.reflect)?;

        let center = vec3(spec.center);
        let basis = LocalBasis::from_axis(center, direction).rotated_xyz(
            spec.angle_x.to_radians(),
            spec.angle_y.to_radians(),
            spec.angle_z.to_radians(),
        );

        let half = scale / 2.0;
        // One entry per face: outward axis and the tangent pair (t1, t2)
        // with t1 x t2 pointing outward, so both triangles of a face wind
        // counter-clockwise seen from outside.
        let faces = [
            (basis.i, basis.j, basis.k),
            (-basis.i, basis.k, basis.j),
            (basis.j, basis.k, basis.i),
            (-basis.j, basis.i, basis.k),
            (basis.k, basis.i, basis.j),
            (-basis.k, basis.j, basis.i),
        ];
        for (axis, t1, t2) in faces {
            let face_center = center + axis * half;
            let corners = [
                face_center + (-t1 - t2) * half,
                face_center + (t1 - t2) * half,
                face_center + (t1 + t2) * half,
                face_center + (-t1 + t2) * half,
            ];
            self.actors.push(Actor::triangle(
                corners[0],
                corners[1],
                corners[2],
                surface.clone(),
            ));
            self.actors.push(Actor::triangle(
                corners[0],
                corners[2],
                corners[3],
                surface.clone(),
            ));
        }
        Ok(())
    }

    fn add_molecule(&mut self, spec: MoleculeSpec) -> Result<(), SceneError> {
        let scale = Self::require_positive("molecule", "scale", spec.scale)?;
        let atom_scale = Self::require_positive("molecule", "atom_scale", spec.atom_scale)?;
        let bond_scale = Self::require_positive("molecule", "bond_scale", spec.bond_scale)?;
        let atom_surface = self.flat("molecule", spec.atom_color, spec.atom_reflect)?;
        let bond_surface = self.flat("molecule", spec.bond_color, spec.bond_reflect)?;

        let mol2_path = self.resolve(&spec.mol2file);
        let molecule_error = |source| SceneError::Molecule {
            path: mol2_path.display().to_string(),
            source,
        };
        let molecule = Molecule::open(&mol2_path).map_err(&molecule_error)?;

        // Re-center on the centroid, scale, rotate, then place.
        let centroid = molecule.centroid();
        let center = vec3(spec.center);
        let (ax, ay, az) = (
            spec.angle_x.to_radians(),
            spec.angle_y.to_radians(),
            spec.angle_z.to_radians(),
        );
        let positions: Vec<DVec3> = molecule
            .positions
            .iter()
            .map(|&p| center + crate::basis::rotate_xyz((p - centroid) * scale, ax, ay, az))
            .collect();

        for &position in &positions {
            self.actors.push(Actor::sphere(
                position,
                DVec3::Z,
                0.5 * atom_scale,
                atom_surface.clone(),
            ));
        }

        for (index, &(origin, target)) in molecule.bonds.iter().enumerate() {
            let from = positions[origin];
            let to = positions[target];
            let axis = to - from;
            let length = axis.length();
            if length < 1e-9 {
                return Err(molecule_error(MoleculeError::DegenerateBond { index }));
            }
            self.actors.push(Actor::cylinder(
                (from + to) / 2.0,
                axis / length,
                0.5 * bond_scale,
                length / 2.0,
                bond_surface.clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Shape;

    fn parse(text: &str) -> Result<Scene, SceneError> {
        parse_scene(text, Path::new("."))
    }

    const HEADER: &str = "
[camera]
position = [0.0, 0.0, 0.0]
target = [10.0, 0.0, 0.0]

[light]
position = [5.0, 5.0, 5.0]
";

    #[test]
    fn loads_a_minimal_scene() {
        let text = format!(
            "{HEADER}
[[sphere]]
center = [5.0, 0.0, 0.0]
color = [1.0, 0.0, 0.0]
"
        );
        let scene = parse(&text).unwrap();
        assert_eq!(scene.actors.len(), 1);
        assert!(matches!(scene.actors[0].shape, Shape::Sphere { radius } if radius == 1.0));
        assert!((scene.light.position - DVec3::new(5.0, 5.0, 5.0)).length() < 1e-12);
    }

    #[test]
    fn camera_is_required() {
        let text = "
[light]
position = [0.0, 0.0, 0.0]

[[sphere]]
center = [5.0, 0.0, 0.0]
color = [1.0, 0.0, 0.0]
";
        assert!(matches!(parse(text), Err(SceneError::MissingCamera)));
    }

    #[test]
    fn at_least_one_actor_is_required() {
        assert!(matches!(parse(HEADER), Err(SceneError::NoActors)));
    }

    #[test]
    fn zero_normal_is_rejected() {
        let text = format!(
            "{HEADER}
[[plane]]
center = [0.0, 0.0, 0.0]
normal = [0.0, 0.0, 0.0]
color = [1.0, 1.0, 1.0]
"
        );
        assert!(matches!(
            parse(&text),
            Err(SceneError::ZeroVector {
                kind: "plane",
                field: "normal"
            })
        ));
    }

    #[test]
    fn texture_and_color_conflict() {
        let text = format!(
            "{HEADER}
[[sphere]]
center = [5.0, 0.0, 0.0]
texture = \"foo.png\"
color = [1.0, 0.0, 0.0]
"
        );
        assert!(matches!(
            parse(&text),
            Err(SceneError::SurfaceChoice { kind: "sphere" })
        ));
    }

    #[test]
    fn reflect_outside_unit_interval_is_rejected() {
        let text = format!(
            "{HEADER}
[[sphere]]
center = [5.0, 0.0, 0.0]
color = [1.0, 0.0, 0.0]
reflect = 1.5
"
        );
        assert!(matches!(
            parse(&text),
            Err(SceneError::ReflectRange { kind: "sphere" })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = format!(
            "{HEADER}
[[sphere]]
center = [5.0, 0.0, 0.0]
color = [1.0, 0.0, 0.0]
radius_typo = 2.0
"
        );
        assert!(matches!(parse(&text), Err(SceneError::Parse { .. })));
    }

    #[test]
    fn cylinder_defaults_to_infinite_span() {
        let text = format!(
            "{HEADER}
[[cylinder]]
center = [5.0, 0.0, 0.0]
direction = [0.0, 0.0, 1.0]
color = [1.0, 1.0, 1.0]
"
        );
        let scene = parse(&text).unwrap();
        assert!(
            matches!(scene.actors[0].shape, Shape::Cylinder { span, .. } if span < 0.0)
        );
    }

    #[test]
    fn cube_becomes_twelve_triangles() {
        let text = format!(
            "{HEADER}
[[cube]]
center = [5.0, 0.0, 0.0]
direction = [0.0, 0.0, 1.0]
scale = 2.0
color = [1.0, 1.0, 0.0]
"
        );
        let scene = parse(&text).unwrap();
        assert_eq!(scene.actors.len(), 12);
        assert!(scene
            .actors
            .iter()
            .all(|actor| matches!(actor.shape, Shape::Triangle { .. })));

        // Face normals must point away from the cube center.
        let center = DVec3::new(5.0, 0.0, 0.0);
        for actor in &scene.actors {
            let outward = actor.basis.o - center;
            assert!(actor.basis.k.dot(outward) > 0.0);
        }
    }

    #[test]
    fn molecule_expands_into_spheres_and_bonds() {
        let dir = std::env::temp_dir().join("prismray-loader-test");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("pair.mol2"),
            "@<TRIPOS>ATOM
 1 C1 0.0 0.0 0.0 C.3
 2 C2 2.0 0.0 0.0 C.3
@<TRIPOS>BOND
 1 1 2 1
",
        )
        .unwrap();

        let text = "
[camera]
position = [0.0, 0.0, 0.0]
target = [10.0, 0.0, 0.0]

[light]
position = [5.0, 5.0, 5.0]

[[molecule]]
mol2file = \"pair.mol2\"
center = [5.0, 0.0, 0.0]
atom_color = [0.2, 0.8, 0.2]
bond_color = [0.8, 0.8, 0.8]
";
        let scene = parse_scene(text, &dir).unwrap();
        // Two atoms and one bond.
        assert_eq!(scene.actors.len(), 3);
        assert!(matches!(scene.actors[0].shape, Shape::Sphere { radius } if radius == 0.5));
        match scene.actors[2].shape {
            Shape::Cylinder { radius, span } => {
                assert!((radius - 0.25).abs() < 1e-12);
                assert!((span - 1.0).abs() < 1e-12);
            }
            _ => panic!("expected a bond cylinder"),
        }
        // Atoms are re-centered around the molecule center.
        assert!((scene.actors[0].basis.o - DVec3::new(4.0, 0.0, 0.0)).length() < 1e-12);
        assert!((scene.actors[1].basis.o - DVec3::new(6.0, 0.0, 0.0)).length() < 1e-12);
    }
}
