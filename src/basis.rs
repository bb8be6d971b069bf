//! Local coordinate frames for actors and the camera.
//!
//! Every actor carries an orthonormal basis (o; i, j, k) where `k` is the
//! surface normal or symmetry axis and (i, j) span the tangent plane.

use glam::DVec3;

/// Geometric tolerance shared by the intersection routines.
pub const GEOM_EPS: f64 = 1e-4;

/// Unit vector along the global axis least aligned with `v`.
///
/// Crossing the returned vector with `v` is guaranteed to be well
/// conditioned, which makes it a good seed for building a tangent frame
/// around an arbitrary axis.
pub fn fill_vector(v: DVec3) -> DVec3 {
    let x = v.x.abs();
    let y = v.y.abs();
    let z = v.z.abs();

    if x < y {
        if x < z {
            DVec3::X
        } else {
            DVec3::Z
        }
    } else if y < z {
        DVec3::Y
    } else {
        DVec3::Z
    }
}

/// Rotate `v` about the unit vector `axis` by `angle` radians (Rodrigues).
pub fn rotate_about(v: DVec3, axis: DVec3, angle: f64) -> DVec3 {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * (axis.dot(v) * (1.0 - cos))
}

/// Rotate `v` about the global X, then Y, then Z axis (radians).
pub fn rotate_xyz(v: DVec3, ax: f64, ay: f64, az: f64) -> DVec3 {
    let v = rotate_about(v, DVec3::X, ax);
    let v = rotate_about(v, DVec3::Y, ay);
    rotate_about(v, DVec3::Z, az)
}

/// Orthonormal frame attached to an actor.
#[derive(Debug, Clone, Copy)]
pub struct LocalBasis {
    /// Frame origin in world coordinates.
    pub o: DVec3,
    /// First tangent vector.
    pub i: DVec3,
    /// Second tangent vector.
    pub j: DVec3,
    /// Normal / axis vector.
    pub k: DVec3,
}

impl LocalBasis {
    /// Build a deterministic frame around an arbitrary non-zero axis.
    ///
    /// The tangent pair is derived from the fill vector: `i = fill x k`,
    /// `j = k x i`, all normalized.
    pub fn from_axis(origin: DVec3, axis: DVec3) -> Self {
        let k = axis.normalize();
        let i = fill_vector(k).cross(k).normalize();
        let j = k.cross(i);

        Self { o: origin, i, j, k }
    }

    /// Frame of a triangle: origin at the centroid, `i` along the first
    /// edge, `k` the face normal.
    pub fn from_triangle(a: DVec3, b: DVec3, c: DVec3) -> Self {
        let o = (a + b + c) / 3.0;
        let i = (b - a).normalize();
        let k = i.cross(c - b).normalize();
        let j = k.cross(i);

        Self { o, i, j, k }
    }

    /// Frame with its axes rotated about the global X, Y, Z axes (radians).
    /// The origin is left in place.
    pub fn rotated_xyz(&self, ax: f64, ay: f64, az: f64) -> Self {
        Self {
            o: self.o,
            i: rotate_xyz(self.i, ax, ay, az),
            j: rotate_xyz(self.j, ax, ay, az),
            k: rotate_xyz(self.k, ax, ay, az),
        }
    }
}
