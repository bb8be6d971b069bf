//! Ray representation for the tracing kernel.
//!
//! A ray is r(t) = origin + t * direction. Primary and secondary rays are
//! constructed with unit directions, so `t` is a world-space distance.

use glam::DVec3;

/// Ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Starting point of the ray in world coordinates.
    pub origin: DVec3,
    /// Direction of the ray; unit length for all rays the renderer spawns.
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray with origin and direction.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Compute the point at parameter t along the ray.
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + t * self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_along_ray() {
        let ray = Ray::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.0, 1.0, 0.0));
        assert!((ray.at(2.5) - DVec3::new(1.0, 2.5, 0.0)).length() < 1e-12);
    }
}
