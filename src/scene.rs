//! The scene model: camera, light and the ordered actor list.

use glam::DVec3;

use crate::actor::Actor;
use crate::camera::Camera;

/// Point light with uniform radiance.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    /// Light position in world coordinates.
    pub position: DVec3,
}

impl Light {
    /// Create a point light.
    pub fn new(position: DVec3) -> Self {
        Self { position }
    }

    /// Unnormalized vector from a surface point towards the light.
    pub fn towards(&self, hit: DVec3) -> DVec3 {
        self.position - hit
    }
}

/// Everything the renderer reads: immutable for the whole render.
///
/// The actor order is the loader's insertion order and is part of the
/// scene contract: closest-hit ties resolve to the earliest actor.
pub struct Scene {
    /// Scene camera.
    pub camera: Camera,
    /// The single point light.
    pub light: Light,
    /// Ordered actor list.
    pub actors: Vec<Actor>,
}

impl Scene {
    /// Assemble a scene from its parts.
    pub fn new(camera: Camera, light: Light, actors: Vec<Actor>) -> Self {
        Self {
            camera,
            light,
            actors,
        }
    }
}
