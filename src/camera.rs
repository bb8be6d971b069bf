//! Camera model and primary-ray generation.
//!
//! The camera is described by an eye point, a target point and a roll
//! angle. For a given resolution and field of view it derives three
//! window vectors: the top-left ray origin `vo` and the per-column and
//! per-row steps `vw` / `vh`. Pixel (i, j) then emits the ray
//! `origin = vo + i*vw + j*vh`, `direction = normalize(origin - eye)`.

use glam::DVec3;

use crate::basis::rotate_about;
use crate::ray::Ray;

/// Pinhole camera: eye point, look target and roll around the view axis.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Eye position in world coordinates.
    pub eye: DVec3,
    /// Point the camera looks at.
    pub target: DVec3,
    /// Roll around the viewing axis, in degrees.
    pub roll: f64,
}

/// Image-plane vectors derived from a camera for one resolution/FOV.
#[derive(Debug, Clone, Copy)]
pub struct CameraWindow {
    /// Eye position the rays start from (conceptually; ray origins lie on
    /// the window itself).
    pub eye: DVec3,
    /// Origin of the top-left pixel.
    pub vo: DVec3,
    /// Step between horizontally adjacent pixels.
    pub vw: DVec3,
    /// Step between vertically adjacent pixels.
    pub vh: DVec3,
}

impl Camera {
    /// Create a camera; `roll` is in degrees.
    pub fn new(eye: DVec3, target: DVec3, roll: f64) -> Self {
        Self { eye, target, roll }
    }

    /// Derive the window vectors for a `width` x `height` image with the
    /// given horizontal field of view in degrees.
    ///
    /// The image plane sits at unit distance from the eye. Pixels are
    /// square; the vertical extent follows from the aspect ratio.
    pub fn window(&self, width: u32, height: u32, fov_degrees: f64) -> CameraWindow {
        let look = (self.target - self.eye).normalize();

        // Screen-right and screen-down for a z-up world; fall back to a
        // y-up hint when the view axis is (anti)parallel to global Z.
        let up_hint = if look.z.abs() > 1.0 - 1e-6 {
            DVec3::Y
        } else {
            DVec3::Z
        };
        let mut right = look.cross(up_hint).normalize();
        let mut down = look.cross(right);

        let roll = self.roll.to_radians();
        if roll != 0.0 {
            right = rotate_about(right, look, roll);
            down = rotate_about(down, look, roll);
        }

        // Horizontal FOV fixes the pixel step; square pixels make the
        // vertical step the same length.
        let step = 2.0 * (fov_degrees.to_radians() / 2.0).tan() / f64::from(width);
        let vw = right * step;
        let vh = down * step;

        let center = self.eye + look;
        let vo = center
            - vw * (f64::from(width) / 2.0)
            - vh * (f64::from(height) / 2.0)
            + (vw + vh) * 0.5;

        CameraWindow {
            eye: self.eye,
            vo,
            vw,
            vh,
        }
    }
}

impl CameraWindow {
    /// Primary ray through pixel (i, j), with a unit direction.
    pub fn primary_ray(&self, i: u32, j: u32) -> Ray {
        let origin = self.vo + f64::from(i) * self.vw + f64::from(j) * self.vh;
        Ray::new(origin, (origin - self.eye).normalize())
    }
}
