//! Geometric actors: primitives, surface bindings and intersection tests.
//!
//! The primitive set is closed, so actors are a tagged enum rather than
//! trait objects: every shape answers `intersect`, `normal_at`,
//! `color_at` and `casts_shadow`, and composites (cubes, molecules) are
//! decomposed into these primitives at load time.

use std::sync::Arc;

use glam::DVec3;

use crate::basis::{LocalBasis, GEOM_EPS};
use crate::interval::Interval;
use crate::ray::Ray;
use crate::texture::{Color, TextureImage};

/// Smaller real root of a*t^2 + b*t + c = 0, or `None` when no real root
/// exists. Near-zero discriminants collapse to the double root. Callers
/// reject negative or out-of-range values.
fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<f64> {
    let delta = b * b - 4.0 * a * c;
    if delta < 0.0 {
        return None;
    }
    if delta < GEOM_EPS {
        return Some(-b / (2.0 * a));
    }

    let sqdelta = delta.sqrt();
    let ta = (-b - sqdelta) / (2.0 * a);
    let tb = (-b + sqdelta) / (2.0 * a);

    Some(ta.min(tb))
}

/// Texture image with per-actor coefficients.
#[derive(Clone)]
pub struct TextureBinding {
    /// Shared decoded image.
    pub image: Arc<TextureImage>,
    /// Fraction of the outgoing radiance taken from the reflected ray.
    pub reflect: f64,
    /// UV scale coefficient.
    pub scale: f64,
}

/// What an actor looks like at a hit point.
#[derive(Clone)]
pub enum Surface {
    /// Image-mapped surface.
    Textured(TextureBinding),
    /// Uniform color.
    Flat {
        /// Surface color in linear [0, 1] RGB.
        color: Color,
        /// Reflection coefficient in [0, 1].
        reflect: f64,
    },
}

impl Surface {
    fn sample(&self, u: f64, v: f64) -> Color {
        match self {
            Surface::Textured(binding) => binding.image.pick_pixel(u, v, binding.scale),
            Surface::Flat { color, .. } => *color,
        }
    }

    /// Reflection coefficient of the surface.
    pub fn reflect(&self) -> f64 {
        match self {
            Surface::Textured(binding) => binding.reflect,
            Surface::Flat { reflect, .. } => *reflect,
        }
    }
}

/// The closed set of geometric primitives.
#[derive(Clone)]
pub enum Shape {
    /// Infinite plane through the basis origin, normal along `k`.
    Plane,
    /// Sphere around the basis origin.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Cylinder along the basis `k` axis. A negative span makes it
    /// infinite; otherwise the surface extends `span` on both sides of
    /// the origin.
    Cylinder {
        /// Cylinder radius.
        radius: f64,
        /// Half-length along the axis; negative = infinite.
        span: f64,
    },
    /// Triangle with precomputed inward edge vectors for the
    /// point-in-triangle test.
    Triangle {
        /// First vertex.
        a: DVec3,
        /// Second vertex.
        b: DVec3,
        /// Third vertex.
        c: DVec3,
        /// Inward edge vector k x (a - c).
        ea: DVec3,
        /// Inward edge vector k x (b - a).
        eb: DVec3,
        /// Inward edge vector k x (c - b).
        ec: DVec3,
    },
}

/// A primitive with its frame and surface.
#[derive(Clone)]
pub struct Actor {
    /// Primitive geometry.
    pub shape: Shape,
    /// Local frame; `k` is the normal/axis.
    pub basis: LocalBasis,
    /// Surface binding.
    pub surface: Surface,
}

impl Actor {
    /// Infinite plane through `center` with the given normal.
    pub fn plane(center: DVec3, normal: DVec3, surface: Surface) -> Self {
        Self {
            shape: Shape::Plane,
            basis: LocalBasis::from_axis(center, normal),
            surface,
        }
    }

    /// Sphere around `center`; `axis` orients the texture mapping.
    pub fn sphere(center: DVec3, axis: DVec3, radius: f64, surface: Surface) -> Self {
        Self {
            shape: Shape::Sphere { radius },
            basis: LocalBasis::from_axis(center, axis),
            surface,
        }
    }

    /// Cylinder through `center` along `direction`. Negative `span`
    /// makes it infinite.
    pub fn cylinder(
        center: DVec3,
        direction: DVec3,
        radius: f64,
        span: f64,
        surface: Surface,
    ) -> Self {
        Self {
            shape: Shape::Cylinder { radius, span },
            basis: LocalBasis::from_axis(center, direction),
            surface,
        }
    }

    /// Triangle with vertices `a`, `b`, `c`.
    pub fn triangle(a: DVec3, b: DVec3, c: DVec3, surface: Surface) -> Self {
        let basis = LocalBasis::from_triangle(a, b, c);
        let k = basis.k;
        Self {
            shape: Shape::Triangle {
                a,
                b,
                c,
                ea: k.cross(a - c),
                eb: k.cross(b - a),
                ec: k.cross(c - b),
            },
            basis,
            surface,
        }
    }

    /// Whether the actor occludes light. Planes do not cast shadows.
    pub fn casts_shadow(&self) -> bool {
        !matches!(self.shape, Shape::Plane)
    }

    /// Reflection coefficient of the actor's surface.
    pub fn reflect(&self) -> f64 {
        self.surface.reflect()
    }

    /// Hit distance of `ray` against this actor inside `range`, or `None`.
    pub fn intersect(&self, ray: &Ray, range: Interval) -> Option<f64> {
        match self.shape {
            Shape::Plane => self.intersect_plane(ray, range),
            Shape::Sphere { radius } => self.intersect_sphere(ray, range, radius),
            Shape::Cylinder { radius, span } => self.intersect_cylinder(ray, range, radius, span),
            Shape::Triangle { a, b, c, ea, eb, ec } => {
                self.intersect_triangle(ray, range, a, b, c, ea, eb, ec)
            }
        }
    }

    fn intersect_plane(&self, ray: &Ray, range: Interval) -> Option<f64> {
        let slope = ray.direction.dot(self.basis.k);
        if slope.abs() < GEOM_EPS {
            return None;
        }

        let t = -(ray.origin - self.basis.o).dot(self.basis.k) / slope;
        range.surrounds(t).then_some(t)
    }

    fn intersect_sphere(&self, ray: &Ray, range: Interval, radius: f64) -> Option<f64> {
        let oc = ray.origin - self.basis.o;

        let a = ray.direction.dot(ray.direction);
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.dot(oc) - radius * radius;

        let t = solve_quadratic(a, b, c)?;
        range.surrounds(t).then_some(t)
    }

    fn intersect_cylinder(&self, ray: &Ray, range: Interval, radius: f64, span: f64) -> Option<f64> {
        let vec = ray.origin - self.basis.o;

        let a = ray.direction.dot(vec);
        let b = ray.direction.dot(self.basis.k);
        let d = vec.dot(self.basis.k);
        let f = radius * radius - vec.dot(vec);

        let t = solve_quadratic(1.0 - b * b, 2.0 * (a - b * d), -(d * d) - f)?;
        if !range.surrounds(t) {
            return None;
        }
        if span >= 0.0 {
            // Clip against the finite extent along the axis.
            let alpha = d + t * b;
            if alpha < -span || alpha > span {
                return None;
            }
        }
        Some(t)
    }

    #[allow(clippy::too_many_arguments)]
    fn intersect_triangle(
        &self,
        ray: &Ray,
        range: Interval,
        a: DVec3,
        b: DVec3,
        c: DVec3,
        ea: DVec3,
        eb: DVec3,
        ec: DVec3,
    ) -> Option<f64> {
        let t = self.intersect_plane(ray, range)?;
        let x = ray.at(t);

        let inside =
            (x - a).dot(ea) > 0.0 && (x - b).dot(eb) > 0.0 && (x - c).dot(ec) > 0.0;
        inside.then_some(t)
    }

    /// Surface normal at a hit point, pointing out of the primitive.
    pub fn normal_at(&self, hit: DVec3) -> DVec3 {
        match self.shape {
            Shape::Plane | Shape::Triangle { .. } => self.basis.k,
            Shape::Sphere { .. } => (hit - self.basis.o).normalize(),
            Shape::Cylinder { .. } => {
                // Drop the axial component of the hit offset.
                let alpha = self.basis.k.dot(hit - self.basis.o);
                (hit - (self.basis.o + alpha * self.basis.k)).normalize()
            }
        }
    }

    /// Surface color at a hit point with the given normal.
    pub fn color_at(&self, hit: DVec3, normal: DVec3) -> Color {
        match self.shape {
            Shape::Plane | Shape::Triangle { .. } => {
                let v = hit - self.basis.o;
                self.surface.sample(v.dot(self.basis.i), v.dot(self.basis.j))
            }
            Shape::Sphere { .. } => {
                // Spherical mapping of the normal onto the local frame.
                let dot_i = normal.dot(self.basis.i);
                let dot_j = normal.dot(self.basis.j);
                let dot_k = normal.dot(self.basis.k);

                let phi = (-dot_j).clamp(-1.0, 1.0).acos();
                let v = phi / std::f64::consts::PI;

                let sin_phi = phi.sin();
                let u = if sin_phi.abs() < 1e-12 {
                    0.0
                } else {
                    let theta = (dot_i / sin_phi).clamp(-1.0, 1.0).acos()
                        / (2.0 * std::f64::consts::PI);
                    if dot_k > 0.0 {
                        theta
                    } else {
                        1.0 - theta
                    }
                };

                self.surface.sample(u, v)
            }
            Shape::Cylinder { radius, .. } => {
                let alpha = (hit - self.basis.o).dot(self.basis.k);
                let u = normal.dot(self.basis.i).clamp(-1.0, 1.0).acos()
                    / std::f64::consts::PI;
                let v = alpha / (2.0 * std::f64::consts::PI * radius);

                self.surface.sample(u, v)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Surface {
        Surface::Flat {
            color: DVec3::new(1.0, 0.0, 0.0),
            reflect: 0.0,
        }
    }

    fn range() -> Interval {
        Interval::new(1e-3, 1e6)
    }

    #[test]
    fn quadratic_roots() {
        // (t - 2)(t - 6) = t^2 - 8t + 12
        let t = solve_quadratic(1.0, -8.0, 12.0).unwrap();
        assert!((t - 2.0).abs() < 1e-12);
        // No real roots
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
        // Double root at t = 3
        let t = solve_quadratic(1.0, -6.0, 9.0).unwrap();
        assert!((t - 3.0).abs() < 1e-6);
    }

    #[test]
    fn sphere_hit_distance() {
        let sphere = Actor::sphere(DVec3::new(5.0, 0.0, 0.0), DVec3::Z, 1.0, red());
        let ray = Ray::new(DVec3::ZERO, DVec3::X);

        let t = sphere.intersect(&ray, range()).unwrap();
        assert!((t - 4.0).abs() < 1e-6);

        let normal = sphere.normal_at(ray.at(t));
        assert!((normal - DVec3::new(-1.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn sphere_inside_origin_rejected_by_range() {
        // From inside the sphere the near root is negative; the range
        // filter turns it into a miss.
        let sphere = Actor::sphere(DVec3::ZERO, DVec3::Z, 2.0, red());
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        assert!(sphere.intersect(&ray, range()).is_none());
    }

    #[test]
    fn plane_hit_and_parallel_miss() {
        let plane = Actor::plane(DVec3::new(0.0, -1.0, 0.0), DVec3::Y, red());

        let down = Ray::new(DVec3::ZERO, DVec3::new(0.0, -1.0, 0.0));
        let t = plane.intersect(&down, range()).unwrap();
        assert!((t - 1.0).abs() < 1e-9);

        let parallel = Ray::new(DVec3::ZERO, DVec3::X);
        assert!(plane.intersect(&parallel, range()).is_none());
    }

    #[test]
    fn cylinder_span_clips_hits() {
        let surface = red();
        let infinite = Actor::cylinder(DVec3::ZERO, DVec3::Z, 1.0, -1.0, surface.clone());
        let finite = Actor::cylinder(DVec3::ZERO, DVec3::Z, 1.0, 2.0, surface);

        // Aimed at the barrel three units up the axis.
        let ray = Ray::new(
            DVec3::new(5.0, 0.0, 3.0),
            DVec3::new(-1.0, 0.0, 0.0),
        );
        let t = infinite.intersect(&ray, range()).unwrap();
        assert!((t - 4.0).abs() < 1e-6);
        assert!(finite.intersect(&ray, range()).is_none());

        // Inside the span both agree.
        let low = Ray::new(DVec3::new(5.0, 0.0, 1.0), DVec3::new(-1.0, 0.0, 0.0));
        assert!(finite.intersect(&low, range()).is_some());

        let normal = infinite.normal_at(ray.at(t));
        assert!((normal - DVec3::X).length() < 1e-9);
    }

    #[test]
    fn triangle_inside_and_outside() {
        let tri = Actor::triangle(
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
            red(),
        );

        let inside = Ray::new(DVec3::new(0.5, 0.5, 5.0), DVec3::new(0.0, 0.0, -1.0));
        let t = tri.intersect(&inside, range()).unwrap();
        assert!((t - 5.0).abs() < 1e-9);

        let outside = Ray::new(DVec3::new(1.8, 1.8, 5.0), DVec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&outside, range()).is_none());
    }

    #[test]
    fn hit_distance_matches_euclidean_distance() {
        // Property: the returned t of a unit-direction ray equals the
        // distance to the surface point for every primitive kind.
        let actors = [
            Actor::plane(DVec3::new(0.0, 0.0, -2.0), DVec3::Z, red()),
            Actor::sphere(DVec3::new(0.0, 0.0, -5.0), DVec3::Z, 1.0, red()),
            Actor::cylinder(DVec3::new(0.0, 0.0, -5.0), DVec3::Y, 1.0, -1.0, red()),
            Actor::triangle(
                DVec3::new(-1.0, -1.0, -3.0),
                DVec3::new(1.0, -1.0, -3.0),
                DVec3::new(0.0, 2.0, -3.0),
                red(),
            ),
        ];

        for actor in &actors {
            let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0));
            let t = actor.intersect(&ray, range()).unwrap();
            let hit = ray.at(t);
            assert!((t - hit.length()).abs() < 1e-6);
        }
    }

    #[test]
    fn planes_do_not_cast_shadows() {
        assert!(!Actor::plane(DVec3::ZERO, DVec3::Z, red()).casts_shadow());
        assert!(Actor::sphere(DVec3::ZERO, DVec3::Z, 1.0, red()).casts_shadow());
        assert!(Actor::cylinder(DVec3::ZERO, DVec3::Z, 1.0, -1.0, red()).casts_shadow());
        assert!(Actor::triangle(DVec3::ZERO, DVec3::X, DVec3::Y, red()).casts_shadow());
    }

    #[test]
    fn sphere_uv_poles_and_equator() {
        // 2x2 texture: row 0 is red/green, row 1 is blue/white.
        let image = Arc::new(TextureImage::from_raw(
            2,
            2,
            vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]],
        ));
        let sphere = Actor::sphere(
            DVec3::ZERO,
            DVec3::Z,
            1.0,
            Surface::Textured(TextureBinding {
                image,
                reflect: 0.0,
                scale: 1.0,
            }),
        );

        // At the -j pole phi = 0, so (u, v) = (0, 0): top-left texel.
        let pole = sphere.basis.j * -1.0;
        let color = sphere.color_at(pole, pole);
        assert!((color - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);

        // On the equator v = 1/2 selects the bottom row. The -i point
        // maps to u = 1/2 (right texel), +i wraps to the left texel.
        let minus_i = sphere.basis.i * -1.0;
        let color = sphere.color_at(minus_i, minus_i);
        assert!((color - DVec3::new(1.0, 1.0, 1.0)).length() < 1e-12);

        let plus_i = sphere.basis.i;
        let color = sphere.color_at(plus_i, plus_i);
        assert!((color - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-12);
    }
}
