//! The rendering kernel: closest-hit search, shading, shadows,
//! reflection recursion and the row-band parallel driver.
//!
//! The framebuffer is partitioned into one contiguous band of rows per
//! worker; bands are traced independently over the shared immutable
//! scene, so the parallel phase needs no synchronization beyond the
//! final join. Pixel values depend only on the scene and configuration,
//! never on the number of workers.

use std::ops::Range;

use glam::DVec3;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::interval::Interval;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::texture::Color;

/// Distance-based light attenuation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightModel {
    /// No attenuation.
    None,
    /// Linear falloff towards `max_distance`.
    Linear,
    /// Quadratic falloff towards `max_distance`.
    Quadratic,
}

/// Renderer configuration; every field has a sensible default.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    /// Horizontal field of view in degrees.
    pub field_of_vision: f64,
    /// Light cutoff distance; hits and light beyond it are ignored.
    pub max_distance: f64,
    /// Multiplier applied to the diffuse term of shadowed surfaces.
    pub shadow_bias: f64,
    /// Offset pushing secondary-ray origins off the surface.
    pub ray_bias: f64,
    /// Maximum reflection recursion depth.
    pub max_ray_depth: u32,
    /// Worker thread count; 0 uses all available cores.
    pub num_threads: usize,
    /// Framebuffer width in pixels.
    pub buffer_width: u32,
    /// Framebuffer height in pixels.
    pub buffer_height: u32,
    /// Attenuation model for the direct light term.
    pub light_model: LightModel,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            field_of_vision: 70.0,
            max_distance: 60.0,
            shadow_bias: 0.25,
            ray_bias: 1e-3,
            max_ray_depth: 3,
            num_threads: 0,
            buffer_width: 640,
            buffer_height: 480,
            light_model: LightModel::Quadratic,
        }
    }
}

/// Row ranges of the `count` bands a `height`-row framebuffer is split
/// into. Band k covers rows [k*height/count, (k+1)*height/count); the
/// bands are contiguous, disjoint and cover every row.
pub fn band_rows(height: u32, count: u32) -> Vec<Range<u32>> {
    let height = u64::from(height);
    let count = u64::from(count.max(1));

    (0..count)
        .map(|k| {
            let start = (k * height / count) as u32;
            let end = ((k + 1) * height / count) as u32;
            start..end
        })
        .collect()
}

/// Scene renderer: traces one framebuffer per `render` call.
pub struct Renderer<'a> {
    scene: &'a Scene,
    config: RendererConfig,
}

impl<'a> Renderer<'a> {
    /// Create a renderer over an immutable scene.
    pub fn new(scene: &'a Scene, config: RendererConfig) -> Self {
        Self { scene, config }
    }

    /// Trace the whole framebuffer and return it in row-major order.
    pub fn render(&self) -> Vec<Color> {
        let width = self.config.buffer_width;
        let height = self.config.buffer_height;

        let window = self
            .scene
            .camera
            .window(width, height, self.config.field_of_vision);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .expect("failed to build render thread pool");
        let workers = pool.current_num_threads() as u32;

        let mut framebuffer = vec![Color::ZERO; (width as usize) * (height as usize)];

        // Slice the framebuffer into one contiguous region per band so
        // every pixel cell has exactly one writer.
        let mut jobs: Vec<(Range<u32>, &mut [Color])> = Vec::new();
        let mut rest: &mut [Color] = &mut framebuffer;
        for rows in band_rows(height, workers) {
            let len = (rows.end - rows.start) as usize * width as usize;
            let (band, tail) = rest.split_at_mut(len);
            jobs.push((rows, band));
            rest = tail;
        }
        debug_assert!(rest.is_empty());

        info!("rendering {}x{} with {} threads", width, height, workers);
        let started = std::time::Instant::now();
        let progress = ProgressBar::new(u64::from(height));
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40} {pos}/{len} rows ETA: {eta}")
                .unwrap(),
        );

        pool.install(|| {
            jobs.into_par_iter().for_each(|(rows, band)| {
                let first_row = rows.start;
                for j in rows {
                    let offset = ((j - first_row) as usize) * width as usize;
                    for i in 0..width {
                        let ray = window.primary_ray(i, j);
                        band[offset + i as usize] =
                            self.trace_ray(ray.origin, ray.direction, 0);
                    }
                    progress.inc(1);
                }
            });
        });

        progress.finish();
        info!("render finished in {:.2?}", started.elapsed());

        framebuffer
    }

    /// Recursively trace one ray. `direction` must be unit length; the
    /// recursion is bounded by `max_ray_depth`. Missed rays are black.
    fn trace_ray(&self, origin: DVec3, direction: DVec3, depth: u32) -> Color {
        let ray = Ray::new(origin, direction);
        let Some((hit_index, distance)) = self.solve_hits(&ray) else {
            return Color::ZERO;
        };

        let actor = &self.scene.actors[hit_index];
        let hit = ray.at(distance);
        let normal = actor.normal_at(hit);
        let surface_color = actor.color_at(hit, normal);

        let mut color = Color::ZERO;

        let to_light = self.scene.light.towards(hit);
        let light_distance = to_light.length();
        if light_distance <= self.config.max_distance {
            let light_dir = to_light / light_distance;

            let mut lambda = normal.dot(light_dir).max(0.0);
            if lambda > 0.0
                && self.solve_shadows(
                    hit + self.config.ray_bias * light_dir,
                    light_dir,
                    light_distance,
                    hit_index,
                )
            {
                lambda *= self.config.shadow_bias;
            }

            color = lambda * self.attenuation(light_distance) * surface_color;
        }

        let reflect = actor.reflect();
        if reflect > 0.0 && depth < self.config.max_ray_depth {
            let reflected = direction - 2.0 * direction.dot(normal) * normal;
            let bounced = self.trace_ray(
                hit + self.config.ray_bias * reflected,
                reflected,
                depth + 1,
            );
            color = (1.0 - reflect) * color + reflect * bounced;
        }

        color
    }

    /// Closest hit over all actors, as (actor index, distance). Ties go
    /// to the earliest actor in insertion order.
    fn solve_hits(&self, ray: &Ray) -> Option<(usize, f64)> {
        let range = Interval::new(self.config.ray_bias, self.config.max_distance);

        let mut closest: Option<(usize, f64)> = None;
        for (index, actor) in self.scene.actors.iter().enumerate() {
            if let Some(distance) = actor.intersect(ray, range) {
                match closest {
                    Some((_, best)) if distance >= best => {}
                    _ => closest = Some((index, distance)),
                }
            }
        }
        closest
    }

    /// Whether anything shadow-casting blocks the segment from `origin`
    /// towards the light. The hit actor itself is skipped.
    fn solve_shadows(
        &self,
        origin: DVec3,
        direction: DVec3,
        light_distance: f64,
        hit_index: usize,
    ) -> bool {
        let ray = Ray::new(origin, direction);
        let range = Interval::new(self.config.ray_bias, light_distance);

        self.scene
            .actors
            .iter()
            .enumerate()
            .filter(|&(index, actor)| index != hit_index && actor.casts_shadow())
            .any(|(_, actor)| actor.intersect(&ray, range).is_some())
    }

    fn attenuation(&self, distance: f64) -> f64 {
        let fade = match self.config.light_model {
            LightModel::None => 1.0,
            LightModel::Linear => 1.0 - distance / self.config.max_distance,
            LightModel::Quadratic => {
                let ratio = distance / self.config.max_distance;
                1.0 - ratio * ratio
            }
        };
        fade.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Surface};
    use crate::camera::Camera;
    use crate::scene::{Light, Scene};

    #[test]
    fn bands_partition_every_row_exactly_once() {
        for (height, count) in [
            (480, 1),
            (480, 4),
            (100, 3),
            (100, 7),
            (64, 64),
            (10, 32),
        ] {
            let bands = band_rows(height, count);
            assert_eq!(bands.len(), count as usize);
            assert_eq!(bands[0].start, 0);
            assert_eq!(bands.last().unwrap().end, height);
            for pair in bands.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            let total: u32 = bands.iter().map(|r| r.end - r.start).sum();
            assert_eq!(total, height);
        }
    }

    fn single_sphere_scene() -> Scene {
        let sphere = Actor::sphere(
            DVec3::new(5.0, 0.0, 0.0),
            DVec3::Z,
            1.0,
            Surface::Flat {
                color: DVec3::new(1.0, 0.0, 0.0),
                reflect: 0.0,
            },
        );
        Scene::new(
            Camera::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0), 0.0),
            Light::new(DVec3::new(0.0, 5.0, 0.0)),
            vec![sphere],
        )
    }

    fn small_config() -> RendererConfig {
        RendererConfig {
            buffer_width: 63,
            buffer_height: 63,
            num_threads: 1,
            ..RendererConfig::default()
        }
    }

    #[test]
    fn attenuation_is_monotonic_in_distance() {
        let scene = single_sphere_scene();
        for model in [LightModel::Linear, LightModel::Quadratic] {
            let renderer = Renderer::new(
                &scene,
                RendererConfig {
                    light_model: model,
                    ..small_config()
                },
            );
            let near = renderer.attenuation(5.0);
            let far = renderer.attenuation(25.0);
            assert!(far < near);
            assert!((0.0..=1.0).contains(&near));
            assert!((0.0..=1.0).contains(&far));
        }

        let renderer = Renderer::new(&scene, small_config());
        // Beyond the cutoff the fade clamps to zero under both falloffs.
        assert_eq!(renderer.attenuation(1000.0), 0.0);
    }

    #[test]
    fn occluded_point_is_darker() {
        // An off-axis occluder dims the lit front of the sphere.
        let mut scene = single_sphere_scene();
        let renderer = Renderer::new(&scene, small_config());
        let open = renderer.render();

        scene.actors.push(Actor::sphere(
            DVec3::new(2.0, 2.5, 0.0),
            DVec3::Z,
            0.5,
            Surface::Flat {
                color: DVec3::ONE,
                reflect: 0.0,
            },
        ));
        let renderer = Renderer::new(&scene, small_config());
        let shadowed = renderer.render();

        let center = (63 / 2) * 63 + 63 / 2;
        assert!(shadowed[center].x < open[center].x);
        // Shading never increases anywhere when an occluder appears.
        for (a, b) in open.iter().zip(shadowed.iter()) {
            assert!(b.x <= a.x + 1e-12);
            assert!(b.y <= a.y + 1e-12);
            assert!(b.z <= a.z + 1e-12);
        }
    }

    #[test]
    fn recursion_depth_is_bounded_by_config() {
        // Two facing mirrors; with full reflectivity the trace bottoms
        // out at max_ray_depth and the result depends on the bound.
        let mirror = |center: DVec3, normal: DVec3| {
            Actor::plane(
                center,
                normal,
                Surface::Flat {
                    color: DVec3::ONE,
                    reflect: 1.0,
                },
            )
        };
        let scene = Scene::new(
            Camera::new(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0), 0.0),
            Light::new(DVec3::new(1.0, 0.5, 0.0)),
            vec![
                mirror(DVec3::new(2.0, 0.0, 0.0), DVec3::new(-1.0, 0.0, 0.0)),
                mirror(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)),
            ],
        );

        let render_with_depth = |depth: u32| {
            let renderer = Renderer::new(
                &scene,
                RendererConfig {
                    max_ray_depth: depth,
                    ..small_config()
                },
            );
            renderer.render()
        };

        let three = render_with_depth(3);
        let four = render_with_depth(4);
        let center = (63 / 2) * 63 + 63 / 2;
        assert!(three[center].is_finite());
        assert!(four[center].is_finite());
        // Odd and even depths terminate on different mirrors.
        assert!((three[center] - four[center]).length() > 1e-9);
    }
}
