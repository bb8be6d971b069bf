//! Texture images and the shared texture store.
//!
//! A scene that references the same texture file from several actors holds
//! a single decoded image; actors keep per-binding reflection and scale
//! coefficients over the shared pixels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::DVec3;
use thiserror::Error;

/// Linear RGB color with each channel in [0, 1].
pub type Color = DVec3;

/// Errors raised while decoding texture files.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The file could not be opened or decoded as an image.
    #[error("cannot load texture {path}: {source}")]
    Decode {
        /// Path of the offending file.
        path: String,
        /// Decoder error.
        source: image::ImageError,
    },
}

/// Immutable 8-bit RGB image, shared between actors.
#[derive(Debug)]
pub struct TextureImage {
    width: u32,
    height: u32,
    data: Vec<[u8; 3]>,
}

impl TextureImage {
    /// Decode an image file into an RGB texture.
    pub fn open(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgb8();

        let (width, height) = image.dimensions();
        let data = image.pixels().map(|p| p.0).collect();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a texture from raw RGB samples, row-major.
    ///
    /// Panics if `data` does not hold `width * height` samples.
    pub fn from_raw(width: u32, height: u32, data: Vec<[u8; 3]>) -> Self {
        assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Sample the texture at fractional coordinates (u, v) with a scale
    /// coefficient. Tiling is periodic in both directions, also for
    /// negative coordinates.
    pub fn pick_pixel(&self, u: f64, v: f64, scale: f64) -> Color {
        let x = (u * f64::from(self.width) * scale)
            .floor()
            .rem_euclid(f64::from(self.width)) as usize;
        let y = (v * f64::from(self.height) * scale)
            .floor()
            .rem_euclid(f64::from(self.height)) as usize;

        let [r, g, b] = self.data[x + y * self.width as usize];
        DVec3::new(f64::from(r), f64::from(g), f64::from(b)) / 255.0
    }
}

/// Cache of decoded texture images, deduplicated by path.
#[derive(Default)]
pub struct TextureStore {
    images: HashMap<PathBuf, Arc<TextureImage>>,
}

impl TextureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a texture, reusing the decoded image if the path was seen
    /// before.
    pub fn load(&mut self, path: &Path) -> Result<Arc<TextureImage>, TextureError> {
        if let Some(image) = self.images.get(path) {
            return Ok(image.clone());
        }

        let image = Arc::new(TextureImage::open(path)?);
        self.images.insert(path.to_path_buf(), image.clone());

        log::debug!("loaded texture {}", path.display());
        Ok(image)
    }

    /// Number of distinct images held by the store.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True if no image has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
