//! Framebuffer export.
//!
//! Converts the linear framebuffer to an 8-bit RGB PNG. Channels are
//! clamped to [0, 1] and scaled to [0, 255]; no tone mapping or gamma
//! curve is applied, the framebuffer values are the image.

use std::path::Path;

use image::{ImageBuffer, Rgb};

use crate::texture::Color;

/// Convert one linear channel to its 8-bit value.
fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0) as u8
}

/// Write a row-major framebuffer of `width` x `height` linear pixels as
/// a PNG file.
pub fn write_png(
    framebuffer: &[Color],
    width: u32,
    height: u32,
    path: &Path,
) -> Result<(), image::ImageError> {
    assert_eq!(framebuffer.len(), (width as usize) * (height as usize));

    let image: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        let pixel = framebuffer[(y as usize) * (width as usize) + (x as usize)];
        Rgb([to_byte(pixel.x), to_byte(pixel.y), to_byte(pixel.z)])
    });

    image.save(path)
}
