//! Pixel value conversions.
//!
//! Single source of truth for the value ranges used across the system.
//!
//! ## Value Ranges
//!
//! | Where                         | Range      |
//! |-------------------------------|------------|
//! | Files on disk (`RgbImage`)    | `0..=255`  |
//! | Generator input/output, loss  | `[-1, 1]`  |
//! | Sample rendering, PSNR        | `[0, 1]`   |
//!
//! The generator ends in `tanh`, so everything it is compared against must live
//! in `[-1, 1]` too. Only convert at system boundaries (dataset in, samples out).

/// Convert an 8-bit channel value to the signed network range `[-1, 1]`.
///
/// # Example
/// ```
/// use srgan_rs::core::color::u8_to_signed;
///
/// assert_eq!(u8_to_signed(0), -1.0);
/// assert_eq!(u8_to_signed(255), 1.0);
/// ```
pub fn u8_to_signed(u: u8) -> f32 {
    (u as f32) / 127.5 - 1.0
}

/// Map a signed network value in `[-1, 1]` to the unit range `[0, 1]`.
pub fn signed_to_unit(x: f32) -> f32 {
    0.5 * x + 0.5
}

/// Quantize a unit-range value to an 8-bit channel, clamping out-of-range input.
///
/// # Example
/// ```
/// use srgan_rs::core::color::unit_to_u8;
///
/// assert_eq!(unit_to_u8(0.5), 128);
/// assert_eq!(unit_to_u8(1.7), 255);
/// ```
pub fn unit_to_u8(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Flatten an RGB image into planar CHW order in the signed range.
pub fn rgb_to_planar_signed(image: &image::RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let plane = (width * height) as usize;
    let mut out = vec![0.0f32; plane * 3];
    for (x, y, pixel) in image.enumerate_pixels() {
        let idx = (y * width + x) as usize;
        for c in 0..3 {
            out[c * plane + idx] = u8_to_signed(pixel[c]);
        }
    }
    out
}

/// Build an RGB image from planar CHW data in the unit range.
///
/// Returns `None` when `data` does not hold exactly `3 * width * height` values.
pub fn planar_unit_to_rgb(data: &[f32], width: u32, height: u32) -> Option<image::RgbImage> {
    let plane = (width * height) as usize;
    if data.len() != plane * 3 {
        return None;
    }
    Some(image::RgbImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        image::Rgb([
            unit_to_u8(data[idx]),
            unit_to_u8(data[plane + idx]),
            unit_to_u8(data[2 * plane + idx]),
        ])
    }))
}
