use std::path::Path;

use image::{ImageBuffer, Luma};
use ndarray::Array2;

use crate::error::{CtfError, Result};
use crate::spectrum::PowerSpectrum;

/// Load a grayscale image file into an array of intensities in [0, 1].
pub fn load_image(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    Ok(data)
}

/// Load an image that already holds a centered power spectrum.
pub fn load_spectrum(path: &Path, sampling: f64) -> Result<PowerSpectrum> {
    PowerSpectrum::new(load_image(path)?, sampling)
}

/// Save an array as a 16-bit grayscale image (PNG or TIFF, by extension),
/// stretched so its minimum maps to black and its maximum to white.
pub fn save_image(data: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    if h == 0 || w == 0 {
        return Err(CtfError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    let (lo, hi) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = if hi > lo { hi - lo } else { 1.0 };

    let pixels: Vec<u16> = data
        .iter()
        .map(|&v| (((v - lo) / range).clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(CtfError::InvalidDimensions {
            width: w,
            height: h,
        })?;
    img.save(path)?;
    Ok(())
}

/// Save the central plane of a power spectrum as an image.
pub fn save_spectrum(spectrum: &PowerSpectrum, path: &Path) -> Result<()> {
    save_image(&spectrum.plane().to_owned(), path)
}
