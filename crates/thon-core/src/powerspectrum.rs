use ndarray::{s, Array2};
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::info;

use crate::error::{CtfError, Result};
use crate::spectrum::PowerSpectrum;

/// Average power spectrum of a micrograph.
///
/// The image is cut into `tile x tile` tiles overlapping by half a tile;
/// each tile has its mean removed, is transformed, and `|F|^2` is averaged
/// over all tiles. The result is shifted so the zero frequency sits at
/// `(tile/2, tile/2)`. With `log` set, `ln(1 + power)` is returned instead.
pub fn power_spectrum(
    image: &Array2<f32>,
    tile: usize,
    sampling: f64,
    log: bool,
) -> Result<PowerSpectrum> {
    let (h, w) = image.dim();
    if tile < 4 || tile > h || tile > w {
        return Err(CtfError::InvalidDimensions {
            width: tile,
            height: tile,
        });
    }

    let stride = tile / 2;
    let origins: Vec<(usize, usize)> = (0..=h - tile)
        .step_by(stride)
        .flat_map(|y| (0..=w - tile).step_by(stride).map(move |x| (y, x)))
        .collect();
    info!(tiles = origins.len(), tile, "Computing power spectrum");

    let total = origins
        .par_iter()
        .map(|&(y, x)| tile_power(&image.slice(s![y..y + tile, x..x + tile]).to_owned()))
        .reduce(
            || Array2::<f64>::zeros((tile, tile)),
            |mut acc, p| {
                acc += &p;
                acc
            },
        );

    let count = origins.len() as f64;
    let half = tile / 2;
    let mut shifted = Array2::<f32>::zeros((tile, tile));
    for ((row, col), &v) in total.indexed_iter() {
        let p = v / count;
        let p = if log { p.ln_1p() } else { p };
        shifted[[(row + half) % tile, (col + half) % tile]] = p as f32;
    }

    PowerSpectrum::new(shifted, sampling)
}

/// `|F|^2` of a mean-subtracted tile.
fn tile_power(data: &Array2<f32>) -> Array2<f64> {
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64;
    let spectrum = fft2d(data, mean);
    spectrum.mapv(|c| c.norm_sqr())
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f32>, offset: f64) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v as f64 - offset, 0.0));

    for mut row in result.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        fft_row.process(&mut buf);
        for (dst, src) in row.iter_mut().zip(buf) {
            *dst = src;
        }
    }

    for mut col in result.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        fft_col.process(&mut buf);
        for (dst, src) in col.iter_mut().zip(buf) {
            *dst = src;
        }
    }

    result
}
