use ndarray::Array2;

use crate::ctf::CtfParams;
use crate::error::Result;
use crate::spectrum::PowerSpectrum;

/// Noise-free power spectrum `baseline(s) + envelope(s) * ctf(s, phi)^2`
/// for the parameters in `params`, with the zero frequency at
/// `(width/2, height/2)`.
pub fn simulate_spectrum(
    params: &CtfParams,
    width: usize,
    height: usize,
    sampling: f64,
) -> Result<PowerSpectrum> {
    let real_size = width as f64 * sampling;
    let (ox, oy) = ((width / 2) as f64, (height / 2) as f64);
    let yscale = width as f64 / height as f64;

    let data = Array2::from_shape_fn((height, width), |(y, x)| {
        let dx = x as f64 - ox;
        let dy = (y as f64 - oy) * yscale;
        let s = (dx * dx + dy * dy).sqrt() / real_size;
        let angle = dy.atan2(dx);
        let ctf = params.calculate(s * s, angle);
        (params.baseline.evaluate(s) + params.envelope.evaluate(s) * ctf * ctf) as f32
    });

    PowerSpectrum::new(data, sampling)
}
