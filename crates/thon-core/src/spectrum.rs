use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{CtfError, Result};

/// A power spectrum with the zero frequency at its origin.
///
/// 2D spectra are stored with depth 1; rotationally averaged volumes keep
/// their full depth and are treated isotropically by the radial averager.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    /// Intensities, shape = (depth, height, width).
    pub data: Array3<f32>,
    /// Pixel size of the real-space image the spectrum was taken from (A/pixel).
    pub sampling: f64,
    /// Origin (x, y, z) in pixels.
    pub origin: [f64; 3],
}

impl PowerSpectrum {
    /// Wrap a 2D spectrum, placing the origin at `(width/2, height/2)`.
    pub fn new(data: Array2<f32>, sampling: f64) -> Result<Self> {
        Self::from_volume(data.insert_axis(Axis(0)), sampling)
    }

    /// Wrap a 3D spectrum, placing the origin at the volume center.
    pub fn from_volume(data: Array3<f32>, sampling: f64) -> Result<Self> {
        if data.is_empty() {
            return Err(CtfError::EmptySpectrum);
        }
        let (d, h, w) = data.dim();
        if w < 2 || h < 2 {
            return Err(CtfError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        if !(sampling.is_finite() && sampling > 0.0) {
            return Err(CtfError::InvalidSampling(sampling));
        }
        Ok(Self {
            data,
            sampling,
            origin: [(w / 2) as f64, (h / 2) as f64, (d / 2) as f64],
        })
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_volume(&self) -> bool {
        self.depth() > 1
    }

    /// Real-space field of view along x (A).
    pub fn real_size(&self) -> f64 {
        self.width() as f64 * self.sampling
    }

    /// Spatial frequency spanned by one pixel along x (1/A).
    pub fn frequency_step(&self) -> f64 {
        1.0 / self.real_size()
    }

    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[[z, y, x]]
    }

    /// The central plane of the spectrum.
    pub fn plane(&self) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), self.depth() / 2)
    }
}
