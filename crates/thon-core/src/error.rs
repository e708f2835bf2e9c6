use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Power spectrum has no data")]
    EmptySpectrum,

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid sampling: {0} A/pixel")]
    InvalidSampling(f64),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Fit error: {0}")]
    Fit(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CtfError>;
