pub mod polynomial;
pub mod simplex;
pub mod smoothing;

pub use polynomial::{fit_polynomial, PolynomialFit};
pub use simplex::{Objective, Simplex, SimplexSettings};
pub use smoothing::{moving_average, moving_polynomial};
