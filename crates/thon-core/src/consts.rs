/// Planck constant (J s).
pub const PLANCK: f64 = 6.626_070_15e-34;

/// Electron rest mass (kg).
pub const ELECTRON_MASS: f64 = 9.109_383_7e-31;

/// Elementary charge (C).
pub const ELECTRON_CHARGE: f64 = 1.602_176_634e-19;

/// Speed of light in vacuum (m/s).
pub const LIGHT_SPEED: f64 = 299_792_458.0;

/// Default accelerating voltage (V).
pub const DEFAULT_VOLTAGE: f64 = 300_000.0;

/// Default spherical aberration coefficient (A), i.e. 2.7 mm.
pub const DEFAULT_CS: f64 = 2.7e7;

/// Default amplitude contrast phase shift (radians).
pub const DEFAULT_AMPLITUDE_CONTRAST: f64 = 0.07;

/// Lowest defocus accepted anywhere (A).
pub const DEFOCUS_MIN: f64 = 1.0;

/// Highest physically plausible defocus (A).
pub const DEFOCUS_MAX: f64 = 2e5;

/// Defocus used to reseed a fit whose starting value is implausible (A).
pub const DEFOCUS_RESEED: f64 = 2e4;

/// Lower clamp for the start of a defocus search (A).
pub const DEFOCUS_SEARCH_FLOOR: f64 = 100.0;

/// Default initial defocus search increment (A).
pub const DEFAULT_DEFOCUS_INCREMENT: f64 = 1000.0;

/// The coarse-to-fine defocus search stops once the increment drops below this (A).
pub const DEFAULT_MIN_DEFOCUS_INCREMENT: f64 = 50.0;

/// Factor the defocus increment is divided by at every refinement level.
pub const DEFAULT_INCREMENT_DIVISOR: f64 = 1.6;

/// Low-resolution limit is never allowed above this during defocus search (A).
pub const MAX_SEARCH_LORES: f64 = 100.0;

/// Maximum number of CTF zeros computed.
pub const MAX_ZEROS: usize = 100;

/// Zeros used for astigmatism scoring extend to this fraction of Nyquist.
pub const ASTIGMATISM_NYQUIST_FRACTION: f64 = 0.9;

/// Defocus search window used in later pipeline rounds spans
/// `average / ROUND_DEFOCUS_FACTOR .. average * ROUND_DEFOCUS_FACTOR`.
pub const ROUND_DEFOCUS_FACTOR: f64 = 10.0;

/// Water ring peak location used for the baseline bump (1/A, about 3.8 A).
pub const DEFAULT_BUMP_LOCATION: f64 = 0.265;

/// The baseline bump is only fitted when hires is finer than this (A).
pub const BUMP_HIRES_LIMIT: f64 = 3.0;

/// Default water ring band edges (1/A): low flank, ring, ring, high flank.
pub const DEFAULT_WATER_RING_BANDS: [f64; 4] = [0.1, 0.2, 0.3, 0.4];

/// Default number of outer pipeline rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Default outer loop stop threshold on the change in figure of merit.
pub const DEFAULT_FOM_THRESHOLD: f64 = 1e-10;

/// Default astigmatism refinement iteration cap.
pub const DEFAULT_ASTIGMATISM_ITERATIONS: usize = 20;

/// Default number of angles evaluated per astigmatism iteration.
pub const DEFAULT_ANGLE_FAN: usize = 11;

/// Default initial step for the astigmatism deviation (A).
pub const DEFAULT_DEVIATION_STEP: f64 = 200.0;

/// Astigmatism angular window divisor when the deviation stalls.
pub const ASTIGMATISM_WINDOW_SHRINK: f64 = 2.0;

/// Astigmatism deviation step multiplier when the deviation stalls.
pub const DEVIATION_STEP_GROWTH: f64 = 2.0;

/// The running deviation moves `1/DEVIATION_NUDGE` of the way to the best one.
pub const DEVIATION_NUDGE: f64 = 1.5;

/// Deviation change (A) below which the refiner counts as stalled.
pub const DEVIATION_TOLERANCE: f64 = 1.0;

/// Default simplex iteration cap.
pub const DEFAULT_SIMPLEX_CYCLES: usize = 10_000;

/// Default simplex relative tolerance.
pub const DEFAULT_SIMPLEX_TOLERANCE: f64 = 1e-6;

/// Default number of simplex restarts after collapse.
pub const DEFAULT_SIMPLEX_RESTARTS: usize = 3;

/// Default seed for the simplex random start.
pub const DEFAULT_SEED: u64 = 1;

/// Minimum number of zeros in range to anchor the baseline on them.
pub const MIN_BASELINE_ZEROS: usize = 4;

/// Minimum number of zeros required before fitting an envelope.
pub const MIN_ENVELOPE_ZEROS: usize = 5;

/// Order of the local polynomial trend removed before defocus search.
pub const TREND_ORDER: usize = 2;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-30;

/// Spatial frequency band (1/A) in which the baseline bump is fitted.
pub const BUMP_BAND: [f64; 2] = [0.2, 0.3];

/// Width (1/A) of the flanks either side of the bump band used to estimate
/// the background under the bump.
pub const BUMP_FLANK: f64 = 0.05;
