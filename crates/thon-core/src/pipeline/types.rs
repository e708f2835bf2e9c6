use crate::ctf::CtfParams;
use crate::radial::RadialProfile;

/// State of a CTF fit, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStage {
    Seeded,
    DefocusCoarse,
    BaselineFit,
    EnvelopeFit,
    AstigmatismRefine,
    Converged,
}

impl std::fmt::Display for FitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seeded => write!(f, "Seeding"),
            Self::DefocusCoarse => write!(f, "Searching defocus"),
            Self::BaselineFit => write!(f, "Fitting baseline"),
            Self::EnvelopeFit => write!(f, "Fitting envelope"),
            Self::AstigmatismRefine => write!(f, "Refining astigmatism"),
            Self::Converged => write!(f, "Converged"),
        }
    }
}

/// Thread-safe progress reporting for a fit.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// The fit entered `stage` during outer round `round` (0 for the
    /// initial pass).
    fn begin_stage(&self, _stage: FitStage, _round: usize) {}

    /// An outer round finished with the given figure of merit.
    fn finish_round(&self, _round: usize, _fom: f64) {}
}

/// No-op progress reporter, used when `fit_ctf` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Profile and model curves sampled on the profile's frequency grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileCurves {
    /// Spatial frequency of every bin (1/A).
    pub frequency: Vec<f64>,
    pub profile: Vec<f64>,
    pub baseline: Vec<f64>,
    pub envelope: Vec<f64>,
    /// `baseline + envelope * ctf^2`.
    pub model: Vec<f64>,
}

impl ProfileCurves {
    pub fn new(profile: &RadialProfile, params: &CtfParams) -> Self {
        let n = profile.len();
        let frequency: Vec<f64> = (0..n).map(|i| profile.frequency(i)).collect();
        let baseline = params.baseline.curve_values(n, profile.step);
        let envelope = params.envelope.curve_values(n, profile.step);
        let ctf2 = params.ctf2_curve(n, profile.step);
        let model = baseline
            .iter()
            .zip(&envelope)
            .zip(&ctf2)
            .map(|((b, e), c)| b + e * c)
            .collect();
        Self {
            frequency,
            profile: profile.values.clone(),
            baseline,
            envelope,
            model,
        }
    }
}

/// Result of a CTF fit.
#[derive(Clone, Debug, PartialEq)]
pub struct FitOutcome {
    /// Fitted parameters, including the figure of merit and water ring index.
    pub params: CtfParams,
    /// Relative residual of the full model against the final profile.
    pub residual: f64,
    /// Outer rounds run.
    pub rounds: usize,
    /// Whether the figure of merit settled before the round cap.
    pub converged: bool,
    pub curves: Option<ProfileCurves>,
}
