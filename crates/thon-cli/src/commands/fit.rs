use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thon_core::ctf::{BaselineFamily, CtfParams, EnvelopeFamily};
use thon_core::estimate::water_ring::fit_water_ring_ellipse;
use thon_core::io::image_io::{load_image, load_spectrum};
use thon_core::pipeline::config::FitConfig;
use thon_core::pipeline::{fit_ctf_reported, FitOutcome, FitStage, ProfileCurves, ProgressReporter};
use thon_core::powerspectrum::power_spectrum;
use thon_core::radial::PolarGrid;
use thon_core::spectrum::PowerSpectrum;
use tracing::info;

use crate::summary::{print_fit_summary, print_water_ring};

#[derive(Clone, Copy, ValueEnum)]
pub enum BaselineArg {
    Polynomial,
    DoubleGaussian,
    Eman,
}

impl From<BaselineArg> for BaselineFamily {
    fn from(arg: BaselineArg) -> Self {
        match arg {
            BaselineArg::Polynomial => BaselineFamily::Polynomial,
            BaselineArg::DoubleGaussian => BaselineFamily::DoubleGaussian,
            BaselineArg::Eman => BaselineFamily::Eman,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EnvelopeArg {
    Gaussian,
    GaussianConstant,
    DoubleGaussian,
    DoubleGaussianConstant,
}

impl From<EnvelopeArg> for EnvelopeFamily {
    fn from(arg: EnvelopeArg) -> Self {
        match arg {
            EnvelopeArg::Gaussian => EnvelopeFamily::Gaussian,
            EnvelopeArg::GaussianConstant => EnvelopeFamily::GaussianWithConstant,
            EnvelopeArg::DoubleGaussian => EnvelopeFamily::DoubleGaussian,
            EnvelopeArg::DoubleGaussianConstant => EnvelopeFamily::DoubleGaussianWithConstant,
        }
    }
}

#[derive(Args)]
pub struct FitArgs {
    /// Input micrograph (or power spectrum with --spectrum)
    pub file: PathBuf,

    /// Pixel size of the micrograph (A/pixel)
    #[arg(long)]
    pub sampling: f64,

    /// The input already holds a centered power spectrum
    #[arg(long)]
    pub spectrum: bool,

    /// Tile size for the power spectrum (pixels)
    #[arg(long, default_value = "512")]
    pub tile: usize,

    /// Fit config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Starting defocus (A)
    #[arg(long, default_value = "20000")]
    pub defocus: f64,

    /// Lowest defocus searched (A)
    #[arg(long)]
    pub defocus_min: Option<f64>,

    /// Highest defocus searched (A)
    #[arg(long)]
    pub defocus_max: Option<f64>,

    /// Low resolution limit (A)
    #[arg(long)]
    pub lores: Option<f64>,

    /// High resolution limit (A)
    #[arg(long)]
    pub hires: Option<f64>,

    /// Accelerating voltage (kV)
    #[arg(long)]
    pub voltage: Option<f64>,

    /// Spherical aberration (mm)
    #[arg(long)]
    pub cs: Option<f64>,

    /// Amplitude contrast phase shift (radians)
    #[arg(long)]
    pub amplitude_contrast: Option<f64>,

    /// Baseline curve family
    #[arg(long, value_enum)]
    pub baseline: Option<BaselineArg>,

    /// Envelope curve family
    #[arg(long, value_enum)]
    pub envelope: Option<EnvelopeArg>,

    /// Model the water ring as a bump on the baseline
    #[arg(long)]
    pub bump: bool,

    /// Skip astigmatism refinement
    #[arg(long)]
    pub no_astigmatism: bool,

    /// Fit the water ring shape, including its ellipticity
    #[arg(long)]
    pub water_ring: bool,

    /// Maximum number of refinement rounds
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Write the fitted parameters to a TOML file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the radial profile and model curves to a CSV file
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

/// Fitted parameters as written by `--output`.
#[derive(Serialize)]
struct FitReport<'a> {
    input: &'a Path,
    sampling: f64,
    residual: f64,
    rounds: usize,
    converged: bool,
    params: &'a CtfParams,
}

/// Shows the current fit stage on a spinner.
struct SpinnerReporter {
    pb: ProgressBar,
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: FitStage, round: usize) {
        if round == 0 {
            self.pb.set_message(stage.to_string());
        } else {
            self.pb.set_message(format!("Round {round}: {stage}"));
        }
    }

    fn finish_round(&self, round: usize, fom: f64) {
        self.pb.println(format!("  round {round:>2}  fom {fom:.4}"));
    }
}

pub fn run(args: &FitArgs) -> Result<()> {
    let config = build_config(args)?;
    let spectrum = read_spectrum(args)?;
    let seed = config.seed(args.defocus);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    let reporter = Arc::new(SpinnerReporter { pb: pb.clone() });

    let outcome = fit_ctf_reported(&spectrum, &seed, &config, reporter)?;
    pb.finish_and_clear();

    print_fit_summary(&args.file, &spectrum, &config, &outcome);
    if args.water_ring {
        let grid = PolarGrid::new(&spectrum)?;
        let ring = fit_water_ring_ellipse(&grid, &config.water_ring, &config.simplex);
        print_water_ring(ring.as_ref());
    }

    if let Some(ref path) = args.output {
        write_report(path, args, &outcome)?;
        println!("Parameters saved to {}", path.display());
    }
    if let (Some(path), Some(curves)) = (&args.profile, &outcome.curves) {
        write_profile(path, curves)?;
        println!("Profile saved to {}", path.display());
    }

    Ok(())
}

fn build_config(args: &FitArgs) -> Result<FitConfig> {
    let mut config: FitConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid fit config")?
    } else {
        FitConfig::default()
    };

    if let Some(start) = args.defocus_min {
        config.defocus.start = start;
    }
    if let Some(end) = args.defocus_max {
        config.defocus.end = end;
    }
    if let Some(lores) = args.lores {
        config.resolution.lores = lores;
    }
    if let Some(hires) = args.hires {
        config.resolution.hires = hires;
    }
    if let Some(kv) = args.voltage {
        config.microscope.voltage = kv * 1e3;
    }
    if let Some(mm) = args.cs {
        config.microscope.cs = mm * 1e7;
    }
    if let Some(ac) = args.amplitude_contrast {
        config.microscope.amplitude_contrast = ac;
    }
    if let Some(baseline) = args.baseline {
        config.baseline.family = baseline.into();
    }
    if let Some(envelope) = args.envelope {
        config.envelope.family = envelope.into();
    }
    if args.bump {
        config.baseline.bump = true;
    }
    if args.no_astigmatism {
        config.astigmatism.enabled = false;
    }
    if let Some(rounds) = args.rounds {
        config.iteration.max_rounds = rounds;
    }
    if args.profile.is_some() {
        config.iteration.keep_curves = true;
    }

    config.validate().context("Invalid fit config")?;
    Ok(config)
}

fn read_spectrum(args: &FitArgs) -> Result<PowerSpectrum> {
    if args.spectrum {
        return load_spectrum(&args.file, args.sampling)
            .with_context(|| format!("Failed to load {}", args.file.display()));
    }

    let image = load_image(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let (h, w) = image.dim();
    println!(
        "Computing power spectrum of {}x{} image ({} px tiles)",
        w, h, args.tile
    );
    power_spectrum(&image, args.tile, args.sampling, false)
        .with_context(|| format!("Tile size {} does not fit a {}x{} image", args.tile, w, h))
}

fn write_report(path: &Path, args: &FitArgs, outcome: &FitOutcome) -> Result<()> {
    let report = FitReport {
        input: &args.file,
        sampling: args.sampling,
        residual: outcome.residual,
        rounds: outcome.rounds,
        converged: outcome.converged,
        params: &outcome.params,
    };
    let toml_str = toml::to_string_pretty(&report)?;
    std::fs::write(path, toml_str)
        .with_context(|| format!("Failed to write parameters to {}", path.display()))?;
    info!(path = %path.display(), "Parameters written");
    Ok(())
}

/// One radial bin as written by `--profile`.
#[derive(Serialize)]
struct ProfileRow {
    s: f64,
    profile: f64,
    baseline: f64,
    envelope: f64,
    model: f64,
}

fn write_profile(path: &Path, curves: &ProfileCurves) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create profile {}", path.display()))?;
    for i in 0..curves.frequency.len() {
        wtr.serialize(ProfileRow {
            s: curves.frequency[i],
            profile: curves.profile[i],
            baseline: curves.baseline[i],
            envelope: curves.envelope[i],
            model: curves.model[i],
        })?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to write profile to {}", path.display()))?;
    info!(path = %path.display(), bins = curves.frequency.len(), "Profile written");
    Ok(())
}
