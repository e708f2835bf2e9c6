use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use thon_core::ctf::{CtfParams, Microscope};
use thon_core::io::image_io::save_spectrum;
use thon_core::simulate::simulate_spectrum;

#[derive(Args)]
pub struct SimulateArgs {
    /// Spectrum width and height (pixels)
    #[arg(long, default_value = "512")]
    pub size: usize,

    /// Pixel size (A/pixel)
    #[arg(long, default_value = "1.0")]
    pub sampling: f64,

    /// Parameters written by `thon fit --output` (overrides the CTF flags)
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Average defocus (A)
    #[arg(long, default_value = "20000")]
    pub defocus: f64,

    /// Defocus deviation (A)
    #[arg(long, default_value = "0")]
    pub deviation: f64,

    /// Astigmatism angle (degrees)
    #[arg(long, default_value = "0")]
    pub angle: f64,

    /// Accelerating voltage (kV)
    #[arg(long, default_value = "300")]
    pub voltage: f64,

    /// Spherical aberration (mm)
    #[arg(long, default_value = "2.7")]
    pub cs: f64,

    /// Amplitude contrast phase shift (radians)
    #[arg(long, default_value = "0.07")]
    pub amplitude_contrast: f64,

    /// Output image path
    #[arg(short, long, default_value = "spectrum.png")]
    pub output: PathBuf,
}

#[derive(Deserialize)]
struct ParamsFile {
    params: CtfParams,
}

pub fn run(args: &SimulateArgs) -> Result<()> {
    let params = if let Some(ref path) = args.params {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters {}", path.display()))?;
        let file: ParamsFile = toml::from_str(&contents).context("Invalid parameter file")?;
        file.params
    } else {
        let microscope = Microscope {
            voltage: args.voltage * 1e3,
            cs: args.cs * 1e7,
            amplitude_contrast: args.amplitude_contrast,
        };
        CtfParams::new(microscope, args.defocus)
            .with_astigmatism(args.deviation, args.angle.to_radians())
    };

    println!(
        "Simulating {}x{} spectrum at {} A/pixel (defocus {:.0} A)",
        args.size, args.size, args.sampling, params.defocus_average
    );
    let spectrum = simulate_spectrum(&params, args.size, args.size, args.sampling)?;
    save_spectrum(&spectrum, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("Spectrum saved to {}", args.output.display());

    Ok(())
}
