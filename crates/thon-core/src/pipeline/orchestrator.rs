use std::sync::Arc;

use tracing::{info, warn};

use crate::consts::{DEFOCUS_MAX, DEFOCUS_MIN, DEFOCUS_RESEED, ROUND_DEFOCUS_FACTOR};
use crate::ctf::CtfParams;
use crate::error::Result;
use crate::estimate::astigmatism::fit_astigmatism;
use crate::estimate::baseline::fit_baseline;
use crate::estimate::defocus::{find_defocus, DefocusSearch};
use crate::estimate::envelope::fit_envelope;
use crate::estimate::residual::fit_residual;
use crate::estimate::water_ring::water_ring_index;
use crate::radial::{PolarGrid, RadialProfile};
use crate::spectrum::PowerSpectrum;

use super::config::FitConfig;
use super::types::{FitOutcome, FitStage, NoOpReporter, ProfileCurves, ProgressReporter};

/// Fit the CTF of `spectrum`, starting from `seed`.
pub fn fit_ctf(spectrum: &PowerSpectrum, seed: &CtfParams, config: &FitConfig) -> Result<FitOutcome> {
    fit_ctf_reported(spectrum, seed, config, Arc::new(NoOpReporter))
}

/// Fit the CTF of `spectrum` with a thread-safe progress reporter.
///
/// An initial defocus search, baseline fit and envelope fit on the isotropic
/// profile are followed by rounds of astigmatism refinement and a narrowed
/// defocus/baseline/envelope pass on the re-averaged profile, until the
/// figure of merit settles or the round cap is hit. The seed's astigmatism
/// is discarded. Only invalid input is an error; stages that cannot fit
/// leave the parameters as they were.
pub fn fit_ctf_reported(
    spectrum: &PowerSpectrum,
    seed: &CtfParams,
    config: &FitConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<FitOutcome> {
    config.validate()?;
    let grid = PolarGrid::new(spectrum)?;
    check_inputs(spectrum, seed, config);

    let mut params = seed.clone().with_astigmatism(0.0, 0.0);
    params.fom = 0.0;
    if !(DEFOCUS_MIN..=DEFOCUS_MAX).contains(&params.defocus_average) {
        warn!(
            defocus = params.defocus_average,
            reseed = DEFOCUS_RESEED,
            "Seed defocus out of range"
        );
        params = params.with_defocus(DEFOCUS_RESEED);
    }
    reporter.begin_stage(FitStage::Seeded, 0);
    info!(
        size = spectrum.width(),
        sampling = spectrum.sampling,
        lores = config.resolution.lores,
        hires = config.resolution.hires,
        "Starting CTF fit"
    );

    let profile = grid.average_for(&params);
    params = fit_profile(&profile, params, &config.defocus, config, reporter.as_ref(), 0)?;
    info!(
        defocus = params.defocus_average,
        fom = params.fom,
        "Initial defocus estimate"
    );

    let (lores, hires) = (config.resolution.lores, config.resolution.hires);
    let mut rounds = 0;
    let mut converged = false;
    let mut previous = params.fom;
    for round in 1..=config.iteration.max_rounds {
        rounds = round;
        if config.astigmatism.enabled {
            reporter.begin_stage(FitStage::AstigmatismRefine, round);
            let astig = fit_astigmatism(&grid, &params, lores, hires, &config.astigmatism);
            params = params.with_astigmatism(astig.deviation, astig.angle);
        }

        let profile = grid.average_for(&params);
        let search = config
            .defocus
            .around(params.defocus_average, ROUND_DEFOCUS_FACTOR);
        params = fit_profile(&profile, params, &search, config, reporter.as_ref(), round)?;
        reporter.finish_round(round, params.fom);
        info!(
            round,
            defocus = params.defocus_average,
            deviation = params.defocus_deviation,
            angle_deg = params.astigmatism_angle.to_degrees(),
            fom = params.fom,
            "Round complete"
        );

        if (params.fom - previous).abs() < config.iteration.fom_threshold {
            converged = true;
            break;
        }
        previous = params.fom;
    }

    reporter.begin_stage(FitStage::Converged, rounds);
    let profile = grid.average_for(&params);
    params.water_ring_index = water_ring_index(&profile, &config.water_ring);
    let residual = fit_residual(&profile, &params, lores, hires);
    let curves = config
        .iteration
        .keep_curves
        .then(|| ProfileCurves::new(&profile, &params));

    info!(
        defocus = params.defocus_average,
        deviation = params.defocus_deviation,
        angle_deg = params.astigmatism_angle.to_degrees(),
        fom = params.fom,
        residual,
        water_ring = params.water_ring_index,
        rounds,
        converged,
        "CTF fit complete"
    );

    Ok(FitOutcome {
        params,
        residual,
        rounds,
        converged,
        curves,
    })
}

/// Defocus search, then baseline and envelope fits on one profile.
fn fit_profile(
    profile: &RadialProfile,
    params: CtfParams,
    search: &DefocusSearch,
    config: &FitConfig,
    reporter: &dyn ProgressReporter,
    round: usize,
) -> Result<CtfParams> {
    let (lores, hires) = (config.resolution.lores, config.resolution.hires);

    reporter.begin_stage(FitStage::DefocusCoarse, round);
    let estimate = find_defocus(profile, &params, search, lores, hires)?;
    let mut params = params.with_defocus(estimate.defocus);
    if estimate.fom > -1.0 {
        params.fom = estimate.fom;
    }

    reporter.begin_stage(FitStage::BaselineFit, round);
    if let Some(fit) = fit_baseline(profile, &params, lores, hires, &config.baseline, &config.simplex) {
        params = params.with_baseline(fit.baseline);
    }

    reporter.begin_stage(FitStage::EnvelopeFit, round);
    if let Some(fit) = fit_envelope(profile, &params, lores, hires, &config.envelope, &config.simplex) {
        params = params.with_envelope(fit.envelope);
    }

    Ok(params)
}

/// Warn about settings that are legal but unlikely to give a good fit.
fn check_inputs(spectrum: &PowerSpectrum, seed: &CtfParams, config: &FitConfig) {
    let search = &config.defocus;
    if search.start < 1e3 || search.end < 1e4 || search.increment < 100.0 {
        warn!(
            start = search.start,
            end = search.end,
            increment = search.increment,
            "Defocus search range may be too small"
        );
    }
    let best_tile = search.end * seed.wavelength() / (config.resolution.hires * spectrum.sampling);
    if (spectrum.width() as f64) < best_tile {
        warn!(
            size = spectrum.width(),
            recommended = best_tile.ceil(),
            "Tile size may be too small for the defocus search range"
        );
    }
}
