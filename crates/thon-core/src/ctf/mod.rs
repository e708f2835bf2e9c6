pub mod baseline;
pub mod envelope;

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_AMPLITUDE_CONTRAST, DEFAULT_CS, DEFAULT_VOLTAGE, DEFOCUS_MAX, DEFOCUS_MIN,
    ELECTRON_CHARGE, ELECTRON_MASS, LIGHT_SPEED, MAX_ZEROS, PLANCK,
};

pub use baseline::{Baseline, BaselineCurve, BaselineFamily, Bump};
pub use envelope::{Envelope, EnvelopeFamily};

/// Microscope constants. These are inputs to a fit and never altered by it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Microscope {
    /// Accelerating voltage (V).
    pub voltage: f64,
    /// Spherical aberration coefficient (A).
    pub cs: f64,
    /// Amplitude contrast expressed as a phase shift (radians).
    pub amplitude_contrast: f64,
}

impl Default for Microscope {
    fn default() -> Self {
        Self {
            voltage: DEFAULT_VOLTAGE,
            cs: DEFAULT_CS,
            amplitude_contrast: DEFAULT_AMPLITUDE_CONTRAST,
        }
    }
}

impl Microscope {
    /// Relativistic electron wavelength (A).
    pub fn wavelength(&self) -> f64 {
        let ev = ELECTRON_CHARGE * self.voltage;
        let rest = 2.0 * ELECTRON_MASS * LIGHT_SPEED * LIGHT_SPEED;
        1e10 * PLANCK / (2.0 * ELECTRON_MASS * ev * (1.0 + ev / rest)).sqrt()
    }
}

/// The full set of CTF parameters for one power spectrum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CtfParams {
    pub microscope: Microscope,
    /// Mean of the two principal defocus values (A, positive = underfocus).
    pub defocus_average: f64,
    /// Half the difference between the principal defocus values (A).
    pub defocus_deviation: f64,
    /// Direction of the major defocus axis (radians, in (-pi/2, pi/2]).
    pub astigmatism_angle: f64,
    pub baseline: Baseline,
    pub envelope: Envelope,
    /// Figure of merit of the last fit, higher is better.
    pub fom: f64,
    pub water_ring_index: f64,
}

impl CtfParams {
    pub fn new(microscope: Microscope, defocus: f64) -> Self {
        Self {
            microscope,
            defocus_average: defocus,
            defocus_deviation: 0.0,
            astigmatism_angle: 0.0,
            baseline: Baseline::default(),
            envelope: Envelope::default(),
            fom: 0.0,
            water_ring_index: 0.0,
        }
    }

    pub fn with_defocus(mut self, defocus: f64) -> Self {
        self.defocus_average = defocus;
        self
    }

    /// Set the astigmatism, normalizing the angle and folding a negative
    /// deviation into a 90 degree rotation.
    pub fn with_astigmatism(mut self, deviation: f64, angle: f64) -> Self {
        let (deviation, angle) = if deviation < 0.0 {
            (-deviation, angle + FRAC_PI_2)
        } else {
            (deviation, angle)
        };
        self.defocus_deviation = deviation;
        self.astigmatism_angle = normalize_angle(angle);
        self
    }

    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn wavelength(&self) -> f64 {
        self.microscope.wavelength()
    }

    /// Defocus along the direction `angle` (radians).
    pub fn defocus_at(&self, angle: f64) -> f64 {
        self.defocus_average
            + self.defocus_deviation * (2.0 * (angle - self.astigmatism_angle)).cos()
    }

    /// Phase shift at squared spatial frequency `s2` for a given defocus.
    pub fn phase_for_defocus(&self, s2: f64, defocus: f64) -> f64 {
        let (t1, t2) = self.phase_terms();
        (t1 * s2 - t2 * defocus) * s2 - self.microscope.amplitude_contrast
    }

    /// Phase shift at squared spatial frequency `s2` along direction `angle`.
    pub fn phase(&self, s2: f64, angle: f64) -> f64 {
        self.phase_for_defocus(s2, self.defocus_at(angle))
    }

    /// CTF value at squared spatial frequency `s2` along direction `angle`.
    pub fn calculate(&self, s2: f64, angle: f64) -> f64 {
        self.phase(s2, angle).sin()
    }

    /// Squared CTF of the average defocus, sampled at `n` frequencies `i * step`.
    pub fn ctf2_curve(&self, n: usize, step: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let s = i as f64 * step;
                self.phase_for_defocus(s * s, self.defocus_average)
                    .sin()
                    .powi(2)
            })
            .collect()
    }

    /// Spatial frequencies (1/A) of the zeros of the average-defocus CTF,
    /// in increasing order up to `max_s`.
    pub fn zeros(&self, max_s: f64) -> Vec<f64> {
        let (t1, t2) = self.phase_terms();
        let b = t2 * self.defocus_average;
        let ac = self.microscope.amplitude_contrast;
        let mut zeros = Vec::new();
        if b <= 0.0 {
            return zeros;
        }
        for n in 1..=MAX_ZEROS {
            let c = n as f64 * PI - ac;
            if c <= 0.0 {
                continue;
            }
            let disc = b * b - 4.0 * t1 * c;
            if disc < 0.0 {
                break;
            }
            let s = (2.0 * c / (b + disc.sqrt())).sqrt();
            if s > max_s {
                break;
            }
            zeros.push(s);
        }
        zeros
    }

    /// Spatial frequencies of the CTF maxima between the zeros up to `max_s`.
    pub fn maxima(&self, max_s: f64) -> Vec<f64> {
        let zeros = self.zeros(max_s);
        let Some(&first) = zeros.first() else {
            return Vec::new();
        };
        std::iter::once(0.75 * first)
            .chain(zeros.windows(2).map(|w| 0.5 * (w[0] + w[1])))
            .collect()
    }

    fn phase_terms(&self) -> (f64, f64) {
        let lambda = self.wavelength();
        (
            FRAC_PI_2 * lambda.powi(3) * self.microscope.cs,
            PI * lambda,
        )
    }
}

/// Fold an angle into (-pi/2, pi/2].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle.rem_euclid(PI);
    if a > FRAC_PI_2 {
        a -= PI;
    }
    a
}

/// Restrict a defocus value to the physically plausible range.
pub fn clamp_defocus(defocus: f64) -> f64 {
    defocus.clamp(DEFOCUS_MIN, DEFOCUS_MAX)
}

/// Format a coefficient with four significant digits for equation strings.
pub(crate) fn sig4(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return format!("{v}");
    }
    let digits = (3 - v.abs().log10().floor() as i32).clamp(0, 12) as usize;
    format!("{v:.digits$}")
}
