use crate::{error::StaLtaError, signal::TimeSeries};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Synthetic step: `low` until `step_at_s`, `high` after it (optionally only
/// until `step_end_s`), plus seeded Gaussian noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSignal {
    pub fs: f64,
    pub duration_s: f64,
    pub step_at_s: f64,
    pub step_end_s: Option<f64>,
    pub low: f64,
    pub high: f64,
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for StepSignal {
    fn default() -> Self {
        Self {
            fs: 100.0,
            duration_s: 10.0,
            step_at_s: 5.0,
            step_end_s: None,
            low: 1.0,
            high: 2.0,
            noise_std: 1e-6,
            seed: 0,
        }
    }
}

impl StepSignal {
    fn validate(&self) -> Result<(), StaLtaError> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(StaLtaError::invalid(
                "fs",
                self.fs,
                "sampling rate must be positive and finite",
            ));
        }
        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return Err(StaLtaError::invalid(
                "duration_s",
                self.duration_s,
                "duration must be non-negative and finite",
            ));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(StaLtaError::invalid(
                "noise_std",
                self.noise_std,
                "noise level must be non-negative and finite",
            ));
        }
        for (name, value) in [
            ("step_at_s", self.step_at_s),
            ("low", self.low),
            ("high", self.high),
        ] {
            if !value.is_finite() {
                return Err(StaLtaError::invalid(name, value, "must be finite"));
            }
        }
        if let Some(end) = self.step_end_s {
            if !end.is_finite() {
                return Err(StaLtaError::invalid("step_end_s", end, "must be finite"));
            }
        }
        Ok(())
    }

    fn level_at(&self, t: f64) -> f64 {
        let after_onset = t > self.step_at_s;
        let before_end = self.step_end_s.map_or(true, |end| t <= end);
        if after_onset && before_end {
            self.high
        } else {
            self.low
        }
    }

    /// Render `floor(duration_s * fs)` samples at `t = i / fs`.
    pub fn generate(&self) -> Result<TimeSeries, StaLtaError> {
        self.validate()?;
        let n = (self.duration_s * self.fs).floor() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let data = (0..n)
            .map(|i| {
                let t = i as f64 / self.fs;
                let noise = if self.noise_std > 0.0 {
                    self.noise_std * standard_normal(&mut rng)
                } else {
                    0.0
                };
                self.level_at(t) + noise
            })
            .collect();
        TimeSeries::new(self.fs, data)
    }
}

// Box-Muller; u1 is kept in (0, 1] so ln() stays finite.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_levels_and_length() {
        let step = StepSignal {
            noise_std: 0.0,
            ..Default::default()
        };
        let ts = step.generate().expect("generate");
        assert_eq!(ts.len(), 1000);
        assert_eq!(ts.data[500], 1.0);
        assert_eq!(ts.data[501], 2.0);
        assert_eq!(ts.data[999], 2.0);
    }

    #[test]
    fn bounded_step_returns_to_low() {
        let ts = StepSignal {
            step_end_s: Some(5.3),
            low: 0.0,
            high: 1.0,
            noise_std: 0.0,
            ..Default::default()
        }
        .generate()
        .expect("generate");
        let high: Vec<usize> = (0..ts.len()).filter(|&i| ts.data[i] == 1.0).collect();
        assert_eq!(high.first(), Some(&501));
        assert_eq!(high.last(), Some(&530));
        assert_eq!(high.len(), 30);
    }

    #[test]
    fn same_seed_same_noise() {
        let step = StepSignal {
            noise_std: 0.1,
            seed: 42,
            ..Default::default()
        };
        let a = step.generate().expect("a");
        let b = step.generate().expect("b");
        assert_eq!(a.data, b.data);
        let c = StepSignal { seed: 43, ..step }.generate().expect("c");
        assert_ne!(a.data, c.data);
    }

    #[test]
    fn noise_has_requested_spread() {
        let ts = StepSignal {
            duration_s: 200.0,
            step_at_s: 1e9,
            low: 0.0,
            noise_std: 0.5,
            ..Default::default()
        }
        .generate()
        .expect("generate");
        let n = ts.len() as f64;
        let mean = ts.data.iter().sum::<f64>() / n;
        let sd = (ts.data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((sd - 0.5).abs() < 0.02, "sd {sd}");
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(StepSignal {
            fs: 0.0,
            ..Default::default()
        }
        .generate()
        .is_err());
        assert!(StepSignal {
            noise_std: -1.0,
            ..Default::default()
        }
        .generate()
        .is_err());
    }
}
