use crate::core::Signal;
use crate::error::{PipelineError, PipelineResult};

/// Level measure a [`Normalize`] filter scales to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Largest absolute sample
    Peak,
    /// Root mean square
    Rms,
}

impl NormalizeMode {
    /// Parse `"peak"` or `"rms"`
    pub fn parse(name: &str) -> PipelineResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "peak" => Ok(NormalizeMode::Peak),
            "rms" => Ok(NormalizeMode::Rms),
            other => Err(PipelineError::config(format!(
                "unknown normalization mode '{}'",
                other
            ))),
        }
    }
}

/// Level normalization filter
#[derive(Clone, Debug)]
pub struct Normalize {
    /// Target level (0.0 to 1.0)
    target: f32,
    mode: NormalizeMode,
}

impl Normalize {
    /// Create a normalizer for `target` in (0, 1]
    pub fn new(target: f32, mode: NormalizeMode) -> PipelineResult<Self> {
        if target <= 0.0 || target > 1.0 {
            return Err(PipelineError::config(format!(
                "Target level must be between 0.0 and 1.0, got {}",
                target
            )));
        }
        Ok(Normalize { target, mode })
    }

    /// Create a peak normalizer
    pub fn peak(target: f32) -> PipelineResult<Self> {
        Self::new(target, NormalizeMode::Peak)
    }

    /// Create an RMS normalizer
    pub fn rms(target: f32) -> PipelineResult<Self> {
        Self::new(target, NormalizeMode::Rms)
    }

    /// Measure the level of `samples` in this filter's mode
    pub fn level(&self, samples: &[f32]) -> f32 {
        match self.mode {
            NormalizeMode::Peak => calculate_peak(samples),
            NormalizeMode::Rms => calculate_rms(samples),
        }
    }

    /// Gain that brings `samples` to the target level; 1.0 for silence
    pub fn gain_for(&self, samples: &[f32]) -> f32 {
        let level = self.level(samples);
        if level == 0.0 {
            1.0
        } else {
            self.target / level
        }
    }
}

fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|&s| s.abs()).fold(0.0f32, f32::max)
}

fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squared: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squared / samples.len() as f32).sqrt()
}

impl super::Filter for Normalize {
    fn process(&mut self, signal: &Signal) -> PipelineResult<Signal> {
        let gain = self.gain_for(signal.samples());
        let samples = signal
            .samples()
            .iter()
            .map(|&s| (s * gain).clamp(-1.0, 1.0))
            .collect();
        Signal::new(samples, signal.sample_rate())
    }
}
