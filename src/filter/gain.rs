use crate::core::Signal;
use crate::error::PipelineResult;

/// Constant gain filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    factor: f32,
}

impl Gain {
    /// Gain from a linear factor
    pub fn linear(factor: f32) -> Self {
        Gain { factor }
    }

    /// Gain from decibels (`10^(db/20)`)
    pub fn from_db(db: f64) -> Self {
        Gain::linear(10f64.powf(db / 20.0) as f32)
    }

    /// Linear factor
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Scale samples in place
    pub fn apply(&self, samples: &mut [f32]) {
        for s in samples {
            *s *= self.factor;
        }
    }
}

impl super::Filter for Gain {
    fn process(&mut self, signal: &Signal) -> PipelineResult<Signal> {
        let mut out = signal.clone();
        self.apply(out.samples_mut());
        Ok(out)
    }
}
