use crate::core::Signal;
use crate::error::PipelineResult;

/// First-order pre-emphasis, `y[n] = x[n] - a * x[n-1]`.
///
/// Keeps the last input sample between calls so a signal can be processed
/// in consecutive blocks.
#[derive(Debug, Clone)]
pub struct PreEmphasis {
    coefficient: f32,
    last: f32,
}

impl PreEmphasis {
    /// Create a filter with coefficient `a`
    pub fn new(coefficient: f32) -> Self {
        PreEmphasis {
            coefficient,
            last: 0.0,
        }
    }

    /// Filter one block in place, continuing from the previous block
    pub fn apply(&mut self, block: &mut [f32]) {
        for sample in block {
            let x = *sample;
            *sample = x - self.coefficient * self.last;
            self.last = x;
        }
    }

    /// Forget the previous block
    pub fn reset(&mut self) {
        self.last = 0.0;
    }
}

impl super::Filter for PreEmphasis {
    fn process(&mut self, signal: &Signal) -> PipelineResult<Signal> {
        self.reset();
        let mut out = signal.clone();
        self.apply(out.samples_mut());
        Ok(out)
    }
}
