use crate::core::Signal;
use crate::error::{PipelineError, PipelineResult};

/// Sample rate converter using linear interpolation
#[derive(Debug, Clone)]
pub struct Resample {
    output_rate: u32,
}

impl Resample {
    /// Create a resampler producing `output_rate` Hz
    pub fn new(output_rate: u32) -> PipelineResult<Self> {
        if output_rate == 0 {
            return Err(PipelineError::config("output sample rate must be positive"));
        }
        Ok(Resample { output_rate })
    }

    /// Get the output sample rate
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Linear interpolation; `ratio` is input rate over output rate
    fn linear_resample(input: &[f32], ratio: f64) -> Vec<f32> {
        if input.is_empty() || ratio <= 0.0 {
            return Vec::new();
        }

        let output_len = (input.len() as f64 / ratio).ceil() as usize;
        let mut output = Vec::with_capacity(output_len);

        for i in 0..output_len {
            let input_pos = i as f64 * ratio;
            let input_idx = input_pos.floor() as usize;

            if input_idx + 1 < input.len() {
                let frac = input_pos - input_idx as f64;
                let sample = input[input_idx] as f64 * (1.0 - frac)
                    + input[input_idx + 1] as f64 * frac;
                output.push(sample as f32);
            } else if input_idx < input.len() {
                output.push(input[input_idx]);
            }
        }

        output
    }
}

impl super::Filter for Resample {
    fn process(&mut self, signal: &Signal) -> PipelineResult<Signal> {
        if signal.sample_rate() == self.output_rate {
            return Ok(signal.clone());
        }

        let ratio = signal.sample_rate() as f64 / self.output_rate as f64;
        let resampled = Self::linear_resample(signal.samples(), ratio);
        Signal::new(resampled, self.output_rate)
    }
}
