use crate::core::Signal;
use crate::error::{PipelineError, PipelineResult};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Mono 32-bit float WAV encoder
pub struct WavEncoder {
    writer: Option<WavWriter<BufWriter<File>>>,
    sample_rate: u32,
}

impl WavEncoder {
    /// Create a new WAV encoder to file
    pub fn new<P: AsRef<Path>>(path: P, sample_rate: u32) -> PipelineResult<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)?;

        Ok(WavEncoder {
            writer: Some(writer),
            sample_rate,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples written
    pub fn samples_written(&self) -> u32 {
        self.writer.as_ref().map(|w| w.len()).unwrap_or(0)
    }
}

impl super::Encoder for WavEncoder {
    fn encode(&mut self, signal: &Signal) -> PipelineResult<()> {
        if signal.sample_rate() != self.sample_rate {
            return Err(PipelineError::Encode(format!(
                "signal at {} Hz written to a {} Hz file",
                signal.sample_rate(),
                self.sample_rate
            )));
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::Encode("Encoder already finalized".to_string()))?;

        for &sample in signal.samples() {
            writer.write_sample(sample)?;
        }

        Ok(())
    }

    fn finalize(&mut self) -> PipelineResult<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}
