//! Audio file decoding into mono signals

pub mod symphonia;

pub use symphonia::SymphoniaDecoder;

use crate::core::Signal;
use crate::error::PipelineResult;
use std::path::Path;

/// Trait for decoders producing mono sample blocks
pub trait Decoder: Send {
    /// Decode the next block, downmixed to mono; `None` at end of stream
    fn decode_block(&mut self) -> PipelineResult<Option<Vec<f32>>>;

    /// Sample rate of the decoded stream
    fn sample_rate(&self) -> u32;

    /// Fraction of the stream decoded so far, when the length is known
    fn fraction_decoded(&self) -> Option<f64> {
        None
    }

    /// Check if decoder is finished
    fn is_finished(&self) -> bool;
}

/// Create a decoder from a file path
pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Box<dyn Decoder>> {
    SymphoniaDecoder::from_file(path).map(|d| Box::new(d) as Box<dyn Decoder>)
}

/// Decode a whole stream into one signal, reporting the decoded fraction
/// after every block
pub fn decode_all<F>(decoder: &mut dyn Decoder, mut on_progress: F) -> PipelineResult<Signal>
where
    F: FnMut(f64),
{
    let mut samples = Vec::new();
    while let Some(block) = decoder.decode_block()? {
        samples.extend_from_slice(&block);
        if let Some(fraction) = decoder.fraction_decoded() {
            on_progress(fraction.min(1.0));
        }
    }
    Signal::new(samples, decoder.sample_rate())
}
