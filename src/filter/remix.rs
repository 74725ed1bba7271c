use crate::error::{PipelineError, PipelineResult};

/// Mix interleaved multi-channel samples down to mono by averaging channels.
///
/// A trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> PipelineResult<Vec<f32>> {
    match channels {
        0 => Err(PipelineError::Decode("stream reports zero channels".to_string())),
        1 => Ok(interleaved.to_vec()),
        n => Ok(interleaved
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect()),
    }
}
