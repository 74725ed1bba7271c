//! Persisting pipeline outputs

pub mod text;
pub mod wav;

pub use wav::WavEncoder;

use crate::core::{Signal, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Trait for signal encoders
pub trait Encoder {
    /// Encode a signal to output
    fn encode(&mut self, signal: &Signal) -> PipelineResult<()>;

    /// Finalize encoding (flush any remaining data)
    fn finalize(&mut self) -> PipelineResult<()> {
        Ok(())
    }
}

/// File extension used for an artifact type, including the dot
pub fn suggested_extension(value_type: ValueType) -> Option<&'static str> {
    match value_type {
        ValueType::Signal => Some(".wav"),
        ValueType::Matrix => Some(".csv"),
        ValueType::Track => Some(".txt"),
        _ => None,
    }
}

/// Write a pipeline output to `path` in the format of its type
pub fn save_artifact<P: AsRef<Path>>(path: P, value: &Value) -> PipelineResult<()> {
    let path = path.as_ref();
    match value {
        Value::Signal(signal) => {
            let mut encoder = WavEncoder::new(path, signal.sample_rate())?;
            encoder.encode(signal)?;
            encoder.finalize()?;
        }
        Value::Matrix(matrix) => {
            let mut out = BufWriter::new(File::create(path)?);
            text::write_matrix(&mut out, matrix)?;
            out.flush()?;
        }
        Value::Track(track) => {
            let mut out = BufWriter::new(File::create(path)?);
            text::write_track(&mut out, track)?;
            out.flush()?;
        }
        other => {
            return Err(PipelineError::Encode(format!(
                "no file format for {} output",
                other.value_type()
            )));
        }
    }
    info!("saved {} to {}", value, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Matrix, Track};
    use hound::WavReader;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_suggested_extension() {
        assert_eq!(suggested_extension(ValueType::Signal), Some(".wav"));
        assert_eq!(suggested_extension(ValueType::Matrix), Some(".csv"));
        assert_eq!(suggested_extension(ValueType::Track), Some(".txt"));
        assert_eq!(suggested_extension(ValueType::Float), None);
    }

    #[test]
    fn test_save_each_artifact() {
        let dir = TempDir::new().unwrap();

        let signal = Signal::new(vec![0.25; 10], 8000).unwrap();
        save_artifact(dir.path().join("out.wav"), &Value::from(signal)).unwrap();
        let reader = WavReader::open(dir.path().join("out.wav")).unwrap();
        assert_eq!(reader.len(), 10);

        let matrix = Matrix::new(vec![1.0, 2.0], 2, 10.0).unwrap();
        save_artifact(dir.path().join("out.csv"), &Value::from(matrix)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("out.csv")).unwrap(), "1,2\n");

        let mut track = Track::new();
        track.push(0.0, 1.0, "loud");
        save_artifact(dir.path().join("out.txt"), &Value::from(track)).unwrap();
        assert!(fs::read_to_string(dir.path().join("out.txt")).unwrap().ends_with("loud\n"));
    }

    #[test]
    fn test_scalar_cannot_be_saved() {
        let dir = TempDir::new().unwrap();
        let err = save_artifact(dir.path().join("x"), &Value::Int(3)).unwrap_err();
        assert!(matches!(err, PipelineError::Encode(_)));
    }
}
