use crate::error::{PipelineError, PipelineResult};
use std::fmt;
use std::time::Duration;

/// Single-channel sampled signal
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Samples, nominally in -1.0..=1.0
    samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 8000, 16000, 44100)
    sample_rate: u32,
}

impl Signal {
    /// Create a new signal
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> PipelineResult<Self> {
        if sample_rate == 0 {
            return Err(PipelineError::execution(format!(
                "Invalid sample rate: {}",
                sample_rate
            )));
        }

        Ok(Signal {
            samples,
            sample_rate,
        })
    }

    /// Get reference to the samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get mutable reference to the samples
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Get owned samples (consumes signal)
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Get sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if signal is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get duration of this signal
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .map(|&s| s.abs())
            .fold(0.0f32, |a, b| a.max(b))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Signal({},{})>", self.samples.len(), self.sample_rate)
    }
}

/// Two dimensional feature matrix, one row per frame
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Row-major values
    data: Vec<f32>,
    /// Number of frames
    rows: usize,
    /// Features per frame
    cols: usize,
    /// Frames per second
    frame_rate: f64,
    /// Sample rate of the signal the frames were computed from, 0 if unknown
    source_rate: u32,
}

impl Matrix {
    /// Create a matrix from row-major data
    pub fn new(data: Vec<f32>, cols: usize, frame_rate: f64) -> PipelineResult<Self> {
        if cols == 0 {
            return Err(PipelineError::execution("Matrix must have at least one column"));
        }
        if data.len() % cols != 0 {
            return Err(PipelineError::execution(format!(
                "Matrix data length {} not divisible by column count {}",
                data.len(),
                cols
            )));
        }

        Ok(Matrix {
            rows: data.len() / cols,
            data,
            cols,
            frame_rate,
            source_rate: 0,
        })
    }

    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize, frame_rate: f64) -> PipelineResult<Self> {
        Matrix::new(vec![0.0; rows * cols], cols, frame_rate)
    }

    /// Record the sample rate of the originating signal
    pub fn with_source_rate(mut self, source_rate: u32) -> Self {
        self.source_rate = source_rate;
        self
    }

    /// Number of frames
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Features per frame
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Sample rate of the originating signal
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /// Row-major values
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// One frame
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// One frame, mutable
    pub fn row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Check if matrix has no frames
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Matrix({}x{},{})>", self.rows, self.cols, self.frame_rate)
    }
}

/// A labelled time span
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Label text
    pub text: String,
}

/// Time-label track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    labels: Vec<Label>,
}

impl Track {
    /// Create an empty track
    pub fn new() -> Self {
        Track::default()
    }

    /// Append a label
    pub fn push(&mut self, start: f64, end: f64, text: impl Into<String>) {
        self.labels.push(Label {
            start,
            end,
            text: text.into(),
        });
    }

    /// All labels in insertion order
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if track has no labels
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.labels.first(), self.labels.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "<Track({:.2}-{:.2}:{})>",
                first.start,
                last.end,
                self.labels.len()
            ),
            _ => write!(f, "<Track(empty)>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_creation() {
        let signal = Signal::new(vec![0.1, -0.5, 0.25, 0.0], 8000).unwrap();

        assert_eq!(signal.sample_rate(), 8000);
        assert_eq!(signal.len(), 4);
        assert_eq!(signal.peak(), 0.5);
        assert!((signal.duration().as_secs_f64() - 0.0005).abs() < 1e-9);
    }

    #[test]
    fn test_signal_invalid_rate() {
        assert!(Signal::new(vec![0.0], 0).is_err());
    }

    #[test]
    fn test_matrix_rows() {
        let mut matrix = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 100.0).unwrap();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.row(1), &[4.0, 5.0, 6.0]);

        matrix.row_mut(0)[2] = 9.0;
        assert_eq!(matrix.data()[2], 9.0);
    }

    #[test]
    fn test_matrix_invalid_shape() {
        assert!(Matrix::new(vec![1.0, 2.0, 3.0], 2, 100.0).is_err());
        assert!(Matrix::new(vec![], 0, 100.0).is_err());
    }

    #[test]
    fn test_track_display() {
        let mut track = Track::new();
        assert_eq!(track.to_string(), "<Track(empty)>");

        track.push(0.5, 1.0, "a");
        track.push(2.0, 2.25, "b");
        assert_eq!(track.len(), 2);
        assert_eq!(track.to_string(), "<Track(0.50-2.25:2)>");
    }
}
