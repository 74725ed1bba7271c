use crate::core::{Matrix, Signal, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use crate::param::{Options, ParamSpec};
use crate::stage::{IterativeStage, Stage, StageKind, StageType, StepOutcome, StepPlan};
use std::f32::consts::PI;

/// Stage type: cut a signal into overlapping windows, one matrix row each
pub fn stage_type() -> StageType {
    StageType::new("frame", StageKind::Iterative, |options| {
        Ok(Stage::iterative(Frame::from_options(options)?))
    })
    .summary("split a signal into overlapping frames")
    .param(ParamSpec::input("signal", ValueType::Signal).name("Signal"))
    .param(ParamSpec::output(ValueType::Matrix).name("Frames"))
    .param(
        ParamSpec::scalar("log_n", ValueType::Int)
            .name("Log2 Window")
            .default(8i64)
            .min(4.0)
            .max(16.0)
            .help("Window length as a power of two"),
    )
    .param(
        ParamSpec::scalar("window_size", ValueType::Int)
            .name("Window Size")
            .min(1.0)
            .suffix("samples")
            .default_rule(&["log_n"], |o| {
                let log_n = o.get("log_n").and_then(Value::as_int).unwrap_or(8);
                Value::Int(2i64.pow(log_n.clamp(0, 30) as u32))
            }),
    )
    .param(
        ParamSpec::scalar("step_size", ValueType::Int)
            .name("Step Size")
            .min(1.0)
            .suffix("samples")
            .default_rule(&["window_size"], |o| {
                let window = o.get("window_size").and_then(Value::as_int).unwrap_or(2);
                Value::Int((window / 2).max(1))
            }),
    )
    .param(
        ParamSpec::scalar("hann", ValueType::Bool)
            .name("Hann Window")
            .default(true)
            .help("Taper each frame with a Hann window"),
    )
}

/// Fills one matrix row per step
pub struct Frame {
    input: Option<Signal>,
    samples: Vec<f32>,
    sample_rate: u32,
    window: Vec<f32>,
    step: usize,
    frames: Option<Matrix>,
}

impl Frame {
    /// Build from resolved options
    pub fn from_options(mut options: Options) -> PipelineResult<Self> {
        let size = positive(&options, "window_size")?;
        let step = positive(&options, "step_size")?;
        let window = if options.bool("hann")? {
            hann(size)
        } else {
            vec![1.0; size]
        };

        Ok(Frame {
            input: Some(options.take_signal("signal")?),
            samples: Vec::new(),
            sample_rate: 0,
            window,
            step,
            frames: None,
        })
    }
}

fn positive(options: &Options, key: &str) -> PipelineResult<usize> {
    match options.int(key)? {
        n if n > 0 => Ok(n as usize),
        n => Err(PipelineError::config(format!(
            "'{}' must be positive, got {}",
            key, n
        ))),
    }
}

fn hann(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (size - 1) as f32).cos())
        .collect()
}

impl IterativeStage for Frame {
    fn begin(&mut self) -> PipelineResult<StepPlan> {
        let signal = self
            .input
            .take()
            .ok_or_else(|| PipelineError::execution("frame has already begun"))?;
        self.sample_rate = signal.sample_rate();
        self.samples = signal.into_samples();

        let size = self.window.len();
        let rows = if self.samples.len() >= size {
            1 + (self.samples.len() - size) / self.step
        } else {
            0
        };

        let frame_rate = self.sample_rate as f64 / self.step as f64;
        self.frames = Some(Matrix::zeros(rows, size, frame_rate)?.with_source_rate(self.sample_rate));
        Ok(StepPlan::Count(rows as i64))
    }

    fn step(&mut self, index: usize) -> PipelineResult<StepOutcome> {
        let frames = self
            .frames
            .as_mut()
            .ok_or_else(|| PipelineError::execution("frame stepped before begin"))?;
        let start = index * self.step;
        let source = &self.samples[start..start + self.window.len()];
        for ((out, &x), &w) in frames.row_mut(index).iter_mut().zip(source).zip(&self.window) {
            *out = x * w;
        }
        Ok(StepOutcome::Continue)
    }

    fn end(&mut self) -> PipelineResult<Value> {
        self.frames
            .take()
            .map(Value::Matrix)
            .ok_or_else(|| PipelineError::execution("frame ended before begin"))
    }

    fn status(&self) -> String {
        match &self.frames {
            Some(frames) => format!("{} frames of {}", frames.rows(), frames.cols()),
            None => String::new(),
        }
    }
}
