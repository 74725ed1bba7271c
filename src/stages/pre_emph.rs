use crate::core::{Signal, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::PreEmphasis;
use crate::param::{Options, ParamSpec};
use crate::stage::{IterativeStage, Stage, StageKind, StageType, StepOutcome, StepPlan};

/// Blocks the signal is split into
const NUM_STEPS: usize = 200;

/// Stage type: first-order high-frequency emphasis
pub fn stage_type() -> StageType {
    StageType::new("pre_emph", StageKind::Iterative, |options| {
        Ok(Stage::iterative(PreEmph::from_options(options)?))
    })
    .summary("boost high frequencies before feature extraction")
    .param(ParamSpec::input("signal", ValueType::Signal).name("Signal"))
    .param(ParamSpec::output(ValueType::Signal).name("Signal"))
    .param(
        ParamSpec::scalar("emph", ValueType::Float)
            .name("Pre Emphasis")
            .default(0.97)
            .min(0.0)
            .max(1.0)
            .help("Filter coefficient; the input is peak-normalized first"),
    )
}

/// Peak-normalizes, then filters the signal block by block
pub struct PreEmph {
    input: Option<Signal>,
    samples: Vec<f32>,
    sample_rate: u32,
    block: usize,
    filter: PreEmphasis,
}

impl PreEmph {
    /// Build from resolved options
    pub fn from_options(mut options: Options) -> PipelineResult<Self> {
        Ok(PreEmph {
            input: Some(options.take_signal("signal")?),
            samples: Vec::new(),
            sample_rate: 0,
            block: 0,
            filter: PreEmphasis::new(options.float("emph")? as f32),
        })
    }
}

impl IterativeStage for PreEmph {
    fn begin(&mut self) -> PipelineResult<StepPlan> {
        let signal = self
            .input
            .take()
            .ok_or_else(|| PipelineError::execution("pre_emph has already begun"))?;
        self.sample_rate = signal.sample_rate();

        let peak = signal.peak();
        self.samples = signal.into_samples();
        if peak > 0.0 {
            for s in &mut self.samples {
                *s /= peak;
            }
        }

        if self.samples.is_empty() {
            return Ok(StepPlan::Count(0));
        }
        self.block = 1 + self.samples.len() / NUM_STEPS;
        Ok(StepPlan::Count(NUM_STEPS as i64))
    }

    fn step(&mut self, index: usize) -> PipelineResult<StepOutcome> {
        let start = index * self.block;
        if start >= self.samples.len() {
            return Ok(StepOutcome::Stop);
        }
        let end = (start + self.block).min(self.samples.len());
        self.filter.apply(&mut self.samples[start..end]);
        Ok(StepOutcome::Continue)
    }

    fn end(&mut self) -> PipelineResult<Value> {
        let samples = std::mem::take(&mut self.samples);
        Ok(Value::Signal(Signal::new(samples, self.sample_rate)?))
    }

    fn status(&self) -> String {
        format!("{} samples in blocks of {}", self.samples.len(), self.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Runner, RunnerConfig};
    use crate::filter::Filter;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_matches_whole_signal_filter() {
        let samples: Vec<f32> = (0..1000).map(|i| ((i % 17) as f32 - 8.0) / 16.0).collect();
        let signal = Signal::new(samples, 8000).unwrap();

        let stage = stage_type()
            .instantiate(Options::new().with("signal", signal.clone()))
            .unwrap();
        let value = Runner::default().run(stage).unwrap();

        let peak = signal.peak();
        let scaled: Vec<f32> = signal.samples().iter().map(|s| s / peak).collect();
        let expected = PreEmphasis::new(0.97)
            .process(&Signal::new(scaled, 8000).unwrap())
            .unwrap();
        assert_eq!(value, Value::Signal(expected));
    }

    #[test]
    fn test_short_signal_stops_early() {
        // 10 samples give blocks of one sample, so stepping stops at index 10
        let signal = Signal::new(vec![0.5; 10], 8000).unwrap();
        let events = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&events);

        let stage = stage_type()
            .instantiate(Options::new().with("signal", signal))
            .unwrap();
        let mut runner = Runner::new(RunnerConfig::default().with_num_updates(200))
            .with_sink(move |_: f64, _: &str| *count.lock().unwrap() += 1);
        let value = runner.run(stage).unwrap();

        assert_eq!(value.as_signal().unwrap().len(), 10);
        assert_eq!(*events.lock().unwrap(), 10);
    }

    #[test]
    fn test_empty_signal() {
        let signal = Signal::new(Vec::new(), 8000).unwrap();
        let stage = stage_type()
            .instantiate(Options::new().with("signal", signal))
            .unwrap();

        let value = Runner::default().run(stage).unwrap();
        assert!(value.as_signal().unwrap().is_empty());
    }
}
