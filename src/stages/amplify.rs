use crate::core::{Signal, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::Gain;
use crate::param::{Options, ParamSpec};
use crate::stage::{AtomicStage, ProgressCell, Stage, StageKind, StageType};

/// Samples scaled between progress updates
const CHUNK: usize = 1 << 16;

/// Stage type: change the volume of a signal
pub fn stage_type() -> StageType {
    StageType::new("amplify", StageKind::Atomic, |options| {
        Ok(Stage::atomic(Amplify::from_options(options)?))
    })
    .summary("change volume of track")
    .param(ParamSpec::input("signal", ValueType::Signal).name("Signal"))
    .param(ParamSpec::output(ValueType::Signal).name("Signal"))
    .param(
        ParamSpec::scalar("dbgain", ValueType::Float)
            .name("Gain")
            .default(0.0)
            .min(-100.0)
            .max(100.0)
            .suffix("db")
            .help("db gain"),
    )
}

/// Applies a constant gain in decibels
pub struct Amplify {
    signal: Option<Signal>,
    gain: Gain,
    progress: ProgressCell,
}

impl Amplify {
    /// Build from resolved options
    pub fn from_options(mut options: Options) -> PipelineResult<Self> {
        Ok(Amplify {
            signal: Some(options.take_signal("signal")?),
            gain: Gain::from_db(options.float("dbgain")?),
            progress: ProgressCell::new(),
        })
    }
}

impl AtomicStage for Amplify {
    fn run(&mut self) -> PipelineResult<Value> {
        let Some(mut signal) = self.signal.take() else {
            return Err(PipelineError::execution("amplify has already run"));
        };
        let total = signal.len().max(1);
        let message = format!("relative gain: {:.3}%", self.gain.factor() * 100.0);

        for (i, chunk) in signal.samples_mut().chunks_mut(CHUNK).enumerate() {
            self.gain.apply(chunk);
            let done = ((i + 1) * CHUNK).min(total);
            self.progress.set(done as f64 / total as f64, message.as_str());
        }
        self.progress.set(1.0, message);
        Ok(Value::Signal(signal))
    }

    fn progress(&self) -> Option<ProgressCell> {
        Some(self.progress.clone())
    }
}
