use crate::core::{Signal, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{Filter, Normalize, NormalizeMode};
use crate::param::{Options, ParamSpec};
use crate::stage::{AtomicStage, Stage, StageKind, StageType};

/// Stage type: scale a signal to a target peak or RMS level
pub fn stage_type() -> StageType {
    StageType::new("normalize", StageKind::Atomic, |options| {
        Ok(Stage::atomic(NormalizeStage::from_options(options)?))
    })
    .summary("scale a signal to a target level")
    .param(ParamSpec::input("signal", ValueType::Signal).name("Signal"))
    .param(ParamSpec::output(ValueType::Signal).name("Signal"))
    .param(
        ParamSpec::scalar("target", ValueType::Float)
            .name("Target Level")
            .default(1.0)
            .min(0.0)
            .max(1.0)
            .help("Level reached after scaling; must be above zero"),
    )
    .param(
        ParamSpec::scalar("mode", ValueType::Str)
            .name("Measure")
            .default("peak")
            .options(&["peak", "rms"]),
    )
}

/// Peak or RMS normalization of one signal
pub struct NormalizeStage {
    signal: Option<Signal>,
    filter: Normalize,
}

impl NormalizeStage {
    /// Build from resolved options
    pub fn from_options(mut options: Options) -> PipelineResult<Self> {
        let mode = NormalizeMode::parse(options.str("mode")?)?;
        let filter = Normalize::new(options.float("target")? as f32, mode)?;
        Ok(NormalizeStage {
            signal: Some(options.take_signal("signal")?),
            filter,
        })
    }
}

impl AtomicStage for NormalizeStage {
    fn run(&mut self) -> PipelineResult<Value> {
        let signal = self
            .signal
            .take()
            .ok_or_else(|| PipelineError::execution("normalize has already run"))?;
        Ok(Value::Signal(self.filter.process(&signal)?))
    }
}
