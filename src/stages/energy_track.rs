use crate::core::{Matrix, Track, Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use crate::param::{Options, ParamSpec};
use crate::stage::{IterativeStage, Stage, StageKind, StageType, StepOutcome, StepPlan};

/// Text of the labels produced for active regions
pub const ACTIVE_LABEL: &str = "active";

/// Stage type: label the spans whose frame energy exceeds a threshold
pub fn stage_type() -> StageType {
    StageType::new("energy_track", StageKind::Iterative, |options| {
        Ok(Stage::iterative(EnergyTrack::from_options(options)?))
    })
    .summary("mark regions of high frame energy")
    .param(ParamSpec::input("frames", ValueType::Matrix).name("Frames"))
    .param(ParamSpec::output(ValueType::Track).name("Track"))
    .param(
        ParamSpec::scalar("hop", ValueType::Int)
            .name("Hop")
            .default(1i64)
            .min(1.0)
            .suffix("frames")
            .help("Only every hop-th frame is measured"),
    )
    .param(
        ParamSpec::scalar("threshold", ValueType::Float)
            .name("Threshold")
            .default(0.01)
            .min(0.0)
            .help("Mean square energy above which a frame is active"),
    )
}

/// Walks every `hop`-th frame, merging active frames into labels
pub struct EnergyTrack {
    frames: Option<Matrix>,
    hop: usize,
    threshold: f32,
    open: Option<(usize, usize)>,
    track: Track,
}

impl EnergyTrack {
    /// Build from resolved options
    pub fn from_options(mut options: Options) -> PipelineResult<Self> {
        let hop = options.int("hop")?;
        if hop < 1 {
            return Err(PipelineError::config(format!("'hop' must be positive, got {}", hop)));
        }
        Ok(EnergyTrack {
            frames: Some(options.take_matrix("frames")?),
            hop: hop as usize,
            threshold: options.float("threshold")? as f32,
            open: None,
            track: Track::new(),
        })
    }

    fn close(&mut self) {
        let Some((first, last)) = self.open.take() else {
            return;
        };
        let Some(frames) = &self.frames else {
            return;
        };
        let rate = frames.frame_rate();
        if rate <= 0.0 {
            return;
        }
        let end = (last + self.hop).min(frames.rows());
        self.track.push(first as f64 / rate, end as f64 / rate, ACTIVE_LABEL);
    }
}

fn energy(row: &[f32]) -> f32 {
    if row.is_empty() {
        return 0.0;
    }
    row.iter().map(|x| x * x).sum::<f32>() / row.len() as f32
}

impl IterativeStage for EnergyTrack {
    fn begin(&mut self) -> PipelineResult<StepPlan> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| PipelineError::execution("energy_track has no frames"))?;
        let indices = (0..frames.rows()).step_by(self.hop).collect();
        Ok(StepPlan::Indices(indices))
    }

    fn step(&mut self, index: usize) -> PipelineResult<StepOutcome> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| PipelineError::execution("energy_track has no frames"))?;
        let active = energy(frames.row(index)) > self.threshold;

        match (active, self.open) {
            (true, Some((first, _))) => self.open = Some((first, index)),
            (true, None) => self.open = Some((index, index)),
            (false, Some(_)) => self.close(),
            (false, None) => {}
        }
        Ok(StepOutcome::Continue)
    }

    fn end(&mut self) -> PipelineResult<Value> {
        self.close();
        Ok(Value::Track(std::mem::take(&mut self.track)))
    }

    fn status(&self) -> String {
        format!("{} regions", self.track.len())
    }
}
