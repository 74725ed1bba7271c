//! Execution engine: drives one stage instance to its value
//!
//! - Atomic stages that publish progress run on a worker thread while the
//!   caller polls their [`ProgressCell`] every `poll_interval`.
//! - Atomic stages without progress run on the calling thread.
//! - Iterative stages step in batches on the calling thread, with one
//!   progress event per batch.

pub mod task;

pub use task::TaskHandle;

use crate::core::Value;
use crate::error::PipelineResult;
use crate::stage::{AtomicStage, IterativeStage, ProgressCell, Stage, StageState, StepOutcome};
use log::{debug, info, warn};
use std::time::Duration;

/// Engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Hint for how many progress events an iterative stage emits
    pub num_updates: usize,
    /// How often a background atomic stage is polled for progress
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            num_updates: 100,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl RunnerConfig {
    /// Set the progress event hint
    pub fn with_num_updates(mut self, num_updates: usize) -> Self {
        self.num_updates = num_updates;
        self
    }

    /// Set the atomic stage poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Consumer of `(percent, message)` progress events
pub trait ProgressSink {
    /// Receive one progress event
    fn progress(&mut self, percent: f64, message: &str);
}

impl<F: FnMut(f64, &str)> ProgressSink for F {
    fn progress(&mut self, percent: f64, message: &str) {
        self(percent, message)
    }
}

/// Discards progress events
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _percent: f64, _message: &str) {}
}

/// Writes progress events to the log
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, percent: f64, message: &str) {
        if percent < 0.0 {
            info!("progress: {}", message);
        } else {
            info!("progress: {:5.1}% {}", percent * 100.0, message);
        }
    }
}

/// Runs stage instances, forwarding their progress to a sink
pub struct Runner {
    config: RunnerConfig,
    sink: Box<dyn ProgressSink>,
    state: StageState,
    last_percent: f64,
}

impl Runner {
    /// Create a runner that discards progress
    pub fn new(config: RunnerConfig) -> Self {
        Runner {
            config,
            sink: Box::new(NullProgress),
            state: StageState::Idle,
            last_percent: -1.0,
        }
    }

    /// Replace the progress sink
    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Engine settings
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// State reached by the most recent stage execution
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Run a stage to completion.
    ///
    /// Errors from the stage's own operations are returned unchanged.
    pub fn run(&mut self, stage: Stage) -> PipelineResult<Value> {
        self.state = StageState::Idle;
        self.last_percent = -1.0;

        let result = match stage {
            Stage::Atomic(stage) => self.run_atomic(stage),
            Stage::Iterative(stage) => self.run_iterative(stage),
        };
        if result.is_err() {
            self.transition(StageState::Failed);
        }
        result
    }

    fn transition(&mut self, state: StageState) {
        debug!("stage state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Forward an event, never letting the percent move backwards
    fn emit(&mut self, percent: f64, message: &str) {
        let percent = percent.max(self.last_percent);
        self.last_percent = percent;
        self.sink.progress(percent, message);
    }

    fn run_atomic(&mut self, mut stage: Box<dyn AtomicStage>) -> PipelineResult<Value> {
        self.transition(StageState::Running);
        let cell = if stage.supports_progress() {
            stage.progress()
        } else {
            None
        };
        let value = match cell {
            Some(cell) => self.run_polled(stage, cell)?,
            None => stage.run()?,
        };
        self.transition(StageState::Completed);
        Ok(value)
    }

    /// Run on a worker and poll progress until it finishes. The worker
    /// cannot be interrupted, only waited for.
    fn run_polled(
        &mut self,
        stage: Box<dyn AtomicStage>,
        cell: ProgressCell,
    ) -> PipelineResult<Value> {
        let mut task = TaskHandle::spawn("stage-worker", move || {
            let mut stage = stage;
            stage.run()
        })?;

        loop {
            let finished = task.wait(self.config.poll_interval);
            match cell.get() {
                Ok(progress) => self.emit(progress.percent, &progress.message),
                Err(e) => warn!("progress poll failed: {}", e),
            }
            if finished {
                break;
            }
        }

        task.join()?
    }

    fn run_iterative(&mut self, mut stage: Box<dyn IterativeStage>) -> PipelineResult<Value> {
        let plan = stage.begin()?;
        self.transition(StageState::Begun);

        let total = plan.len();
        if total == 0 {
            debug!("iterative stage planned no steps");
            let value = stage.end()?;
            self.transition(StageState::Ended);
            return Ok(value);
        }

        let num_updates = self.config.num_updates.clamp(1, total);
        let batch = (total / num_updates).max(1);
        debug!(
            "stepping {} steps in batches of {} ({} updates)",
            total, batch, num_updates
        );

        self.transition(StageState::Stepping);
        let mut indices = plan.into_indices();
        let mut batches = 0usize;
        'batches: loop {
            let mut ran = 0usize;
            for _ in 0..batch {
                let Some(index) = indices.next() else {
                    break;
                };
                ran += 1;
                if stage.step(index)? == StepOutcome::Stop {
                    debug!("stage stopped early at step {}", index);
                    break 'batches;
                }
            }
            if ran == 0 {
                break;
            }

            batches += 1;
            let percent = (batches as f64 / num_updates as f64).min(1.0);
            let status = stage.status();
            self.emit(percent, &status);

            if ran < batch {
                break;
            }
        }

        let value = stage.end()?;
        self.transition(StageState::Ended);
        Ok(value)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new(RunnerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::stage::StepPlan;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Events = Arc<Mutex<Vec<(f64, String)>>>;

    fn recording_runner(config: RunnerConfig) -> (Runner, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let runner = Runner::new(config).with_sink(move |percent: f64, message: &str| {
            sink_events.lock().unwrap().push((percent, message.to_string()));
        });
        (runner, events)
    }

    /// Counts steps; stops at `stop_at` if set
    struct Counter {
        plan: StepPlan,
        stop_at: Option<usize>,
        visited: Vec<usize>,
        ends: Arc<AtomicUsize>,
        fail_at: Option<usize>,
    }

    impl Counter {
        fn new(plan: StepPlan, ends: &Arc<AtomicUsize>) -> Self {
            Counter {
                plan,
                stop_at: None,
                visited: Vec::new(),
                ends: Arc::clone(ends),
                fail_at: None,
            }
        }
    }

    impl IterativeStage for Counter {
        fn begin(&mut self) -> PipelineResult<StepPlan> {
            Ok(self.plan.clone())
        }

        fn step(&mut self, index: usize) -> PipelineResult<StepOutcome> {
            if self.fail_at == Some(index) {
                return Err(PipelineError::execution("step failed"));
            }
            self.visited.push(index);
            if self.stop_at == Some(index) {
                return Ok(StepOutcome::Stop);
            }
            Ok(StepOutcome::Continue)
        }

        fn end(&mut self) -> PipelineResult<Value> {
            self.ends.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(self.visited.len() as i64))
        }

        fn status(&self) -> String {
            format!("{} steps", self.visited.len())
        }
    }

    #[test]
    fn test_iterative_batches() {
        let ends = Arc::new(AtomicUsize::new(0));
        let (mut runner, events) = recording_runner(RunnerConfig::default().with_num_updates(10));

        let value = runner
            .run(Stage::iterative(Counter::new(StepPlan::Count(37), &ends)))
            .unwrap();

        assert_eq!(value, Value::Int(37));
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        assert_eq!(runner.state(), StageState::Ended);

        let events = events.lock().unwrap();
        // batch = max(1, 37 / 10) = 3, so ceil(37 / 3) events
        assert_eq!(events.len(), 13);
        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(events.iter().all(|(p, _)| *p <= 1.0));
        assert_eq!(events[0], (0.1, "3 steps".to_string()));
        assert_eq!(events[12].1, "37 steps");
    }

    #[test]
    fn test_num_updates_clamped_to_step_count() {
        let ends = Arc::new(AtomicUsize::new(0));
        let (mut runner, events) = recording_runner(RunnerConfig::default());

        runner
            .run(Stage::iterative(Counter::new(StepPlan::Count(5), &ends)))
            .unwrap();

        let percents: Vec<f64> = events.lock().unwrap().iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    }

    #[test]
    fn test_stop_halts_stepping() {
        let ends = Arc::new(AtomicUsize::new(0));
        let (mut runner, events) = recording_runner(RunnerConfig::default().with_num_updates(10));

        let mut counter = Counter::new(StepPlan::Count(100), &ends);
        counter.stop_at = Some(14);
        let value = runner.run(Stage::iterative(counter)).unwrap();

        // indices 0..=14 ran, nothing after the stop
        assert_eq!(value, Value::Int(15));
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        // one event per completed batch of 10
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_explicit_indices() {
        let ends = Arc::new(AtomicUsize::new(0));
        let (mut runner, _) = recording_runner(RunnerConfig::default());

        let mut counter = Counter::new(StepPlan::Indices(vec![0, 4, 8, 12]), &ends);
        counter.stop_at = Some(8);
        let value = runner.run(Stage::iterative(counter)).unwrap();

        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn test_empty_plan_still_ends() {
        let ends = Arc::new(AtomicUsize::new(0));
        let (mut runner, events) = recording_runner(RunnerConfig::default());

        let value = runner
            .run(Stage::iterative(Counter::new(StepPlan::Count(0), &ends)))
            .unwrap();

        assert_eq!(value, Value::Int(0));
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_step_error_aborts_without_end() {
        let ends = Arc::new(AtomicUsize::new(0));
        let mut runner = Runner::default();

        let mut counter = Counter::new(StepPlan::Count(10), &ends);
        counter.fail_at = Some(3);
        let err = runner.run(Stage::iterative(counter)).unwrap_err();

        assert!(matches!(err, PipelineError::Execution(_)));
        assert_eq!(ends.load(Ordering::SeqCst), 0);
        assert_eq!(runner.state(), StageState::Failed);
    }

    struct Blocking {
        value: i64,
        cell: Option<ProgressCell>,
        fail: bool,
    }

    impl AtomicStage for Blocking {
        fn run(&mut self) -> PipelineResult<Value> {
            for i in 1..=5 {
                std::thread::sleep(Duration::from_millis(10));
                if let Some(cell) = &self.cell {
                    cell.set(i as f64 / 5.0, format!("{}/5", i));
                }
            }
            if self.fail {
                return Err(PipelineError::execution("worker failed"));
            }
            Ok(Value::Int(self.value))
        }

        fn progress(&self) -> Option<ProgressCell> {
            self.cell.clone()
        }
    }

    #[test]
    fn test_atomic_without_progress_runs_inline() {
        let (mut runner, events) = recording_runner(RunnerConfig::default());

        let stage = Blocking {
            value: 7,
            cell: None,
            fail: false,
        };
        assert_eq!(runner.run(Stage::atomic(stage)).unwrap(), Value::Int(7));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(runner.state(), StageState::Completed);
    }

    #[test]
    fn test_atomic_with_progress_is_polled() {
        let config = RunnerConfig::default().with_poll_interval(Duration::from_millis(5));
        let (mut runner, events) = recording_runner(config);

        let stage = Blocking {
            value: 9,
            cell: Some(ProgressCell::new()),
            fail: false,
        };
        assert_eq!(runner.run(Stage::atomic(stage)).unwrap(), Value::Int(9));

        let events = events.lock().unwrap();
        assert!(!events.is_empty());
        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
        // the final poll happens after the worker finished
        assert_eq!(events.last().unwrap(), &(1.0, "5/5".to_string()));
    }

    struct Unpolled(Blocking);

    impl AtomicStage for Unpolled {
        fn run(&mut self) -> PipelineResult<Value> {
            self.0.run()
        }

        fn progress(&self) -> Option<ProgressCell> {
            self.0.progress()
        }

        fn supports_progress(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_atomic_opting_out_of_progress_runs_inline() {
        let config = RunnerConfig::default().with_poll_interval(Duration::from_millis(5));
        let (mut runner, events) = recording_runner(config);

        let stage = Unpolled(Blocking {
            value: 3,
            cell: Some(ProgressCell::new()),
            fail: false,
        });
        assert_eq!(runner.run(Stage::atomic(stage)).unwrap(), Value::Int(3));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(runner.state(), StageState::Completed);
    }

    #[test]
    fn test_failed_polls_are_skipped() {
        let config = RunnerConfig::default().with_poll_interval(Duration::from_millis(5));
        let (mut runner, events) = recording_runner(config);

        let cell = ProgressCell::new();
        cell.poison();
        let stage = Blocking {
            value: 11,
            cell: Some(cell),
            fail: false,
        };
        assert_eq!(runner.run(Stage::atomic(stage)).unwrap(), Value::Int(11));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(runner.state(), StageState::Completed);
    }

    #[test]
    fn test_atomic_error_surfaces_after_join() {
        let config = RunnerConfig::default().with_poll_interval(Duration::from_millis(5));
        let mut runner = Runner::new(config);

        let stage = Blocking {
            value: 0,
            cell: Some(ProgressCell::new()),
            fail: true,
        };
        let err = runner.run(Stage::atomic(stage)).unwrap_err();
        assert!(matches!(err, PipelineError::Execution(ref m) if m == "worker failed"));
        assert_eq!(runner.state(), StageState::Failed);
    }
}
