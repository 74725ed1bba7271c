//! Stage contract
//!
//! A stage is one processing behavior. It comes in two shapes:
//!
//! - [`AtomicStage`]: a single `run` call. It may publish progress through a
//!   [`ProgressCell`] that the engine polls from another thread. Once started
//!   an atomic stage cannot be cancelled.
//! - [`IterativeStage`]: `begin`, repeated `step`, then `end`. A step may
//!   return [`StepOutcome::Stop`] to finish early; `end` is still called.
//!
//! Stage instances are built from resolved [`Options`](crate::param::Options)
//! by the factory of their [`StageType`].

pub mod registry;
pub mod stage_type;

pub use registry::{StageRegistry, display_name};
pub use stage_type::StageType;

use crate::core::Value;
use crate::error::{PipelineError, PipelineResult};
use std::sync::{Arc, Mutex};

/// Execution shape of a stage type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Single `run` call
    Atomic,
    /// `begin` / `step` / `end`
    Iterative,
}

/// Lifecycle of one stage execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Not started
    Idle,
    /// Atomic stage executing
    Running,
    /// Atomic stage returned a value
    Completed,
    /// Iterative stage initialized
    Begun,
    /// Iterative stage inside its step loop
    Stepping,
    /// Iterative stage finished through `end`
    Ended,
    /// Any operation returned an error
    Failed,
}

/// A progress report: percent in `[-1, 1]` (negative means unknown) and a
/// short message
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Fraction done, or -1 when unknown
    pub percent: f64,
    /// Short description of what is going on
    pub message: String,
}

impl Progress {
    /// Progress with no estimate
    pub fn unknown() -> Self {
        Progress {
            percent: -1.0,
            message: String::new(),
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress::unknown()
    }
}

/// Progress shared between a running atomic stage and the polling engine
#[derive(Debug, Clone, Default)]
pub struct ProgressCell {
    inner: Arc<Mutex<Progress>>,
}

impl ProgressCell {
    /// Create a cell holding an unknown progress
    pub fn new() -> Self {
        ProgressCell::default()
    }

    /// Publish progress, clamping the percent to `[-1, 1]`
    pub fn set(&self, percent: f64, message: impl Into<String>) {
        // a poisoned cell is reported by the poller, the worker keeps going
        if let Ok(mut progress) = self.inner.lock() {
            progress.percent = percent.clamp(-1.0, 1.0);
            progress.message = message.into();
        }
    }

    /// Read the latest progress
    pub fn get(&self) -> PipelineResult<Progress> {
        self.inner
            .lock()
            .map(|p| p.clone())
            .map_err(|_| PipelineError::execution("progress state poisoned"))
    }

    /// Poison the lock by panicking while holding it
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let inner = Arc::clone(&self.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock();
            panic!("progress writer crashed");
        })
        .join();
    }
}

/// A stage that produces its value in one call.
///
/// Once `run` has started it always runs to completion or error; the engine
/// can only stop polling it.
pub trait AtomicStage: Send {
    /// Produce the stage's value
    fn run(&mut self) -> PipelineResult<Value>;

    /// Progress published while `run` executes, if the stage reports any
    fn progress(&self) -> Option<ProgressCell> {
        None
    }

    /// Whether the engine should run this stage on a worker and poll it.
    /// When false the stage runs inline and its cell is never read.
    fn supports_progress(&self) -> bool {
        self.progress().is_some()
    }
}

/// How many steps an iterative stage expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPlan {
    /// Dense `0..n`; zero or negative means nothing to do
    Count(i64),
    /// Explicit ordered step indices
    Indices(Vec<usize>),
}

impl StepPlan {
    /// Total number of steps
    pub fn len(&self) -> usize {
        match self {
            StepPlan::Count(n) => (*n).max(0) as usize,
            StepPlan::Indices(indices) => indices.len(),
        }
    }

    /// True when no step will run
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step indices in order
    pub fn into_indices(self) -> Box<dyn Iterator<Item = usize>> {
        match self {
            StepPlan::Count(n) => Box::new(0..n.max(0) as usize),
            StepPlan::Indices(indices) => Box::new(indices.into_iter()),
        }
    }
}

/// Result of one iterative step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep stepping
    Continue,
    /// Stop now; `end` is called next
    Stop,
}

/// A stage that does its work in small steps
pub trait IterativeStage: Send {
    /// Initialize and report the expected steps
    fn begin(&mut self) -> PipelineResult<StepPlan>;

    /// Do a small amount of work
    fn step(&mut self, index: usize) -> PipelineResult<StepOutcome>;

    /// Produce the stage's value from whatever state the steps left
    fn end(&mut self) -> PipelineResult<Value>;

    /// Short, side-effect free description of the current state
    fn status(&self) -> String {
        String::new()
    }
}

/// A constructed stage instance, ready for the engine
pub enum Stage {
    /// Single-call stage
    Atomic(Box<dyn AtomicStage>),
    /// Stepped stage
    Iterative(Box<dyn IterativeStage>),
}

impl Stage {
    /// Wrap an atomic stage
    pub fn atomic(stage: impl AtomicStage + 'static) -> Self {
        Stage::Atomic(Box::new(stage))
    }

    /// Wrap an iterative stage
    pub fn iterative(stage: impl IterativeStage + 'static) -> Self {
        Stage::Iterative(Box::new(stage))
    }

    /// Execution shape
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Atomic(_) => StageKind::Atomic,
            Stage::Iterative(_) => StageKind::Iterative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_plan_len() {
        assert_eq!(StepPlan::Count(37).len(), 37);
        assert_eq!(StepPlan::Count(-4).len(), 0);
        assert!(StepPlan::Count(0).is_empty());
        assert_eq!(StepPlan::Indices(vec![0, 3, 6]).len(), 3);
    }

    #[test]
    fn test_step_plan_indices() {
        let dense: Vec<usize> = StepPlan::Count(3).into_indices().collect();
        assert_eq!(dense, vec![0, 1, 2]);

        let sparse: Vec<usize> = StepPlan::Indices(vec![4, 2, 9]).into_indices().collect();
        assert_eq!(sparse, vec![4, 2, 9]);

        assert_eq!(StepPlan::Count(-1).into_indices().count(), 0);
    }

    #[test]
    fn test_progress_cell_clamps() {
        let cell = ProgressCell::new();
        assert_eq!(cell.get().unwrap(), Progress::unknown());

        cell.set(1.5, "almost");
        let progress = cell.clone().get().unwrap();
        assert_eq!(progress.percent, 1.0);
        assert_eq!(progress.message, "almost");
    }

    #[test]
    fn test_poisoned_progress_cell() {
        let cell = ProgressCell::new();
        cell.poison();

        cell.set(0.5, "ignored");
        assert!(cell.get().unwrap_err().is_execution());
    }
}
