#![warn(missing_docs)]

//! # sigproc: recipe-driven signal processing pipelines
//!
//! Stages are small processing behaviors with a declared parameter
//! contract. Recipes name stages in order, override their parameters with
//! literal strings, and may reference other recipes. The recipe manager
//! compiles a recipe into a flat pipeline which the composer runs stage by
//! stage, feeding each output into the next stage's input port.
//!
//! ## Features
//!
//! - **Parameters** - typed specs with defaults, ranges, enumerations and
//!   default rules computed from other parameters
//! - **Stages** - atomic (single call, optional background progress) and
//!   iterative (batched steps with early stop)
//! - **Recipes** - INI documents, nested recipes, stage aliases
//! - **Built-ins** - decode (symphonia), amplify, normalize, pre-emphasis,
//!   framing, energy tracking
//! - **CLI** - run recipes over files and inspect the catalog
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sigproc::{PipelineRunner, RecipeManager, Runner, Value};
//!
//! let registry = Arc::new(sigproc::stages::builtin_registry()?);
//! let mut manager = RecipeManager::new(registry);
//! manager.load_dir("recipes")?;
//!
//! let pipeline = manager.compile("speech")?;
//! let outputs = PipelineRunner::new(Runner::default())
//!     .run(&pipeline, Some(Value::from("input.mp3")))?;
//! ```

/// Values and artifacts passed between stages
pub mod core;
/// Error types for pipeline operations
pub mod error;
/// Parameter specs and option resolution
pub mod param;
/// Stage contract, stage types and the registry
pub mod stage;
/// Execution engine
pub mod engine;
/// Pipeline composer
pub mod pipeline;
/// Recipe model and manager
pub mod recipe;
/// Audio decoder implementations
pub mod decoder;
/// Signal filter implementations
pub mod filter;
/// Output encoders
pub mod encoder;
/// Built-in stages
pub mod stages;

pub use core::{Matrix, Signal, Track, Value, ValueType};
pub use engine::{LogProgress, ProgressSink, Runner, RunnerConfig};
pub use error::{PipelineError, PipelineResult};
pub use param::{Options, ParamSpec};
pub use pipeline::{CompiledPipeline, PipelineRunner};
pub use recipe::{CompileOptions, Recipe, RecipeManager};
pub use stage::{StageRegistry, StageType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
