//! Pipeline composer
//!
//! Runs a [`CompiledPipeline`] stage by stage, handing each stage's output
//! to the next stage's input port.

use crate::core::{Value, ValueType};
use crate::engine::Runner;
use crate::error::{PipelineError, PipelineResult};
use crate::param::Options;
use crate::stage::StageType;
use log::{debug, error, info};
use std::sync::Arc;

/// One stage of a compiled pipeline
#[derive(Debug, Clone)]
pub struct CompiledStage {
    /// Recipe section the stage came from
    pub section: String,
    /// Stage type to instantiate
    pub stage: Arc<StageType>,
    /// Resolved options (ports unbound)
    pub options: Options,
}

/// Entry of a compiled pipeline
#[derive(Debug, Clone)]
pub enum PipelineEntry {
    /// A stage ready to run
    Stage(CompiledStage),
    /// Unexpanded reference to another recipe; display only, never run
    SubRecipe(String),
}

/// Flattened, ordered list of stages and their options
#[derive(Debug, Clone, Default)]
pub struct CompiledPipeline {
    entries: Vec<PipelineEntry>,
}

impl CompiledPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        CompiledPipeline::default()
    }

    /// Append a stage
    pub fn push_stage(&mut self, section: &str, stage: Arc<StageType>, options: Options) {
        self.entries.push(PipelineEntry::Stage(CompiledStage {
            section: section.to_string(),
            stage,
            options,
        }));
    }

    /// Append an unexpanded sub-recipe placeholder
    pub fn push_sub_recipe(&mut self, recipe: &str) {
        self.entries.push(PipelineEntry::SubRecipe(recipe.to_string()));
    }

    /// Splice another pipeline in at the end, keeping its order
    pub fn append(&mut self, other: CompiledPipeline) {
        self.entries.extend(other.entries);
    }

    /// Entries in run order
    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    /// Stages in run order, skipping placeholders
    pub fn stages(&self) -> impl Iterator<Item = &CompiledStage> {
        self.entries.iter().filter_map(|e| match e {
            PipelineEntry::Stage(stage) => Some(stage),
            PipelineEntry::SubRecipe(_) => None,
        })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared output type of the last stage
    pub fn output_type(&self) -> Option<ValueType> {
        match self.entries.last()? {
            PipelineEntry::Stage(stage) => stage.stage.output_type(),
            PipelineEntry::SubRecipe(_) => None,
        }
    }
}

/// Executes compiled pipelines through a [`Runner`]
pub struct PipelineRunner {
    runner: Runner,
    step: usize,
}

impl PipelineRunner {
    /// Wrap an engine runner
    pub fn new(runner: Runner) -> Self {
        PipelineRunner { runner, step: 0 }
    }

    /// Index of the stage currently (or last) executed
    pub fn step(&self) -> usize {
        self.step
    }

    /// The underlying engine runner
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Run every stage in order and return all of their outputs.
    ///
    /// `input`, when given, is bound to the first stage's input port. A stage
    /// without an input port ignores the upstream value. Any error aborts the
    /// run; nothing is returned for the stages that did complete.
    pub fn run(
        &mut self,
        pipeline: &CompiledPipeline,
        input: Option<Value>,
    ) -> PipelineResult<Vec<Value>> {
        for entry in pipeline.entries() {
            if let PipelineEntry::SubRecipe(name) = entry {
                return Err(PipelineError::config(format!(
                    "sub-recipe '{}' was not expanded and cannot be run",
                    name
                )));
            }
        }

        let mut outputs: Vec<Value> = Vec::with_capacity(pipeline.len());
        let mut initial = input;
        self.step = 0;

        for compiled in pipeline.stages() {
            // upstream artifacts are copied only into stages that consume them
            let upstream = match (initial.take(), outputs.last()) {
                (Some(value), _) => Some(value),
                (None, Some(previous)) if compiled.stage.input_spec().is_some() => {
                    Some(previous.clone())
                }
                (None, Some(previous)) => {
                    debug!(
                        "{} has no input port, dropping upstream {}",
                        compiled.stage.name(),
                        previous
                    );
                    None
                }
                (None, None) => None,
            };
            let output = self
                .run_stage(compiled, upstream)
                .map_err(|e| {
                    error!(
                        "stage {} (section {}) failed: {}",
                        compiled.stage.name(),
                        compiled.section,
                        e
                    );
                    PipelineError::Stage {
                        stage: compiled.stage.name().to_string(),
                        section: compiled.section.clone(),
                        source: Box::new(e),
                    }
                })?;

            outputs.push(output);
            self.step += 1;
        }

        Ok(outputs)
    }

    fn run_stage(&mut self, compiled: &CompiledStage, upstream: Option<Value>) -> PipelineResult<Value> {
        let stage_type = &compiled.stage;
        let mut options = compiled.options.clone();

        if let Some(value) = upstream {
            match stage_type.input_spec() {
                Some(spec) => {
                    options.insert(spec.store(), value);
                }
                None => debug!(
                    "{} has no input port, dropping upstream {}",
                    stage_type.name(),
                    value
                ),
            }
        }

        let listing: String = options
            .iter()
            .map(|(k, v)| format!("\t{}:{}\n", k, v))
            .collect();
        info!("Running {}:\n{}", stage_type.name(), listing);

        let stage = stage_type.instantiate(options)?;
        self.runner.run(stage)
    }
}
