use super::{Recipe, ALIAS_KEY};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{CompiledPipeline, PipelineEntry};
use crate::stage::StageRegistry;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Section name treated as the decoding step by [`CompileOptions::skip_ingest`]
pub const INGEST_SECTION: &str = "ingest";

/// How [`RecipeManager::compile_with`] flattens a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Splice referenced recipes in place; otherwise leave a placeholder
    pub expand_sub_recipes: bool,
    /// Drop a top-level section named `ingest`
    pub skip_ingest: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            expand_sub_recipes: true,
            skip_ingest: false,
        }
    }
}

/// Loaded recipes plus the stage registry they refer to
#[derive(Debug, Clone)]
pub struct RecipeManager {
    registry: Arc<StageRegistry>,
    recipes: BTreeMap<String, Recipe>,
}

impl RecipeManager {
    /// Create a manager with no recipes
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        RecipeManager {
            registry,
            recipes: BTreeMap::new(),
        }
    }

    /// Stage registry used for compilation
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Add a recipe, replacing any recipe of the same name
    pub fn add_recipe(&mut self, recipe: Recipe) {
        if self.recipes.contains_key(recipe.name()) {
            warn!("recipe {} replaced", recipe.name());
        }
        self.recipes.insert(recipe.name().to_string(), recipe);
    }

    /// Load one recipe file and return its name
    pub fn load_recipe<P: AsRef<Path>>(&mut self, path: P) -> PipelineResult<String> {
        let recipe = Recipe::load(path.as_ref())?;
        let name = recipe.name().to_string();
        info!("loaded recipe {} from {}", name, path.as_ref().display());
        self.add_recipe(recipe);
        Ok(name)
    }

    /// Load every `*.ini` file of a directory; returns the names loaded
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> PipelineResult<Vec<String>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_ini = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ini"));
            if path.is_file() && is_ini {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| self.load_recipe(path)).collect()
    }

    /// Look up a recipe
    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Check if a recipe is loaded
    pub fn has_recipe(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// Loaded recipe names, sorted
    pub fn recipe_names(&self) -> Vec<&str> {
        self.recipes.keys().map(|k| k.as_str()).collect()
    }

    /// Compile a recipe with sub-recipes expanded
    pub fn compile(&self, name: &str) -> PipelineResult<CompiledPipeline> {
        self.compile_with(name, &CompileOptions::default())
    }

    /// Compile a recipe into a flat pipeline.
    ///
    /// Each section resolves to a registered stage first, then to a loaded
    /// recipe. Recipe references are not checked for cycles.
    pub fn compile_with(
        &self,
        name: &str,
        options: &CompileOptions,
    ) -> PipelineResult<CompiledPipeline> {
        let recipe = self
            .recipes
            .get(name)
            .ok_or_else(|| PipelineError::config(format!("No such recipe: {}", name)))?;
        self.compile_recipe(recipe, options, true)
    }

    fn compile_recipe(
        &self,
        recipe: &Recipe,
        options: &CompileOptions,
        top_level: bool,
    ) -> PipelineResult<CompiledPipeline> {
        let mut pipeline = CompiledPipeline::new();

        for section in recipe.process() {
            if top_level && options.skip_ingest && section == INGEST_SECTION {
                debug!("{}: skipping section {}", recipe.name(), section);
                continue;
            }

            let target = recipe.stage_name(section);
            debug!("{}: compiling section {} as {}", recipe.name(), section, target);

            if let Some(stage) = self.registry.get(target) {
                let resolved = stage.resolve(&recipe.overrides(section))?;
                pipeline.push_stage(section, stage, resolved);
            } else if let Some(sub) = self.recipes.get(target) {
                if !recipe.overrides(section).is_empty() {
                    warn!(
                        "{}: overrides in section {} do not apply to recipe {}",
                        recipe.name(),
                        section,
                        target
                    );
                }
                if options.expand_sub_recipes {
                    pipeline.append(self.compile_recipe(sub, options, false)?);
                } else {
                    pipeline.push_sub_recipe(target);
                }
            } else {
                return Err(PipelineError::config(format!(
                    "no process or recipe found for section '{}'",
                    section
                )));
            }
        }

        Ok(pipeline)
    }

    /// Turn a compiled pipeline back into a recipe.
    ///
    /// Sections are named after their stage; repeated stages get numbered
    /// section names pointing at the stage through `dsp_proc`. Placeholders
    /// become plain recipe references.
    pub fn recipe_from_pipeline(name: &str, pipeline: &CompiledPipeline) -> Recipe {
        let mut recipe = Recipe::new(name);
        let mut seen: HashMap<String, usize> = HashMap::new();

        for entry in pipeline.entries() {
            match entry {
                PipelineEntry::Stage(compiled) => {
                    let stage = compiled.stage.name();
                    let count = seen.entry(stage.to_string()).or_insert(0);
                    *count += 1;

                    let literals: Vec<(String, String)> = compiled
                        .options
                        .iter()
                        .filter(|(_, v)| !v.value_type().is_artifact())
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    let mut overrides: Vec<(&str, &str)> = literals
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str()))
                        .collect();

                    if *count == 1 {
                        recipe = recipe.with_section(stage, &overrides);
                    } else {
                        let section = format!("{}_{}", stage, count);
                        overrides.push((ALIAS_KEY, stage));
                        recipe = recipe.with_section(&section, &overrides);
                    }
                }
                PipelineEntry::SubRecipe(sub) => {
                    recipe = recipe.with_section(sub, &[]);
                }
            }
        }
        recipe
    }

    /// Write a compiled pipeline as recipe source
    pub fn write_recipe<P: AsRef<Path>>(
        &self,
        path: P,
        pipeline: &CompiledPipeline,
    ) -> PipelineResult<()> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recipe");
        Self::recipe_from_pipeline(name, pipeline).save(path)?;
        info!("wrote recipe {} to {}", name, path.display());
        Ok(())
    }
}
