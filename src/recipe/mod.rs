//! Recipes: ordered, named lists of stage references
//!
//! A recipe document is INI text. The `[process]` section lists section
//! names under integer keys; sorting the keys gives the run order. Every
//! other section holds literal overrides for the stage (or recipe) of the
//! same name. The reserved key `dsp_proc` names the stage type explicitly,
//! so one recipe can use a stage type several times:
//!
//! ```ini
//! [process]
//! 0 = ingest
//! 1 = quiet
//! 2 = normalize
//!
//! [ingest]
//! outRate = 16000
//!
//! [quiet]
//! dsp_proc = amplify
//! dbgain = -6
//! ```

pub mod ini;
pub mod manager;

pub use manager::{CompileOptions, RecipeManager};

use crate::error::{PipelineError, PipelineResult};
use crate::stage::display_name;
use ini::IniSection;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the section listing the run order
pub const PROCESS_SECTION: &str = "process";

/// Section key naming the stage or recipe a section instantiates
pub const ALIAS_KEY: &str = "dsp_proc";

/// Overrides of one recipe section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    /// Stage or recipe name, when it differs from the section name
    pub alias: Option<String>,
    /// Literal overrides keyed by lowercase parameter key
    pub overrides: BTreeMap<String, String>,
}

/// A loaded recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    name: String,
    path: Option<PathBuf>,
    process: Vec<String>,
    sections: HashMap<String, Section>,
}

impl Recipe {
    /// Create an empty recipe
    pub fn new(name: &str) -> Self {
        Recipe {
            name: name.to_string(),
            path: None,
            process: Vec::new(),
            sections: HashMap::new(),
        }
    }

    /// Append a section to the run order with its overrides; a `dsp_proc`
    /// entry becomes the section's alias
    pub fn with_section(mut self, section: &str, overrides: &[(&str, &str)]) -> Self {
        self.process.push(section.to_string());
        let entries = overrides
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();
        self.sections.insert(section.to_string(), Self::section_from(entries));
        self
    }

    fn section_from(entries: Vec<(String, String)>) -> Section {
        let mut section = Section::default();
        for (key, value) in entries {
            if key == ALIAS_KEY {
                section.alias = Some(value);
            } else {
                section.overrides.insert(key, value);
            }
        }
        section
    }

    /// Parse recipe text
    pub fn parse(name: &str, text: &str) -> PipelineResult<Self> {
        let mut recipe = Recipe::new(name);
        let mut order: Option<Vec<(i64, String)>> = None;

        for IniSection { name: section, entries } in ini::parse(text)? {
            if section == PROCESS_SECTION {
                let mut steps = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let position = key.parse::<i64>().map_err(|_| {
                        PipelineError::config(format!(
                            "recipe '{}': process key '{}' is not an integer",
                            name, key
                        ))
                    })?;
                    steps.push((position, value));
                }
                order = Some(steps);
            } else {
                recipe.sections.insert(section, Self::section_from(entries));
            }
        }

        let mut order = order.ok_or_else(|| {
            PipelineError::config(format!(
                "recipe '{}' has no [{}] section",
                name, PROCESS_SECTION
            ))
        })?;
        order.sort_by_key(|(position, _)| *position);
        recipe.process = order.into_iter().map(|(_, section)| section).collect();
        Ok(recipe)
    }

    /// Load a recipe file; its name is the file stem in display form
    /// (`MyRecipe.ini` → `my_recipe`)
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::config(format!("invalid recipe path: {}", path.display()))
            })?;

        let text = fs::read_to_string(path)?;
        let mut recipe = Recipe::parse(&display_name(stem, ""), &text)?;
        recipe.path = Some(path.to_path_buf());
        Ok(recipe)
    }

    /// Write the recipe as INI text
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        fs::write(path, self.to_ini())?;
        Ok(())
    }

    /// Recipe name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the recipe was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Section names in run order
    pub fn process(&self) -> &[String] {
        &self.process
    }

    /// Overrides of a section, if the recipe has a block for it
    pub fn section(&self, section: &str) -> Option<&Section> {
        self.sections.get(section)
    }

    /// Stage or recipe a section instantiates
    pub fn stage_name<'a>(&'a self, section: &'a str) -> &'a str {
        self.sections
            .get(section)
            .and_then(|s| s.alias.as_deref())
            .unwrap_or(section)
    }

    /// Literal overrides of a section; empty when the section has no block
    pub fn overrides(&self, section: &str) -> BTreeMap<String, String> {
        self.sections
            .get(section)
            .map(|s| s.overrides.clone())
            .unwrap_or_default()
    }

    /// Render as recipe text
    pub fn to_ini(&self) -> String {
        let mut sections = vec![IniSection {
            name: PROCESS_SECTION.to_string(),
            entries: self
                .process
                .iter()
                .enumerate()
                .map(|(i, s)| (i.to_string(), s.clone()))
                .collect(),
        }];

        for name in &self.process {
            let Some(section) = self.sections.get(name) else {
                continue;
            };
            let mut entries = Vec::new();
            if let Some(alias) = &section.alias {
                entries.push((ALIAS_KEY.to_string(), alias.clone()));
            }
            entries.extend(section.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
            sections.push(IniSection {
                name: name.clone(),
                entries,
            });
        }

        ini::write(&sections)
    }
}
