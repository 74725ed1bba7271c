use super::StageType;
use crate::error::{PipelineError, PipelineResult};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered stage types by display name.
///
/// Built once at startup and shared read-only (behind an `Arc`) with the
/// recipe manager.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: BTreeMap<String, Arc<StageType>>,
}

impl StageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        StageRegistry::default()
    }

    /// Register a stage type under its own name
    pub fn register(&mut self, stage: StageType) -> PipelineResult<()> {
        stage.validate()?;
        let name = stage.name().to_string();
        if self.stages.contains_key(&name) {
            return Err(PipelineError::config(format!(
                "stage '{}' is already registered",
                name
            )));
        }
        debug!("registered stage {}", name);
        self.stages.insert(name, Arc::new(stage));
        Ok(())
    }

    /// Make an existing stage reachable under another name, replacing any
    /// previous alias of that name
    pub fn alias(&mut self, alias: &str, target: &str) -> PipelineResult<()> {
        let stage = self
            .get(target)
            .ok_or_else(|| PipelineError::config(format!("no stage named '{}'", target)))?;
        debug!("stage alias {} -> {}", alias, target);
        self.stages.insert(alias.to_string(), stage);
        Ok(())
    }

    /// Look up a stage type
    pub fn get(&self, name: &str) -> Option<Arc<StageType>> {
        self.stages.get(name).cloned()
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.stages.keys().map(|k| k.as_str()).collect()
    }

    /// Entries sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<StageType>)> {
        self.stages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Convert a CamelCase name to lower snake case, dropping `suffix` when the
/// name ends with it (`"PreEmphProcess"` → `"pre_emph"`).
pub fn display_name(name: &str, suffix: &str) -> String {
    let name = match name.strip_suffix(suffix) {
        Some(stripped) if !suffix.is_empty() && !stripped.is_empty() => stripped,
        _ => name,
    };

    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = true;
    for (i, c) in name.chars().enumerate() {
        let upper = c.is_uppercase();
        if i > 0 && upper && !prev_upper {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev_upper = upper;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Value, ValueType};
    use crate::param::ParamSpec;
    use crate::stage::{AtomicStage, Stage, StageKind};

    struct Noop;

    impl AtomicStage for Noop {
        fn run(&mut self) -> PipelineResult<Value> {
            Ok(Value::Bool(true))
        }
    }

    fn noop(name: &str) -> StageType {
        StageType::new(name, StageKind::Atomic, |_| Ok(Stage::atomic(Noop)))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = StageRegistry::new();
        registry.register(noop("beta")).unwrap();
        registry.register(noop("alpha")).unwrap();

        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("gamma").is_none());
        assert!(registry.register(noop("alpha")).is_err());
    }

    #[test]
    fn test_register_enforces_port_contract() {
        let mut registry = StageRegistry::new();
        let stage = noop("two_outputs")
            .param(ParamSpec::output(ValueType::Signal))
            .param(ParamSpec::output(ValueType::Matrix));

        assert!(registry.register(stage).unwrap_err().is_configuration());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_alias() {
        let mut registry = StageRegistry::new();
        registry.register(noop("ffmpeg_ingest")).unwrap();
        registry.alias("ingest", "ffmpeg_ingest").unwrap();

        assert_eq!(registry.get("ingest").unwrap().name(), "ffmpeg_ingest");
        assert!(registry.alias("x", "missing").is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("PreEmphProcess", "Process"), "pre_emph");
        assert_eq!(display_name("FMVNProcess", "Process"), "fmvn");
        assert_eq!(display_name("SpectralFluxProcess", "Process"), "spectral_flux");
        assert_eq!(display_name("MyRecipe", ""), "my_recipe");
        assert_eq!(display_name("mfcc", ""), "mfcc");
        assert_eq!(display_name("Process", "Process"), "process");
    }
}
