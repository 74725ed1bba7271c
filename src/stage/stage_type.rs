use super::{Stage, StageKind};
use crate::core::ValueType;
use crate::error::{PipelineError, PipelineResult};
use crate::param::{self, Options, ParamSpec, Role};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

type Factory = dyn Fn(Options) -> PipelineResult<Stage> + Send + Sync;

/// A registered processing behavior: its parameter contract and a factory
/// building instances from resolved options
#[derive(Clone)]
pub struct StageType {
    name: String,
    summary: String,
    kind: StageKind,
    specs: Vec<ParamSpec>,
    factory: Arc<Factory>,
}

impl StageType {
    /// Create a stage type with no parameters
    pub fn new<F>(name: &str, kind: StageKind, factory: F) -> Self
    where
        F: Fn(Options) -> PipelineResult<Stage> + Send + Sync + 'static,
    {
        StageType {
            name: name.to_string(),
            summary: String::new(),
            kind,
            specs: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    /// Set the one-line summary
    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    /// Append a parameter spec
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line summary
    pub fn summary_text(&self) -> &str {
        &self.summary
    }

    /// Execution shape
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Parameter specs in declaration order
    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    /// The input port, if the stage consumes upstream output
    pub fn input_spec(&self) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.role() == Role::Input)
    }

    /// The output port
    pub fn output_spec(&self) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.role() == Role::Output)
    }

    /// Declared type of the produced value
    pub fn output_type(&self) -> Option<ValueType> {
        self.output_spec().map(|s| s.value_type())
    }

    /// Check the contract: at most one input and one output port, unique
    /// non-empty scalar keys
    pub fn validate(&self) -> PipelineResult<()> {
        let inputs = self.specs.iter().filter(|s| s.role() == Role::Input).count();
        let outputs = self.specs.iter().filter(|s| s.role() == Role::Output).count();
        if inputs > 1 || outputs > 1 {
            return Err(PipelineError::config(format!(
                "stage '{}' declares {} input and {} output ports, at most one of each is allowed",
                self.name, inputs, outputs
            )));
        }

        let mut seen = HashSet::new();
        for spec in self.specs.iter().filter(|s| s.role() != Role::Output) {
            if spec.store().is_empty() {
                return Err(PipelineError::config(format!(
                    "stage '{}' declares a parameter without a store key",
                    self.name
                )));
            }
            if !seen.insert(spec.store().to_lowercase()) {
                return Err(PipelineError::config(format!(
                    "stage '{}' declares '{}' more than once",
                    self.name,
                    spec.store()
                )));
            }
        }
        Ok(())
    }

    /// Resolve recipe literals into options
    pub fn resolve(&self, literals: &BTreeMap<String, String>) -> PipelineResult<Options> {
        param::resolve(&self.name, &self.specs, literals)
    }

    /// Options produced when a recipe gives no overrides
    pub fn default_options(&self) -> PipelineResult<Options> {
        self.resolve(&BTreeMap::new())
    }

    /// Build an instance, filling in defaults for anything `options` lacks
    pub fn instantiate(&self, mut options: Options) -> PipelineResult<Stage> {
        param::complete(&self.name, &self.specs, &mut options)?;
        let stage = (self.factory)(options)?;
        if stage.kind() != self.kind {
            return Err(PipelineError::config(format!(
                "stage '{}' is declared {:?} but built a {:?} instance",
                self.name,
                self.kind,
                stage.kind()
            )));
        }
        Ok(stage)
    }

    /// Multi-line description: summary, then input, output and options
    pub fn describe(&self) -> String {
        let pad = self
            .specs
            .iter()
            .map(|s| s.display_name().len().max(s.store().len() + 2))
            .max()
            .unwrap_or(0)
            + 4;

        let mut out = String::new();
        if !self.summary.is_empty() {
            out.push_str(&self.summary);
            out.push_str("\n\n");
        }

        let sections = [
            ("Input", Role::Input),
            ("Output", Role::Output),
            ("Options", Role::Scalar),
        ];
        for (title, role) in sections {
            let specs: Vec<&ParamSpec> = self.specs.iter().filter(|s| s.role() == role).collect();
            if specs.is_empty() {
                continue;
            }
            out.push_str(title);
            out.push_str(":\n");
            for spec in specs {
                out.push_str(&spec.format(pad));
                out.push('\n');
            }
        }
        out
    }
}

impl fmt::Debug for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::stage::{AtomicStage, StageKind};

    struct Constant(i64);

    impl AtomicStage for Constant {
        fn run(&mut self) -> PipelineResult<Value> {
            Ok(Value::Int(self.0))
        }
    }

    fn counter() -> StageType {
        StageType::new("count", StageKind::Atomic, |options| {
            Ok(Stage::atomic(Constant(options.int("target")?)))
        })
        .summary("count to a target")
        .param(ParamSpec::input("start", ValueType::Int))
        .param(ParamSpec::output(ValueType::Int))
        .param(ParamSpec::scalar("target", ValueType::Int).default(100i64))
        .param(ParamSpec::scalar("increment", ValueType::Int).help("step size"))
    }

    #[test]
    fn test_ports() {
        let stage = counter();
        assert_eq!(stage.input_spec().unwrap().store(), "start");
        assert_eq!(stage.output_type(), Some(ValueType::Int));
        assert!(stage.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_second_input() {
        let stage = counter().param(ParamSpec::input("other", ValueType::Int));
        assert!(stage.validate().unwrap_err().is_configuration());

        let stage = counter().param(ParamSpec::scalar("TARGET", ValueType::Int));
        assert!(stage.validate().is_err());
    }

    #[test]
    fn test_instantiate_requires_settings() {
        let stage = counter();

        let err = stage.instantiate(Options::new()).err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("increment"));

        let built = stage.instantiate(Options::new().with("increment", 1i64)).unwrap();
        match built {
            Stage::Atomic(mut s) => assert_eq!(s.run().unwrap(), Value::Int(100)),
            Stage::Iterative(_) => panic!("expected atomic stage"),
        }
    }

    #[test]
    fn test_instantiate_checks_supplied_options() {
        let options = Options::new().with("increment", 1i64).with("target", "many");
        assert!(counter().instantiate(options).err().unwrap().is_validation());
    }

    #[test]
    fn test_instantiate_rejects_kind_mismatch() {
        let stage = StageType::new("liar", StageKind::Iterative, |_| {
            Ok(Stage::atomic(Constant(1)))
        })
        .param(ParamSpec::output(ValueType::Int));

        let err = stage.instantiate(Options::new()).err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("liar"));
    }

    #[test]
    fn test_describe_groups_specs() {
        let text = counter().describe();
        assert!(text.starts_with("count to a target"));

        let input = text.find("Input:").unwrap();
        let output = text.find("Output:").unwrap();
        let options = text.find("Options:").unwrap();
        assert!(input < output && output < options);
        assert!(text.contains("[target]"));
        assert!(text.contains(" increment"));
    }
}
