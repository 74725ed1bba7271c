//! Typed parameter and port specifications
//!
//! Every stage describes its configuration as an ordered list of
//! [`ParamSpec`]s. A spec is either a port ([`Role::Input`] or
//! [`Role::Output`]), used to wire consecutive stages together, or a
//! [`Role::Scalar`] setting that a recipe may override with a literal.

pub mod options;
pub mod resolve;

pub use options::Options;
pub use resolve::{complete, resolve};

use crate::core::{Value, ValueType};
use crate::error::{PipelineError, PipelineResult};
use std::fmt;
use std::sync::Arc;

/// What a spec describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Receives the previous stage's output
    Input,
    /// Describes the artifact the stage produces
    Output,
    /// A configurable setting
    Scalar,
}

/// Range and enumeration constraints on a scalar value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Inclusive lower bound for numeric values
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values
    pub max: Option<f64>,
    /// The value's textual form must be one of these
    pub options: Vec<String>,
}

impl Constraints {
    /// Check a value, returning the violated constraint on failure
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if let Some(v) = value.as_float() {
            if v.is_nan() && (self.min.is_some() || self.max.is_some()) {
                return Err("value is not a number".to_string());
            }
            if let Some(min) = self.min {
                if v < min {
                    return Err(format!("value {} is below minimum {}", value, min));
                }
            }
            if let Some(max) = self.max {
                if v > max {
                    return Err(format!("value {} is above maximum {}", value, max));
                }
            }
        }

        if !self.options.is_empty() {
            let text = value.to_string();
            if !self.options.iter().any(|o| *o == text) {
                return Err(format!(
                    "value '{}' is not one of {{{}}}",
                    text,
                    self.options.join(", ")
                ));
            }
        }

        Ok(())
    }

    fn is_ranged(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

type RuleFn = dyn Fn(&Options) -> Value + Send + Sync;

/// Computes a parameter's default from other parameters of the same stage
#[derive(Clone)]
pub struct DefaultRule {
    triggers: Vec<String>,
    rule: Arc<RuleFn>,
}

impl DefaultRule {
    /// Create a rule reading the given store keys
    pub fn new<F>(triggers: &[&str], rule: F) -> Self
    where
        F: Fn(&Options) -> Value + Send + Sync + 'static,
    {
        DefaultRule {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            rule: Arc::new(rule),
        }
    }

    /// Store keys the rule reads
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Evaluate against the options resolved so far
    pub fn evaluate(&self, options: &Options) -> Value {
        (self.rule)(options)
    }
}

impl fmt::Debug for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRule")
            .field("triggers", &self.triggers)
            .finish_non_exhaustive()
    }
}

/// Declaration of one stage parameter or port
#[derive(Debug, Clone)]
pub struct ParamSpec {
    store: String,
    name: String,
    role: Role,
    value_type: ValueType,
    constraints: Constraints,
    default: Option<Value>,
    default_rule: Option<DefaultRule>,
    optional: bool,
    help: Option<String>,
    suffix: Option<String>,
}

impl ParamSpec {
    fn new(store: &str, role: Role, value_type: ValueType) -> Self {
        ParamSpec {
            store: store.to_string(),
            name: store.to_string(),
            role,
            value_type,
            constraints: Constraints::default(),
            default: None,
            default_rule: None,
            optional: false,
            help: None,
            suffix: None,
        }
    }

    /// Input port bound to `store`
    pub fn input(store: &str, value_type: ValueType) -> Self {
        ParamSpec::new(store, Role::Input, value_type)
    }

    /// Output port
    pub fn output(value_type: ValueType) -> Self {
        ParamSpec::new("", Role::Output, value_type)
    }

    /// Scalar setting stored under `store`
    pub fn scalar(store: &str, value_type: ValueType) -> Self {
        ParamSpec::new(store, Role::Scalar, value_type)
    }

    /// Set the display name
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the static default
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Derive the default from other settings of the same stage
    pub fn default_rule<F>(mut self, triggers: &[&str], rule: F) -> Self
    where
        F: Fn(&Options) -> Value + Send + Sync + 'static,
    {
        self.default_rule = Some(DefaultRule::new(triggers, rule));
        self
    }

    /// Inclusive lower bound
    pub fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    /// Inclusive upper bound
    pub fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    /// Restrict to an enumerated set
    pub fn options(mut self, options: &[&str]) -> Self {
        self.constraints.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    /// Allow the setting to be absent even without a default
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the help text
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Set the unit suffix shown after defaults (Hz, db, samples)
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    /// Storage key
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Display name
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Role of this spec
    pub fn role(&self) -> Role {
        self.role
    }

    /// Declared type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Range and enumeration constraints
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Static default
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Dynamic default rule
    pub fn rule(&self) -> Option<&DefaultRule> {
        self.default_rule.as_ref()
    }

    /// Help text
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// True for input and output ports
    pub fn is_port(&self) -> bool {
        self.role != Role::Scalar
    }

    /// A scalar with neither a default nor a default rule must be supplied
    pub fn is_required(&self) -> bool {
        self.role == Role::Scalar
            && self.default.is_none()
            && self.default_rule.is_none()
            && !self.optional
    }

    /// Parse and validate a literal override
    pub fn parse_literal(&self, literal: &str) -> PipelineResult<Value> {
        let value = self
            .value_type
            .parse(literal)
            .map_err(|reason| self.validation_error(reason))?;
        self.constraints
            .check(&value)
            .map_err(|reason| self.validation_error(reason))?;
        Ok(value)
    }

    /// Check an already typed value against the declared type and
    /// constraints; integers are accepted where floats are declared
    pub fn check_value(&self, value: &Value) -> PipelineResult<()> {
        let found = value.value_type();
        let widened = self.value_type == ValueType::Float && found == ValueType::Int;
        if found != self.value_type && !widened {
            return Err(self.validation_error(format!("got a {} value", found.name())));
        }
        self.constraints
            .check(value)
            .map_err(|reason| self.validation_error(reason))
    }

    fn validation_error(&self, reason: String) -> PipelineError {
        PipelineError::Validation {
            key: self.store.clone(),
            expected: self.value_type.name().to_string(),
            reason,
        }
    }

    /// Human-readable one-entry description, `pad` wide label column.
    ///
    /// Set `pad` to 0 to get only the type and constraint text.
    pub fn format(&self, pad: usize) -> String {
        let mut out = String::new();
        if pad > 4 {
            let label = if self.is_port() {
                self.name.clone()
            } else if self.is_required() {
                self.store.clone()
            } else {
                format!("[{}]", self.store)
            };
            out.push_str(&format!(" {:<width$}:", label, width = pad - 1));
        }
        out.push_str(&format!(" as type {}", self.value_type));

        if let Some(default) = &self.default {
            match &self.suffix {
                Some(suffix) => out.push_str(&format!(" ({} {})", default, suffix)),
                None => out.push_str(&format!(" ({})", default)),
            }
        }
        if self.constraints.is_ranged() {
            let lo = self.constraints.min.map(|v| v.to_string()).unwrap_or_default();
            let hi = self.constraints.max.map(|v| v.to_string()).unwrap_or_default();
            out.push_str(&format!(" [{}..{}]", lo, hi));
        }
        if !self.constraints.options.is_empty() {
            out.push_str(&format!(" {{{}}}", self.constraints.options.join("|")));
        }
        if let Some(rule) = &self.default_rule {
            out.push_str(&format!(" (derived from {})", rule.triggers().join(", ")));
        }
        if let Some(help) = &self.help {
            out.push_str(&wrap_text(help, pad, 65));
        }
        out
    }
}

/// Break text on spaces into lines of at most `width` characters, each
/// indented by `pad` spaces and a colon.
pub fn wrap_text(text: &str, pad: usize, width: usize) -> String {
    let base = if pad > 1 {
        format!("\n{}:", " ".repeat(pad))
    } else {
        "\n".to_string()
    };
    let limit = width.saturating_sub(pad).max(1);

    let mut out = String::new();
    let mut line = base.clone();
    for word in text.split_whitespace() {
        if line.len() > base.len() && line.len() + 1 + word.len() > limit + base.len() {
            out.push_str(&line);
            line = base.clone();
        }
        line.push(' ');
        line.push_str(word);
    }
    if line != base {
        out.push_str(&line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_only_for_plain_scalars() {
        assert!(ParamSpec::scalar("num_params", ValueType::Int).is_required());
        assert!(!ParamSpec::scalar("delta", ValueType::Int).default(3i64).is_required());
        assert!(!ParamSpec::input("signal", ValueType::Signal).is_required());
        assert!(!ParamSpec::output(ValueType::Signal).is_required());
        assert!(!ParamSpec::scalar("label", ValueType::Str).optional().is_required());

        let derived = ParamSpec::scalar("window_size", ValueType::Int)
            .default_rule(&["log_n"], |_| Value::Int(512));
        assert!(!derived.is_required());
    }

    #[test]
    fn test_parse_literal_range() {
        let spec = ParamSpec::scalar("outRate", ValueType::Int)
            .min(6000.0)
            .max(44100.0)
            .default(8000i64);

        assert_eq!(spec.parse_literal("16000").unwrap(), Value::Int(16000));

        let err = spec.parse_literal("100").unwrap_err();
        match err {
            PipelineError::Validation { key, expected, reason } => {
                assert_eq!(key, "outRate");
                assert_eq!(expected, "int");
                assert!(reason.contains("minimum"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(spec.parse_literal("fast").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_literal_nan() {
        let spec = ParamSpec::scalar("emph", ValueType::Float)
            .min(0.0)
            .max(1.0)
            .default(0.97);

        for literal in ["NaN", "nan"] {
            match spec.parse_literal(literal).unwrap_err() {
                PipelineError::Validation { key, reason, .. } => {
                    assert_eq!(key, "emph");
                    assert!(reason.contains("not a number"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        // without a range there is nothing to compare against
        let free = ParamSpec::scalar("gain", ValueType::Float);
        assert!(free.parse_literal("NaN").unwrap().as_float().unwrap().is_nan());
    }

    #[test]
    fn test_check_value() {
        let spec = ParamSpec::scalar("emph", ValueType::Float).min(0.0).max(1.0);

        assert!(spec.check_value(&Value::Float(0.5)).is_ok());
        assert!(spec.check_value(&Value::Int(1)).is_ok());
        assert!(spec.check_value(&Value::Float(1.5)).unwrap_err().is_validation());
        assert!(spec.check_value(&Value::from("high")).unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_literal_options() {
        let spec = ParamSpec::scalar("mode", ValueType::Str)
            .options(&["peak", "rms"])
            .default("peak");

        assert_eq!(spec.parse_literal("rms").unwrap(), Value::from("rms"));
        let err = spec.parse_literal("lufs").unwrap_err();
        assert!(err.to_string().contains("peak, rms"));
    }

    #[test]
    fn test_format_marks_optional_settings() {
        let spec = ParamSpec::scalar("dbgain", ValueType::Float)
            .default(0.0)
            .min(-100.0)
            .max(100.0)
            .suffix("db")
            .help("gain applied to every sample");

        let text = spec.format(12);
        assert!(text.starts_with(" [dbgain]"));
        assert!(text.contains("as type float (0 db) [-100..100]"));
        assert!(text.contains("gain applied"));
    }

    #[test]
    fn test_wrap_text() {
        let text = wrap_text("one two three four five six", 0, 10);
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 10));
    }
}
