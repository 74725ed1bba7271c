use super::{DefaultRule, Options, ParamSpec};
use crate::error::{PipelineError, PipelineResult};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

/// Build the options for one stage from recipe literals.
///
/// `literals` maps lowercase keys to raw strings; keys are matched
/// case-insensitively against each scalar's store key. Precedence, lowest
/// first: static default, literal, default rule (only for specs the literals
/// do not set). Ports are skipped, they are bound when the pipeline runs.
pub fn resolve(
    stage: &str,
    specs: &[ParamSpec],
    literals: &BTreeMap<String, String>,
) -> PipelineResult<Options> {
    let mut options = Options::new();
    let mut pending = Vec::new();

    for spec in specs.iter().filter(|s| !s.is_port() && !s.store().is_empty()) {
        if let Some(literal) = literals.get(&spec.store().to_lowercase()) {
            options.insert(spec.store(), spec.parse_literal(literal)?);
            continue;
        }

        if let Some(default) = spec.default_value() {
            options.insert(spec.store(), default.clone());
        }
        if let Some(rule) = spec.rule() {
            pending.push((spec, rule));
        } else if spec.is_required() {
            return Err(PipelineError::config(format!(
                "required setting '{}' not found for stage '{}'",
                spec.store().to_lowercase(),
                stage
            )));
        }
    }

    apply_rules(stage, &mut options, pending);
    Ok(options)
}

/// Fill in whatever a caller-supplied option set is missing.
///
/// Used when a stage is constructed: absent scalars take their static
/// default, then their default rule; a required scalar that is still absent
/// is a configuration error.
pub fn complete(stage: &str, specs: &[ParamSpec], options: &mut Options) -> PipelineResult<()> {
    let mut pending = Vec::new();

    for spec in specs.iter().filter(|s| !s.is_port() && !s.store().is_empty()) {
        if let Some(value) = options.get(spec.store()) {
            spec.check_value(value)?;
            continue;
        }
        if let Some(default) = spec.default_value() {
            options.insert(spec.store(), default.clone());
        }
        if let Some(rule) = spec.rule() {
            pending.push((spec, rule));
        } else if spec.is_required() {
            return Err(PipelineError::config(format!(
                "Key '{}' not found in input options for {}",
                spec.store(),
                stage
            )));
        }
    }

    apply_rules(stage, options, pending);
    Ok(())
}

/// Evaluate default rules so that each runs after the rules producing its
/// triggers.
///
/// Triggers that no pending rule produces count as resolved; the rule sees
/// whatever value (if any) is present. When every remaining rule waits on
/// another remaining rule the triggers are cyclic, and the rest are evaluated
/// in declaration order.
fn apply_rules(stage: &str, options: &mut Options, mut pending: Vec<(&ParamSpec, &DefaultRule)>) {
    while !pending.is_empty() {
        let waiting: HashSet<&str> = pending.iter().map(|(spec, _)| spec.store()).collect();
        let ready = pending.iter().position(|(spec, rule)| {
            rule.triggers()
                .iter()
                .all(|t| t == spec.store() || !waiting.contains(t.as_str()))
        });

        let index = ready.unwrap_or_else(|| {
            warn!(
                "{}: cyclic default rule triggers among {:?}, evaluating in declaration order",
                stage, waiting
            );
            0
        });

        let (spec, rule) = pending.remove(index);
        let value = rule.evaluate(options);
        debug!("{}: default rule set {} = {}", stage, spec.store(), value);
        options.insert(spec.store(), value);
    }
}
