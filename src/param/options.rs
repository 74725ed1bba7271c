use crate::core::{Matrix, Signal, Track, Value};
use crate::error::{PipelineError, PipelineResult};
use std::collections::BTreeMap;

/// Resolved stage options, keyed by parameter store key.
///
/// Iteration is ordered by key so logged option dumps are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<String, Value>,
}

impl Options {
    /// Create an empty option set
    pub fn new() -> Self {
        Options::default()
    }

    /// Set a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Builder-style [`Options::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over entries ordered by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, key: &str) -> PipelineResult<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| PipelineError::config(format!("option '{}' not set", key)))
    }

    fn mismatch(key: &str, expected: &str, got: &Value) -> PipelineError {
        PipelineError::config(format!(
            "option '{}' should be {}, got {}",
            key,
            expected,
            got.value_type()
        ))
    }

    /// Integer option
    pub fn int(&self, key: &str) -> PipelineResult<i64> {
        let value = self.require(key)?;
        value.as_int().ok_or_else(|| Self::mismatch(key, "int", value))
    }

    /// Float option (integers are accepted)
    pub fn float(&self, key: &str) -> PipelineResult<f64> {
        let value = self.require(key)?;
        value.as_float().ok_or_else(|| Self::mismatch(key, "float", value))
    }

    /// Boolean option
    pub fn bool(&self, key: &str) -> PipelineResult<bool> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| Self::mismatch(key, "bool", value))
    }

    /// Text option
    pub fn str(&self, key: &str) -> PipelineResult<&str> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| Self::mismatch(key, "str", value))
    }

    /// Move a signal out of the options (input ports hand over ownership)
    pub fn take_signal(&mut self, key: &str) -> PipelineResult<Signal> {
        match self.take_port(key)? {
            Value::Signal(signal) => Ok(signal),
            other => Err(Self::mismatch(key, "Signal", &other)),
        }
    }

    /// Move a matrix out of the options
    pub fn take_matrix(&mut self, key: &str) -> PipelineResult<Matrix> {
        match self.take_port(key)? {
            Value::Matrix(matrix) => Ok(matrix),
            other => Err(Self::mismatch(key, "Matrix", &other)),
        }
    }

    /// Move a track out of the options
    pub fn take_track(&mut self, key: &str) -> PipelineResult<Track> {
        match self.take_port(key)? {
            Value::Track(track) => Ok(track),
            other => Err(Self::mismatch(key, "Track", &other)),
        }
    }

    fn take_port(&mut self, key: &str) -> PipelineResult<Value> {
        self.values
            .remove(key)
            .ok_or_else(|| PipelineError::config(format!("input port '{}' is not bound", key)))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}
