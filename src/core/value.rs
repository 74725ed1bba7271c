use super::artifact::{Matrix, Signal, Track};
use std::fmt;

/// Declared type of a parameter or port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// Boolean flag
    Bool,
    /// Text, including file paths
    Str,
    /// Sampled signal artifact
    Signal,
    /// Feature matrix artifact
    Matrix,
    /// Label track artifact
    Track,
}

impl ValueType {
    /// Type name used in messages and documentation
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Str => "str",
            ValueType::Signal => "Signal",
            ValueType::Matrix => "Matrix",
            ValueType::Track => "Track",
        }
    }

    /// True for types that can only be produced by a stage
    pub fn is_artifact(&self) -> bool {
        matches!(self, ValueType::Signal | ValueType::Matrix | ValueType::Track)
    }

    /// Parse a literal string as this type.
    ///
    /// Booleans are true only for a case-insensitive `"true"`; any other
    /// text is false.
    pub fn parse(&self, literal: &str) -> Result<Value, String> {
        let text = literal.trim();
        match self {
            ValueType::Bool => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
            ValueType::Int => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("cannot parse '{}' as int: {}", text, e)),
            ValueType::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("cannot parse '{}' as float: {}", text, e)),
            ValueType::Str => Ok(Value::Str(text.to_string())),
            artifact => Err(format!(
                "{} values cannot be given as literals",
                artifact.name()
            )),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter value or stage artifact
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Text
    Str(String),
    /// Sampled signal
    Signal(Signal),
    /// Feature matrix
    Matrix(Matrix),
    /// Label track
    Track(Track),
}

impl Value {
    /// Runtime type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Str(_) => ValueType::Str,
            Value::Signal(_) => ValueType::Signal,
            Value::Matrix(_) => ValueType::Matrix,
            Value::Track(_) => ValueType::Track,
        }
    }

    /// Integer view (floats are truncated)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Float view (integers are widened)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Signal view
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Value::Signal(v) => Some(v),
            _ => None,
        }
    }

    /// Matrix view
    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(v) => Some(v),
            _ => None,
        }
    }

    /// Track view
    pub fn as_track(&self) -> Option<&Track> {
        match self {
            Value::Track(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::Signal(v) => v.fmt(f),
            Value::Matrix(v) => v.fmt(f),
            Value::Track(v) => v.fmt(f),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Signal> for Value {
    fn from(v: Signal) -> Self {
        Value::Signal(v)
    }
}

impl From<Matrix> for Value {
    fn from(v: Matrix) -> Self {
        Value::Matrix(v)
    }
}

impl From<Track> for Value {
    fn from(v: Track) -> Self {
        Value::Track(v)
    }
}
