use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error types raised while describing, compiling and running pipelines
#[derive(Error, Debug)]
pub enum PipelineError {
    /// IO error (recipe files, input and output files)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unknown section reference, missing required parameter, unknown recipe,
    /// malformed recipe document or unbound input port
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A literal override failed to parse or violated a constraint
    #[error("Validation error for '{key}' (expected {expected}): {reason}")]
    Validation {
        /// Store key of the offending parameter
        key: String,
        /// Declared type of the parameter
        expected: String,
        /// What went wrong (parse failure, range, enumerated set)
        reason: String,
    },

    /// Raised by a stage while it runs
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error raised by a stage of a running pipeline, with its location
    #[error("stage '{stage}' (section '{section}') failed: {source}")]
    Stage {
        /// Registered name of the failing stage
        stage: String,
        /// Recipe section that instantiated the stage
        section: String,
        /// The error the stage raised
        #[source]
        source: Box<PipelineError>,
    },

    /// Decoding an input file failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Encoding an output file failed
    #[error("Encode error: {0}")]
    Encode(String),
}

impl PipelineError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }

    /// Shorthand for an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        PipelineError::Execution(msg.into())
    }

    /// Innermost error, looking through stage context wrappers
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for errors raised before any stage executed
    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), PipelineError::Configuration(_))
    }

    /// True for literal parse and constraint failures
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), PipelineError::Validation { .. })
    }

    /// True for errors raised by a stage's own operations
    pub fn is_execution(&self) -> bool {
        matches!(self.root(), PipelineError::Execution(_))
    }
}

impl From<symphonia::core::errors::Error> for PipelineError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        match err {
            symphonia::core::errors::Error::IoError(e) => PipelineError::Io(e),
            e => PipelineError::Decode(e.to_string()),
        }
    }
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => PipelineError::Io(e),
            e => PipelineError::Encode(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_stage_context() {
        let err = PipelineError::Stage {
            stage: "amplify".to_string(),
            section: "loud".to_string(),
            source: Box::new(PipelineError::execution("boom")),
        };

        assert!(err.is_execution());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("section 'loud'"));
    }

    #[test]
    fn test_validation_message_names_key() {
        let err = PipelineError::Validation {
            key: "outRate".to_string(),
            expected: "int".to_string(),
            reason: "value 5 is below minimum 6000".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("outRate"));
        assert!(msg.contains("int"));
        assert!(err.is_validation());
    }
}
