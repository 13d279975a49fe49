//! Engine error taxonomy.
//!
//! One flat enum mirroring the status codes surfaced to users. `Ok` is the
//! `Ok` arm of `Result`; everything else is a variant with enough payload to
//! name the failing key, template, or resource. Algorithms return
//! `Result<()>`, the dispatcher collects per-task outcomes and decides
//! between fail-slow (within a step) and fail-fast (between steps).

use thiserror::Error;

/// Status carried by every fallible engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Unclassified failure.
    #[error("error: {0}")]
    Generic(String),

    /// The accelerated backend was requested but is not present (feature
    /// disabled or no device found at init).
    #[error("no accelerated backend available")]
    NoAcceleration,

    /// No registered algorithm covers the requested key combination.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Malformed operand, operator, or parameter at the call boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine or an object was used out of its lifecycle order
    /// (duplicate registration, mutation after freeze, broken invariant).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Host or device allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A specialized kernel failed to compile; payload carries the build log.
    #[error("compilation failed: {0}")]
    CompilationError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// True for the classes that abort the whole schedule immediately
    /// (internal invariants and resource exhaustion), as opposed to
    /// per-task operational failures collected until the end of the step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::OutOfMemory(_) | EngineError::InvalidState(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_payload() {
        let err = EngineError::NotImplemented("vxm_masked_PLUS_FLOAT_MULT_FLOAT__cl".into());
        assert!(err.to_string().contains("vxm_masked_PLUS_FLOAT_MULT_FLOAT__cl"));
    }

    #[test]
    fn fatal_classes() {
        assert!(EngineError::OutOfMemory("device".into()).is_fatal());
        assert!(EngineError::InvalidState("offsets non-monotone".into()).is_fatal());
        assert!(!EngineError::NotImplemented("x".into()).is_fatal());
        assert!(!EngineError::NoAcceleration.is_fatal());
    }
}
