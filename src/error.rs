use std::fmt;

/// Error taxonomy for the Kakshya core, one variant per failure kind
/// described in the component design.
#[derive(Debug, thiserror::Error)]
pub enum KakshyaError {
    #[error("structure validation failed: {0}")]
    StructureValidation(String),

    #[error("range error: {0}")]
    Range(String),

    #[error("state error: {0}")]
    State(String),

    #[error("container expired")]
    ContainerExpired,

    #[error("data type mismatch: expected {expected}, found {found}")]
    DataTypeMismatch { expected: &'static str, found: &'static str },

    #[error("transition degenerate: {0}")]
    TransitionDegenerate(String),
}

pub type KakshyaResult<T> = Result<T, KakshyaError>;

/// Cache misses are not part of the error taxonomy: they are a normal
/// control-flow outcome. This small marker type documents that at call
/// sites that would otherwise look like an error is being discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMiss;

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache miss")
    }
}
