use thiserror::Error;

use crate::node::FieldValue;

/// All ways a compression run can fail. Every variant here corresponds to one
/// of the closed set of error kinds named in the format specification; none
/// of them are retried, and a run that returns one discards its byte buffer.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("unknown node type: {0}")]
    UnknownType(String),

    #[error("node {0} is missing required field {1}")]
    MissingField(String, &'static str),

    #[error("node {0} is missing required branch {1}")]
    MissingBranch(String, &'static str),

    #[error("node {0} has unknown property {1}")]
    UnknownProperty(String, String),

    #[error("node {0} branch {1} has mismatched array shape")]
    ArrayShapeMismatch(String, &'static str),

    #[error("string not registered in table before finalize: {0:?}")]
    UnknownString(String),

    #[error("value has no wire encoding: {0:?}")]
    UnsupportedValue(FieldValue),

    #[error("varuint value {0} exceeds 32 bits")]
    VarUintOverflow(u64),

    #[error("cache reference parameter out of range: {0}")]
    RefOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, CompressError>;
