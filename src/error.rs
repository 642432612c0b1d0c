//! # Error Taxonomy
//!
//! Every fallible core operation returns [`Result`], whose error type is the
//! closed [`HybridRowError`] enum. The variants fall into five groups:
//!
//! | Group | Variants | Recovery |
//! |-------|----------|----------|
//! | Schema | `Schema` | Fatal: fix the schema before encoding any row |
//! | Field access | `TypeMismatch`, `NotFound` | Recoverable: skip the field |
//! | Writer protocol | `OutOfOrderWrite`, `MissingRequiredField`, `DuplicateItem` | Programming error, never retried |
//! | Buffer structure | `BufferTooSmall`, `CorruptLayout`, `ScopeMismatch` | Discard the buffer |
//! | Stream framing | `TruncatedSegment`, `CorruptSegment` | Recoverable at the segment boundary |
//!
//! I/O-facing helpers in [`crate::recordio::stream`] wrap these errors in
//! `eyre::Report` with context; callers can still get at the typed error with
//! `report.downcast_ref::<HybridRowError>()`.

use thiserror::Error;

use crate::layouts::LayoutCode;

/// Result type alias using HybridRowError.
pub type Result<T> = std::result::Result<T, HybridRowError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HybridRowError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("type mismatch at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: LayoutCode,
    },

    #[error("field '{0}' not found")]
    NotFound(String),

    #[error("out of order write to '{path}': {reason}")]
    OutOfOrderWrite { path: String, reason: String },

    #[error("required field '{0}' was not written")]
    MissingRequiredField(String),

    #[error("duplicate item in unique scope '{0}'")]
    DuplicateItem(String),

    #[error("buffer too small: need {required} bytes, limit {limit}")]
    BufferTooSmall { required: usize, limit: usize },

    #[error("corrupt row layout: {0}")]
    CorruptLayout(String),

    #[error("scope mismatch: expected depth {expected}, found {actual}")]
    ScopeMismatch { expected: usize, actual: usize },

    #[error("truncated segment: need {needed} bytes, have {available}")]
    TruncatedSegment { needed: usize, available: usize },

    #[error("corrupt segment: {0}")]
    CorruptSegment(String),
}

impl HybridRowError {
    /// Returns true when the caller may continue with the same buffer or stream
    /// after handling the error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HybridRowError::TypeMismatch { .. }
                | HybridRowError::NotFound(_)
                | HybridRowError::TruncatedSegment { .. }
                | HybridRowError::CorruptSegment(_)
        )
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        HybridRowError::Schema(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        HybridRowError::CorruptLayout(msg.into())
    }

    pub(crate) fn mismatch(path: &str, expected: impl ToString, actual: LayoutCode) -> Self {
        HybridRowError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }
}

/// `ensure!`-style guard producing a `CorruptLayout` error.
macro_rules! ensure_layout {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::HybridRowError::CorruptLayout(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_layout;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification_follows_taxonomy() {
        assert!(HybridRowError::mismatch("a", "int32", LayoutCode::Utf8).is_recoverable());
        assert!(HybridRowError::TruncatedSegment {
            needed: 10,
            available: 9
        }
        .is_recoverable());
        assert!(!HybridRowError::corrupt("bad offset").is_recoverable());
        assert!(!HybridRowError::ScopeMismatch {
            expected: 1,
            actual: 2
        }
        .is_recoverable());
        assert!(!HybridRowError::schema("dup").is_recoverable());
    }

    #[test]
    fn messages_name_the_field() {
        let err = HybridRowError::mismatch("name", LayoutCode::Int32, LayoutCode::Utf8);
        assert_eq!(
            err.to_string(),
            "type mismatch at 'name': expected int32, found utf8"
        );
    }
}
