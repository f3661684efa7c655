//! Error types for decoding, harness execution and triage.

use thiserror::Error;

use crate::models::DType;

/// All errors raised while turning fuzz bytes into an operator invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Input buffer is shorter than the harness' declared minimum.
    #[error("Input too short: need at least {needed} bytes, got {found}")]
    InputTooShort { needed: usize, found: usize },

    /// Decoded parameters are structurally unusable (e.g. empty variadic list).
    #[error("Rejected input: {0}")]
    Rejected(String),

    /// Decoded shape asks for more elements than the harness allows.
    #[error("Tensor with {elements} elements exceeds limit of {limit}")]
    TooManyElements { elements: usize, limit: usize },

    /// Element count or byte size does not fit in `usize`.
    #[error("Tensor shape overflow: dimensions produce more elements than representable")]
    ShapeOverflow,

    /// A selector was asked to choose from an empty list.
    #[error("Cannot select from an empty allow-list")]
    EmptySelection,

    /// Decoder bounds with `lo > hi` or otherwise unusable.
    #[error("Invalid bounds [{lo}, {hi}]")]
    InvalidBounds { lo: i64, hi: i64 },

    /// Materializer was handed a dtype outside the harness allow-list.
    #[error("DType {dtype} is not in the allow-list")]
    DTypeNotAllowed { dtype: DType },

    /// Typed view requested with the wrong element type.
    #[error("Type mismatch in {context}: expected '{expected}', found '{found}'")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    /// I/O error while reading or writing triage artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CBOR serialization failed.
    #[error("CBOR serialization error: {0}")]
    CborSerialize(serde_cbor::Error),

    /// CBOR deserialization failed.
    #[error("CBOR deserialization error: {0}")]
    CborDeserialize(serde_cbor::Error),

    /// Other unspecified error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for malformed-input rejections, which are uninteresting to the
    /// fuzzing engine. Every other variant is a harness defect.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InputTooShort { .. }
                | Error::Rejected(_)
                | Error::TooManyElements { .. }
                | Error::ShapeOverflow
        )
    }
}

/// Errors raised by an operator under test.
///
/// Everything except [`OpError::Internal`] belongs to the library's own
/// validation hierarchy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Operand shapes are incompatible.
    #[error("{op}: shape mismatch: {detail}")]
    ShapeMismatch { op: &'static str, detail: String },

    /// An attribute value is outside its domain.
    #[error("{op}: invalid attribute '{name}': {detail}")]
    InvalidAttribute {
        op: &'static str,
        name: &'static str,
        detail: String,
    },

    /// The operator has no kernel for this dtype.
    #[error("{op}: unsupported dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// A numerical precondition failed (empty input, non-finite value, ...).
    #[error("{op}: precondition failed: {detail}")]
    Precondition { op: &'static str, detail: String },

    /// Failure outside the validation hierarchy.
    #[error("{op}: internal error: {detail}")]
    Internal { op: &'static str, detail: String },
}

impl OpError {
    /// True when the operator rejected its arguments the way it is documented to.
    pub fn is_validation(&self) -> bool {
        !matches!(self, OpError::Internal { .. })
    }
}
