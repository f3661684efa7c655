use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cursor::Pod;
use crate::error::Error;
use crate::materialize::codec;

pub const DEFAULT_MIN_RANK: u8 = 0;
pub const DEFAULT_MAX_RANK: u8 = 4;
pub const DEFAULT_MIN_DIM: i64 = 0;
pub const DEFAULT_MAX_DIM: i64 = 16;
/// Global cap on elements per materialized tensor.
pub const DEFAULT_MAX_ELEMENTS: usize = 1 << 20;
/// Width of one encoded dimension word.
pub const DIM_WORD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float64,
    Float32,
    Float16,
    BFloat16,
    Complex64,
    Complex128,
    Int64,
    Int32,
    Int16,
    Int8,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
    Bool,
    QInt8,
    QUint8,
    QInt32,
}

impl DType {
    pub const ALL: [DType; 18] = [
        DType::Float64,
        DType::Float32,
        DType::Float16,
        DType::BFloat16,
        DType::Complex64,
        DType::Complex128,
        DType::Int64,
        DType::Int32,
        DType::Int16,
        DType::Int8,
        DType::Uint64,
        DType::Uint32,
        DType::Uint16,
        DType::Uint8,
        DType::Bool,
        DType::QInt8,
        DType::QUint8,
        DType::QInt32,
    ];

    pub fn byte_size(&self) -> usize {
        match self {
            DType::Complex128 => 16,
            DType::Float64 | DType::Int64 | DType::Uint64 | DType::Complex64 => 8,
            DType::Float32 | DType::Int32 | DType::Uint32 | DType::QInt32 => 4,
            DType::Float16 | DType::BFloat16 | DType::Int16 | DType::Uint16 => 2,
            DType::Int8 | DType::Uint8 | DType::Bool | DType::QInt8 | DType::QUint8 => 1,
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            DType::Float64 | DType::Float32 | DType::Float16 | DType::BFloat16
        )
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, DType::QInt8 | DType::QUint8 | DType::QInt32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Float16 => "float16",
            DType::BFloat16 => "bfloat16",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::Int64 => "int64",
            DType::Int32 => "int32",
            DType::Int16 => "int16",
            DType::Int8 => "int8",
            DType::Uint64 => "uint64",
            DType::Uint32 => "uint32",
            DType::Uint16 => "uint16",
            DType::Uint8 => "uint8",
            DType::Bool => "bool",
            DType::QInt8 => "qint8",
            DType::QUint8 => "quint8",
            DType::QInt32 => "qint32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complex element stored as two consecutive little-endian components.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

/// Ordered dimension sizes. An empty shape is a scalar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Product of the dimensions (1 for a scalar), `None` on overflow.
    pub fn num_elements(&self) -> Option<usize> {
        self.0
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    pub fn into_dims(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(scalar)");
        }
        write!(
            f,
            "[{}]",
            self.0
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Rank and per-dimension bounds a harness decodes shapes within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeBounds {
    pub min_rank: u8,
    pub max_rank: u8,
    pub min_dim: i64,
    pub max_dim: i64,
}

impl ShapeBounds {
    pub const DEFAULT: ShapeBounds =
        ShapeBounds::new(DEFAULT_MIN_RANK, DEFAULT_MAX_RANK, DEFAULT_MIN_DIM, DEFAULT_MAX_DIM);

    pub const fn new(min_rank: u8, max_rank: u8, min_dim: i64, max_dim: i64) -> Self {
        Self { min_rank, max_rank, min_dim, max_dim }
    }

    /// Same dimension bounds, fixed rank.
    pub const fn with_rank(self, rank: u8) -> Self {
        Self { min_rank: rank, max_rank: rank, ..self }
    }
}

impl Default for ShapeBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-harness decoding limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub shape: ShapeBounds,
    pub max_elements: usize,
}

impl Limits {
    pub const DEFAULT: Limits = Limits::new(ShapeBounds::DEFAULT, DEFAULT_MAX_ELEMENTS);

    pub const fn new(shape: ShapeBounds, max_elements: usize) -> Self {
        Self { shape, max_elements }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One operator argument: dtype, shape and little-endian element bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Shape,
    pub data: Vec<u8>,
}

impl Tensor {
    pub fn num_elements(&self) -> usize {
        self.data.len() / self.dtype.byte_size()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Builds a tensor from `f64` values, converting each into `dtype`.
    pub fn from_f64(dtype: DType, shape: Shape, values: &[f64]) -> Result<Self, Error> {
        let expected = shape.num_elements().ok_or(Error::ShapeOverflow)?;
        if values.len() != expected {
            return Err(Error::Other(format!(
                "{} values supplied for shape {}",
                values.len(),
                shape
            )));
        }
        let codec = codec(dtype);
        let mut data = Vec::with_capacity(expected * codec.width);
        for &v in values {
            (codec.encode_f64)(v, &mut data);
        }
        Ok(Self { dtype, shape, data })
    }

    /// Copies the elements out as `T`, which must match the tensor dtype.
    pub fn to_vec<T: Pod>(&self) -> Result<Vec<T>, Error> {
        if !T::dtype_matches(&self.dtype) {
            return Err(Error::TypeMismatch {
                expected: self.dtype.to_string(),
                found: std::any::type_name::<T>().to_string(),
                context: "Tensor::to_vec".to_string(),
            });
        }
        Ok(self.data.chunks_exact(T::SIZE).map(T::from_le_bytes).collect())
    }

    /// Widens every element to `f64` (complex values contribute their real part).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let codec = codec(self.dtype);
        self.data.chunks_exact(codec.width).map(codec.to_f64).collect()
    }

    /// Returns the tensor converted to `dtype` through `f64`.
    pub fn cast(&self, dtype: DType) -> Tensor {
        if dtype == self.dtype {
            return self.clone();
        }
        let target = codec(dtype);
        let mut data = Vec::with_capacity(self.num_elements() * target.width);
        for v in self.to_f64_vec() {
            (target.encode_f64)(v, &mut data);
        }
        Tensor { dtype, shape: self.shape.clone(), data }
    }
}

/// Terminal state of one harness invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operator ran and returned normally.
    Continue,
    /// Input was malformed or the operator rejected it through validation.
    RejectInput,
    /// Unexpected failure; carries the diagnostic text.
    BugFound(String),
}

impl Outcome {
    /// Return value handed back to the fuzzing engine.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Continue | Outcome::RejectInput => 0,
            Outcome::BugFound(_) => -1,
        }
    }

    pub fn is_bug(&self) -> bool {
        matches!(self, Outcome::BugFound(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::RejectInput => "reject",
            Outcome::BugFound(_) => "bug",
        }
    }
}
