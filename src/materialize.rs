//! Tensor materialization from the cursor.
//!
//! Element decoding goes through a closed codec table indexed by [`DType`]:
//! one entry per dtype holding its width and the functions that decode,
//! widen and narrow a single element.

use half::{bf16, f16};

use crate::cursor::{ByteCursor, Pod};
use crate::decode::decode_enum;
use crate::error::Error;
use crate::models::{Complex, DType, Limits, Shape, Tensor};

/// Numeric view of an element used by the codec table.
trait Element: Pod {
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),+) => {
        $(impl Element for $t {
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        })+
    };
}
impl_element!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

impl Element for bool {
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
    fn from_f64(v: f64) -> Self {
        v != 0.0
    }
}

impl Element for f16 {
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

impl Element for bf16 {
    fn to_f64(self) -> f64 {
        bf16::to_f64(self)
    }
    fn from_f64(v: f64) -> Self {
        bf16::from_f64(v)
    }
}

impl<T: Element> Element for Complex<T>
where
    Complex<T>: Pod,
{
    fn to_f64(self) -> f64 {
        self.re.to_f64()
    }
    fn from_f64(v: f64) -> Self {
        Complex { re: T::from_f64(v), im: T::from_f64(0.0) }
    }
}

fn decode_element<T: Element>(cursor: &mut ByteCursor<'_>, out: &mut Vec<u8>) -> bool {
    match cursor.try_read::<T>() {
        Some(v) => {
            v.write_le(out);
            true
        }
        None => {
            T::default().write_le(out);
            false
        }
    }
}

fn element_to_f64<T: Element>(bytes: &[u8]) -> f64 {
    T::from_le_bytes(bytes).to_f64()
}

fn element_from_f64<T: Element>(v: f64, out: &mut Vec<u8>) {
    T::from_f64(v).write_le(out);
}

/// Per-dtype element behavior.
pub struct ElementCodec {
    pub dtype: DType,
    pub width: usize,
    /// Appends one element, zero when the cursor is dry. Returns whether
    /// bytes were consumed.
    pub decode: fn(&mut ByteCursor<'_>, &mut Vec<u8>) -> bool,
    pub to_f64: fn(&[u8]) -> f64,
    pub encode_f64: fn(f64, &mut Vec<u8>),
}

macro_rules! codec {
    ($d:expr, $t:ty) => {
        ElementCodec {
            dtype: $d,
            width: <$t as Pod>::SIZE,
            decode: decode_element::<$t>,
            to_f64: element_to_f64::<$t>,
            encode_f64: element_from_f64::<$t>,
        }
    };
}

// Same order as the `DType` declaration.
static CODECS: [ElementCodec; 18] = [
    codec!(DType::Float64, f64),
    codec!(DType::Float32, f32),
    codec!(DType::Float16, f16),
    codec!(DType::BFloat16, bf16),
    codec!(DType::Complex64, Complex<f32>),
    codec!(DType::Complex128, Complex<f64>),
    codec!(DType::Int64, i64),
    codec!(DType::Int32, i32),
    codec!(DType::Int16, i16),
    codec!(DType::Int8, i8),
    codec!(DType::Uint64, u64),
    codec!(DType::Uint32, u32),
    codec!(DType::Uint16, u16),
    codec!(DType::Uint8, u8),
    codec!(DType::Bool, bool),
    codec!(DType::QInt8, i8),
    codec!(DType::QUint8, u8),
    codec!(DType::QInt32, i32),
];

pub fn codec(dtype: DType) -> &'static ElementCodec {
    &CODECS[dtype as usize]
}

/// Allocates `shape` worth of `dtype` elements and fills them from `cursor`.
///
/// Elements past the end of the input are zero. The element count is checked
/// against `max_elements` before anything is allocated.
pub fn materialize(
    dtype: DType,
    shape: Shape,
    cursor: &mut ByteCursor<'_>,
    max_elements: usize,
) -> Result<Tensor, Error> {
    let elements = shape.num_elements().ok_or(Error::ShapeOverflow)?;
    if elements > max_elements {
        return Err(Error::TooManyElements { elements, limit: max_elements });
    }
    let codec = codec(dtype);
    let byte_len = elements.checked_mul(codec.width).ok_or(Error::ShapeOverflow)?;

    let start = cursor.offset();
    let mut data = Vec::with_capacity(byte_len);
    let mut filled = 0usize;
    for _ in 0..elements {
        if (codec.decode)(cursor, &mut data) {
            filled += 1;
        }
    }
    tracing::debug!(
        %dtype,
        %shape,
        elements,
        zero_filled = elements - filled,
        consumed = cursor.offset() - start,
        "materialized tensor"
    );
    Ok(Tensor { dtype, shape, data })
}

/// Builds tensors for one harness: an allow-list of dtypes plus limits.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    allow: &'a [DType],
    limits: Limits,
}

impl<'a> Materializer<'a> {
    pub fn new(allow: &'a [DType], limits: Limits) -> Self {
        Self { allow, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn allow(&self) -> &'a [DType] {
        self.allow
    }

    /// Dtype selector byte over the allow-list.
    pub fn decode_dtype(&self, cursor: &mut ByteCursor<'_>) -> Result<DType, Error> {
        decode_enum(cursor, self.allow)
    }

    /// Rank byte and dimension words within the configured bounds.
    pub fn decode_shape(&self, cursor: &mut ByteCursor<'_>) -> Result<Shape, Error> {
        self.limits.shape.decode(cursor)
    }

    /// Fills a tensor of a dtype the harness already chose.
    pub fn materialize(
        &self,
        dtype: DType,
        shape: Shape,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<Tensor, Error> {
        if !self.allow.contains(&dtype) {
            return Err(Error::DTypeNotAllowed { dtype });
        }
        materialize(dtype, shape, cursor, self.limits.max_elements)
    }

    /// Selector byte, rank byte, dimension words, then element payload.
    pub fn create(&self, cursor: &mut ByteCursor<'_>) -> Result<Tensor, Error> {
        let dtype = self.decode_dtype(cursor)?;
        let shape = self.decode_shape(cursor)?;
        self.materialize(dtype, shape, cursor)
    }
}

/// One-call tensor construction: selector byte over `allow`, rank byte,
/// dimension words, element payload.
pub fn create_tensor(
    cursor: &mut ByteCursor<'_>,
    allow: &[DType],
    limits: Limits,
) -> Result<Tensor, Error> {
    Materializer::new(allow, limits).create(cursor)
}
