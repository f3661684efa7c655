//! Forward-only read cursor over a borrowed fuzz input.

use byteorder::{ByteOrder, LittleEndian};
use half::{bf16, f16};

use crate::models::{Complex, DType};

/// Plain element types that can be decoded from little-endian bytes.
pub trait Pod: Sized + Default + Copy {
    const SIZE: usize = std::mem::size_of::<Self>();
    /// `bytes` is exactly `SIZE` long.
    fn from_le_bytes(bytes: &[u8]) -> Self;
    fn write_le(&self, out: &mut Vec<u8>);
    fn dtype_matches(dtype: &DType) -> bool;
}

macro_rules! impl_pod {
    ($t:ty, $read:ident, $write:ident, $($d:path)|+) => {
        impl Pod for $t {
            fn from_le_bytes(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }
            fn write_le(&self, out: &mut Vec<u8>) {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                LittleEndian::$write(&mut buf, *self);
                out.extend_from_slice(&buf);
            }
            fn dtype_matches(dtype: &DType) -> bool {
                matches!(dtype, $($d)|+)
            }
        }
    };
}

impl_pod!(f64, read_f64, write_f64, DType::Float64);
impl_pod!(f32, read_f32, write_f32, DType::Float32);
impl_pod!(i64, read_i64, write_i64, DType::Int64);
impl_pod!(i32, read_i32, write_i32, DType::Int32 | DType::QInt32);
impl_pod!(i16, read_i16, write_i16, DType::Int16);
impl_pod!(u64, read_u64, write_u64, DType::Uint64);
impl_pod!(u32, read_u32, write_u32, DType::Uint32);
impl_pod!(u16, read_u16, write_u16, DType::Uint16);

macro_rules! impl_pod_byte {
    ($t:ty, $($d:path)|+) => {
        impl Pod for $t {
            fn from_le_bytes(bytes: &[u8]) -> Self {
                bytes[0] as $t
            }
            fn write_le(&self, out: &mut Vec<u8>) {
                out.push(*self as u8);
            }
            fn dtype_matches(dtype: &DType) -> bool {
                matches!(dtype, $($d)|+)
            }
        }
    };
}
impl_pod_byte!(u8, DType::Uint8 | DType::QUint8);
impl_pod_byte!(i8, DType::Int8 | DType::QInt8);

impl Pod for bool {
    fn from_le_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
    fn dtype_matches(dtype: &DType) -> bool {
        dtype == &DType::Bool
    }
}

impl Pod for f16 {
    fn from_le_bytes(bytes: &[u8]) -> Self {
        f16::from_bits(LittleEndian::read_u16(bytes))
    }
    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
    fn dtype_matches(dtype: &DType) -> bool {
        dtype == &DType::Float16
    }
}

impl Pod for bf16 {
    fn from_le_bytes(bytes: &[u8]) -> Self {
        bf16::from_bits(LittleEndian::read_u16(bytes))
    }
    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
    fn dtype_matches(dtype: &DType) -> bool {
        dtype == &DType::BFloat16
    }
}

macro_rules! impl_pod_complex {
    ($t:ty, $d:path) => {
        impl Pod for Complex<$t> {
            const SIZE: usize = 2 * std::mem::size_of::<$t>();
            fn from_le_bytes(bytes: &[u8]) -> Self {
                let width = std::mem::size_of::<$t>();
                Complex {
                    re: <$t as Pod>::from_le_bytes(&bytes[..width]),
                    im: <$t as Pod>::from_le_bytes(&bytes[width..]),
                }
            }
            fn write_le(&self, out: &mut Vec<u8>) {
                self.re.write_le(out);
                self.im.write_le(out);
            }
            fn dtype_matches(dtype: &DType) -> bool {
                dtype == &$d
            }
        }
    };
}
impl_pod_complex!(f32, DType::Complex64);
impl_pod_complex!(f64, DType::Complex128);

/// Read cursor over one fuzz input.
///
/// The offset only ever moves forward and never passes the end of the buffer.
/// Running out of bytes is not an error: reads report `None` (or a default)
/// and leave the offset where it was.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes the next `n` bytes, or nothing if fewer remain.
    pub fn try_read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Some(bytes)
    }

    /// Decodes a `T` from the next `T::SIZE` bytes.
    pub fn try_read<T: Pod>(&mut self) -> Option<T> {
        self.try_read_bytes(T::SIZE).map(T::from_le_bytes)
    }

    /// Like [`try_read`](Self::try_read) but substitutes `default` on exhaustion.
    pub fn read_or<T: Pod>(&mut self, default: T) -> T {
        self.try_read().unwrap_or(default)
    }

    pub fn read_byte(&mut self, default: u8) -> u8 {
        self.read_or(default)
    }

    /// Skips whatever is left so every later read falls back.
    pub fn exhaust(&mut self) {
        self.offset = self.data.len();
    }

    /// Everything not consumed yet, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }
}
