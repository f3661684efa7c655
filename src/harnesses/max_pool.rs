use crate::cursor::ByteCursor;
use crate::decode::{decode_enum, decode_small_int};
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::materialize::Materializer;
use crate::models::{DEFAULT_MAX_ELEMENTS, DType, Limits, ShapeBounds, Tensor};
use crate::ops::{DataFormat, MaxPool, MaxPoolAttrs, Operator, Padding};

pub const MAX_POOL_DTYPES: [DType; 11] = [
    DType::Float16,
    DType::BFloat16,
    DType::Float32,
    DType::Float64,
    DType::Int32,
    DType::Int64,
    DType::Uint8,
    DType::Int16,
    DType::Int8,
    DType::Uint16,
    DType::QInt8,
];

const LIMITS: Limits = Limits::new(ShapeBounds::new(4, 4, 1, 10), DEFAULT_MAX_ELEMENTS);
const PADDINGS: [Padding; 3] = [Padding::Same, Padding::Valid, Padding::Explicit];
const FORMATS: [DataFormat; 3] = [DataFormat::Nhwc, DataFormat::Nchw, DataFormat::NchwVectC];

#[derive(Debug, Clone, PartialEq)]
pub struct MaxPoolCase {
    pub input: Tensor,
    pub attrs: MaxPoolAttrs,
}

/// 2-D max pooling over a rank-4 input.
///
/// Layout: dtype byte, rank byte, four dimension words, payload, four ksize
/// bytes (`% 5 + 1`), four stride bytes (`% 3 + 1`), padding selector, eight
/// padding bytes (`% 3`, only for explicit padding), data-format selector.
#[derive(Debug, Clone, Default)]
pub struct MaxPoolHarness<O = MaxPool> {
    op: O,
}

impl<O> MaxPoolHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

fn small_ints<const N: usize>(
    cursor: &mut ByteCursor<'_>,
    lo: i64,
    hi: i64,
) -> Result<[usize; N], Error> {
    let mut out = [0usize; N];
    for v in &mut out {
        *v = decode_small_int(cursor, lo, hi)? as usize;
    }
    Ok(out)
}

impl<O: Operator<Attrs = MaxPoolAttrs>> Harness for MaxPoolHarness<O> {
    type Case = MaxPoolCase;

    const NAME: &'static str = "max_pool";
    const MIN_INPUT_LEN: usize = 20;
    const LIMITS: Limits = LIMITS;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<MaxPoolCase, Error> {
        let input = Materializer::new(&MAX_POOL_DTYPES, LIMITS).create(cursor)?;
        let ksize = small_ints::<4>(cursor, 1, 5)?;
        let strides = small_ints::<4>(cursor, 1, 3)?;
        let padding = decode_enum(cursor, &PADDINGS)?;
        let explicit_paddings = match padding {
            Padding::Explicit => small_ints::<8>(cursor, 0, 2)?.to_vec(),
            _ => Vec::new(),
        };
        let data_format = decode_enum(cursor, &FORMATS)?;
        Ok(MaxPoolCase {
            input,
            attrs: MaxPoolAttrs { ksize, strides, padding, explicit_paddings, data_format },
        })
    }

    fn invoke(&self, case: MaxPoolCase) -> Result<(), OpError> {
        self.op.apply(&[case.input], &case.attrs).map(|_| ())
    }
}
