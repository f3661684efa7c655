use crate::cursor::ByteCursor;
use crate::decode::decode_bool;
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::harnesses::WIDE_DTYPES;
use crate::materialize::Materializer;
use crate::models::{DEFAULT_MAX_ELEMENTS, Limits, ShapeBounds, Tensor};
use crate::ops::{MatMul, MatMulAttrs, Operator};

const LIMITS: Limits = Limits::new(ShapeBounds::new(0, 4, 0, 32), DEFAULT_MAX_ELEMENTS);

#[derive(Debug, Clone, PartialEq)]
pub struct MatMulCase {
    pub a: Tensor,
    pub b: Tensor,
    pub attrs: MatMulAttrs,
}

/// Matrix product of two operands sharing one dtype.
///
/// Layout: dtype byte, transpose-a byte, transpose-b byte, then rank byte,
/// dimension words and payload for `a`, then the same for `b`. Ranks are
/// decoded freely so the operator's rank validation is exercised too.
#[derive(Debug, Clone, Default)]
pub struct MatMulHarness<O = MatMul> {
    op: O,
}

impl<O> MatMulHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

impl<O: Operator<Attrs = MatMulAttrs>> Harness for MatMulHarness<O> {
    type Case = MatMulCase;

    const NAME: &'static str = "matmul";
    const MIN_INPUT_LEN: usize = 4;
    const LIMITS: Limits = LIMITS;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<MatMulCase, Error> {
        let m = Materializer::new(&WIDE_DTYPES, LIMITS);
        let dtype = m.decode_dtype(cursor)?;
        let attrs = MatMulAttrs {
            transpose_a: decode_bool(cursor, false),
            transpose_b: decode_bool(cursor, false),
        };
        let shape = m.decode_shape(cursor)?;
        let a = m.materialize(dtype, shape, cursor)?;
        if cursor.is_exhausted() {
            return Err(Error::Rejected("no bytes left for the second operand".into()));
        }
        let shape = m.decode_shape(cursor)?;
        let b = m.materialize(dtype, shape, cursor)?;
        Ok(MatMulCase { a, b, attrs })
    }

    fn invoke(&self, case: MatMulCase) -> Result<(), OpError> {
        self.op.apply(&[case.a, case.b], &case.attrs).map(|_| ())
    }
}
