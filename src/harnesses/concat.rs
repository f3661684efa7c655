use crate::cursor::ByteCursor;
use crate::decode::{decode_enum, decode_rank, decode_small_int};
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::harnesses::WIDE_DTYPES;
use crate::materialize::Materializer;
use crate::models::{DEFAULT_MAX_ELEMENTS, Limits, Shape, ShapeBounds, Tensor};
use crate::ops::{Concat, Operator};
use crate::shape::decode_shape;

const BOUNDS: ShapeBounds = ShapeBounds::new(0, 4, 0, 8);
const LIMITS: Limits = Limits::new(BOUNDS, DEFAULT_MAX_ELEMENTS);
const MAX_OPERANDS: i64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatCase {
    pub values: Vec<Tensor>,
    pub axis: i64,
}

/// Variadic concatenation along one axis.
///
/// Layout: operand-count byte (`% 5`, zero is rejected), dtype byte, rank
/// byte, axis byte (`% rank`), base dimension words, then per operand an
/// optional axis-extent byte (`% 8 + 1`) followed by its payload.
#[derive(Debug, Clone, Default)]
pub struct ConcatHarness<O = Concat> {
    op: O,
}

impl<O> ConcatHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

impl<O: Operator<Attrs = i64>> Harness for ConcatHarness<O> {
    type Case = ConcatCase;

    const NAME: &'static str = "concat";
    const MIN_INPUT_LEN: usize = 4;
    const LIMITS: Limits = LIMITS;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<ConcatCase, Error> {
        let count = decode_small_int(cursor, 0, MAX_OPERANDS)?;
        if count == 0 {
            return Err(Error::Rejected("concat needs at least one operand".into()));
        }
        let m = Materializer::new(&WIDE_DTYPES, LIMITS);
        let dtype = decode_enum(cursor, m.allow())?;
        let rank = decode_rank(cursor, BOUNDS.min_rank, BOUNDS.max_rank)?;
        let axis = if rank > 0 { cursor.read_byte(0) % rank } else { 0 };
        let base = decode_shape(cursor, rank, BOUNDS.min_dim, BOUNDS.max_dim)?;

        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut dims = base.dims().to_vec();
            if rank > 0 && !cursor.is_exhausted() {
                dims[axis as usize] = decode_small_int(cursor, 1, 8)? as usize;
            }
            values.push(m.materialize(dtype, Shape::new(dims), cursor)?);
        }
        Ok(ConcatCase { values, axis: axis.into() })
    }

    fn invoke(&self, case: ConcatCase) -> Result<(), OpError> {
        self.op.apply(&case.values, &case.axis).map(|_| ())
    }
}
