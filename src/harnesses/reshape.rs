use crate::cursor::ByteCursor;
use crate::decode::{decode_rank, reduce_into};
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::harnesses::WIDE_DTYPES;
use crate::materialize::Materializer;
use crate::models::{Limits, ShapeBounds, Tensor};
use crate::ops::{Operator, Reshape};

const LIMITS: Limits = Limits::new(ShapeBounds::new(0, 4, 0, 10), 1_000_000);
const TARGET_RANK: (u8, u8) = (0, 4);

#[derive(Debug, Clone, PartialEq)]
pub struct ReshapeCase {
    pub input: Tensor,
    pub target: Vec<i64>,
}

/// Reshape to a decoded target shape.
///
/// Layout: dtype byte, rank byte, dimension words, payload, target-rank byte,
/// then one 4-byte word per target dimension mapped into `[-1, 20]`
/// (fallback `1`).
#[derive(Debug, Clone, Default)]
pub struct ReshapeHarness<O = Reshape> {
    op: O,
}

impl<O> ReshapeHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

impl<O: Operator<Attrs = Vec<i64>>> Harness for ReshapeHarness<O> {
    type Case = ReshapeCase;

    const NAME: &'static str = "reshape";
    const MIN_INPUT_LEN: usize = 3;
    const LIMITS: Limits = LIMITS;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<ReshapeCase, Error> {
        let input = Materializer::new(&WIDE_DTYPES, LIMITS).create(cursor)?;
        if cursor.is_exhausted() {
            return Err(Error::Rejected("no bytes left for the target shape".into()));
        }
        let rank = decode_rank(cursor, TARGET_RANK.0, TARGET_RANK.1)?;
        let mut target = Vec::with_capacity(rank as usize);
        for _ in 0..rank {
            let dim = match cursor.try_read::<i32>() {
                Some(raw) => reduce_into(raw.into(), 0, 21)? - 1,
                None => 1,
            };
            target.push(dim);
        }
        Ok(ReshapeCase { input, target })
    }

    fn invoke(&self, case: ReshapeCase) -> Result<(), OpError> {
        self.op.apply(&[case.input], &case.target).map(|_| ())
    }
}
