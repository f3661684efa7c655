use crate::compare::values_close;
use crate::cursor::ByteCursor;
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::harnesses::WIDE_DTYPES;
use crate::materialize::Materializer;
use crate::models::{DEFAULT_MAX_ELEMENTS, DType, Limits, ShapeBounds, Tensor};
use crate::ops::{Operator, Softmax};

const LIMITS: Limits = Limits::new(ShapeBounds::new(0, 4, 0, 8), DEFAULT_MAX_ELEMENTS);

#[derive(Debug, Clone, PartialEq)]
pub struct SoftmaxCase {
    pub logits: Tensor,
}

/// Softmax over the last axis, then a check that every finite row sums to 1.
///
/// Layout: dtype byte, rank byte, dimension words, payload.
#[derive(Debug, Clone, Default)]
pub struct SoftmaxHarness<O = Softmax> {
    op: O,
}

impl<O> SoftmaxHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

fn row_tolerance(dtype: DType) -> f64 {
    match dtype {
        DType::BFloat16 => 5e-2,
        DType::Float16 => 1e-2,
        DType::Float32 => 1e-4,
        _ => 1e-9,
    }
}

impl<O: Operator<Attrs = ()>> Harness for SoftmaxHarness<O> {
    type Case = SoftmaxCase;

    const NAME: &'static str = "softmax";
    const MIN_INPUT_LEN: usize = 2;
    const LIMITS: Limits = LIMITS;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<SoftmaxCase, Error> {
        let logits = Materializer::new(&WIDE_DTYPES, LIMITS).create(cursor)?;
        Ok(SoftmaxCase { logits })
    }

    fn invoke(&self, case: SoftmaxCase) -> Result<(), OpError> {
        let outputs = self.op.apply(std::slice::from_ref(&case.logits), &())?;
        let Some(probs) = outputs.first() else {
            return Err(OpError::Internal { op: self.op.name(), detail: "no output tensor".into() });
        };
        if probs.shape != case.logits.shape {
            return Err(OpError::Internal {
                op: self.op.name(),
                detail: format!(
                    "output shape {} differs from input {}",
                    probs.shape, case.logits.shape
                ),
            });
        }

        let row = case.logits.shape.dims().last().copied().unwrap_or(1);
        if row == 0 {
            return Ok(());
        }
        let inputs = case.logits.to_f64_vec();
        let values = probs.to_f64_vec();
        let mut sums = Vec::new();
        for (logits, probs) in inputs.chunks(row).zip(values.chunks(row)) {
            if logits.iter().all(|v| v.is_finite()) {
                sums.push(probs.iter().sum::<f64>());
            }
        }
        let ones = vec![1.0; sums.len()];
        let tolerance = row_tolerance(probs.dtype);
        values_close(&sums, &ones, 0.0, tolerance).map_err(|mismatch| OpError::Internal {
            op: self.op.name(),
            detail: format!("rows do not sum to 1: {}", mismatch),
        })
    }
}
