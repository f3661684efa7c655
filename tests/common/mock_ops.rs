use std::cell::Cell;

use opfuzz::cursor::ByteCursor;
use opfuzz::driver::Harness;
use opfuzz::materialize::Materializer;
use opfuzz::models::{DEFAULT_MAX_ELEMENTS, DType, Limits, ShapeBounds, Tensor};
use opfuzz::{Error, OpError, Operator};

pub const SAMPLE_DTYPES: [DType; 2] = [DType::Float32, DType::Int32];
pub const SAMPLE_LIMITS: Limits = Limits::new(ShapeBounds::new(1, 4, 1, 16), DEFAULT_MAX_ELEMENTS);

/// Dtype selector byte, rank byte in `[1, 4]`, dimension words, payload.
pub struct SampleHarness<O> {
    pub op: O,
}

impl<O> SampleHarness<O> {
    pub fn new(op: O) -> Self {
        Self { op }
    }
}

impl<O: Operator<Attrs = ()>> Harness for SampleHarness<O> {
    type Case = Tensor;

    const NAME: &'static str = "sample";
    const MIN_INPUT_LEN: usize = 2;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<Tensor, Error> {
        Materializer::new(&SAMPLE_DTYPES, SAMPLE_LIMITS).create(cursor)
    }

    fn invoke(&self, input: Tensor) -> Result<(), OpError> {
        self.op.apply(&[input], &()).map(|_| ())
    }
}

/// Echoes its first input.
#[derive(Default)]
pub struct Accept {
    pub calls: Cell<usize>,
    pub seen: Cell<Option<usize>>,
}

impl Operator for Accept {
    type Attrs = ();

    fn name(&self) -> &'static str {
        "accept"
    }

    fn apply(&self, inputs: &[Tensor], _: &()) -> Result<Vec<Tensor>, OpError> {
        self.calls.set(self.calls.get() + 1);
        self.seen.set(inputs.first().map(|t| t.num_elements()));
        Ok(inputs.to_vec())
    }
}

/// Validation error once the input has more than `max_elements` elements.
pub struct RejectLarge {
    pub max_elements: usize,
}

impl Operator for RejectLarge {
    type Attrs = ();

    fn name(&self) -> &'static str {
        "reject_large"
    }

    fn apply(&self, inputs: &[Tensor], _: &()) -> Result<Vec<Tensor>, OpError> {
        let elements = inputs[0].num_elements();
        if elements > self.max_elements {
            return Err(OpError::InvalidAttribute {
                op: "reject_large",
                name: "shape",
                detail: format!("{} elements exceed {}", elements, self.max_elements),
            });
        }
        Ok(inputs.to_vec())
    }
}

/// Fails outside the validation hierarchy once the input is large.
pub struct FailLarge {
    pub max_elements: usize,
}

impl Operator for FailLarge {
    type Attrs = ();

    fn name(&self) -> &'static str {
        "fail_large"
    }

    fn apply(&self, inputs: &[Tensor], _: &()) -> Result<Vec<Tensor>, OpError> {
        if inputs[0].num_elements() > self.max_elements {
            return Err(OpError::Internal { op: "fail_large", detail: "std::bad_alloc".into() });
        }
        Ok(inputs.to_vec())
    }
}

pub struct Panicking;

impl Operator for Panicking {
    type Attrs = ();

    fn name(&self) -> &'static str {
        "panicking"
    }

    fn apply(&self, _: &[Tensor], _: &()) -> Result<Vec<Tensor>, OpError> {
        panic!("index out of bounds in kernel");
    }
}
