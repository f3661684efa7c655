use crate::compare::allclose;
use crate::cursor::ByteCursor;
use crate::decode::{decode_axis, decode_bool, decode_enum, decode_fraction, decode_small_int};
use crate::driver::Harness;
use crate::error::{Error, OpError};
use crate::harnesses::TENSOR_DTYPES;
use crate::materialize::create_tensor;
use crate::models::{DType, Limits, Shape, Tensor};
use crate::ops::{Interpolation, Operator, Quantile, QuantileAttrs, QuantileQ};

const INTERPOLATIONS: [Interpolation; 5] = [
    Interpolation::Linear,
    Interpolation::Lower,
    Interpolation::Higher,
    Interpolation::Midpoint,
    Interpolation::Nearest,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Plain,
    Dim,
    Full,
}

const VARIANTS: [Variant; 4] = [Variant::Plain, Variant::Dim, Variant::Dim, Variant::Full];

const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

/// Arguments of one quantile call.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileCall {
    pub attrs: QuantileAttrs,
    /// Run on the flattened input (full form without a decoded axis).
    pub flatten: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NanQuantileCase {
    pub input: Tensor,
    pub scalar: QuantileCall,
    /// Second call with a list of quantiles, when the input carried one.
    pub list: Option<QuantileCall>,
}

/// `nanquantile`, cross-checked against `quantile` on NaN-free input.
///
/// Layout: `create_tensor`, NaN control byte, `q` word, axis word, keepdim
/// byte, interpolation selector, call-form selector, then optionally a count
/// byte (`% 5 + 1`), that many `q` words and a second call-form selector for
/// the list call.
#[derive(Debug, Clone)]
pub struct NanQuantileHarness<O = Quantile, R = Quantile> {
    nan_aware: O,
    plain: R,
}

impl Default for NanQuantileHarness {
    fn default() -> Self {
        Self::new(Quantile::nan_aware(), Quantile::default())
    }
}

impl<O, R> NanQuantileHarness<O, R> {
    pub fn new(nan_aware: O, plain: R) -> Self {
        Self { nan_aware, plain }
    }
}

/// Overwrites the first `control % 5 + 1` elements with NaN when
/// `control % 3 == 0`.
/// Builds the arguments for one call form. The full form without an axis
/// runs over the flattened input along dim 0.
fn call_for(
    variant: Variant,
    q: QuantileQ,
    dim: Option<usize>,
    keepdim: bool,
    interpolation: Interpolation,
) -> QuantileCall {
    let mut attrs = QuantileAttrs {
        q,
        dim: None,
        keepdim: false,
        interpolation: Interpolation::Linear,
    };
    let mut flatten = false;
    match (variant, dim) {
        (Variant::Plain, _) | (Variant::Dim, None) => {}
        (Variant::Dim, Some(_)) => {
            attrs.dim = dim;
            attrs.keepdim = keepdim;
        }
        (Variant::Full, _) => {
            flatten = dim.is_none();
            attrs.dim = Some(dim.unwrap_or(0));
            attrs.keepdim = keepdim;
            attrs.interpolation = interpolation;
        }
    }
    QuantileCall { attrs, flatten }
}

fn flattened(input: &Tensor) -> Tensor {
    let mut flat = input.clone();
    flat.shape = Shape::new(vec![input.num_elements()]);
    flat
}

fn inject_nan(input: Tensor, control: u8) -> Result<Tensor, Error> {
    if control % 3 != 0 {
        return Ok(input);
    }
    let mut values = input.to_f64_vec();
    let count = (usize::from(control % 5) + 1).min(values.len());
    values[..count].fill(f64::NAN);
    Tensor::from_f64(input.dtype, input.shape, &values)
}

impl<O, R> NanQuantileHarness<O, R>
where
    O: Operator<Attrs = QuantileAttrs>,
    R: Operator<Attrs = QuantileAttrs>,
{
    fn check(&self, input: &Tensor, call: &QuantileCall) -> Result<(), OpError> {
        let flat;
        let input = if call.flatten {
            flat = flattened(input);
            &flat
        } else {
            input
        };
        let attrs = &call.attrs;
        let inputs = std::slice::from_ref(input);
        let skipped = self.nan_aware.apply(inputs, attrs)?;
        if input.to_f64_vec().iter().any(|v| v.is_nan()) {
            return Ok(());
        }
        let plain = self.plain.apply(inputs, attrs)?;
        for (a, b) in skipped.iter().zip(&plain) {
            allclose(a, b, RTOL, ATOL).map_err(|mismatch| OpError::Internal {
                op: self.nan_aware.name(),
                detail: format!(
                    "disagrees with {} on NaN-free input: {}",
                    self.plain.name(),
                    mismatch
                ),
            })?;
        }
        Ok(())
    }
}

impl<O, R> Harness for NanQuantileHarness<O, R>
where
    O: Operator<Attrs = QuantileAttrs>,
    R: Operator<Attrs = QuantileAttrs>,
{
    type Case = NanQuantileCase;

    const NAME: &'static str = "nanquantile";
    const MIN_INPUT_LEN: usize = 4;
    const LIMITS: Limits = Limits::DEFAULT;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<NanQuantileCase, Error> {
        let input = create_tensor(cursor, &TENSOR_DTYPES, Self::LIMITS)?;
        let mut input = if input.dtype.is_floating() { input } else { input.cast(DType::Float32) };
        if !cursor.is_exhausted() && input.num_elements() > 0 {
            input = inject_nan(input, cursor.read_byte(0))?;
        }

        let q = decode_fraction(cursor, 0.5);
        let dim = decode_axis(cursor, input.rank());
        let keepdim = decode_bool(cursor, false);
        let interpolation = decode_enum(cursor, &INTERPOLATIONS)?;
        let variant = decode_enum(cursor, &VARIANTS)?;
        let scalar = call_for(variant, QuantileQ::Scalar(q), dim, keepdim, interpolation);

        let mut list = None;
        if cursor.remaining() > 1 {
            let count = decode_small_int(cursor, 1, 5)?;
            let mut qs = Vec::new();
            for _ in 0..count {
                if cursor.remaining() < 8 {
                    break;
                }
                qs.push(decode_fraction(cursor, 0.5));
            }
            if !qs.is_empty() {
                let variant = decode_enum(cursor, &VARIANTS)?;
                list = Some(call_for(variant, QuantileQ::List(qs), dim, keepdim, interpolation));
            }
        }
        Ok(NanQuantileCase { input, scalar, list })
    }

    fn invoke(&self, case: NanQuantileCase) -> Result<(), OpError> {
        self.check(&case.input, &case.scalar)?;
        if let Some(list) = &case.list {
            self.check(&case.input, list)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        // int32 selector, rank 1, dim 4, payload
        let mut data = vec![9, 1];
        data.extend_from_slice(&4i64.to_le_bytes());
        for v in [4i32, 1, 3, 2] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data
    }

    #[test]
    fn integer_input_is_cast_and_nan_injected() {
        let mut data = header();
        data.push(6); // 6 % 3 == 0, 6 % 5 + 1 == 2 NaNs
        let case = <NanQuantileHarness>::default().decode(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(case.input.dtype, DType::Float32);
        let values = case.input.to_vec::<f32>().unwrap();
        assert!(values[0].is_nan() && values[1].is_nan());
        assert_eq!(&values[2..], &[3.0, 2.0]);
        assert_eq!(case.scalar.attrs.q, QuantileQ::Scalar(0.5));
        assert_eq!(case.scalar.attrs.dim, None);
        assert!(case.list.is_none());
    }

    #[test]
    fn full_variant_without_axis_flattens() {
        let mut data = header();
        data.push(1); // no NaN
        data.extend_from_slice(&0.25f64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes()); // no axis
        data.extend_from_slice(&[1, 2, 3]); // keepdim, higher, full
        data.push(1); // two quantiles
        data.extend_from_slice(&1.75f64.to_le_bytes());
        data.extend_from_slice(&0.5f64.to_le_bytes());
        let case = <NanQuantileHarness>::default().decode(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(case.input.shape, Shape::new(vec![4]));
        assert!(case.scalar.flatten);
        assert_eq!(case.scalar.attrs.dim, Some(0));
        assert!(case.scalar.attrs.keepdim);
        assert_eq!(case.scalar.attrs.interpolation, Interpolation::Higher);
        // list selector missing: plain form
        let list = case.list.clone().unwrap();
        assert_eq!(list.attrs.q, QuantileQ::List(vec![0.75, 0.5]));
        assert_eq!(list.attrs.dim, None);
        assert!(!list.flatten);
        assert!(<NanQuantileHarness>::default().invoke(case).is_ok());
    }

    #[test]
    fn list_call_has_its_own_form() {
        // float32 [2, 2]
        let mut data = vec![0, 2];
        data.extend_from_slice(&2i64.to_le_bytes());
        data.extend_from_slice(&2i64.to_le_bytes());
        for v in [1.0f32, 4.0, 3.0, 2.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.push(1); // no NaN
        data.extend_from_slice(&0.5f64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes()); // no axis
        data.extend_from_slice(&[1, 4, 0]); // keepdim, nearest, plain scalar call
        data.push(0); // one quantile
        data.extend_from_slice(&0.25f64.to_le_bytes());
        data.push(3); // full form for the list call
        let mut cursor = ByteCursor::new(&data);
        let case = <NanQuantileHarness>::default().decode(&mut cursor).unwrap();
        assert!(cursor.is_exhausted());

        assert_eq!(case.scalar.attrs.dim, None);
        assert!(!case.scalar.flatten);
        assert_eq!(case.scalar.attrs.interpolation, Interpolation::Linear);

        let list = case.list.clone().unwrap();
        assert_eq!(list.attrs.q, QuantileQ::List(vec![0.25]));
        assert!(list.flatten);
        assert_eq!(list.attrs.dim, Some(0));
        assert!(list.attrs.keepdim);
        assert_eq!(list.attrs.interpolation, Interpolation::Nearest);
        assert!(<NanQuantileHarness>::default().invoke(case).is_ok());
    }

    #[test]
    fn short_dim_word_leaves_attributes_at_defaults() {
        // float32, rank 1, then five bytes: too short for a dim word
        let data = [0u8, 1, 0, 0, 0x80, 0x3f, 3];
        let mut cursor = ByteCursor::new(&data);
        let case = <NanQuantileHarness>::default().decode(&mut cursor).unwrap();
        assert_eq!(case.input.shape, Shape::new(vec![1]));
        assert_eq!(case.input.to_vec::<f32>().unwrap(), vec![0.0]);
        assert_eq!(case.scalar.attrs.q, QuantileQ::Scalar(0.5));
        assert!(case.list.is_none());
    }
}
