//! Element-wise closeness checks for differential harness stages.

use std::fmt;

use crate::models::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    DType { left: String, right: String },
    Shape { left: String, right: String },
    Values { index: usize, max_abs_diff: f64, max_rel_diff: f64, count: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::DType { left, right } => write!(f, "dtype mismatch: {} vs {}", left, right),
            Mismatch::Shape { left, right } => write!(f, "shape mismatch: {} vs {}", left, right),
            Mismatch::Values { index, max_abs_diff, max_rel_diff, count } => write!(
                f,
                "{} elements differ (first at {}), max abs diff {:e}, max rel diff {:e}",
                count, index, max_abs_diff, max_rel_diff
            ),
        }
    }
}

/// `|a - b| <= atol + rtol * |b|` for every element, with NaN equal to NaN.
pub fn allclose(a: &Tensor, b: &Tensor, rtol: f64, atol: f64) -> Result<(), Mismatch> {
    if a.dtype != b.dtype {
        return Err(Mismatch::DType { left: a.dtype.to_string(), right: b.dtype.to_string() });
    }
    if a.shape != b.shape {
        return Err(Mismatch::Shape { left: a.shape.to_string(), right: b.shape.to_string() });
    }
    values_close(&a.to_f64_vec(), &b.to_f64_vec(), rtol, atol)
}

/// Same check over raw values; slices must be the same length.
pub fn values_close(a: &[f64], b: &[f64], rtol: f64, atol: f64) -> Result<(), Mismatch> {
    if a.len() != b.len() {
        return Err(Mismatch::Shape {
            left: format!("[{}]", a.len()),
            right: format!("[{}]", b.len()),
        });
    }
    let mut first = None;
    let mut count = 0;
    let (mut max_abs, mut max_rel) = (0.0f64, 0.0f64);
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        if x.is_nan() && y.is_nan() {
            continue;
        }
        if x == y {
            continue;
        }
        let diff = (x - y).abs();
        if diff <= atol + rtol * y.abs() {
            continue;
        }
        first.get_or_insert(i);
        count += 1;
        // NaN against a number makes diff NaN; report it as infinite.
        let diff = if diff.is_nan() { f64::INFINITY } else { diff };
        max_abs = max_abs.max(diff);
        max_rel = max_rel.max(diff / y.abs().max(f64::MIN_POSITIVE));
    }
    match first {
        None => Ok(()),
        Some(index) => Err(Mismatch::Values {
            index,
            max_abs_diff: max_abs,
            max_rel_diff: max_rel,
            count,
        }),
    }
}
