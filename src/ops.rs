//! Operator capability and the bundled CPU reference backend.
//!
//! Harnesses only talk to operators through [`Operator`]. The reference
//! implementations here validate their arguments the way a tensor library
//! does and compute a plain result through `f64`; they exist so the harnesses
//! run without a native library attached.

use crate::error::OpError;
use crate::models::{DType, Shape, Tensor};

/// One invocable operator of the library under test.
pub trait Operator {
    type Attrs;

    fn name(&self) -> &'static str;

    /// Runs the operator. Validation failures use the [`OpError`] validation
    /// variants; anything else is [`OpError::Internal`].
    fn apply(&self, inputs: &[Tensor], attrs: &Self::Attrs) -> Result<Vec<Tensor>, OpError>;
}

fn expect_inputs(op: &'static str, inputs: &[Tensor], n: usize) -> Result<(), OpError> {
    if inputs.len() != n {
        return Err(OpError::InvalidAttribute {
            op,
            name: "inputs",
            detail: format!("expected {} inputs, got {}", n, inputs.len()),
        });
    }
    Ok(())
}

fn expect_rank(op: &'static str, t: &Tensor, rank: usize) -> Result<(), OpError> {
    if t.rank() != rank {
        return Err(OpError::ShapeMismatch {
            op,
            detail: format!("expected rank {}, got shape {}", rank, t.shape),
        });
    }
    Ok(())
}

fn finish(
    op: &'static str,
    dtype: DType,
    dims: Vec<usize>,
    values: &[f64],
) -> Result<Tensor, OpError> {
    Tensor::from_f64(dtype, Shape::new(dims), values)
        .map_err(|e| OpError::Internal { op, detail: e.to_string() })
}

/// Splits `shape` around `axis` into (outer, axis length, inner) extents.
fn lanes(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = dims[..axis].iter().product();
    let inner = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

// ============================================================================
// Pooling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Same,
    Valid,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Nhwc,
    Nchw,
    NchwVectC,
}

impl DataFormat {
    /// Positions of (batch, height, width, channel) in a rank-4 shape.
    fn layout(self) -> [usize; 4] {
        match self {
            DataFormat::Nhwc => [0, 1, 2, 3],
            DataFormat::Nchw | DataFormat::NchwVectC => [0, 2, 3, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxPoolAttrs {
    pub ksize: [usize; 4],
    pub strides: [usize; 4],
    pub padding: Padding,
    /// Eight (before, after) pairs, one per dimension; only for `Explicit`.
    pub explicit_paddings: Vec<usize>,
    pub data_format: DataFormat,
}

/// 2-D max pooling over a rank-4 tensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPool;

impl MaxPool {
    const NAME: &'static str = "max_pool";

    fn validate(&self, input: &Tensor, attrs: &MaxPoolAttrs) -> Result<(), OpError> {
        let op = Self::NAME;
        if input.dtype.is_quantized() || input.dtype.is_complex() || input.dtype == DType::Bool {
            return Err(OpError::UnsupportedDType { op, dtype: input.dtype });
        }
        if attrs.data_format == DataFormat::NchwVectC {
            return Err(OpError::InvalidAttribute {
                op,
                name: "data_format",
                detail: "NCHW_VECT_C is not supported on CPU".to_string(),
            });
        }
        expect_rank(op, input, 4)?;
        let [b, _, _, c] = attrs.data_format.layout();
        for (name, values) in [("ksize", &attrs.ksize), ("strides", &attrs.strides)] {
            if values.iter().any(|&v| v == 0) {
                return Err(OpError::InvalidAttribute {
                    op,
                    name,
                    detail: format!("{:?} contains zero", values),
                });
            }
            if values[b] != 1 || values[c] != 1 {
                return Err(OpError::InvalidAttribute {
                    op,
                    name,
                    detail: "pooling across batch or depth is not supported".to_string(),
                });
            }
        }
        if attrs.padding == Padding::Explicit {
            if attrs.explicit_paddings.len() != 8 {
                return Err(OpError::InvalidAttribute {
                    op,
                    name: "explicit_paddings",
                    detail: format!("expected 8 values, got {}", attrs.explicit_paddings.len()),
                });
            }
            let p = &attrs.explicit_paddings;
            if p[2 * b] + p[2 * b + 1] + p[2 * c] + p[2 * c + 1] != 0 {
                return Err(OpError::InvalidAttribute {
                    op,
                    name: "explicit_paddings",
                    detail: "batch and depth padding must be zero".to_string(),
                });
            }
            for dim in 0..4 {
                if p[2 * dim] >= attrs.ksize[dim] || p[2 * dim + 1] >= attrs.ksize[dim] {
                    return Err(OpError::InvalidAttribute {
                        op,
                        name: "explicit_paddings",
                        detail: format!(
                            "padding on dimension {} must be smaller than the window",
                            dim
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Output extent and leading pad for one spatial dimension.
    fn spatial(
        &self,
        size: usize,
        k: usize,
        s: usize,
        attrs: &MaxPoolAttrs,
        dim: usize,
    ) -> Result<(usize, usize), OpError> {
        let (padded, before) = match attrs.padding {
            Padding::Valid => (size, 0),
            Padding::Same => {
                let out = size.div_ceil(s);
                let total = ((out.saturating_sub(1)) * s + k).saturating_sub(size);
                return Ok((out, total / 2));
            }
            Padding::Explicit => {
                let before = attrs.explicit_paddings[2 * dim];
                (size + before + attrs.explicit_paddings[2 * dim + 1], before)
            }
        };
        if padded < k {
            return Err(OpError::InvalidAttribute {
                op: Self::NAME,
                name: "ksize",
                detail: format!("window {} larger than padded input {}", k, padded),
            });
        }
        Ok(((padded - k) / s + 1, before))
    }
}

impl Operator for MaxPool {
    type Attrs = MaxPoolAttrs;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, inputs: &[Tensor], attrs: &MaxPoolAttrs) -> Result<Vec<Tensor>, OpError> {
        expect_inputs(Self::NAME, inputs, 1)?;
        let input = &inputs[0];
        self.validate(input, attrs)?;

        let [bi, hi, wi, ci] = attrs.data_format.layout();
        let dims = input.shape.dims();
        let (out_h, pad_h) = self.spatial(dims[hi], attrs.ksize[hi], attrs.strides[hi], attrs, hi)?;
        let (out_w, pad_w) = self.spatial(dims[wi], attrs.ksize[wi], attrs.strides[wi], attrs, wi)?;

        let mut out_dims = dims.to_vec();
        out_dims[hi] = out_h;
        out_dims[wi] = out_w;

        let values = input.to_f64_vec();
        let strides_of = |d: &[usize]| {
            let mut s = [1usize; 4];
            for i in (0..3).rev() {
                s[i] = s[i + 1] * d[i + 1];
            }
            s
        };
        let in_strides = strides_of(dims);
        let out_strides = strides_of(&out_dims);
        let mut out = vec![0.0f64; out_dims.iter().product()];

        for n in 0..dims[bi] {
            for c in 0..dims[ci] {
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let mut best = f64::NEG_INFINITY;
                        for kh in 0..attrs.ksize[hi] {
                            for kw in 0..attrs.ksize[wi] {
                                let h = (oh * attrs.strides[hi] + kh).checked_sub(pad_h);
                                let w = (ow * attrs.strides[wi] + kw).checked_sub(pad_w);
                                let (Some(h), Some(w)) = (h, w) else { continue };
                                if h >= dims[hi] || w >= dims[wi] {
                                    continue;
                                }
                                let idx = n * in_strides[bi]
                                    + c * in_strides[ci]
                                    + h * in_strides[hi]
                                    + w * in_strides[wi];
                                let v = values[idx];
                                if v > best || v.is_nan() {
                                    best = v;
                                }
                            }
                        }
                        let o = n * out_strides[bi]
                            + c * out_strides[ci]
                            + oh * out_strides[hi]
                            + ow * out_strides[wi];
                        out[o] = best;
                    }
                }
            }
        }
        Ok(vec![finish(Self::NAME, input.dtype, out_dims, &out)?])
    }
}

// ============================================================================
// Linear algebra
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatMulAttrs {
    pub transpose_a: bool,
    pub transpose_b: bool,
}

/// Rank-2 matrix product.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatMul;

impl Operator for MatMul {
    type Attrs = MatMulAttrs;

    fn name(&self) -> &'static str {
        "matmul"
    }

    fn apply(&self, inputs: &[Tensor], attrs: &MatMulAttrs) -> Result<Vec<Tensor>, OpError> {
        let op = self.name();
        expect_inputs(op, inputs, 2)?;
        let (a, b) = (&inputs[0], &inputs[1]);
        if a.dtype != b.dtype {
            return Err(OpError::InvalidAttribute {
                op,
                name: "T",
                detail: format!("operand dtypes differ: {} vs {}", a.dtype, b.dtype),
            });
        }
        if a.dtype == DType::Bool || a.dtype.is_quantized() {
            return Err(OpError::UnsupportedDType { op, dtype: a.dtype });
        }
        expect_rank(op, a, 2)?;
        expect_rank(op, b, 2)?;

        let (ad, bd) = (a.shape.dims(), b.shape.dims());
        let (m, k) = if attrs.transpose_a { (ad[1], ad[0]) } else { (ad[0], ad[1]) };
        let (k2, n) = if attrs.transpose_b { (bd[1], bd[0]) } else { (bd[0], bd[1]) };
        if k != k2 {
            return Err(OpError::ShapeMismatch {
                op,
                detail: format!("inner dimensions differ: {} vs {}", k, k2),
            });
        }

        let (av, bv) = (a.to_f64_vec(), b.to_f64_vec());
        let at = |i: usize, p: usize| {
            if attrs.transpose_a { av[p * ad[1] + i] } else { av[i * ad[1] + p] }
        };
        let bt = |p: usize, j: usize| {
            if attrs.transpose_b { bv[j * bd[1] + p] } else { bv[p * bd[1] + j] }
        };
        let mut out = vec![0.0f64; m * n];
        for i in 0..m {
            for j in 0..n {
                out[i * n + j] = (0..k).map(|p| at(i, p) * bt(p, j)).sum();
            }
        }
        Ok(vec![finish(op, a.dtype, vec![m, n], &out)?])
    }
}

// ============================================================================
// Shape manipulation
// ============================================================================

/// Joins tensors along `axis` (negative values count from the end).
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl Operator for Concat {
    type Attrs = i64;

    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, inputs: &[Tensor], axis: &i64) -> Result<Vec<Tensor>, OpError> {
        let op = self.name();
        let Some(first) = inputs.first() else {
            return Err(OpError::InvalidAttribute {
                op,
                name: "values",
                detail: "at least one input is required".to_string(),
            });
        };
        let rank = first.rank() as i64;
        if rank == 0 || *axis < -rank || *axis >= rank {
            return Err(OpError::InvalidAttribute {
                op,
                name: "axis",
                detail: format!("axis {} out of range for rank {}", axis, rank),
            });
        }
        let axis = axis.rem_euclid(rank) as usize;

        for t in &inputs[1..] {
            if t.dtype != first.dtype {
                return Err(OpError::InvalidAttribute {
                    op,
                    name: "T",
                    detail: format!("mixed dtypes {} and {}", first.dtype, t.dtype),
                });
            }
            let compatible = t.rank() == first.rank()
                && t.shape
                    .dims()
                    .iter()
                    .zip(first.shape.dims())
                    .enumerate()
                    .all(|(i, (x, y))| i == axis || x == y);
            if !compatible {
                return Err(OpError::ShapeMismatch {
                    op,
                    detail: format!(
                        "{} does not match {} outside axis {}",
                        t.shape, first.shape, axis
                    ),
                });
            }
        }

        let width = first.dtype.byte_size();
        let (outer, _, inner) = lanes(first.shape.dims(), axis);
        let mut out_dims = first.shape.dims().to_vec();
        out_dims[axis] = inputs.iter().map(|t| t.shape.dims()[axis]).sum();
        let mut data = Vec::with_capacity(inputs.iter().map(|t| t.data.len()).sum());
        for o in 0..outer {
            for t in inputs {
                let slab = t.shape.dims()[axis] * inner * width;
                data.extend_from_slice(&t.data[o * slab..(o + 1) * slab]);
            }
        }
        Ok(vec![Tensor { dtype: first.dtype, shape: Shape::new(out_dims), data }])
    }
}

/// Reinterprets the input with a new shape; one entry may be `-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reshape;

impl Operator for Reshape {
    type Attrs = Vec<i64>;

    fn name(&self) -> &'static str {
        "reshape"
    }

    fn apply(&self, inputs: &[Tensor], target: &Vec<i64>) -> Result<Vec<Tensor>, OpError> {
        let op = self.name();
        expect_inputs(op, inputs, 1)?;
        let input = &inputs[0];
        let invalid = |detail: String| OpError::InvalidAttribute { op, name: "shape", detail };

        let mut inferred = None;
        let mut known = 1usize;
        for (i, &d) in target.iter().enumerate() {
            match d {
                -1 if inferred.is_none() => inferred = Some(i),
                -1 => return Err(invalid("only one dimension can be -1".to_string())),
                d if d < 0 => return Err(invalid(format!("negative dimension {}", d))),
                d => {
                    known = known
                        .checked_mul(d as usize)
                        .ok_or_else(|| invalid("dimension product overflows".to_string()))?;
                }
            }
        }

        let total = input.num_elements();
        let mut dims: Vec<usize> = target.iter().map(|&d| d.max(0) as usize).collect();
        if let Some(i) = inferred {
            if known == 0 || total % known != 0 {
                return Err(invalid(format!(
                    "cannot infer dimension {} for {} elements from known product {}",
                    i, total, known
                )));
            }
            dims[i] = total / known;
        } else if known != total {
            return Err(OpError::ShapeMismatch {
                op,
                detail: format!("cannot reshape {} elements into {:?}", total, target),
            });
        }
        Ok(vec![Tensor { dtype: input.dtype, shape: Shape::new(dims), data: input.data.clone() }])
    }
}

// ============================================================================
// Reductions
// ============================================================================

/// Softmax over the last axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl Operator for Softmax {
    type Attrs = ();

    fn name(&self) -> &'static str {
        "softmax"
    }

    fn apply(&self, inputs: &[Tensor], _: &()) -> Result<Vec<Tensor>, OpError> {
        let op = self.name();
        expect_inputs(op, inputs, 1)?;
        let logits = &inputs[0];
        if !logits.dtype.is_floating() {
            return Err(OpError::UnsupportedDType { op, dtype: logits.dtype });
        }
        if logits.rank() == 0 {
            return Err(OpError::ShapeMismatch {
                op,
                detail: "logits must have rank >= 1".to_string(),
            });
        }
        let values = logits.to_f64_vec();
        let row = logits.shape.dims()[logits.rank() - 1];
        let mut out = Vec::with_capacity(values.len());
        if row > 0 {
            for chunk in values.chunks(row) {
                let max = chunk.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exps: Vec<f64> = chunk.iter().map(|v| (v - max).exp()).collect();
                let sum: f64 = exps.iter().sum();
                out.extend(exps.iter().map(|e| e / sum));
            }
        }
        Ok(vec![finish(op, logits.dtype, logits.shape.dims().to_vec(), &out)?])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Lower,
    Higher,
    Midpoint,
    Nearest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantileQ {
    Scalar(f64),
    /// One-dimensional list of quantiles.
    List(Vec<f64>),
}

impl QuantileQ {
    fn values(&self) -> &[f64] {
        match self {
            QuantileQ::Scalar(q) => std::slice::from_ref(q),
            QuantileQ::List(qs) => qs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantileAttrs {
    pub q: QuantileQ,
    pub dim: Option<usize>,
    pub keepdim: bool,
    pub interpolation: Interpolation,
}

/// `quantile` / `nanquantile` over one axis or the flattened input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantile {
    pub ignore_nan: bool,
}

impl Quantile {
    pub fn nan_aware() -> Self {
        Self { ignore_nan: true }
    }

    fn lane_quantile(&self, lane: &mut Vec<f64>, q: f64, interpolation: Interpolation) -> f64 {
        if self.ignore_nan {
            lane.retain(|v| !v.is_nan());
        } else if lane.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        if lane.is_empty() {
            return f64::NAN;
        }
        lane.sort_by(f64::total_cmp);
        let rank = q * (lane.len() - 1) as f64;
        let (lo, hi) = (lane[rank.floor() as usize], lane[rank.ceil() as usize]);
        match interpolation {
            Interpolation::Linear => lo + (hi - lo) * (rank - rank.floor()),
            Interpolation::Lower => lo,
            Interpolation::Higher => hi,
            Interpolation::Midpoint => (lo + hi) / 2.0,
            Interpolation::Nearest => lane[rank.round_ties_even() as usize],
        }
    }
}

impl Operator for Quantile {
    type Attrs = QuantileAttrs;

    fn name(&self) -> &'static str {
        if self.ignore_nan { "nanquantile" } else { "quantile" }
    }

    fn apply(&self, inputs: &[Tensor], attrs: &QuantileAttrs) -> Result<Vec<Tensor>, OpError> {
        let op = self.name();
        expect_inputs(op, inputs, 1)?;
        let input = &inputs[0];
        if !matches!(input.dtype, DType::Float32 | DType::Float64) {
            return Err(OpError::UnsupportedDType { op, dtype: input.dtype });
        }
        if input.num_elements() == 0 {
            return Err(OpError::Precondition {
                op,
                detail: "input tensor must be non-empty".to_string(),
            });
        }
        let qs = attrs.q.values();
        if qs.is_empty() || qs.iter().any(|q| !(0.0..=1.0).contains(q)) {
            return Err(OpError::InvalidAttribute {
                op,
                name: "q",
                detail: format!("values must be in [0, 1], got {:?}", qs),
            });
        }

        let dims = input.shape.dims();
        let values = input.to_f64_vec();
        let (reduced, lanes_of): (Vec<usize>, Vec<Vec<f64>>) = match attrs.dim {
            None => {
                let kept = if attrs.keepdim { vec![1; dims.len()] } else { Vec::new() };
                (kept, vec![values])
            }
            Some(dim) if dim >= dims.len() => {
                return Err(OpError::InvalidAttribute {
                    op,
                    name: "dim",
                    detail: format!("dimension {} out of range for rank {}", dim, dims.len()),
                });
            }
            Some(dim) => {
                let (outer, len, inner) = lanes(dims, dim);
                let mut all = Vec::with_capacity(outer * inner);
                for o in 0..outer {
                    for i in 0..inner {
                        all.push((0..len).map(|k| values[(o * len + k) * inner + i]).collect());
                    }
                }
                let mut kept = dims.to_vec();
                if attrs.keepdim {
                    kept[dim] = 1;
                } else {
                    kept.remove(dim);
                }
                (kept, all)
            }
        };

        let mut out = Vec::with_capacity(qs.len() * lanes_of.len());
        for &q in qs {
            for lane in &lanes_of {
                out.push(self.lane_quantile(&mut lane.clone(), q, attrs.interpolation));
            }
        }
        let mut out_dims = reduced;
        if let QuantileQ::List(list) = &attrs.q {
            out_dims.insert(0, list.len());
        }
        Ok(vec![finish(op, input.dtype, out_dims, &out)?])
    }
}
