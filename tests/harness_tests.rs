use opfuzz::driver::run;
use opfuzz::harnesses::{
    self, ConcatHarness, MaxPoolHarness, NanQuantileHarness, ReshapeHarness, SoftmaxHarness,
};
use opfuzz::models::{Outcome, Tensor};
use opfuzz::ops::{Quantile, QuantileAttrs};
use opfuzz::{OpError, Operator};

mod common;
use common::input_builder::InputBuilder;

/// float32 [1, 2, 2, 1] with a 2x2 window, unit strides, VALID, NHWC.
fn max_pool_input() -> InputBuilder {
    InputBuilder::new()
        .byte(2)
        .byte(0)
        .dims(&[0, 1, 1, 0])
        .f32s(&[1.0, 4.0, 2.0, 3.0])
        .bytes(&[0, 1, 1, 0])
        .bytes(&[0, 0, 0, 0])
        .byte(1)
        .byte(0)
}

// ----- max_pool -----

#[test]
fn max_pool_valid_window_continues() {
    let data = max_pool_input().build();
    assert_eq!(run(&<MaxPoolHarness>::default(), &data), Outcome::Continue);
}

#[test]
fn max_pool_vect_c_is_rejected() {
    let data = max_pool_input().build();
    let mut data = data[..data.len() - 1].to_vec();
    data.push(2);
    assert_eq!(run(&<MaxPoolHarness>::default(), &data), Outcome::RejectInput);
}

#[test]
fn max_pool_needs_twenty_bytes() {
    assert_eq!(run(&<MaxPoolHarness>::default(), &[2; 19]), Outcome::RejectInput);
}

// ----- nanquantile -----

fn quantile_input() -> Vec<u8> {
    InputBuilder::new()
        .byte(0) // float32
        .byte(2) // rank 2
        .dims(&[2, 3])
        .f32s(&[5.0, 1.0, 4.0, 2.0, 3.0, 6.0])
        .byte(1) // no NaN
        .f64(0.5)
        .dim(3) // axis 1
        .bytes(&[1, 0, 1]) // keepdim, linear, dim variant
        .build()
}

#[test]
fn nanquantile_agrees_with_quantile() {
    assert_eq!(run(&<NanQuantileHarness>::default(), &quantile_input()), Outcome::Continue);
}

/// Nan-aware implementation that is off by one on every output.
struct Skewed;

impl Operator for Skewed {
    type Attrs = QuantileAttrs;

    fn name(&self) -> &'static str {
        "nanquantile"
    }

    fn apply(&self, inputs: &[Tensor], attrs: &QuantileAttrs) -> Result<Vec<Tensor>, OpError> {
        let out = Quantile::nan_aware().apply(inputs, attrs)?;
        Ok(out
            .into_iter()
            .map(|t| {
                let values: Vec<f64> = t.to_f64_vec().iter().map(|v| v + 1.0).collect();
                Tensor::from_f64(t.dtype, t.shape.clone(), &values).unwrap()
            })
            .collect())
    }
}

#[test]
fn nanquantile_divergence_is_bug() {
    let h = NanQuantileHarness::new(Skewed, Quantile::default());
    let Outcome::BugFound(message) = run(&h, &quantile_input()) else {
        panic!("expected BugFound");
    };
    assert!(message.contains("disagrees with quantile"), "{}", message);
}

#[test]
fn nanquantile_with_nan_skips_cross_check() {
    let mut data = quantile_input();
    // NaN control byte sits right after the 24-byte payload.
    let control = 2 + 16 + 24;
    data[control] = 0;
    let h = NanQuantileHarness::new(Skewed, Quantile::default());
    assert_eq!(run(&h, &data), Outcome::Continue);
}

// ----- concat / reshape / softmax -----

#[test]
fn concat_without_operands_is_rejected() {
    let data = InputBuilder::new().bytes(&[0, 0, 1, 0]).dim(1).build();
    assert_eq!(run(&<ConcatHarness>::default(), &data), Outcome::RejectInput);
}

#[test]
fn concat_of_matching_operands_continues() {
    let data = InputBuilder::new()
        .bytes(&[3, 0, 1, 0]) // three float32 vectors along axis 0
        .dim(2)
        .bytes(&[1])
        .f32s(&[1.0, 2.0])
        .bytes(&[0])
        .f32s(&[3.0])
        .build();
    assert_eq!(run(&<ConcatHarness>::default(), &data), Outcome::Continue);
}

#[test]
fn reshape_to_wrong_size_is_rejected() {
    let data = InputBuilder::new()
        .bytes(&[0, 1])
        .dim(6)
        .f32s(&[0.0; 6])
        .byte(1)
        .i32s(&[5]) // target [4]
        .build();
    assert_eq!(run(&<ReshapeHarness>::default(), &data), Outcome::RejectInput);
}

#[test]
fn reshape_with_inferred_dim_continues() {
    let data = InputBuilder::new()
        .bytes(&[0, 1])
        .dim(6)
        .f32s(&[0.0; 6])
        .byte(2)
        .i32s(&[3, 0]) // target [2, -1]
        .build();
    assert_eq!(run(&<ReshapeHarness>::default(), &data), Outcome::Continue);
}

#[test]
fn softmax_on_float_logits_continues() {
    let data = InputBuilder::new().bytes(&[1, 2]).dims(&[3, 4]).build();
    assert_eq!(run(&<SoftmaxHarness>::default(), &data), Outcome::Continue);
}

#[test]
fn registry_lookup_runs_by_name() {
    let data = max_pool_input().build();
    assert_eq!(harnesses::run_by_name("max_pool", &data), Some(Outcome::Continue));
}
