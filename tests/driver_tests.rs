use opfuzz::cursor::ByteCursor;
use opfuzz::driver::{Harness, fuzz_one_input, run};
use opfuzz::models::{DType, Outcome, Shape};

mod common;
use common::input_builder::InputBuilder;
use common::mock_ops::*;

// ----- Minimum size -----

#[test]
fn empty_input_is_rejected_without_decoding() {
    let h = SampleHarness::new(Accept::default());
    assert_eq!(run(&h, &[]), Outcome::RejectInput);
    assert_eq!(fuzz_one_input(&h, &[]), 0);
    assert_eq!(h.op.calls.get(), 0);
}

#[test]
fn below_minimum_never_touches_operator() {
    let h = SampleHarness::new(Panicking);
    assert_eq!(run(&h, &[0x00]), Outcome::RejectInput);
}

// ----- Exhaustion fallback -----

#[test]
fn rank_byte_zero_selects_rank_one_and_defaults_dim() {
    let data = InputBuilder::new().bytes(&[0x00, 0x00, 0xAA, 0xBB, 0xCC]).build();
    let h = SampleHarness::new(Accept::default());
    let case = h.decode(&mut ByteCursor::new(&data)).unwrap();
    assert_eq!(case.dtype, DType::Float32);
    assert_eq!(case.shape, Shape::new(vec![1]));
    // three bytes are not enough for one f32
    assert_eq!(case.to_vec::<f32>().unwrap(), vec![0.0]);

    assert_eq!(run(&h, &data), Outcome::Continue);
    assert_eq!(h.op.calls.get(), 1);
    assert_eq!(h.op.seen.get(), Some(1));
}

#[test]
fn leftover_bytes_after_short_dim_word_are_not_payload() {
    // seven bytes after the rank byte: 1.0f32 plus three more, short of a dim word
    let data = InputBuilder::new()
        .bytes(&[0x00, 0x00])
        .bytes(&[0x00, 0x00, 0x80, 0x3f, 0x11, 0x22, 0x33])
        .build();
    let h = SampleHarness::new(Accept::default());
    let mut cursor = ByteCursor::new(&data);
    let case = h.decode(&mut cursor).unwrap();
    assert_eq!(case.shape, Shape::new(vec![1]));
    assert_eq!(case.to_vec::<f32>().unwrap(), vec![0.0]);
    assert!(cursor.is_exhausted());
    assert_eq!(run(&h, &data), Outcome::Continue);
}

#[test]
fn short_dimension_words_default_to_one() {
    // rank byte 0x01 selects rank 2 in [1, 4]; both dims fall back.
    let data = InputBuilder::new().bytes(&[0x00, 0x01, 0x10, 0x20]).build();
    let h = SampleHarness::new(Accept::default());
    let case = h.decode(&mut ByteCursor::new(&data)).unwrap();
    assert_eq!(case.shape, Shape::new(vec![1, 1]));
    assert_eq!(run(&h, &data), Outcome::Continue);
}

// ----- Operator outcomes -----

fn rank4_input() -> Vec<u8> {
    // rank byte 3 selects rank 4; each word reduces to 16.
    InputBuilder::new().byte(1).byte(3).dims(&[15, -15, 31, i64::MAX]).build()
}

#[test]
fn rank4_dims_land_at_upper_bound() {
    let h = SampleHarness::new(Accept::default());
    let case = h.decode(&mut ByteCursor::new(&rank4_input())).unwrap();
    assert_eq!(case.dtype, DType::Int32);
    assert_eq!(case.shape, Shape::new(vec![16, 16, 16, 16]));
    assert_eq!(case.to_vec::<i32>().unwrap().len(), 65536);
}

#[test]
fn validation_error_is_rejection() {
    let h = SampleHarness::new(RejectLarge { max_elements: 1000 });
    assert_eq!(run(&h, &rank4_input()), Outcome::RejectInput);
    assert_eq!(fuzz_one_input(&h, &rank4_input()), 0);
}

#[test]
fn internal_error_is_bug() {
    let h = SampleHarness::new(FailLarge { max_elements: 1000 });
    let Outcome::BugFound(message) = run(&h, &rank4_input()) else {
        panic!("expected BugFound");
    };
    assert!(message.contains("std::bad_alloc"), "{}", message);
    assert!(message.starts_with("sample while invoking"), "{}", message);
    assert_eq!(fuzz_one_input(&h, &rank4_input()), -1);
}

#[test]
fn panic_is_bug_and_does_not_escape() {
    let h = SampleHarness::new(Panicking);
    let outcome = run(&h, &[0, 0]);
    assert!(matches!(&outcome, Outcome::BugFound(m) if m.contains("index out of bounds")));
    assert_eq!(fuzz_one_input(&h, &[0, 0]), -1);
}

// ----- Determinism -----

#[test]
fn distinct_buffers_decode_to_same_tensor() {
    let a = InputBuilder::new().byte(0).byte(0).dim(3).f32s(&[1.5, -2.0]).build();
    let b = InputBuilder::new().byte(2).byte(4).dim(-19).f32s(&[1.5, -2.0]).build();
    assert_ne!(a, b);

    let h = SampleHarness::new(Accept::default());
    let mut ca = ByteCursor::new(&a);
    let mut cb = ByteCursor::new(&b);
    let ta = h.decode(&mut ca).unwrap();
    let tb = h.decode(&mut cb).unwrap();
    assert_eq!(ca.offset(), cb.offset());
    assert_eq!(ta, tb);
    assert_eq!(ta.shape, Shape::new(vec![4]));
    assert_eq!(ta.to_vec::<f32>().unwrap(), vec![1.5, -2.0, 0.0, 0.0]);
}
