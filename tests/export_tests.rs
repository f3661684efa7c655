use opfuzz::harnesses::SoftmaxHarness;

opfuzz::export_fuzz_entry!(SoftmaxHarness);

#[test]
fn exported_entry_accepts_null_and_short_input() {
    assert_eq!(FuzzOneInput(std::ptr::null(), 0), 0);
    assert_eq!(FuzzOneInput(std::ptr::null(), 16), 0);
    let data = [1u8];
    assert_eq!(FuzzOneInput(data.as_ptr(), data.len()), 0);
}

#[test]
fn exported_entry_runs_the_harness() {
    // float64 logits of shape [4]; payload falls back to zeros
    let data = [1u8, 1, 4, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(FuzzOneInput(data.as_ptr(), data.len()), 0);
}
