#![no_main]
use libfuzzer_sys::fuzz_target;
use opfuzz::driver::fuzz_one_input;
use opfuzz::harnesses::ReshapeHarness;

fuzz_target!(|data: &[u8]| {
    // -1 means BugFound; the diagnostic is already on stderr.
    let code = fuzz_one_input(&<ReshapeHarness>::default(), data);
    assert_eq!(code, 0, "reshape reported a bug");
});
