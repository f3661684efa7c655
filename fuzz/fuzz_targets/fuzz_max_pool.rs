#![no_main]
use libfuzzer_sys::fuzz_target;
use opfuzz::driver::fuzz_one_input;
use opfuzz::harnesses::MaxPoolHarness;

fuzz_target!(|data: &[u8]| {
    // -1 means BugFound; the diagnostic is already on stderr.
    let code = fuzz_one_input(&<MaxPoolHarness>::default(), data);
    assert_eq!(code, 0, "max_pool reported a bug");
});
