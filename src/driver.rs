//! Harness driver: decode, invoke once, classify.
//!
//! Every invocation walks `Decoding -> Invoking -> {Continue, RejectInput,
//! BugFound}`. Both stages run under `catch_unwind`, so a panic in a decoder
//! or an operator surfaces as [`Outcome::BugFound`] instead of unwinding into
//! the fuzzing engine.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{Error, OpError};
use crate::models::{Limits, Outcome};

/// One fuzz target: a fixed decode sequence plus an operator call sequence.
pub trait Harness {
    /// Fully decoded operator arguments.
    type Case;

    const NAME: &'static str;
    /// Inputs shorter than this are rejected before decoding.
    const MIN_INPUT_LEN: usize;
    /// Bounds the decode sequence works within, recorded in bug reports.
    const LIMITS: Limits = Limits::DEFAULT;

    fn decode(&self, cursor: &mut ByteCursor<'_>) -> Result<Self::Case, Error>;

    /// Calls the operator (at most two related operators) with the case.
    fn invoke(&self, case: Self::Case) -> Result<(), OpError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Invoking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Decoding => "decoding",
            Stage::Invoking => "invoking",
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn bug(harness: &str, stage: Stage, message: String) -> Outcome {
    warn!(harness, %stage, %message, "bug found");
    Outcome::BugFound(format!("{} while {}: {}", harness, stage, message))
}

/// Runs one input through `harness` and classifies the result.
pub fn run<H: Harness>(harness: &H, data: &[u8]) -> Outcome {
    if data.len() < H::MIN_INPUT_LEN {
        debug!(
            harness = H::NAME,
            len = data.len(),
            min = H::MIN_INPUT_LEN,
            "input below minimum size"
        );
        return Outcome::RejectInput;
    }

    let decoded = guarded(|| {
        let mut cursor = ByteCursor::new(data);
        harness.decode(&mut cursor)
    });
    let case = match decoded {
        Ok(Ok(case)) => case,
        Ok(Err(e)) if e.is_rejection() => {
            debug!(harness = H::NAME, reason = %e, "input rejected while decoding");
            return Outcome::RejectInput;
        }
        Ok(Err(e)) => return bug(H::NAME, Stage::Decoding, e.to_string()),
        Err(panicked) => return bug(H::NAME, Stage::Decoding, format!("panicked: {}", panicked)),
    };

    match guarded(|| harness.invoke(case)) {
        Ok(Ok(())) => Outcome::Continue,
        Ok(Err(e)) if e.is_validation() => {
            debug!(harness = H::NAME, reason = %e, "operator rejected input");
            Outcome::RejectInput
        }
        Ok(Err(e)) => bug(H::NAME, Stage::Invoking, e.to_string()),
        Err(panicked) => bug(H::NAME, Stage::Invoking, format!("panicked: {}", panicked)),
    }
}

/// Engine-facing variant of [`run`]: prints the bug text to stderr and
/// returns `0` or `-1`.
pub fn fuzz_one_input<H: Harness>(harness: &H, data: &[u8]) -> i32 {
    let outcome = run(harness, data);
    if let Outcome::BugFound(message) = &outcome {
        eprintln!("{}", message);
    }
    outcome.exit_code()
}

/// Type-erased registry entry for a harness with a default constructor.
#[derive(Clone, Copy)]
pub struct HarnessEntry {
    pub name: &'static str,
    pub min_input_len: usize,
    pub limits: Limits,
    pub run: fn(&[u8]) -> Outcome,
    pub fuzz_one_input: fn(&[u8]) -> i32,
}

fn run_default<H: Harness + Default>(data: &[u8]) -> Outcome {
    run(&H::default(), data)
}

fn fuzz_default<H: Harness + Default>(data: &[u8]) -> i32 {
    fuzz_one_input(&H::default(), data)
}

impl HarnessEntry {
    pub const fn of<H: Harness + Default>() -> Self {
        Self {
            name: H::NAME,
            min_input_len: H::MIN_INPUT_LEN,
            limits: H::LIMITS,
            run: run_default::<H>,
            fuzz_one_input: fuzz_default::<H>,
        }
    }
}

impl fmt::Debug for HarnessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessEntry")
            .field("name", &self.name)
            .field("min_input_len", &self.min_input_len)
            .field("limits", &self.limits)
            .finish()
    }
}

/// Exports `FuzzOneInput(const uint8_t*, size_t) -> int` for one harness.
///
/// The harness type must implement `Default`. A null `data` pointer is read
/// as an empty input.
#[macro_export]
macro_rules! export_fuzz_entry {
    ($harness:ty) => {
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn FuzzOneInput(
            data: *const u8,
            size: $crate::__libc::size_t,
        ) -> $crate::__libc::c_int {
            let bytes: &[u8] = if data.is_null() || size == 0 {
                &[]
            } else {
                unsafe { ::std::slice::from_raw_parts(data, size) }
            };
            let harness = <$harness as ::std::default::Default>::default();
            $crate::driver::fuzz_one_input(&harness, bytes)
        }
    };
}
