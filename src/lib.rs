pub mod compare;
pub mod cursor;
pub mod decode;
pub mod driver;
pub mod error;
pub mod ffi;
pub mod harnesses;
pub mod materialize;
pub mod models;
pub mod ops;
pub mod shape;
pub mod triage;
pub mod utils;

pub use cursor::{ByteCursor, Pod};
pub use driver::{Harness, HarnessEntry, fuzz_one_input, run};
pub use error::{Error, OpError};
pub use materialize::{Materializer, create_tensor, materialize};
pub use models::{DType, Limits, Outcome, Shape, ShapeBounds, Tensor};
pub use ops::Operator;
pub use triage::BugReport;

#[doc(hidden)]
pub use libc as __libc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harnesses::{MatMulHarness, SoftmaxHarness};

    #[test]
    fn same_bytes_same_outcome() {
        let inputs: [&[u8]; 3] = [
            &[0, 1, 2, 3],
            &[1, 0, 1, 2, 5, 0, 0, 0, 0, 0, 0, 0, 9],
            &[7; 40],
        ];
        for data in inputs {
            let matmul = MatMulHarness::<ops::MatMul>::default();
            assert_eq!(run(&matmul, data), run(&matmul, data));
            let softmax = SoftmaxHarness::<ops::Softmax>::default();
            assert_eq!(run(&softmax, data), run(&softmax, data));
        }
    }

    #[test]
    fn registry_entries_report_zero_or_minus_one() {
        for entry in harnesses::REGISTRY {
            for data in [&[][..], &[0xff; 3][..], &[0x42; 128][..]] {
                let code = (entry.fuzz_one_input)(data);
                assert!(code == 0 || code == -1, "{} returned {}", entry.name, code);
            }
        }
    }
}
