//! Bundled fuzz targets.
//!
//! Each harness is a thin composition of the shared decoders with its own
//! allow-lists and bounds, generic over the [`Operator`](crate::ops::Operator)
//! it drives. The default type parameter is the bundled reference operator.

mod concat;
mod matmul;
mod max_pool;
mod nanquantile;
mod reshape;
mod softmax;

pub use concat::{ConcatCase, ConcatHarness};
pub use matmul::{MatMulCase, MatMulHarness};
pub use max_pool::{MAX_POOL_DTYPES, MaxPoolCase, MaxPoolHarness};
pub use nanquantile::{NanQuantileCase, NanQuantileHarness};
pub use reshape::{ReshapeCase, ReshapeHarness};
pub use softmax::{SoftmaxCase, SoftmaxHarness};

use crate::driver::HarnessEntry;
use crate::models::{DType, Outcome};

/// Selector order shared by the graph-op harnesses.
pub const WIDE_DTYPES: [DType; 18] = [
    DType::Float32,
    DType::Float64,
    DType::Int32,
    DType::Uint8,
    DType::Int16,
    DType::Int8,
    DType::Complex64,
    DType::Int64,
    DType::Bool,
    DType::QInt8,
    DType::QUint8,
    DType::QInt32,
    DType::BFloat16,
    DType::Uint16,
    DType::Complex128,
    DType::Float16,
    DType::Uint32,
    DType::Uint64,
];

/// Selector order used with [`create_tensor`](crate::materialize::create_tensor).
pub const TENSOR_DTYPES: [DType; 12] = [
    DType::Float32,
    DType::Float64,
    DType::Float16,
    DType::BFloat16,
    DType::Complex64,
    DType::Complex128,
    DType::Int8,
    DType::Uint8,
    DType::Int16,
    DType::Int32,
    DType::Int64,
    DType::Bool,
];

pub static REGISTRY: &[HarnessEntry] = &[
    HarnessEntry::of::<MaxPoolHarness>(),
    HarnessEntry::of::<NanQuantileHarness>(),
    HarnessEntry::of::<MatMulHarness>(),
    HarnessEntry::of::<ConcatHarness>(),
    HarnessEntry::of::<ReshapeHarness>(),
    HarnessEntry::of::<SoftmaxHarness>(),
];

pub fn find(name: &str) -> Option<&'static HarnessEntry> {
    REGISTRY.iter().find(|entry| entry.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|entry| entry.name)
}

/// Runs the named registry harness; `None` if no harness has that name.
pub fn run_by_name(name: &str, data: &[u8]) -> Option<Outcome> {
    find(name).map(|entry| (entry.run)(data))
}
