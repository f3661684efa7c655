use lazy_static::lazy_static;
use libc::{c_char, c_int, size_t};
use std::ffi::{CStr, CString};
use std::ptr;
use std::slice;

use crate::harnesses::{self, REGISTRY};

// --- Registry names ---

lazy_static! {
    /// NUL-terminated copies of the registry names, indexed like `REGISTRY`.
    static ref HARNESS_NAMES: Vec<CString> = REGISTRY
        .iter()
        .filter_map(|entry| CString::new(entry.name).ok())
        .collect();
}

/// Borrows `size` bytes at `data`; null or zero-sized input is empty.
///
/// # Safety
/// A non-null `data` must point to `size` readable bytes for `'a`.
unsafe fn input_slice<'a>(data: *const u8, size: size_t) -> &'a [u8] {
    if data.is_null() || size == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, size) }
    }
}

// --- Entry points ---

/// Runs the registry harness called `name` on one input.
///
/// Returns `0` when the input was processed and `-1` when a bug was found,
/// the name is null, not UTF-8, or unknown.
///
/// # Safety
/// `name` must be null or a valid C string; a non-null `data` must point to
/// `size` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn opfuzz_run(name: *const c_char, data: *const u8, size: size_t) -> c_int {
    if name.is_null() {
        return -1;
    }
    let Ok(name) = (unsafe { CStr::from_ptr(name) }).to_str() else {
        return -1;
    };
    match harnesses::find(name) {
        Some(entry) => (entry.fuzz_one_input)(unsafe { input_slice(data, size) }),
        None => {
            tracing::warn!(name, "unknown harness");
            -1
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn opfuzz_harness_count() -> size_t {
    HARNESS_NAMES.len()
}

/// Name of the harness at `index`, or null when out of range.
///
/// The string is owned by the library and valid for the process lifetime.
#[unsafe(no_mangle)]
pub extern "C" fn opfuzz_harness_name(index: size_t) -> *const c_char {
    HARNESS_NAMES.get(index).map_or(ptr::null(), |name| name.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_registry_order() {
        assert_eq!(opfuzz_harness_count(), REGISTRY.len());
        for (i, entry) in REGISTRY.iter().enumerate() {
            let name = unsafe { CStr::from_ptr(opfuzz_harness_name(i)) };
            assert_eq!(name.to_str().unwrap(), entry.name);
        }
        assert!(opfuzz_harness_name(REGISTRY.len()).is_null());
    }

    #[test]
    fn run_handles_null_and_unknown() {
        let name = CString::new("softmax").unwrap();
        let unknown = CString::new("conv3d").unwrap();
        unsafe {
            assert_eq!(opfuzz_run(ptr::null(), ptr::null(), 0), -1);
            assert_eq!(opfuzz_run(unknown.as_ptr(), ptr::null(), 0), -1);
            assert_eq!(opfuzz_run(name.as_ptr(), ptr::null(), 16), 0);
            let data = [0u8, 1, 2, 0, 0, 0, 0, 0, 0, 0];
            assert_eq!(opfuzz_run(name.as_ptr(), data.as_ptr(), data.len()), 0);
        }
    }
}
