//! FFI bindings for the GT3X converter
//!
//! This module provides C-compatible functions for calling the converter from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `gt3x_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::pipeline::{read_metadata, Converter, DeviceInfo};
use crate::types::ConvertOptions;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a result, or record its error and return NULL
fn json_or_null<T: serde::Serialize, E: std::fmt::Display>(result: Result<T, E>) -> *mut c_char {
    let value = match result {
        Ok(value) => value,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    match serde_json::to_string(&value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert a `.gt3x` file and return the conversion summary as JSON.
///
/// # Safety
/// - `input` and `output_dir` must be valid null-terminated C strings.
/// - `options_json` may be NULL (defaults) or a JSON object of conversion options.
/// - Returns a newly allocated string that must be freed with `gt3x_free_string`.
/// - Returns NULL on error; call `gt3x_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gt3x_convert_file(
    input: *const c_char,
    output_dir: *const c_char,
    options_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let input = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid input path pointer");
            return ptr::null_mut();
        }
    };

    let output_dir = match cstr_to_string(output_dir) {
        Some(s) => s,
        None => {
            set_last_error("Invalid output directory pointer");
            return ptr::null_mut();
        }
    };

    let options = if options_json.is_null() {
        ConvertOptions::default()
    } else {
        let json = match cstr_to_string(options_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid options string pointer");
                return ptr::null_mut();
            }
        };
        match ConvertOptions::from_json(&json) {
            Ok(options) => options,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    json_or_null(Converter::new(options).convert_file(Path::new(&input), Path::new(&output_dir)))
}

/// Read a recording's metadata and return it as JSON.
///
/// # Safety
/// - `input` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `gt3x_free_string`.
/// - Returns NULL on error; call `gt3x_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gt3x_read_metadata(input: *const c_char) -> *mut c_char {
    clear_last_error();

    let input = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid input path pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(
        read_metadata(Path::new(&input))
            .map(|(metadata, variant)| DeviceInfo::new(metadata, variant)),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by converter functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `gt3x_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gt3x_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next converter call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn gt3x_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn gt3x_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
