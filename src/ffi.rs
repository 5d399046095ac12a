//! FFI bindings for the screen feature extractor
//!
//! C-compatible functions for calling the extractor from other languages.
//! All functions take null-terminated C strings and return allocated memory
//! that must be freed by the caller using `screen_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{screen_features_to_json, ScreenProcessor};

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

/// Convert a C string to an owned Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read the table arguments shared by the extraction entry points.
///
/// `features` may be NULL (all features); the tables may not.
unsafe fn read_arguments(
    screen: *const c_char,
    battery: *const c_char,
    features: *const c_char,
) -> Option<(String, String, Option<String>)> {
    let Some(screen) = cstr_to_string(screen) else {
        set_last_error("Invalid screen table string pointer");
        return None;
    };
    let Some(battery) = cstr_to_string(battery) else {
        set_last_error("Invalid battery table string pointer");
        return None;
    };
    let features = if features.is_null() {
        None
    } else {
        match cstr_to_string(features) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid feature selection string pointer");
                return None;
            }
        }
    };
    Some((screen, battery, features))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute screen features and return a JSON report.
///
/// # Safety
/// - `screen` and `battery` must be valid null-terminated C strings holding JSON arrays.
/// - `features` must be NULL (compute everything) or a JSON mapping of
///   feature name to configuration.
/// - Returns a newly allocated string that must be freed with `screen_free_string`.
/// - Returns NULL on error; call `screen_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn screen_extract_features(
    screen: *const c_char,
    battery: *const c_char,
    features: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some((screen, battery, features)) = read_arguments(screen, battery, features) else {
        return ptr::null_mut();
    };

    match screen_features_to_json(&screen, &battery, features.as_deref()) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a ScreenProcessor
pub struct ScreenProcessorHandle {
    processor: ScreenProcessor,
}

/// Create a processor. A non-zero `memoize` shares the prepared timeline
/// between features that use the same column configuration.
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `screen_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn screen_processor_new(memoize: i32) -> *mut ScreenProcessorHandle {
    clear_last_error();

    let processor = if memoize != 0 {
        ScreenProcessor::with_memoization()
    } else {
        ScreenProcessor::new()
    };
    Box::into_raw(Box::new(ScreenProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `screen_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn screen_processor_free(processor: *mut ScreenProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Compute screen features with a processor and return a JSON report.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `screen_processor_new`.
/// - Arguments follow `screen_extract_features`.
/// - Returns a newly allocated string that must be freed with `screen_free_string`.
/// - Returns NULL on error; call `screen_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn screen_processor_extract(
    processor: *const ScreenProcessorHandle,
    screen: *const c_char,
    battery: *const c_char,
    features: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some((screen, battery, features)) = read_arguments(screen, battery, features) else {
        return ptr::null_mut();
    };

    match handle
        .processor
        .extract_json(&screen, &battery, features.as_deref())
    {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by an extraction function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by this library, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn screen_free_string(ptr: *mut c_char) {
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
/// - The pointer is valid until the next call into this library on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn screen_last_error() -> *const c_char {
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
pub unsafe extern "C" fn screen_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
