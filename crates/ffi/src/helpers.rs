use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::{ptr, slice};

use flowviz_core::{EngineResult, Session};

use crate::error::{with_last_error_mut, DefaultFlowVizError, FlowVizError, FlowVizErrorCode};
use crate::instance::FlowVizSession;

/// Set the thread-local error message and code.
/// Internal helper for FFI functions to record failure details.
/// Accepts any type implementing `FlowVizError` trait.
pub(crate) fn set_last_error(error: &impl FlowVizError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl FlowVizError) -> FlowVizErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Internal helper called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = FlowVizErrorCode::Ok;
    });
}

/// Record the outcome of an operation: clear the error slot on success,
/// store the error on failure.
pub(crate) fn track_result<T>(result: Result<T, DefaultFlowVizError>) -> Result<T, FlowVizErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Collapse an operation result into a status code.
pub(crate) fn status(result: Result<(), DefaultFlowVizError>) -> FlowVizErrorCode {
    match track_result(result) {
        Ok(()) => FlowVizErrorCode::Ok,
        Err(code) => code,
    }
}

/// Borrow the session behind an FFI handle.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `flowviz_session_new`.
pub(crate) unsafe fn instance_ref<'a>(
    ptr: *const FlowVizSession,
) -> Result<&'a FlowVizSession, DefaultFlowVizError> {
    // SAFETY: caller guarantees the pointer is null or valid
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultFlowVizError::null_pointer("session"))
}

/// Run a read-only engine operation under the read lock.
///
/// # Safety
/// Same contract as [`instance_ref`].
pub(crate) unsafe fn with_session<T>(
    ptr: *const FlowVizSession,
    f: impl FnOnce(&Session) -> EngineResult<T>,
) -> Result<T, DefaultFlowVizError> {
    // SAFETY: forwarded from the caller
    let instance = unsafe { instance_ref(ptr) }?;
    let session = instance
        .session
        .read()
        .map_err(|_| DefaultFlowVizError::lock_poisoned("RwLock"))?;
    f(&session).map_err(DefaultFlowVizError::from)
}

/// Run a mutating engine operation under the write lock.
///
/// # Safety
/// Same contract as [`instance_ref`].
pub(crate) unsafe fn with_session_mut<T>(
    ptr: *const FlowVizSession,
    f: impl FnOnce(&mut Session) -> EngineResult<T>,
) -> Result<T, DefaultFlowVizError> {
    // SAFETY: forwarded from the caller
    let instance = unsafe { instance_ref(ptr) }?;
    let mut session = instance
        .session
        .write()
        .map_err(|_| DefaultFlowVizError::lock_poisoned("RwLock"))?;
    f(&mut session).map_err(DefaultFlowVizError::from)
}

/// Borrow a C string parameter as UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_from_ptr<'a>(
    ptr: *const c_char,
    param_name: &str,
) -> Result<&'a str, DefaultFlowVizError> {
    if ptr.is_null() {
        return Err(DefaultFlowVizError::null_pointer(param_name));
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| DefaultFlowVizError::invalid_utf8(param_name))
}

/// Borrow a `(pointer, length)` parameter as a slice.
///
/// A zero length is accepted with a null pointer.
///
/// # Safety
/// When `len > 0`, `ptr` must point to `len` readable elements that outlive `'a`.
pub(crate) unsafe fn slice_from_ptr<'a, T>(
    ptr: *const T,
    len: usize,
    param_name: &str,
) -> Result<&'a [T], DefaultFlowVizError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(DefaultFlowVizError::null_pointer(param_name));
    }
    // SAFETY: non-null with `len` elements per the caller's contract
    Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

/// Run `f` and store its value through the out-parameter `out`.
///
/// `out` is checked before `f` runs. On failure `out` receives
/// `T::default()` (an empty buffer, zero), so callers may free it
/// unconditionally.
///
/// # Safety
/// `out` must be null or valid for writes of `T`.
pub(crate) unsafe fn write_result<T: Default>(
    out: *mut T,
    param_name: &str,
    f: impl FnOnce() -> Result<T, DefaultFlowVizError>,
) -> FlowVizErrorCode {
    if out.is_null() {
        return track_error(&DefaultFlowVizError::null_pointer(param_name));
    }
    let (value, code) = match track_result(f()) {
        Ok(value) => (value, FlowVizErrorCode::Ok),
        Err(code) => (T::default(), code),
    };
    // SAFETY: non-null and writable per the caller's contract
    unsafe { out.write(value) };
    code
}

/// Hand a vector to the caller as a raw `(pointer, length)` pair.
///
/// Ownership moves to the caller, who must give it back through
/// [`free_raw_parts`].
pub(crate) fn into_raw_parts<T>(values: Vec<T>) -> (*mut T, usize) {
    if values.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let boxed = values.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed).cast::<T>(), len)
}

/// Reclaim a buffer produced by [`into_raw_parts`].
///
/// # Safety
/// `(data, len)` must come from `into_raw_parts` and not have been freed.
pub(crate) unsafe fn free_raw_parts<T>(data: *mut T, len: usize) {
    if data.is_null() {
        return;
    }
    // SAFETY: the pair was produced by `Box::into_raw` on a boxed slice of `len`
    unsafe {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
    }
}
