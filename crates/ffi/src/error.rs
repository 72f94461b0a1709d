use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use flowviz_core::EngineError;

/// Common interface for FFI error types.
///
/// This trait provides a unified way to handle errors across the FFI boundary,
/// allowing both simple error codes and custom error messages.
///
/// # Design
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait FlowVizError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> FlowVizErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `FlowVizError` for FFI and engine failures.
///
/// Wraps a `FlowVizErrorCode` with a message. Engine errors convert into it
/// with their `Display` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultFlowVizError {
    code: FlowVizErrorCode,
    msg: String,
}

impl DefaultFlowVizError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_session"`, `"bytes"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: FlowVizErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned (e.g., `"RwLock"`)
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: FlowVizErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for invalid parameter.
    ///
    /// # Arguments
    /// * `message` - Description of the error
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: FlowVizErrorCode::InvalidParameter,
            msg: message,
        }
    }

    /// Create error for a C string that is not valid UTF-8.
    ///
    /// # Arguments
    /// * `param_name` - The name of the string parameter
    pub fn invalid_utf8(param_name: &str) -> Self {
        Self::invalid_parameter(format!("Parameter '{param_name}' is not valid UTF-8"))
    }
}

impl FlowVizError for DefaultFlowVizError {
    fn code(&self) -> FlowVizErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<EngineError> for DefaultFlowVizError {
    fn from(error: EngineError) -> Self {
        let code = match &error {
            EngineError::Decode { .. } => FlowVizErrorCode::Decode,
            EngineError::Encode { .. } => FlowVizErrorCode::Encode,
            EngineError::InvalidGrid(_) => FlowVizErrorCode::InvalidGrid,
            EngineError::MissingField { .. } => FlowVizErrorCode::MissingField,
            EngineError::MissingRepresentation(_) | EngineError::NoActiveRepresentation => {
                FlowVizErrorCode::MissingRepresentation
            }
            EngineError::InvalidArgument { .. } => FlowVizErrorCode::InvalidParameter,
            EngineError::DegenerateExtent { .. } => FlowVizErrorCode::DegenerateExtent,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by flowviz functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowVizErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter: unknown enum string, out-of-range index, bad sizes.
    InvalidParameter = 3,

    /// Input buffer could not be decoded (grid, polygon data, STL, config).
    Decode = 4,

    /// Output could not be encoded.
    Encode = 5,

    /// Decoded grid has inconsistent connectivity or array sizes.
    InvalidGrid = 6,

    /// Requested field array does not exist.
    MissingField = 7,

    /// Requested representation (surface, plane, streamlines) has not been produced.
    MissingRepresentation = 8,

    /// Integration volume or area is too small to average over.
    DegenerateExtent = 9,
}

impl From<DefaultFlowVizError> for FlowVizErrorCode {
    fn from(error: DefaultFlowVizError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored to prevent memory leaks when returning raw pointers via FFI.
    static LAST_ERROR: RefCell<(Option<CString>, FlowVizErrorCode)> = const { RefCell::new((None, FlowVizErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, FlowVizErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, FlowVizErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call succeeded or the message cannot be converted to a C string.
///
/// # Thread Safety
/// Error messages are stored per-thread (thread-local storage), so this is thread-safe.
///
/// # Lifetime
/// The returned pointer is valid until the next flowviz call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// FlowVizBytes out;
/// if (flowviz_cut(session, origin, normal, &out) != Ok) {
///     const char* error = flowviz_get_last_error();
///     if (error) {
///         printf("Cut failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn flowviz_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `FlowVizErrorCode::Ok` (0) if the last call on this thread succeeded.
#[no_mangle]
pub extern "C" fn flowviz_get_last_error_code() -> FlowVizErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
