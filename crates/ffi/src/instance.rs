use std::os::raw::c_char;
use std::ptr;
use std::sync::RwLock;

use flowviz_core::{EngineConfig, JsonCodec, Session};

use crate::error::{DefaultFlowVizError, FlowVizErrorCode};
use crate::helpers::{clear_last_error, str_from_ptr, track_error, track_result};

/// A post-processing session handle.
/// Holds one active mesh and every representation derived from it.
///
/// # Thread Safety
/// `FlowVizSession` can be shared across threads. The session is protected
/// by an `RwLock`:
/// - **Queries** (probe, integrate, scalar bar range, exports): `.read()` lock
/// - **Mutations** (load, cut, trace, render, field updates): `.write()` lock
///
/// # Usage
/// ```c
/// FlowVizSession* session = NULL;
/// if (flowviz_session_new(&session) != Ok) {
///     fprintf(stderr, "%s\n", flowviz_get_last_error());
///     return;
/// }
/// size_t cells = 0;
/// flowviz_load(session, grid_bytes, grid_len, &cells);
/// // ... cut, trace, render ...
/// flowviz_session_destroy(session);
/// ```
pub struct FlowVizSession {
    pub(crate) session: RwLock<Session>,
}

impl FlowVizSession {
    /// Creates a session with the default configuration.
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            session: RwLock::new(Session::new()),
        })
    }

    /// Creates a session from a (possibly partial) JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `FlowVizErrorCode::Decode` for malformed JSON and
    /// `FlowVizErrorCode::InvalidParameter` for out-of-range settings.
    pub(crate) fn with_config(config_json: &str) -> Result<Box<Self>, DefaultFlowVizError> {
        let config = EngineConfig::from_json(config_json)?;
        let session = Session::with_config(config, Box::new(JsonCodec::new()))?;
        Ok(Box::new(Self {
            session: RwLock::new(session),
        }))
    }
}

/// Create a new session with the default configuration.
///
/// Returns
/// - `FlowVizErrorCode::Ok` (0) — success, `out_session` contains valid pointer
/// - `FlowVizErrorCode::NullPointer` — `out_session` is null
///
/// # Safety
///
/// - `out_session` must be a valid, non-null pointer to writable memory.
/// - The caller takes ownership of the returned session and MUST call
///   `flowviz_session_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn flowviz_session_new(
    out_session: *mut *mut FlowVizSession,
) -> FlowVizErrorCode {
    if out_session.is_null() {
        return track_error(&DefaultFlowVizError::null_pointer("out_session"));
    }
    clear_last_error();
    unsafe {
        *out_session = Box::into_raw(FlowVizSession::new());
    }
    FlowVizErrorCode::Ok
}

/// Create a new session from a JSON configuration document.
///
/// Missing settings take their defaults, so `"{}"` is equivalent to
/// `flowviz_session_new`.
///
/// Returns
/// - `FlowVizErrorCode::Ok` (0) — success, `out_session` contains valid pointer
/// - `FlowVizErrorCode::NullPointer` — `config_json` or `out_session` is null
/// - `FlowVizErrorCode::Decode` — `config_json` is not valid JSON
/// - `FlowVizErrorCode::InvalidParameter` — a setting is out of range
///
/// On failure `out_session` is set to null.
///
/// # Safety
///
/// - `config_json` must be a NUL-terminated string.
/// - `out_session` must be a valid, non-null pointer to writable memory.
/// - The caller MUST call `flowviz_session_destroy` exactly once on success.
#[no_mangle]
pub unsafe extern "C" fn flowviz_session_new_with_config(
    config_json: *const c_char,
    out_session: *mut *mut FlowVizSession,
) -> FlowVizErrorCode {
    if out_session.is_null() {
        return track_error(&DefaultFlowVizError::null_pointer("out_session"));
    }
    // SAFETY: forwarded from the caller
    let result = unsafe { str_from_ptr(config_json, "config_json") }
        .and_then(FlowVizSession::with_config);

    match track_result(result) {
        Ok(instance) => {
            unsafe {
                *out_session = Box::into_raw(instance);
            }
            FlowVizErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                // Set to null on error (per documentation contract)
                *out_session = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys a session previously created by `flowviz_session_new`.
///
/// If `session` is null, this function is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `flowviz_session_new` or
///   `flowviz_session_new_with_config`.
/// - The pointer MUST NOT have been freed already.
/// - After calling this function, the caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn flowviz_session_destroy(session: *mut FlowVizSession) {
    if session.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in one of the
    // constructors and has not been freed.
    unsafe {
        drop(Box::from_raw(session));
    }
}
