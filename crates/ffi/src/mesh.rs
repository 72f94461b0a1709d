use std::os::raw::c_char;

use flowviz_core::{EngineError, EngineResult, MeshEngine, RegionClassifier};

use crate::buffers::{FlowVizBytes, FlowVizF64Buffer};
use crate::error::FlowVizErrorCode;
use crate::helpers::{
    slice_from_ptr, status, str_from_ptr, with_session, with_session_mut, write_result,
};
use crate::instance::FlowVizSession;

/// Replace the active grid with an encoded unstructured grid.
///
/// All derived representations and the render state are dropped. On failure
/// the previous grid is kept.
///
/// Returns
/// - `FlowVizErrorCode::Ok` — `out_cell_count` holds the new cell count
/// - `FlowVizErrorCode::Decode` / `InvalidGrid` — the buffer was rejected
///
/// # Safety
/// - `session` must be a live session handle.
/// - `bytes` must point to `len` readable bytes.
/// - `out_cell_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flowviz_load(
    session: *const FlowVizSession,
    bytes: *const u8,
    len: usize,
    out_cell_count: *mut usize,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_cell_count, "out_cell_count", || {
            let bytes = slice_from_ptr(bytes, len, "bytes")?;
            with_session_mut(session, |s| s.load(bytes))
        })
    }
}

/// Encode the active grid, including arrays added since it was loaded.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_export_current(
    session: *const FlowVizSession,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            with_session(session, MeshEngine::export_current).map(FlowVizBytes::from)
        })
    }
}

/// Number of cells in the active grid.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flowviz_cell_count(
    session: *const FlowVizSession,
    out_count: *mut usize,
) -> FlowVizErrorCode {
    unsafe { write_result(out_count, "out_count", || with_session(session, |s| Ok(s.cell_count()))) }
}

/// Number of points in the active grid.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flowviz_point_count(
    session: *const FlowVizSession,
    out_count: *mut usize,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_count, "out_count", || with_session(session, |s| Ok(s.point_count())))
    }
}

/// Copy `len` values into the vector scratch buffer.
///
/// The buffer is channel-stacked: component `c` of cell `i` goes at
/// `i + c * cell_count`. `len` must equal `3 * cell_count`.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `data` must point to `len` readable doubles.
#[no_mangle]
pub unsafe extern "C" fn flowviz_set_field_vector(
    session: *const FlowVizSession,
    data: *const f64,
    len: usize,
) -> FlowVizErrorCode {
    status(unsafe {
        slice_from_ptr(data, len, "data").and_then(|values| {
            with_session_mut(session, |s| copy_scratch(s.field_vector_mut(), values))
        })
    })
}

/// Copy `len` values into the scalar scratch buffer (`len == cell_count`).
///
/// # Safety
/// - `session` must be a live session handle.
/// - `data` must point to `len` readable doubles.
#[no_mangle]
pub unsafe extern "C" fn flowviz_set_field_scalar(
    session: *const FlowVizSession,
    data: *const f64,
    len: usize,
) -> FlowVizErrorCode {
    status(unsafe {
        slice_from_ptr(data, len, "data").and_then(|values| {
            with_session_mut(session, |s| copy_scratch(s.field_scalar_mut(), values))
        })
    })
}

fn copy_scratch(scratch: &mut [f64], values: &[f64]) -> EngineResult<()> {
    if scratch.len() != values.len() {
        return Err(EngineError::invalid_argument(
            "len",
            format!("expected {} values, got {}", scratch.len(), values.len()),
        ));
    }
    scratch.copy_from_slice(values);
    Ok(())
}

/// Build the cell array `name` from the scratch buffers and refresh point data.
///
/// `components` is 1 (scalar buffer), 2 or 3 (vector buffer).
///
/// # Safety
/// - `session` must be a live session handle.
/// - `name` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flowviz_update_field(
    session: *const FlowVizSession,
    name: *const c_char,
    components: usize,
) -> FlowVizErrorCode {
    status(unsafe {
        str_from_ptr(name, "name")
            .and_then(|name| with_session_mut(session, |s| s.update_field(name, components)))
    })
}

/// Append `vorticity` and/or `gradients` point arrays computed from `U`.
///
/// # Safety
/// `session` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn flowviz_compute_gradients(
    session: *const FlowVizSession,
    include_vorticity: bool,
    include_gradients: bool,
) -> FlowVizErrorCode {
    status(unsafe {
        with_session_mut(session, |s| s.compute_gradients(include_vorticity, include_gradients))
    })
}

/// Classify cells against an encoded surface.
///
/// `out_values` receives `[sdf(N), flowRegion(N), sdf2(N)]` with the flow
/// region zeroed below the surface. The grid's own `flowRegion` is unchanged.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `surface` must point to `len` readable bytes.
/// - `out_values` must be valid for writes; release it with `flowviz_f64_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_compute_distance_and_region(
    session: *const FlowVizSession,
    surface: *const u8,
    len: usize,
    out_values: *mut FlowVizF64Buffer,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_values, "out_values", || {
            let surface = slice_from_ptr(surface, len, "surface")?;
            with_session_mut(session, |s| s.compute_distance_and_region(surface))
                .map(FlowVizF64Buffer::from)
        })
    }
}

/// Convert an ASCII or binary STL file to encoded polygon data.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `bytes` must point to `len` readable bytes.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_stl_to_polydata(
    session: *const FlowVizSession,
    bytes: *const u8,
    len: usize,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            let bytes = slice_from_ptr(bytes, len, "bytes")?;
            with_session(session, |s| s.stl_to_polydata(bytes)).map(FlowVizBytes::from)
        })
    }
}
