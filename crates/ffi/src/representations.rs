use std::os::raw::c_char;

use flowviz_core::{MeshEngine, RenderRequest};

use crate::buffers::{FlowVizBytes, FlowVizF32Buffer, FlowVizStreamlineParams, FlowVizVec3};
use crate::error::{DefaultFlowVizError, FlowVizErrorCode};
use crate::helpers::{status, str_from_ptr, with_session, with_session_mut, write_result};
use crate::instance::FlowVizSession;

/// Extract the boundary surface and make it the active representation.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_polygons` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flowviz_extract_surface(
    session: *const FlowVizSession,
    out_polygons: *mut usize,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_polygons, "out_polygons", || {
            with_session_mut(session, |s| Ok(s.extract_surface()))
        })
    }
}

/// Encode the boundary surface without changing the active representation.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_surface_to_polydata(
    session: *const FlowVizSession,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            with_session(session, MeshEngine::surface_to_polydata).map(FlowVizBytes::from)
        })
    }
}

/// Cut the grid with a plane. The cut becomes the active representation.
///
/// Returns `FlowVizErrorCode::InvalidParameter` for a zero normal. A plane
/// that misses the grid yields empty polygon data.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_cut(
    session: *const FlowVizSession,
    origin: FlowVizVec3,
    normal: FlowVizVec3,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            with_session_mut(session, |s| s.cut(origin.point(), normal.vector()))
                .map(FlowVizBytes::from)
        })
    }
}

/// Trace streamline tubes from a seed sphere. The tubes become the active
/// representation.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `params` must point to a valid `FlowVizStreamlineParams` whose `field`
///   is a NUL-terminated string.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_trace(
    session: *const FlowVizSession,
    params: *const FlowVizStreamlineParams,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            let params = params
                .as_ref()
                .ok_or_else(|| DefaultFlowVizError::null_pointer("params"))?
                .to_params()?;
            with_session_mut(session, |s| s.trace(&params)).map(FlowVizBytes::from)
        })
    }
}

/// Map a point field of a representation to RGBA colors.
///
/// `component` is `"surface"`, `"plane"` or `"streamlines"`. A
/// `component_index` of -1 maps the magnitude; `min == max == 0` maps over
/// the field's own range. `out_colors` receives four floats per point.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `component` and `field` must be NUL-terminated strings.
/// - `out_colors` must be valid for writes; release it with `flowviz_f32_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_render(
    session: *const FlowVizSession,
    component: *const c_char,
    field: *const c_char,
    component_index: i32,
    min: f64,
    max: f64,
    out_colors: *mut FlowVizF32Buffer,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_colors, "out_colors", || {
            let request = RenderRequest {
                component: str_from_ptr(component, "component")?.to_owned(),
                field: str_from_ptr(field, "field")?.to_owned(),
                component_index,
                min,
                max,
            };
            with_session_mut(session, |s| s.render(&request)).map(FlowVizF32Buffer::from)
        })
    }
}

/// Drop the render state.
///
/// # Safety
/// `session` must be a live session handle.
#[no_mangle]
pub unsafe extern "C" fn flowviz_clear_scene(session: *const FlowVizSession) -> FlowVizErrorCode {
    status(unsafe {
        with_session_mut(session, |s| {
            s.clear_scene();
            Ok(())
        })
    })
}

/// Export the active representation as a self-contained glTF document.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_bytes` must be valid for writes; release it with `flowviz_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_export_scene(
    session: *const FlowVizSession,
    out_bytes: *mut FlowVizBytes,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_bytes, "out_bytes", || {
            with_session(session, MeshEngine::export_scene).map(FlowVizBytes::from)
        })
    }
}
