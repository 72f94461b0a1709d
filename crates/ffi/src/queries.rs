use std::os::raw::c_char;

use flowviz_core::MeshEngine;

use crate::buffers::{FlowVizF64Buffer, FlowVizVec3};
use crate::error::FlowVizErrorCode;
use crate::helpers::{str_from_ptr, with_session, write_result};
use crate::instance::FlowVizSession;

/// Interpolate a field at a point.
///
/// `out_values` receives `[v0, v1, v2, |v|]`; all four are NaN when the
/// point lies outside the grid. Fields with fewer than three components
/// are padded with zeros.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `field` must be a NUL-terminated string.
/// - `out_values` must be valid for writes of four doubles.
#[no_mangle]
pub unsafe extern "C" fn flowviz_probe(
    session: *const FlowVizSession,
    field: *const c_char,
    point: FlowVizVec3,
    out_values: *mut [f64; 4],
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_values, "out_values", || {
            let field = str_from_ptr(field, "field")?;
            with_session(session, |s| s.probe(field, &point.point()))
        })
    }
}

/// Extent-averaged integral of a field.
///
/// `target` is `"grid"` (volume) or `"component"` (active representation).
/// `out_values` receives `[extent, mean...]` with a trailing magnitude for
/// fields of three or more components.
///
/// # Safety
/// - `session` must be a live session handle.
/// - `field` and `target` must be NUL-terminated strings.
/// - `out_values` must be valid for writes; release it with `flowviz_f64_free`.
#[no_mangle]
pub unsafe extern "C" fn flowviz_integrate(
    session: *const FlowVizSession,
    field: *const c_char,
    target: *const c_char,
    out_values: *mut FlowVizF64Buffer,
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_values, "out_values", || {
            let field = str_from_ptr(field, "field")?;
            let target = str_from_ptr(target, "target")?;
            with_session(session, |s| s.integrate(field, target)).map(FlowVizF64Buffer::from)
        })
    }
}

/// Range of the last rendered field for a component mode (-1 = magnitude).
///
/// # Safety
/// - `session` must be a live session handle.
/// - `out_range` must be valid for writes of two doubles.
#[no_mangle]
pub unsafe extern "C" fn flowviz_scalar_bar_range(
    session: *const FlowVizSession,
    component_index: i32,
    out_range: *mut [f64; 2],
) -> FlowVizErrorCode {
    unsafe {
        write_result(out_range, "out_range", || {
            with_session(session, |s| s.scalar_bar_range(component_index))
        })
    }
}
