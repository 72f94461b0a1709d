use std::os::raw::c_char;
use std::ptr;

use flowviz_core::{Point, StreamlineParams, Vec3};

use crate::error::DefaultFlowVizError;
use crate::helpers::{free_raw_parts, into_raw_parts, str_from_ptr};

#[repr(C)]
/// Owned byte buffer returned to the caller (encoded polygon data, grids,
/// glTF documents).
///
/// Release with `flowviz_bytes_free`. An empty buffer has a null `data`.
pub struct FlowVizBytes {
    /// Start of the buffer, or null when empty.
    pub data: *mut u8,
    /// Number of bytes.
    pub len: usize,
}

#[repr(C)]
/// Owned `double` buffer returned to the caller. Release with `flowviz_f64_free`.
pub struct FlowVizF64Buffer {
    /// Start of the buffer, or null when empty.
    pub data: *mut f64,
    /// Number of values.
    pub len: usize,
}

#[repr(C)]
/// Owned `float` buffer returned to the caller (RGBA colors).
/// Release with `flowviz_f32_free`.
pub struct FlowVizF32Buffer {
    /// Start of the buffer, or null when empty.
    pub data: *mut f32,
    /// Number of values.
    pub len: usize,
}

macro_rules! owned_buffer {
    ($name:ident, $elem:ty) => {
        impl Default for $name {
            fn default() -> Self {
                Self {
                    data: ptr::null_mut(),
                    len: 0,
                }
            }
        }

        impl From<Vec<$elem>> for $name {
            fn from(values: Vec<$elem>) -> Self {
                let (data, len) = into_raw_parts(values);
                Self { data, len }
            }
        }
    };
}

owned_buffer!(FlowVizBytes, u8);
owned_buffer!(FlowVizF64Buffer, f64);
owned_buffer!(FlowVizF32Buffer, f32);

/// Free a byte buffer returned by a flowviz function.
///
/// Freeing an empty buffer is a no-op.
///
/// # Safety
/// `buffer` must come from a flowviz function and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn flowviz_bytes_free(buffer: FlowVizBytes) {
    // SAFETY: produced by `into_raw_parts` per the caller's contract
    unsafe { free_raw_parts(buffer.data, buffer.len) }
}

/// Free a `double` buffer returned by a flowviz function.
///
/// # Safety
/// `buffer` must come from a flowviz function and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn flowviz_f64_free(buffer: FlowVizF64Buffer) {
    // SAFETY: produced by `into_raw_parts` per the caller's contract
    unsafe { free_raw_parts(buffer.data, buffer.len) }
}

/// Free a `float` buffer returned by a flowviz function.
///
/// # Safety
/// `buffer` must come from a flowviz function and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn flowviz_f32_free(buffer: FlowVizF32Buffer) {
    // SAFETY: produced by `into_raw_parts` per the caller's contract
    unsafe { free_raw_parts(buffer.data, buffer.len) }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Three doubles: a point or a direction.
pub struct FlowVizVec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FlowVizVec3 {
    pub(crate) fn point(self) -> Point {
        Point::new(self.x, self.y, self.z)
    }

    pub(crate) fn vector(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[repr(C)]
/// Streamline request. `field` is a NUL-terminated point array name.
pub struct FlowVizStreamlineParams {
    /// Center of the seed sphere.
    pub center: FlowVizVec3,
    /// Radius of the seed sphere.
    pub radius: f64,
    /// Maximum arclength per streamline.
    pub max_length: f64,
    /// Base tube radius.
    pub tube_radius: f64,
    /// Sides of the tube cross-section (>= 3).
    pub tube_sides: usize,
    /// Seed sphere resolution (>= 3).
    pub resolution: usize,
    /// Vector array to follow.
    pub field: *const c_char,
}

impl FlowVizStreamlineParams {
    /// Copy into the engine's parameter type.
    ///
    /// # Safety
    /// `field` must be null or a NUL-terminated string.
    pub(crate) unsafe fn to_params(&self) -> Result<StreamlineParams, DefaultFlowVizError> {
        // SAFETY: forwarded from the caller
        let field = unsafe { str_from_ptr(self.field, "field") }?;
        Ok(StreamlineParams {
            center: self.center.point(),
            radius: self.radius,
            max_length: self.max_length,
            tube_radius: self.tube_radius,
            tube_sides: self.tube_sides,
            resolution: self.resolution,
            field: field.to_owned(),
        })
    }
}
