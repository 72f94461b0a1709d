//! glTF 2.0 scene export
//!
//! One mesh with a single triangle primitive. All binary data lives in one
//! buffer embedded as a base64 data URI, so the document is self-contained.
//!
//! Buffer layout: positions (f32 x3), then colors (f32 x4, optional), then
//! indices (u32). Every section is 4-byte aligned by construction.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::grid::PolyData;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;

fn encode_error(message: impl Into<String>) -> EngineError {
    EngineError::Encode {
        what: "scene",
        message: message.into(),
    }
}

/// Export `poly` as a glTF JSON document.
///
/// # Arguments
///
/// * `poly` - Representation to export; polygons are fan-triangulated
/// * `colors` - Optional RGBA per point (`4 * points` values in `0..=1`)
pub fn export_gltf(poly: &PolyData, colors: Option<&[f32]>) -> EngineResult<Vec<u8>> {
    let indices: Vec<u32> = poly.triangles().flatten().collect();

    let document = if indices.is_empty() {
        json!({
            "asset": { "version": "2.0", "generator": "flowviz" },
            "scene": 0,
            "scenes": [{ "nodes": [] }],
        })
    } else {
        if let Some(colors) = colors {
            if colors.len() != 4 * poly.point_count() {
                return Err(encode_error(format!(
                    "{} color values for {} points",
                    colors.len(),
                    poly.point_count()
                )));
            }
        }
        build_document(poly, colors, &indices)
    };

    let bytes = serde_json::to_vec(&document).map_err(|e| encode_error(e.to_string()))?;
    info!(
        "Exported scene: {} points, {} triangles, {} bytes",
        poly.point_count(),
        indices.len() / 3,
        bytes.len()
    );
    Ok(bytes)
}

fn build_document(poly: &PolyData, colors: Option<&[f32]>, indices: &[u32]) -> Value {
    let positions: Vec<f32> = poly
        .points
        .iter()
        .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect();
    let bounds = poly.bounds();
    let min = bounds.min.coords.map(|c| c as f32);
    let max = bounds.max.coords.map(|c| c as f32);

    let mut buffer: Vec<u8> = Vec::new();
    let mut views = Vec::new();
    let mut accessors = Vec::new();
    let mut attributes = serde_json::Map::new();

    let mut push_view = |buffer: &mut Vec<u8>, bytes: &[u8], target: u32| -> usize {
        views.push(json!({
            "buffer": 0,
            "byteOffset": buffer.len(),
            "byteLength": bytes.len(),
            "target": target,
        }));
        buffer.extend_from_slice(bytes);
        views.len() - 1
    };

    let view = push_view(&mut buffer, bytemuck::cast_slice(&positions), ARRAY_BUFFER);
    accessors.push(json!({
        "bufferView": view,
        "componentType": FLOAT,
        "count": poly.point_count(),
        "type": "VEC3",
        "min": [min.x, min.y, min.z],
        "max": [max.x, max.y, max.z],
    }));
    attributes.insert("POSITION".into(), json!(accessors.len() - 1));

    if let Some(colors) = colors {
        let view = push_view(&mut buffer, bytemuck::cast_slice(colors), ARRAY_BUFFER);
        accessors.push(json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": poly.point_count(),
            "type": "VEC4",
        }));
        attributes.insert("COLOR_0".into(), json!(accessors.len() - 1));
    }

    let view = push_view(&mut buffer, bytemuck::cast_slice(indices), ELEMENT_ARRAY_BUFFER);
    accessors.push(json!({
        "bufferView": view,
        "componentType": UNSIGNED_INT,
        "count": indices.len(),
        "type": "SCALAR",
    }));
    let index_accessor = accessors.len() - 1;

    json!({
        "asset": { "version": "2.0", "generator": "flowviz" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": attributes,
                "indices": index_accessor,
                "mode": TRIANGLES,
            }]
        }],
        "accessors": accessors,
        "bufferViews": views,
        "buffers": [{
            "byteLength": buffer.len(),
            "uri": format!("data:application/octet-stream;base64,{}", BASE64.encode(&buffer)),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Point;

    fn quad() -> PolyData {
        PolyData {
            points: vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 2.0, 0.0),
                Point::new(0.0, 2.0, 0.0),
            ],
            polys: vec![vec![0, 1, 2, 3]],
            ..PolyData::default()
        }
    }

    fn decode_buffer(doc: &Value) -> Vec<u8> {
        let uri = doc["buffers"][0]["uri"].as_str().unwrap();
        let data = uri.strip_prefix("data:application/octet-stream;base64,").unwrap();
        BASE64.decode(data).unwrap()
    }

    #[test]
    fn test_uncolored_quad() {
        let bytes = export_gltf(&quad(), None).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["asset"]["version"], "2.0");
        let primitive = &doc["meshes"][0]["primitives"][0];
        assert!(primitive["attributes"].get("COLOR_0").is_none());
        assert_eq!(doc["accessors"][0]["max"], json!([1.0, 2.0, 0.0]));

        let buffer = decode_buffer(&doc);
        assert_eq!(buffer.len(), 4 * 12 + 6 * 4);
        let index_bytes = &buffer[48..];
        let indices: Vec<u32> = index_bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_colored_quad() {
        let colors = vec![1.0f32; 16];
        let doc: Value = serde_json::from_slice(&export_gltf(&quad(), Some(&colors)).unwrap()).unwrap();
        let primitive = &doc["meshes"][0]["primitives"][0];
        assert_eq!(primitive["attributes"]["COLOR_0"], 1);
        assert_eq!(primitive["indices"], 2);
        assert_eq!(doc["accessors"][1]["type"], "VEC4");
        assert_eq!(decode_buffer(&doc).len(), 48 + 64 + 24);
    }

    #[test]
    fn test_color_count_mismatch() {
        assert!(matches!(
            export_gltf(&quad(), Some(&[0.0; 3])),
            Err(EngineError::Encode { what: "scene", .. })
        ));
    }

    #[test]
    fn test_empty_representation() {
        let doc: Value = serde_json::from_slice(&export_gltf(&PolyData::new(), None).unwrap()).unwrap();
        assert!(doc.get("meshes").is_none());
        assert!(doc.get("buffers").is_none());
    }
}
