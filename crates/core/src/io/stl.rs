//! STL import for classifier surfaces
//!
//! Both ASCII and binary STL are accepted. Binary files carry an 80-byte
//! header, a little-endian `u32` triangle count and 50 bytes per triangle
//! (normal, three vertices, attribute count). Coincident vertices are merged
//! so the resulting surface is connected.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::core_types::Point;
use crate::error::{EngineError, EngineResult};
use crate::grid::PolyData;

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Parse an STL buffer into triangle polygon data.
pub fn read_stl(bytes: &[u8]) -> EngineResult<PolyData> {
    if bytes.len() < 6 {
        return Err(EngineError::decode("STL", "buffer too small to be valid STL"));
    }

    let triangles = if looks_ascii(bytes) {
        parse_ascii(bytes)?
    } else {
        parse_binary(bytes)?
    };

    if triangles.is_empty() {
        return Err(EngineError::decode("STL", "no triangles"));
    }

    let poly = merge_vertices(&triangles);
    debug!(
        "STL parsed: {} triangles, {} unique vertices",
        poly.polys.len(),
        poly.points.len()
    );
    Ok(poly)
}

/// ASCII files start with "solid"; binary files that happen to start with
/// "solid" are told apart by their exact size.
fn looks_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(HEADER_SIZE)];
    let starts_solid = String::from_utf8_lossy(head).trim_start().starts_with("solid");
    if !starts_solid {
        return false;
    }
    if bytes.len() >= HEADER_SIZE + 4 {
        let count = read_u32(&bytes[HEADER_SIZE..]) as usize;
        if HEADER_SIZE + 4 + count * TRIANGLE_SIZE == bytes.len() {
            return false;
        }
    }
    !head.contains(&0)
}

fn parse_binary(bytes: &[u8]) -> EngineResult<Vec<[Point; 3]>> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(EngineError::decode(
            "STL",
            format!("binary header needs {} bytes, got {}", HEADER_SIZE + 4, bytes.len()),
        ));
    }
    let count = read_u32(&bytes[HEADER_SIZE..]) as usize;
    let body = &bytes[HEADER_SIZE + 4..];
    if body.len() < count * TRIANGLE_SIZE {
        return Err(EngineError::decode(
            "STL",
            format!(
                "header declares {count} triangles, buffer holds {}",
                body.len() / TRIANGLE_SIZE
            ),
        ));
    }

    Ok(body
        .chunks_exact(TRIANGLE_SIZE)
        .take(count)
        .map(|tri| {
            // Skip the stored normal, it is recomputed from the winding
            [
                read_vertex(&tri[12..24]),
                read_vertex(&tri[24..36]),
                read_vertex(&tri[36..48]),
            ]
        })
        .collect())
}

fn parse_ascii(bytes: &[u8]) -> EngineResult<Vec<[Point; 3]>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EngineError::decode("STL", format!("ASCII STL is not UTF-8: {e}")))?;

    let mut triangles = Vec::new();
    let mut facet: Vec<Point> = Vec::with_capacity(3);
    let mut in_loop = false;

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "outer" => {
                in_loop = true;
                facet.clear();
            }
            "vertex" if in_loop => {
                let mut coord = || -> EngineResult<f64> {
                    parts
                        .next()
                        .ok_or_else(|| {
                            EngineError::decode("STL", format!("line {}: short vertex", line_no + 1))
                        })?
                        .parse::<f64>()
                        .map_err(|e| EngineError::decode("STL", format!("line {}: {e}", line_no + 1)))
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                facet.push(Point::new(x, y, z));
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                if facet.len() == 3 {
                    triangles.push([facet[0], facet[1], facet[2]]);
                } else {
                    warn!("STL facet ending on line {} has {} vertices, skipped", line_no + 1, facet.len());
                }
                facet.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }
    Ok(triangles)
}

/// Build indexed polygon data, merging bit-identical vertices.
fn merge_vertices(triangles: &[[Point; 3]]) -> PolyData {
    let mut index: FxHashMap<[u64; 3], u32> = FxHashMap::default();
    let mut poly = PolyData::new();
    poly.polys.reserve(triangles.len());

    for tri in triangles {
        let ids = tri.map(|p| {
            // +0.0 and -0.0 are the same vertex
            let key = [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f64::to_bits);
            *index.entry(key).or_insert_with(|| {
                poly.points.push(p);
                (poly.points.len() - 1) as u32
            })
        });
        if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
            continue;
        }
        poly.polys.push(ids.to_vec());
    }
    poly
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn read_vertex(buf: &[u8]) -> Point {
    let f = |o: usize| f64::from(f32::from_le_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]));
    Point::new(f(0), f(4), f(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_TETRA: &str = "solid tet
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 1 0 0
  endloop
endfacet
facet normal 0 -1 0
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 0 1
  endloop
endfacet
facet normal -1 0 0
  outer loop
    vertex 0 0 0
    vertex 0 0 1
    vertex 0 1 0
  endloop
endfacet
facet normal 1 1 1
  outer loop
    vertex 1 0 0
    vertex 0 1 0
    vertex 0 0 1
  endloop
endfacet
endsolid tet
";

    fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            out.extend_from_slice(&[0u8; 12]);
            for v in tri {
                for c in v {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_ascii_merges_vertices() {
        let poly = read_stl(ASCII_TETRA.as_bytes()).unwrap();
        assert_eq!(poly.polys.len(), 4);
        assert_eq!(poly.points.len(), 4);
        assert!(poly.validate().is_ok());
    }

    #[test]
    fn test_binary() {
        let bytes = binary_stl(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let poly = read_stl(&bytes).unwrap();
        assert_eq!(poly.polys.len(), 2);
        assert_eq!(poly.points.len(), 4);
        assert!((poly.total_area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let mut bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes[..5].copy_from_slice(b"solid");
        assert_eq!(read_stl(&bytes).unwrap().polys.len(), 1);
    }

    #[test]
    fn test_truncated_binary_is_decode_error() {
        let mut bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(read_stl(&bytes), Err(EngineError::Decode { .. })));
    }

    #[test]
    fn test_empty_solid_is_decode_error() {
        assert!(read_stl(b"solid empty\nendsolid empty\n").is_err());
    }
}
