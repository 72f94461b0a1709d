//! Volumetric cell kinds and their local topology
//!
//! Vertex and face orderings follow the VTK linear cell conventions so that
//! grids written by VTK-based solvers keep their orientation. Polyhedra carry
//! their own outward face lists.

use serde::{Deserialize, Serialize};

use crate::core_types::Point;

/// 3D cell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// 4 vertices
    Tetra,
    /// 8 vertices, bottom quad 0-3 then top quad 4-7
    Hexahedron,
    /// 6 vertices, bottom triangle 0-2 then top triangle 3-5
    Wedge,
    /// 5 vertices, quad base 0-3 then apex 4
    Pyramid,
    /// Arbitrary convex polyhedron described by its faces
    Polyhedron,
}

const TETRA_FACES: &[&[usize]] = &[&[0, 1, 3], &[1, 2, 3], &[2, 0, 3], &[0, 2, 1]];
const HEX_FACES: &[&[usize]] = &[
    &[0, 4, 7, 3],
    &[1, 2, 6, 5],
    &[0, 1, 5, 4],
    &[3, 7, 6, 2],
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
];
const WEDGE_FACES: &[&[usize]] = &[
    &[0, 1, 2],
    &[3, 5, 4],
    &[0, 3, 4, 1],
    &[1, 4, 5, 2],
    &[2, 5, 3, 0],
];
const PYRAMID_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];

const TETRA_TETS: &[[usize; 4]] = &[[0, 1, 2, 3]];
// Six tets fanned around the 0-6 diagonal
const HEX_TETS: &[[usize; 4]] = &[
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];
const WEDGE_TETS: &[[usize; 4]] = &[[0, 1, 2, 5], [0, 1, 5, 4], [0, 4, 5, 3]];
const PYRAMID_TETS: &[[usize; 4]] = &[[0, 1, 2, 4], [0, 2, 3, 4]];

impl CellKind {
    /// Number of vertices, `None` for polyhedra.
    pub fn vertex_count(self) -> Option<usize> {
        match self {
            CellKind::Tetra => Some(4),
            CellKind::Hexahedron => Some(8),
            CellKind::Wedge => Some(6),
            CellKind::Pyramid => Some(5),
            CellKind::Polyhedron => None,
        }
    }

    /// VTK cell type id.
    pub fn vtk_type(self) -> u8 {
        match self {
            CellKind::Tetra => 10,
            CellKind::Hexahedron => 12,
            CellKind::Wedge => 13,
            CellKind::Pyramid => 14,
            CellKind::Polyhedron => 42,
        }
    }

    /// Inverse of [`CellKind::vtk_type`].
    pub fn from_vtk_type(id: u8) -> Option<Self> {
        match id {
            10 => Some(CellKind::Tetra),
            12 => Some(CellKind::Hexahedron),
            13 => Some(CellKind::Wedge),
            14 => Some(CellKind::Pyramid),
            42 => Some(CellKind::Polyhedron),
            _ => None,
        }
    }

    /// Faces as local vertex indices, ordered so normals point outward.
    /// Empty for polyhedra.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            CellKind::Tetra => TETRA_FACES,
            CellKind::Hexahedron => HEX_FACES,
            CellKind::Wedge => WEDGE_FACES,
            CellKind::Pyramid => PYRAMID_FACES,
            CellKind::Polyhedron => &[],
        }
    }

    /// Decomposition into tetrahedra, as local vertex indices.
    ///
    /// Only existing vertices are used, so every tet edge is an edge or a face
    /// diagonal between two grid points.
    pub fn tetrahedra(self) -> &'static [[usize; 4]] {
        match self {
            CellKind::Tetra => TETRA_TETS,
            CellKind::Hexahedron => HEX_TETS,
            CellKind::Wedge => WEDGE_TETS,
            CellKind::Pyramid => PYRAMID_TETS,
            CellKind::Polyhedron => &[],
        }
    }
}

/// A cell: its kind and global point ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell kind
    pub kind: CellKind,
    /// Global point ids, `kind.vertex_count()` of them for linear kinds
    pub points: Vec<u32>,
    /// Outward faces as global point ids (polyhedra only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<Vec<u32>>>,
}

impl Cell {
    /// Create a linear cell.
    pub fn new(kind: CellKind, points: Vec<u32>) -> Self {
        Self {
            kind,
            points,
            faces: None,
        }
    }

    /// Create a polyhedron from its outward faces. The vertex list is the
    /// face points in order of first use.
    pub fn polyhedron(faces: Vec<Vec<u32>>) -> Self {
        let mut points: Vec<u32> = Vec::new();
        for &p in faces.iter().flatten() {
            if !points.contains(&p) {
                points.push(p);
            }
        }
        Self {
            kind: CellKind::Polyhedron,
            points,
            faces: Some(faces),
        }
    }

    /// Check connectivity sizes and that every id is below `n_points`.
    pub fn check(&self, n_points: usize) -> Result<(), String> {
        match (self.kind.vertex_count(), &self.faces) {
            (Some(expected), None) if self.points.len() == expected => {}
            (Some(expected), None) => {
                return Err(format!(
                    "{:?} has {} points, expected {expected}",
                    self.kind,
                    self.points.len()
                ))
            }
            (Some(_), Some(_)) => return Err(format!("{:?} cannot carry a face list", self.kind)),
            (None, None) => return Err("polyhedron without faces".into()),
            (None, Some(faces)) => {
                if faces.len() < 4 || faces.iter().any(|f| f.len() < 3) {
                    return Err("polyhedron needs at least 4 faces of 3 or more points".into());
                }
                if let Some(p) = faces.iter().flatten().find(|p| !self.points.contains(p)) {
                    return Err(format!("polyhedron face point {p} missing from its vertex list"));
                }
            }
        }
        match self.points.iter().find(|&&p| p as usize >= n_points) {
            Some(bad) => Err(format!("references point {bad}, grid has {n_points} points")),
            None => Ok(()),
        }
    }

    /// Global point ids of each tetrahedron in the decomposition.
    ///
    /// Polyhedra are fanned from their first vertex: every face not touching
    /// it is fan-triangulated and joined to it. This is exact for convex
    /// cells and keeps every tet vertex a grid point.
    pub fn tets(&self) -> impl Iterator<Item = [u32; 4]> + '_ {
        let fixed = self
            .kind
            .tetrahedra()
            .iter()
            .map(|t| t.map(|local| self.points[local]));
        let fanned = self.faces.iter().flat_map(|faces| {
            let apex = faces.first().and_then(|f| f.first()).copied();
            apex.into_iter().flat_map(move |apex| {
                faces
                    .iter()
                    .filter(move |f| !f.contains(&apex))
                    .flat_map(move |f| {
                        (1..f.len().saturating_sub(1)).map(move |i| [f[0], f[i + 1], f[i], apex])
                    })
            })
        });
        fixed.chain(fanned)
    }

    /// Global point ids of each face.
    pub fn face_points(&self) -> impl Iterator<Item = Vec<u32>> + '_ {
        let fixed = self
            .kind
            .faces()
            .iter()
            .map(|f| f.iter().map(|&local| self.points[local]).collect());
        fixed.chain(self.faces.iter().flatten().cloned())
    }
}

/// Signed volume of a tetrahedron (positive for right-handed ordering).
#[inline]
pub fn tet_signed_volume(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}
