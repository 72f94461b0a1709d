//! Named field arrays attached to grids and polygon data
//!
//! A field array stores one tuple per point or per cell, contiguously:
//! tuple `i` occupies `values[i * components .. (i + 1) * components]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::Vec3;

/// Which namespace an array lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Association {
    /// One tuple per point
    Points,
    /// One tuple per cell
    Cells,
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Association::Points => write!(f, "point data"),
            Association::Cells => write!(f, "cell data"),
        }
    }
}

/// A named numeric array with a fixed number of components per tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldArray {
    /// Array name ("U", "p", "flowRegion", ...)
    pub name: String,
    /// Components per tuple (1 = scalar, 3 = vector, 9 = tensor)
    pub components: usize,
    /// Flattened tuples
    pub values: Vec<f64>,
}

impl FieldArray {
    /// Create an array from flattened values.
    pub fn new(name: impl Into<String>, components: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            components,
            values,
        }
    }

    /// Create a single-component array.
    pub fn scalar(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, 1, values)
    }

    /// Create a three-component array from vectors.
    pub fn vector(name: impl Into<String>, vectors: &[Vec3]) -> Self {
        let values = vectors.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        Self::new(name, 3, values)
    }

    /// Create a zero-filled array with `tuples` tuples.
    pub fn zeros(name: impl Into<String>, components: usize, tuples: usize) -> Self {
        Self::new(name, components, vec![0.0; components * tuples])
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }

    /// True when the array holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow tuple `i`.
    pub fn tuple(&self, i: usize) -> &[f64] {
        let nc = self.components;
        &self.values[i * nc..(i + 1) * nc]
    }

    /// First component of tuple `i`.
    pub fn scalar_at(&self, i: usize) -> f64 {
        self.values[i * self.components]
    }

    /// Tuple `i` as a vector. Missing components read as zero.
    pub fn vector_at(&self, i: usize) -> Vec3 {
        let t = self.tuple(i);
        Vec3::new(
            t.first().copied().unwrap_or(0.0),
            t.get(1).copied().unwrap_or(0.0),
            t.get(2).copied().unwrap_or(0.0),
        )
    }

    /// Euclidean norm of tuple `i`.
    pub fn magnitude_at(&self, i: usize) -> f64 {
        self.tuple(i).iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Value used for colouring and ranges.
    ///
    /// `None` selects the tuple magnitude, except for single-component arrays
    /// which report their raw (signed) value.
    pub fn value_for(&self, i: usize, component: Option<usize>) -> f64 {
        match component {
            Some(c) => self.tuple(i)[c],
            None if self.components == 1 => self.scalar_at(i),
            None => self.magnitude_at(i),
        }
    }

    /// `[min, max]` of `value_for` over all tuples, or `None` for an empty array.
    pub fn range(&self, component: Option<usize>) -> Option<[f64; 2]> {
        if self.is_empty() {
            return None;
        }
        let mut range = [f64::INFINITY, f64::NEG_INFINITY];
        for i in 0..self.len() {
            let v = self.value_for(i, component);
            if v.is_nan() {
                continue;
            }
            range[0] = range[0].min(v);
            range[1] = range[1].max(v);
        }
        (range[0] <= range[1]).then_some(range)
    }

    /// Accumulate `weight * tuple(i)` into `out`.
    #[inline]
    pub fn accumulate(&self, i: usize, weight: f64, out: &mut [f64]) {
        for (o, v) in out.iter_mut().zip(self.tuple(i)) {
            *o += weight * v;
        }
    }
}

/// Ordered collection of field arrays for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    /// Arrays in insertion order
    #[serde(default)]
    pub arrays: Vec<FieldArray>,
    /// Name of the array acting as the active scalars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_scalars: Option<String>,
    /// Name of the array acting as the active vectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_vectors: Option<String>,
}

impl FieldData {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an array by name.
    pub fn get(&self, name: &str) -> Option<&FieldArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// Look up an array by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldArray> {
        self.arrays.iter_mut().find(|a| a.name == name)
    }

    /// True when an array with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add an array, replacing any existing array with the same name in place.
    pub fn insert(&mut self, array: FieldArray) {
        if let Some(existing) = self.get_mut(&array.name) {
            *existing = array;
        } else {
            self.arrays.push(array);
        }
    }

    /// Number of arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// True when there are no arrays.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Iterate over arrays.
    pub fn iter(&self) -> impl Iterator<Item = &FieldArray> {
        self.arrays.iter()
    }

    /// Array names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|a| a.name.as_str())
    }

    /// Empty arrays with the same names and component counts, preallocated.
    pub fn empty_like(&self, capacity: usize) -> Self {
        Self {
            arrays: self
                .arrays
                .iter()
                .map(|a| FieldArray {
                    name: a.name.clone(),
                    components: a.components,
                    values: Vec::with_capacity(capacity * a.components),
                })
                .collect(),
            active_scalars: self.active_scalars.clone(),
            active_vectors: self.active_vectors.clone(),
        }
    }

    /// Append tuple `src_idx` of every array in `src` to the matching array here.
    ///
    /// `self` must have been created by `src.empty_like(..)`.
    pub fn push_copy(&mut self, src: &FieldData, src_idx: usize) {
        for (dst, s) in self.arrays.iter_mut().zip(&src.arrays) {
            dst.values.extend_from_slice(s.tuple(src_idx));
        }
    }

    /// Append a weighted combination of tuples from `src` to every array.
    pub fn push_interpolated(&mut self, src: &FieldData, weights: &[(usize, f64)]) {
        for (dst, s) in self.arrays.iter_mut().zip(&src.arrays) {
            let start = dst.values.len();
            dst.values.resize(start + s.components, 0.0);
            for &(idx, w) in weights {
                s.accumulate(idx, w, &mut dst.values[start..]);
            }
        }
    }

    /// Check that every array holds exactly `tuples` tuples.
    pub fn validate(&self, tuples: usize, association: Association) -> Result<(), String> {
        for a in &self.arrays {
            if a.components == 0 {
                return Err(format!("{association} array '{}' has zero components", a.name));
            }
            if a.values.len() != a.components * tuples {
                return Err(format!(
                    "{association} array '{}' has {} values, expected {} ({} tuples x {} components)",
                    a.name,
                    a.values.len(),
                    a.components * tuples,
                    tuples,
                    a.components
                ));
            }
        }
        Ok(())
    }
}
