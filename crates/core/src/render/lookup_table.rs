//! HSV color lookup table
//!
//! A fixed number of entries ramping the hue linearly across the configured
//! range at full saturation and value. Entries are stored as RGBA bytes, the
//! same precision a graphics pipeline would upload.

use crate::config::LookupTableConfig;

/// Color table mapping scalars in `[min, max]` to RGBA bytes.
#[derive(Debug, Clone)]
pub struct LookupTable {
    table: Vec<[u8; 4]>,
    nan_color: [u8; 4],
    range: [f64; 2],
}

/// Convert HSV (all in `0..=1`) to RGB.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[inline]
fn quantize(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

impl LookupTable {
    /// Build the table for the scalar range `[min, max]`.
    pub fn new(config: &LookupTableConfig, range: [f64; 2]) -> Self {
        let n = config.num_colors.max(1);
        let [h0, h1] = config.hue_range;
        let table = (0..n)
            .map(|i| {
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                let [r, g, b] = hsv_to_rgb(h0 + (h1 - h0) * t, 1.0, 1.0);
                [quantize(r), quantize(g), quantize(b), 255]
            })
            .collect();
        Self {
            table,
            nan_color: config.nan_color.map(quantize),
            range,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no entries (never true once built).
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Scalar range the table spans.
    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    /// Table index for `v`; values outside the range clamp to the ends.
    pub fn index_of(&self, v: f64) -> usize {
        let last = self.table.len() - 1;
        let [lo, hi] = self.range;
        if hi > lo {
            let scaled = ((v - lo) / (hi - lo) * self.table.len() as f64).floor();
            scaled.clamp(0.0, last as f64) as usize
        } else if v > hi {
            last
        } else {
            0
        }
    }

    /// RGBA bytes for `v`.
    pub fn map_value(&self, v: f64) -> [u8; 4] {
        if v.is_nan() {
            self.nan_color
        } else {
            self.table[self.index_of(v)]
        }
    }

    /// RGBA normalized to `0..=1`.
    pub fn map_normalized(&self, v: f64) -> [f32; 4] {
        self.map_value(v).map(|c| f32::from(c) / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LookupTable {
        LookupTable::new(&LookupTableConfig::default(), [0.0, 1.0])
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]);
        let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert!(blue[0].abs() < 1e-12 && blue[1].abs() < 1e-12);
        assert_eq!(blue[2], 1.0);
        assert_eq!(hsv_to_rgb(0.5, 0.0, 0.25), [0.25; 3]);
    }

    #[test]
    fn test_ramp_ends() {
        let lut = table();
        assert_eq!(lut.len(), 256);
        let low = lut.map_value(0.0);
        assert!(low[0] <= 1);
        assert_eq!(low[1], 0);
        assert_eq!(low[2], 255);
        assert_eq!(lut.map_value(1.0), [255, 0, 0, 255]);
        // Middle of the ramp is green
        assert_eq!(lut.map_value(0.5)[1], 255);
    }

    #[test]
    fn test_clamping_and_nan() {
        let lut = table();
        assert_eq!(lut.index_of(-5.0), 0);
        assert_eq!(lut.index_of(5.0), 255);
        assert_eq!(lut.map_value(f64::NAN), [128, 0, 0, 255]);
        let rgba = lut.map_normalized(1.0);
        assert_eq!(rgba, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_degenerate_range() {
        let lut = LookupTable::new(&LookupTableConfig::default(), [2.0, 2.0]);
        assert_eq!(lut.index_of(2.0), 0);
        assert_eq!(lut.index_of(1.0), 0);
        assert_eq!(lut.index_of(3.0), 255);
    }
}
