//! Scalar-to-color mapping of polygon point data

use tracing::debug;

use crate::config::LookupTableConfig;
use crate::error::{EngineError, EngineResult};
use crate::grid::PolyData;

use super::lookup_table::LookupTable;

/// Colors produced for one field of one polygon representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapping {
    /// Point array that was mapped
    pub field: String,
    /// Mapped component, `None` for magnitude mode
    pub component: Option<usize>,
    /// Scalar range the lookup table spanned
    pub range: [f64; 2],
    /// RGBA per point, normalized to `0..=1`
    pub colors: Vec<f32>,
}

/// Interpret a host component index: `-1` selects magnitude mode.
pub fn parse_component(component_index: i32, components: usize) -> EngineResult<Option<usize>> {
    match component_index {
        -1 => Ok(None),
        i if i >= 0 && (i as usize) < components => Ok(Some(i as usize)),
        i => Err(EngineError::invalid_argument(
            "component_index",
            format!("{i} is not -1 or a component below {components}"),
        )),
    }
}

/// Range of a point array of `poly` for the given component mode.
pub fn field_range(poly: &PolyData, field: &str, component_index: i32) -> EngineResult<[f64; 2]> {
    let array = poly.point_array(field)?;
    let component = parse_component(component_index, array.components)?;
    Ok(array.range(component).unwrap_or([0.0, 0.0]))
}

/// Map the point array `field` of `poly` to colors.
///
/// # Arguments
///
/// * `poly` - Representation whose point data is colored
/// * `field` - Point array name
/// * `component_index` - `-1` for magnitude, otherwise the component to map
/// * `bounds` - Explicit `[min, max]`; `[0, 0]` selects the field's own range
/// * `config` - Lookup table settings
pub fn map_colors(
    poly: &PolyData,
    field: &str,
    component_index: i32,
    bounds: [f64; 2],
    config: &LookupTableConfig,
) -> EngineResult<ColorMapping> {
    let array = poly.point_array(field)?;
    let component = parse_component(component_index, array.components)?;

    let range = if bounds == [0.0, 0.0] {
        array.range(component).unwrap_or([0.0, 0.0])
    } else {
        bounds
    };

    let lut = LookupTable::new(config, range);
    let colors: Vec<f32> = (0..array.len())
        .flat_map(|i| lut.map_normalized(array.value_for(i, component)))
        .collect();

    debug!(
        "Mapped '{}' over [{}, {}] to {} point colors",
        field,
        range[0],
        range[1],
        array.len()
    );

    Ok(ColorMapping {
        field: field.to_owned(),
        component,
        range,
        colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Point;
    use crate::grid::FieldArray;

    fn strip() -> PolyData {
        let mut poly = PolyData::new();
        poly.points = (0..3).map(|i| Point::new(f64::from(i), 0.0, 0.0)).collect();
        poly.point_data.insert(FieldArray::scalar("p", vec![-1.0, 0.0, 1.0]));
        poly.point_data
            .insert(FieldArray::new("U", 3, vec![3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
        poly
    }

    #[test]
    fn test_auto_range_matches_field() {
        let poly = strip();
        let config = LookupTableConfig::default();
        let scalar = map_colors(&poly, "p", -1, [0.0, 0.0], &config).unwrap();
        assert_eq!(scalar.range, [-1.0, 1.0]);
        assert_eq!(scalar.colors.len(), 12);
        let magnitude = map_colors(&poly, "U", -1, [0.0, 0.0], &config).unwrap();
        assert_eq!(magnitude.range, [0.0, 5.0]);
        assert_eq!(magnitude.component, None);
        let x = map_colors(&poly, "U", 0, [0.0, 0.0], &config).unwrap();
        assert_eq!(x.range, [0.0, 3.0]);
        assert_eq!(x.component, Some(0));
    }

    #[test]
    fn test_explicit_range_wins() {
        let poly = strip();
        let mapping =
            map_colors(&poly, "p", -1, [0.0, 10.0], &LookupTableConfig::default()).unwrap();
        assert_eq!(mapping.range, [0.0, 10.0]);
        // -1 clamps to the bottom of the ramp: blue
        assert_eq!(mapping.colors[2], 1.0);
        assert_eq!(mapping.colors[3], 1.0);
    }

    #[test]
    fn test_bad_component_and_field() {
        let poly = strip();
        let config = LookupTableConfig::default();
        assert!(matches!(
            map_colors(&poly, "U", 3, [0.0, 0.0], &config),
            Err(EngineError::InvalidArgument { name: "component_index", .. })
        ));
        assert!(matches!(
            map_colors(&poly, "p", -2, [0.0, 0.0], &config),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            map_colors(&poly, "T", -1, [0.0, 0.0], &config),
            Err(EngineError::MissingField { .. })
        ));
        assert_eq!(field_range(&poly, "U", 1).unwrap(), [0.0, 4.0]);
    }
}
