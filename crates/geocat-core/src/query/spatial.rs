//! Spatial filter: `bbox` or `intersects` into one `Intersects` predicate.

use geo_types::{coord, Geometry, Polygon, Rect};

use crate::error::SearchError;
use crate::query::Predicate;

/// Rectangle polygon for `[minx, miny, maxx, maxy]`.
pub fn bbox_polygon(bbox: &[f64; 4]) -> Result<Polygon<f64>, SearchError> {
    let [minx, miny, maxx, maxy] = *bbox;
    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(SearchError::InvalidSpatialFilter {
            reason: "bbox bounds must be finite numbers".to_string(),
        });
    }
    if minx > maxx || miny > maxy {
        return Err(SearchError::InvalidSpatialFilter {
            reason: format!("bbox {bbox:?} has min greater than max"),
        });
    }
    Ok(Rect::new(coord! { x: minx, y: miny }, coord! { x: maxx, y: maxy }).to_polygon())
}

/// Build the single spatial predicate for a request. `intersects` wins when
/// both are given; neither yields `None`.
pub fn spatial_predicate(
    bbox: Option<&[f64; 4]>,
    intersects: Option<&geojson::Geometry>,
) -> Result<Option<Predicate>, SearchError> {
    if let Some(geometry) = intersects {
        let shape = Geometry::<f64>::try_from(geometry.clone()).map_err(|e| {
            SearchError::InvalidSpatialFilter {
                reason: format!("intersects is not a usable geometry: {e}"),
            }
        })?;
        return Ok(Some(Predicate::Intersects(shape)));
    }
    match bbox {
        Some(bbox) => Ok(Some(Predicate::Intersects(Geometry::Polygon(bbox_polygon(bbox)?)))),
        None => Ok(None),
    }
}
