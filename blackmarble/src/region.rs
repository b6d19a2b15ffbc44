//! Caller supplied regions of interest.

use crate::{grid::single_polygon, BlackMarbleError, C};
use geo::{geometry::Polygon, Area};
use geojson::GeoJson;

/// Parses a GeoJSON region of interest.
///
/// The document may be a bare geometry, a feature, or a feature
/// collection, but must hold exactly one polygon in WGS84 degrees.
pub fn parse_region(text: &str) -> Result<Polygon<C>, BlackMarbleError> {
    let geometry = match text.parse::<GeoJson>()? {
        GeoJson::Geometry(geometry) => Some(geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::FeatureCollection(collection) => {
            if collection.features.len() != 1 {
                return Err(BlackMarbleError::Region(format!(
                    "found {} features",
                    collection.features.len()
                )));
            }
            collection
                .features
                .into_iter()
                .next()
                .and_then(|feature| feature.geometry)
        }
    }
    .ok_or_else(|| BlackMarbleError::Region("missing geometry".to_string()))?;

    let polygon = single_polygon(geometry)
        .ok_or_else(|| BlackMarbleError::Region("geometry is not a polygon".to_string()))?;
    validate_region(&polygon)?;
    Ok(polygon)
}

/// Checks that `region` is a usable, non-degenerate polygon.
pub fn validate_region(region: &Polygon<C>) -> Result<(), BlackMarbleError> {
    if region.exterior().0.len() < 4 {
        return Err(BlackMarbleError::Region("too few vertices".to_string()));
    }
    if region.unsigned_area() == 0.0 {
        return Err(BlackMarbleError::Region("zero area".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_region;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[24,4],[26,4],[26,6],[24,6],[24,4]]]}"#;

    #[test]
    fn test_bare_geometry() {
        let region = parse_region(SQUARE).unwrap();
        assert_eq!(region.exterior().0.len(), 5);
    }

    #[test]
    fn test_feature_collection() {
        let text = format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{SQUARE}}}]}}"#
        );
        assert!(parse_region(&text).is_ok());

        let two = format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{SQUARE}}},{{"type":"Feature","properties":{{}},"geometry":{SQUARE}}}]}}"#
        );
        assert!(parse_region(&two).is_err());
    }

    #[test]
    fn test_rejects_non_polygons() {
        assert!(parse_region(r#"{"type":"Point","coordinates":[24,4]}"#).is_err());
        assert!(parse_region(
            r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]],[[[2,2],[3,2],[3,3],[2,2]]]]}"#
        )
        .is_err());
        assert!(parse_region("not json").is_err());
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(
            parse_region(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[2,2],[0,0]]]}"#)
                .is_err()
        );
    }
}
