//! The Black Marble tile grid.
//!
//! Products are distributed as 10x10 degree tiles named `hNNvNN`. The
//! grid geometry is published as a GeoJSON feature collection with a
//! `TileID` property per polygon.

use crate::{file_name::find_tile_id, raster::round_extent, BlackMarbleError, C};
use geo::{
    geometry::{Geometry, Polygon, Rect},
    BoundingRect, Intersects,
};
use geojson::GeoJson;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub struct TileGrid {
    /// Tile polygons keyed by tile ID.
    tiles: BTreeMap<String, Polygon<C>>,
}

impl TileGrid {
    /// Parses the tile grid GeoJSON document.
    ///
    /// Tiles in column `h00` or row `v00` are dropped, as their
    /// polygons wrap the antimeridian/poles and break intersection
    /// tests.
    pub fn from_geojson(text: &str) -> Result<Self, BlackMarbleError> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(BlackMarbleError::GridFeature(0));
            }
        };

        let mut tiles = BTreeMap::new();
        for (idx, feature) in features.into_iter().enumerate() {
            let tile_id = feature
                .property("TileID")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or(BlackMarbleError::GridFeature(idx))?;
            let polygon = feature
                .geometry
                .and_then(single_polygon)
                .ok_or(BlackMarbleError::GridFeature(idx))?;
            if is_edge_tile(&tile_id) {
                continue;
            }
            tiles.insert(tile_id, polygon);
        }
        debug!("loaded {} grid tiles", tiles.len());
        Ok(Self { tiles })
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = (String, Polygon<C>)>) -> Self {
        let tiles = tiles
            .into_iter()
            .filter(|(tile_id, _)| !is_edge_tile(tile_id))
            .collect();
        Self { tiles }
    }

    /// Returns the number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, tile_id: &str) -> Option<&Polygon<C>> {
        self.tiles.get(tile_id)
    }

    /// Returns the IDs of every tile whose polygon intersects
    /// `region`.
    pub fn intersecting(&self, region: &Polygon<C>) -> BTreeSet<String> {
        self.tiles
            .iter()
            .filter(|(_, polygon)| polygon.intersects(region))
            .map(|(tile_id, _)| tile_id.clone())
            .collect()
    }

    /// Returns the bounding box of `tile_id`, rounded to whole
    /// degrees.
    pub fn bounds(&self, tile_id: &str) -> Result<Rect<C>, BlackMarbleError> {
        self.tiles
            .get(tile_id)
            .and_then(|polygon| polygon.bounding_rect())
            .map(round_extent)
            .ok_or_else(|| BlackMarbleError::UnknownTile(tile_id.to_string()))
    }
}

/// Whether `name` embeds one of `tile_ids`.
pub fn matches_tiles(name: &str, tile_ids: &BTreeSet<String>) -> bool {
    find_tile_id(name).map_or(false, |tile_id| tile_ids.contains(tile_id))
}

fn is_edge_tile(tile_id: &str) -> bool {
    tile_id.get(1..3) == Some("00") || tile_id.get(4..6) == Some("00")
}

/// Converts a GeoJSON geometry into exactly one polygon.
pub(crate) fn single_polygon(geometry: geojson::Geometry) -> Option<Polygon<C>> {
    match Geometry::<C>::try_from(geometry).ok()? {
        Geometry::Polygon(polygon) => Some(polygon),
        Geometry::MultiPolygon(multi) if multi.0.len() == 1 => multi.0.into_iter().next(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{is_edge_tile, matches_tiles, TileGrid};
    use geo::{
        geometry::{Coord, Rect},
        polygon,
    };
    use std::collections::BTreeSet;

    /// GeoJSON for a 3x2 block of tiles spanning 20-50E, 0-20N, plus
    /// an edge tile which must be dropped.
    pub(crate) fn grid_geojson() -> String {
        let mut features = Vec::new();
        for (h, west) in [(20, 20.0), (21, 30.0), (22, 40.0)] {
            for (v, south) in [(8, 0.0), (7, 10.0)] {
                features.push(feature(&format!("h{h:02}v{v:02}"), west, south));
            }
        }
        features.push(feature("h00v08", -180.0, 0.0));
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    fn feature(tile_id: &str, west: f64, south: f64) -> String {
        // Grid polygons are not exactly on whole degrees.
        let (w, s, e, n) = (west + 1e-7, south - 1e-7, west + 10.0, south + 10.0);
        format!(
            r#"{{"type":"Feature","properties":{{"TileID":"{tile_id}"}},"geometry":{{"type":"Polygon","coordinates":[[[{w},{s}],[{e},{s}],[{e},{n}],[{w},{n}],[{w},{s}]]]}}}}"#
        )
    }

    #[test]
    fn test_load_drops_edge_tiles() {
        let grid = TileGrid::from_geojson(&grid_geojson()).unwrap();
        assert_eq!(grid.len(), 6);
        assert!(grid.get("h00v08").is_none());
        assert!(is_edge_tile("h12v00"));
        assert!(!is_edge_tile("h10v10"));
    }

    #[test]
    fn test_intersecting_single_tile() {
        let grid = TileGrid::from_geojson(&grid_geojson()).unwrap();
        let region = polygon![
            (x: 24.0, y: 4.0),
            (x: 26.0, y: 4.0),
            (x: 26.0, y: 6.0),
            (x: 24.0, y: 6.0),
            (x: 24.0, y: 4.0),
        ];
        let expected: BTreeSet<String> = ["h20v08".to_string()].into();
        assert_eq!(grid.intersecting(&region), expected);
    }

    #[test]
    fn test_intersecting_across_boundary() {
        let grid = TileGrid::from_geojson(&grid_geojson()).unwrap();
        let region = polygon![
            (x: 28.0, y: 8.0),
            (x: 32.0, y: 8.0),
            (x: 32.0, y: 12.0),
            (x: 28.0, y: 12.0),
            (x: 28.0, y: 8.0),
        ];
        let hits = grid.intersecting(&region);
        assert!(hits.len() >= 2);
        assert_eq!(hits.len(), 4);
        assert!(hits.contains("h21v07"));
    }

    #[test]
    fn test_intersecting_disjoint() {
        let grid = TileGrid::from_geojson(&grid_geojson()).unwrap();
        let region = polygon![
            (x: -100.0, y: 40.0),
            (x: -99.0, y: 40.0),
            (x: -99.0, y: 41.0),
            (x: -100.0, y: 40.0),
        ];
        assert!(grid.intersecting(&region).is_empty());
    }

    #[test]
    fn test_bounds_are_rounded() {
        let grid = TileGrid::from_geojson(&grid_geojson()).unwrap();
        assert_eq!(
            grid.bounds("h21v07").unwrap(),
            Rect::new(Coord { x: 30.0, y: 10.0 }, Coord { x: 40.0, y: 20.0 })
        );
        assert!(grid.bounds("h99v99").is_err());
    }

    #[test]
    fn test_matches_tiles() {
        let tile_ids: BTreeSet<String> = ["h20v08".to_string()].into();
        assert!(matches_tiles(
            "VNP46A2.A2021001.h20v08.001.2021032222012.h5",
            &tile_ids
        ));
        assert!(!matches_tiles(
            "VNP46A2.A2021001.h21v08.001.2021032222012.h5",
            &tile_ids
        ));
    }

    #[test]
    fn test_missing_tile_id() {
        let text = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#;
        assert!(TileGrid::from_geojson(text).is_err());
    }
}
