//! GeoJSON feature collections, flattened for line rendering and hit tests.

use std::collections::BTreeSet;

use geojson::{FeatureCollection, GeoJson, Value};
use log::warn;

use crate::error::AtlasError;
use crate::ident::normalize_id;

/// One drawable feature: the normalized join key (if any) and its geometry
/// flattened into lng/lat polylines. Polygon rings render as closed lines.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    pub id: Option<String>,
    pub paths: Vec<Vec<[f64; 2]>>,
}

/// Parse a GeoJSON document and flatten it into [`MapFeature`]s, reading
/// the join key from `id_property` in each feature's property bag.
pub fn parse_collection(raw: &str, id_property: &str) -> Result<Vec<MapFeature>, AtlasError> {
    let geojson: GeoJson = raw
        .parse()
        .map_err(|e: geojson::Error| AtlasError::InvalidGeoJson(e.to_string()))?;
    let collection: FeatureCollection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        other => {
            return Err(AtlasError::InvalidGeoJson(format!(
                "expected a FeatureCollection, got {}",
                match other {
                    GeoJson::Geometry(_) => "a bare Geometry",
                    GeoJson::Feature(_) => "a bare Feature",
                    GeoJson::FeatureCollection(_) => unreachable!(),
                }
            )))
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let mut paths = Vec::new();
        if let Some(geometry) = &feature.geometry {
            flatten_geometry(&geometry.value, &mut paths);
        }
        let id = normalize_id(
            feature
                .properties
                .as_ref()
                .and_then(|props| props.get(id_property)),
        );
        if paths.is_empty() {
            warn!("feature {:?} has no line geometry to draw", id);
        }
        features.push(MapFeature { id, paths });
    }
    Ok(features)
}

fn flatten_geometry(value: &Value, out: &mut Vec<Vec<[f64; 2]>>) {
    match value {
        Value::LineString(line) => out.push(to_path(line)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(|l| to_path(l))),
        Value::Polygon(rings) => out.extend(rings.iter().map(|r| to_path(r))),
        Value::MultiPolygon(polys) => {
            out.extend(polys.iter().flat_map(|rings| rings.iter().map(|r| to_path(r))))
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                flatten_geometry(&g.value, out);
            }
        }
        // Points carry no line to draw.
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

fn to_path(positions: &[Vec<f64>]) -> Vec<[f64; 2]> {
    positions.iter().map(|p| [p[0], p[1]]).collect()
}

/// The deduplicated set of join keys across loaded features — the input to
/// the eager batch query.
pub fn distinct_ids<'a>(features: impl IntoIterator<Item = &'a MapFeature>) -> BTreeSet<String> {
    features
        .into_iter()
        .filter_map(|f| f.id.clone())
        .collect()
}

/// Distance from `p` to the segment `ab`, all in the same planar space.
pub fn segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    };
    let closest = [a[0] + ab[0] * t, a[1] + ab[1] * t];
    ((p[0] - closest[0]).powi(2) + (p[1] - closest[1]).powi(2)).sqrt()
}

/// Whether any segment of `path` passes within `tolerance` of `p`.
pub fn path_within(path: &[[f64; 2]], p: [f64; 2], tolerance: f64) -> bool {
    path.windows(2)
        .any(|seg| segment_distance(p, seg[0], seg[1]) <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RIVERS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ID": 42, "nom": "La Seine" },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[2.0, 48.0], [2.5, 48.5], [3.0, 49.0]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ID": " 7 " },
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "nom": "sans id" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_and_flatten() {
        let features = parse_collection(RIVERS, "ID").unwrap();
        assert_eq!(features.len(), 3);

        assert_eq!(features[0].id.as_deref(), Some("42"));
        assert_eq!(features[0].paths.len(), 1);
        assert_eq!(features[0].paths[0].len(), 3);
        assert_relative_eq!(features[0].paths[0][1][0], 2.5);

        // Numeric and padded string ids both normalize.
        assert_eq!(features[1].id.as_deref(), Some("7"));
        assert_eq!(features[1].paths.len(), 2);

        // Polygon rings become one closed path; missing id stays None.
        assert_eq!(features[2].id, None);
        assert_eq!(features[2].paths.len(), 1);
        assert_eq!(features[2].paths[0].len(), 4);
    }

    #[test]
    fn test_rejects_non_collections() {
        let err = parse_collection(r#"{"type": "Point", "coordinates": [0, 0]}"#, "ID");
        assert!(matches!(err, Err(AtlasError::InvalidGeoJson(_))));
        assert!(parse_collection("not json at all", "ID").is_err());
    }

    #[test]
    fn test_distinct_ids_deduplicates() {
        let features = vec![
            MapFeature { id: Some("42".into()), paths: vec![] },
            MapFeature { id: Some("7".into()), paths: vec![] },
            MapFeature { id: Some("42".into()), paths: vec![] },
            MapFeature { id: None, paths: vec![] },
        ];
        let ids = distinct_ids(&features);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("42") && ids.contains("7"));
    }

    #[test]
    fn test_segment_distance() {
        assert_relative_eq!(
            segment_distance([0.0, 1.0], [-1.0, 0.0], [1.0, 0.0]),
            1.0
        );
        // Beyond the endpoint the distance is to the endpoint itself.
        assert_relative_eq!(
            segment_distance([3.0, 0.0], [-1.0, 0.0], [1.0, 0.0]),
            2.0
        );
        // Degenerate segment.
        assert_relative_eq!(
            segment_distance([3.0, 4.0], [0.0, 0.0], [0.0, 0.0]),
            5.0
        );
    }

    #[test]
    fn test_path_within() {
        let path = vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]];
        assert!(path_within(&path, [5.0, 0.5], 1.0));
        assert!(path_within(&path, [10.5, 5.0], 1.0));
        assert!(!path_within(&path, [5.0, 5.0], 1.0));
        // A single-point path has no segment to hit.
        assert!(!path_within(&[[0.0, 0.0]], [0.0, 0.0], 1.0));
    }
}
