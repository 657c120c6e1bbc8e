use crate::common::config::BufferConfig;
use crate::common::geometry::Geometry;
use crate::common::lines::merge_lines;
use crate::common::projection::{lon_lat_to_mercator, mercator_to_lon_lat};
use crate::io::geojson::{Feature, FeatureCollection, GeoJsonGeometry};
use crate::pipeline::error::CenterlineError;
use crate::pipeline::multiline_centerline;
use crate::pipeline::voronoi::VoronoiDriver;
use ahash::AHashMap;
use serde_json::{Map, Value};

/// The property values that identify one logical route, e.g. a street's
/// `(name, highway)` or a relation's `(network, ref)`. Output order follows
/// the natural order of these tuples.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    fn label(&self) -> String {
        self.0.join(", ")
    }

    fn properties(&self, key_fields: &[String]) -> Map<String, Value> {
        key_fields
            .iter()
            .zip(&self.0)
            .map(|(field, value)| (field.clone(), Value::String(value.clone())))
            .collect()
    }
}

/// All the geometry collected for one key, still in geographic coordinates.
#[derive(Clone, Debug)]
pub struct GroupEntry {
    pub key: GroupKey,
    pub parts: Vec<Geometry>,
}

/// Bucket features by the configured key properties. Features missing any
/// key property (or carrying an empty value) are dropped, matching how
/// unnamed service ways are ignored.
pub fn collect_groups(collection: &FeatureCollection, key_fields: &[String]) -> Vec<GroupEntry> {
    let mut groups: AHashMap<GroupKey, GroupEntry> = AHashMap::new();

    for feature in &collection.features {
        let Some(properties) = &feature.properties else {
            continue;
        };
        let Some(geometry) = &feature.geometry else {
            continue;
        };

        let values: Option<Vec<String>> = key_fields
            .iter()
            .map(|field| match properties.get(field) {
                Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
                _ => None,
            })
            .collect();
        let Some(values) = values else {
            continue;
        };

        let key = GroupKey(values);
        groups
            .entry(key.clone())
            .or_insert_with(|| GroupEntry {
                key,
                parts: Vec::new(),
            })
            .parts
            .push(geometry.to_geometry());
    }

    let mut groups: Vec<GroupEntry> = groups.into_values().collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

/// Run every group through the centerline pipeline and encode the survivors
/// as output features, in key order.
///
/// Failed groups produce no feature: overtime and invalid input are logged
/// (and dumped where applicable) and processing continues with the next
/// group.
pub fn generalize_groups(
    groups: &[GroupEntry],
    driver: &dyn VoronoiDriver,
    config: &BufferConfig,
    key_fields: &[String],
) -> Vec<Feature> {
    let mut features = Vec::new();

    for group in groups {
        let label = group.key.label();

        let projected: Vec<Geometry> = group
            .parts
            .iter()
            .map(|part| part.map_points(|p| lon_lat_to_mercator(p.x, p.y)))
            .collect();

        // merge line fragments into maximal runs; polygons pass through
        let mut lines = Vec::new();
        let mut parts = Vec::new();
        for part in projected {
            match part {
                Geometry::Polyline(line) => lines.push(line),
                Geometry::MultiPolyline(multi) => lines.extend(multi),
                other => parts.push(other),
            }
        }
        if !lines.is_empty() {
            parts.push(Geometry::MultiPolyline(merge_lines(lines)));
        }

        match multiline_centerline(&parts, driver, config, &label) {
            Ok(Some(centerlines)) => {
                log::info!("found {label}");
                let unprojected: Vec<Vec<glam::DVec2>> = centerlines
                    .iter()
                    .map(|line| {
                        line.iter()
                            .map(|&point| {
                                let (lon, lat) = mercator_to_lon_lat(point);
                                glam::dvec2(lon, lat)
                            })
                            .collect()
                    })
                    .collect();
                features.push(Feature::new(
                    group.key.properties(key_fields),
                    GeoJsonGeometry::from_lines(&unprojected),
                ));
            }
            Ok(None) => {
                log::info!("ignored {label}");
            }
            Err(failure @ CenterlineError::CarverOvertime(_)) => {
                log::warn!("abandoned {label}: {failure}");
            }
            Err(failure) => {
                log::warn!("skipped {label}: {failure}");
            }
        }
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::voronoi::VoronoiDiagram;
    use glam::{dvec2 as vec2, DVec2 as Vec2};
    use serde_json::json;

    /// Draws a straight chain across the middle of whatever sites arrive;
    /// close enough to a real diagram for pill-shaped regions.
    struct MidlineDriver;

    impl VoronoiDriver for MidlineDriver {
        fn compute(&self, sites: &[Vec2]) -> Result<VoronoiDiagram, CenterlineError> {
            let min_x = sites.iter().map(|s| s.x).fold(f64::INFINITY, f64::min);
            let max_x = sites.iter().map(|s| s.x).fold(f64::NEG_INFINITY, f64::max);
            let mid_y = sites.iter().map(|s| s.y).sum::<f64>() / sites.len() as f64;

            let vertices: Vec<Vec2> = (0..)
                .map(|step| vec2(min_x + 5.0 + f64::from(step) * 2.5, mid_y))
                .take_while(|point| point.x <= max_x - 5.0)
                .collect();
            let cells = (0..vertices.len().saturating_sub(1))
                .map(|index| vec![index as i64, index as i64 + 1])
                .collect();
            Ok(VoronoiDiagram { vertices, cells })
        }
    }

    fn street_feature(name: &str, geometry: GeoJsonGeometry) -> Feature {
        let mut properties = Map::new();
        properties.insert("name".to_owned(), json!(name));
        properties.insert("highway".to_owned(), json!("residential"));
        Feature {
            feature_type: "Feature".to_owned(),
            properties: Some(properties),
            geometry: Some(geometry),
        }
    }

    fn key_fields() -> Vec<String> {
        vec!["name".to_owned(), "highway".to_owned()]
    }

    fn line(coordinates: Vec<Vec<f64>>) -> GeoJsonGeometry {
        GeoJsonGeometry::LineString { coordinates }
    }

    #[test]
    fn features_bucket_by_key_and_keyless_ones_drop() {
        let collection = FeatureCollection::new(vec![
            street_feature("Elm Street", line(vec![vec![0.0, 0.0], vec![0.001, 0.0]])),
            street_feature("Elm Street", line(vec![vec![0.001, 0.0], vec![0.002, 0.0]])),
            street_feature("Oak Street", line(vec![vec![0.0, 0.01], vec![0.001, 0.01]])),
            Feature {
                feature_type: "Feature".to_owned(),
                properties: Some(Map::new()),
                geometry: Some(line(vec![vec![0.0, 0.0], vec![1.0, 1.0]])),
            },
        ]);

        let groups = collect_groups(&collection, &key_fields());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.0[0], "Elm Street");
        assert_eq!(groups[0].parts.len(), 2);
        assert_eq!(groups[1].key.0[0], "Oak Street");
    }

    #[test]
    fn groups_generalize_in_key_order_and_bad_groups_vanish() {
        // two parallel carriageways ~220m long at the equator
        let collection = FeatureCollection::new(vec![
            street_feature("Elm Street", line(vec![vec![0.0, 0.0], vec![0.002, 0.0]])),
            street_feature(
                "Elm Street",
                line(vec![vec![0.0, 0.000045], vec![0.002, 0.000045]]),
            ),
            street_feature("Aaa Avenue", line(vec![vec![0.0, 0.01], vec![0.002, 0.01]])),
            street_feature(
                "Broken Point",
                GeoJsonGeometry::Point {
                    coordinates: vec![0.0, 0.0],
                },
            ),
        ]);
        let fields = key_fields();
        let groups = collect_groups(&collection, &fields);
        assert_eq!(groups.len(), 3);

        let config = BufferConfig::new(5.0).min_length(40.0);
        let features = generalize_groups(&groups, &MidlineDriver, &config, &fields);

        // the point group is skipped as invalid input, the rest keep order
        assert_eq!(features.len(), 2);
        let names: Vec<&Value> = features
            .iter()
            .map(|feature| &feature.properties.as_ref().unwrap()["name"])
            .collect();
        assert_eq!(names, vec![&json!("Aaa Avenue"), &json!("Elm Street")]);

        let Some(GeoJsonGeometry::MultiLineString { coordinates }) = &features[1].geometry else {
            panic!("expected a multiline");
        };
        assert_eq!(coordinates.len(), 1);
        for position in &coordinates[0] {
            // between the carriageways, inside the original extent
            assert!((-0.0001..=0.0021).contains(&position[0]));
            assert!((-0.00001..=0.000055).contains(&position[1]));
        }
    }
}
