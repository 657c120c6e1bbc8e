use crate::common::geometry::{polyline_to_line_string, Geometry};
use geo_types::{LineString, MultiPolygon, Polygon};
use glam::{dvec2 as vec2, DVec2 as Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Just enough GeoJSON to read a feature collection in and write one back.
/// Positions keep only lon and lat; any altitude is dropped.

#[derive(Serialize, Deserialize, Debug)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_owned(),
            features,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
}

impl Feature {
    pub fn new(properties: Map<String, Value>, geometry: GeoJsonGeometry) -> Self {
        Self {
            feature_type: "Feature".to_owned(),
            properties: Some(properties),
            geometry: Some(geometry),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

fn position_to_vec2(position: &[f64]) -> Vec2 {
    vec2(
        position.first().copied().unwrap_or(0.0),
        position.get(1).copied().unwrap_or(0.0),
    )
}

fn ring_to_line_string(ring: &[Vec<f64>]) -> LineString {
    polyline_to_line_string(&ring.iter().map(|p| position_to_vec2(p)).collect::<Vec<_>>())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Polygon {
    let exterior = rings
        .first()
        .map(|ring| ring_to_line_string(ring))
        .unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = rings.iter().skip(1).map(|ring| ring_to_line_string(ring)).collect();
    Polygon::new(exterior, interiors)
}

impl GeoJsonGeometry {
    pub fn to_geometry(&self) -> Geometry {
        match self {
            Self::Point { coordinates } => Geometry::Point(position_to_vec2(coordinates)),
            Self::MultiPoint { coordinates } => Geometry::Point(
                coordinates
                    .first()
                    .map(|p| position_to_vec2(p))
                    .unwrap_or(Vec2::ZERO),
            ),
            Self::LineString { coordinates } => {
                Geometry::Polyline(coordinates.iter().map(|p| position_to_vec2(p)).collect())
            }
            Self::MultiLineString { coordinates } => Geometry::MultiPolyline(
                coordinates
                    .iter()
                    .map(|line| line.iter().map(|p| position_to_vec2(p)).collect())
                    .collect(),
            ),
            Self::Polygon { coordinates } => Geometry::Polygon(polygon_from_rings(coordinates)),
            Self::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
                coordinates.iter().map(|rings| polygon_from_rings(rings)).collect(),
            )),
        }
    }

    pub fn from_lines(lines: &[Vec<Vec2>]) -> Self {
        Self::MultiLineString {
            coordinates: lines
                .iter()
                .map(|line| line.iter().map(|point| vec![point.x, point.y]).collect())
                .collect(),
        }
    }
}
