use geo::{MapCoords, Within};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use glam::{dvec2 as vec2, DVec2 as Vec2};

/// A straight segment between two planar points.
pub type Line = (Vec2, Vec2);

pub const EMPTY_MULTI_POLYGON: MultiPolygon = MultiPolygon(vec![]);

/// The geometry variants the pipeline accepts, in planar or geographic
/// coordinates depending on the stage. Anything else coming from a feed is
/// rejected up front rather than coerced.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    Polyline(Vec<Vec2>),
    MultiPolyline(Vec<Vec<Vec2>>),
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Geometry {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Polyline(_) => "Polyline",
            Self::MultiPolyline(_) => "MultiPolyline",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Apply a coordinate transform to every point, e.g. a projection.
    pub fn map_points(&self, transform: impl Fn(Vec2) -> Vec2 + Copy) -> Self {
        let map_line = |line: &Vec<Vec2>| line.iter().map(|&p| transform(p)).collect::<Vec<_>>();
        match self {
            Self::Point(p) => Self::Point(transform(*p)),
            Self::Polyline(line) => Self::Polyline(map_line(line)),
            Self::MultiPolyline(lines) => {
                Self::MultiPolyline(lines.iter().map(map_line).collect())
            }
            Self::Polygon(polygon) => Self::Polygon(polygon.map_coords(|c| {
                vec2_to_coord(&transform(coord_to_vec2(c)))
            })),
            Self::MultiPolygon(polygons) => Self::MultiPolygon(polygons.map_coords(|c| {
                vec2_to_coord(&transform(coord_to_vec2(c)))
            })),
        }
    }
}

pub const fn coord_to_vec2(c: Coord) -> Vec2 {
    vec2(c.x, c.y)
}

pub const fn vec2_to_coord(v: &Vec2) -> Coord {
    Coord { x: v.x, y: v.y }
}

pub fn polyline_to_line_string(points: &[Vec2]) -> LineString {
    LineString::from(points.iter().map(vec2_to_coord).collect::<Vec<_>>())
}

pub fn line_string_to_polyline(line_string: &LineString) -> Vec<Vec2> {
    line_string.coords().copied().map(coord_to_vec2).collect()
}

pub fn create_polygon(vertices: &[Vec2]) -> Polygon {
    Polygon::new(polyline_to_line_string(vertices), vec![])
}

/// Every ring of a polygon, exterior first, as plain point lists.
pub fn polygon_rings(polygon: &Polygon) -> Vec<Vec<Vec2>> {
    let mut rings = vec![line_string_to_polyline(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(line_string_to_polyline));
    rings
}

pub fn union_polygons(poly_a: &MultiPolygon, poly_b: &MultiPolygon) -> MultiPolygon {
    geo::BooleanOps::union(poly_a, poly_b)
}

pub fn intersection_polygons(poly_a: &MultiPolygon, poly_b: &MultiPolygon) -> MultiPolygon {
    geo::BooleanOps::intersection(poly_a, poly_b)
}

pub fn point_within(point: Vec2, region: &MultiPolygon) -> bool {
    geo_types::Point::new(point.x, point.y).is_within(region)
}

pub fn segment_within(start: Vec2, end: Vec2, region: &MultiPolygon) -> bool {
    geo_types::Line::new(vec2_to_coord(&start), vec2_to_coord(&end)).is_within(region)
}
