use crate::common::config::BufferConfig;
use crate::common::geometry::{
    line_string_to_polyline, polyline_to_line_string, Geometry,
};
use crate::common::lines::{cascaded_union, simplify_dp};
use crate::pipeline::error::CenterlineError;
use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo_types::{MultiPolygon, Polygon};
use std::f64::consts::FRAC_PI_2;

// three segments per quadrant on caps and joins
const ARC_STEP: f64 = FRAC_PI_2 / 3.0;

fn round_style(radius: f64) -> BufferStyle<f64> {
    BufferStyle::new(radius)
        .line_cap(LineCap::Round(ARC_STEP))
        .line_join(LineJoin::Round(ARC_STEP))
}

/// Dilate a group's geometry into one region the skeleton can grow inside.
///
/// Each part is pre-thinned with Douglas-Peucker at the buffer radius (the
/// perimeter detail below that scale cannot survive dilation anyway), then
/// buffered separately and dissolved together. Buffering part by part costs
/// a few unions but fills geometry that single-shot buffering of a whole
/// multi-line has been seen to leave incomplete.
pub fn buffer_group(parts: &[Geometry], config: &BufferConfig) -> Result<MultiPolygon, CenterlineError> {
    let mut buffered: Vec<MultiPolygon> = Vec::new();

    for part in parts {
        match part {
            Geometry::Polyline(line) => buffered.push(buffer_polyline(line, config)),
            Geometry::MultiPolyline(lines) => {
                buffered.extend(lines.iter().map(|line| buffer_polyline(line, config)));
            }
            Geometry::Polygon(polygon) => buffered.push(buffer_polygon(polygon, config)),
            Geometry::MultiPolygon(polygons) => {
                buffered.extend(polygons.iter().map(|polygon| buffer_polygon(polygon, config)));
            }
            Geometry::Point(_) => {
                return Err(CenterlineError::InvalidInput(part.kind()));
            }
        }
    }

    let region = cascaded_union(&buffered);
    if region.0.is_empty() && !buffered.is_empty() {
        return Err(CenterlineError::GeometryEngine(
            "buffering produced no area".to_owned(),
        ));
    }
    Ok(region)
}

fn buffer_polyline(line: &[glam::DVec2], config: &BufferConfig) -> MultiPolygon {
    let thinned = simplify_dp(line, config.buffer);
    polyline_to_line_string(&thinned).buffer_with_style(round_style(config.buffer))
}

fn buffer_polygon(polygon: &Polygon, config: &BufferConfig) -> MultiPolygon {
    let exterior = simplify_dp(&line_string_to_polyline(polygon.exterior()), config.buffer);
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| polyline_to_line_string(&simplify_dp(&line_string_to_polyline(ring), config.buffer)))
        .collect();
    let thinned = Polygon::new(polyline_to_line_string(&exterior), interiors);
    thinned.buffer_with_style(round_style(config.buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geometry::point_within;
    use geo::Area;
    use glam::dvec2 as vec2;

    #[test]
    fn doubled_carriageways_dissolve_into_one_region() {
        let parts = vec![Geometry::MultiPolyline(vec![
            vec![vec2(0.0, 0.0), vec2(100.0, 0.0)],
            vec![vec2(0.0, 4.0), vec2(100.0, 4.0)],
        ])];
        let config = BufferConfig::new(5.0);
        let region = buffer_group(&parts, &config).unwrap();

        assert_eq!(region.0.len(), 1, "the two pills merge");
        // the midline between the carriageways is inside the region
        for step in 0..=10 {
            assert!(point_within(vec2(f64::from(step) * 10.0, 2.0), &region));
        }
        // pill of a 100m line at radius 5, doubled and overlapping
        assert!(region.unsigned_area() > 100.0 * 14.0 * 0.9);
    }

    #[test]
    fn far_apart_lines_stay_separate_parts() {
        let parts = vec![Geometry::MultiPolyline(vec![
            vec![vec2(0.0, 0.0), vec2(100.0, 0.0)],
            vec![vec2(0.0, 500.0), vec2(100.0, 500.0)],
        ])];
        let config = BufferConfig::new(5.0);
        let region = buffer_group(&parts, &config).unwrap();
        assert_eq!(region.0.len(), 2);
    }

    #[test]
    fn input_detail_below_the_radius_is_thinned_away() {
        let wiggly: Vec<glam::DVec2> = (0..200)
            .map(|step| vec2(f64::from(step), if step % 2 == 0 { 0.2 } else { -0.2 }))
            .collect();
        let parts = vec![Geometry::Polyline(wiggly)];
        let config = BufferConfig::new(10.0);
        let region = buffer_group(&parts, &config).unwrap();
        assert_eq!(region.0.len(), 1);
        assert!(point_within(vec2(100.0, 0.0), &region));
    }

    #[test]
    fn polygons_keep_their_holes() {
        let polygon = Polygon::new(
            polyline_to_line_string(&[
                vec2(0.0, 0.0),
                vec2(200.0, 0.0),
                vec2(200.0, 200.0),
                vec2(0.0, 200.0),
            ]),
            vec![polyline_to_line_string(&[
                vec2(50.0, 50.0),
                vec2(150.0, 50.0),
                vec2(150.0, 150.0),
                vec2(50.0, 150.0),
            ])],
        );
        let config = BufferConfig::new(5.0);
        let region = buffer_group(&[Geometry::Polygon(polygon)], &config).unwrap();
        // hole shrinks by the radius but survives
        assert!(!point_within(vec2(100.0, 100.0), &region));
        assert!(point_within(vec2(100.0, 2.0), &region));
    }

    #[test]
    fn points_are_rejected() {
        let config = BufferConfig::new(5.0);
        let result = buffer_group(&[Geometry::Point(vec2(0.0, 0.0))], &config);
        assert!(matches!(result, Err(CenterlineError::InvalidInput("Point"))));
    }
}
