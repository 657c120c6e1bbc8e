use crate::common::config::BufferConfig;
use crate::common::geometry::{create_polygon, intersection_polygons};
use geo::algorithm::buffer::Buffer;
use geo_types::MultiPolygon;
use glam::{dvec2 as vec2, DVec2 as Vec2};
use nalgebra::{Matrix2, SymmetricEigen};

/// One spatially independent slice of an oversized site set: the clipped and
/// re-sealed buffer region together with the sites that fall in it.
#[derive(Clone, Debug)]
pub struct Subdivision {
    pub region: MultiPolygon,
    pub sites: Vec<Vec2>,
}

/// Split `sites` along the principal axis of their covariance until every
/// subdivision holds fewer than `max_sites_per_cell` sites, clipping the
/// buffer region to follow each half.
///
/// Voronoi construction degrades badly past a few thousand sites, so big
/// perimeters are cut across their long direction and the halves are
/// processed as independent diagrams.
pub fn partition_sites(
    region: &MultiPolygon,
    sites: Vec<Vec2>,
    config: &BufferConfig,
) -> Vec<Subdivision> {
    let mut subdivisions = Vec::new();
    split_recursive(region, sites, config, &mut subdivisions);
    subdivisions
}

fn split_recursive(
    region: &MultiPolygon,
    sites: Vec<Vec2>,
    config: &BufferConfig,
    out: &mut Vec<Subdivision>,
) {
    if sites.len() < config.max_sites_per_cell {
        out.push(Subdivision {
            region: region.clone(),
            sites,
        });
        return;
    }

    let Some((half_a, half_b)) = principal_axis_split(&sites) else {
        // no spread to split on, take the whole set as-is
        out.push(Subdivision {
            region: region.clone(),
            sites,
        });
        return;
    };

    for (points, rectangle) in [half_a, half_b] {
        let clip = create_polygon(&rectangle).into();
        // clip to the half, then re-buffer so the skeleton is not cut off
        // right at the dividing line
        let sealed = intersection_polygons(region, &clip).buffer(config.buffer);
        split_recursive(&sealed, points, config, out);
    }
}

type Half = (Vec<Vec2>, [Vec2; 4]);

/// Split a point cloud across its major axis: rotate so the dominant
/// eigenvector of the covariance is horizontal, cut at the centroid, and hand
/// back each half with its axis-aligned bounding rectangle un-rotated into
/// the original frame. `None` when one side comes up empty.
fn principal_axis_split(points: &[Vec2]) -> Option<(Half, Half)> {
    let count = points.len() as f64;
    let centroid = points.iter().sum::<Vec2>() / count;

    let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
    for point in points {
        let delta = *point - centroid;
        xx += delta.x * delta.x;
        xy += delta.x * delta.y;
        yy += delta.y * delta.y;
    }
    let covariance = Matrix2::new(xx / count, xy / count, xy / count, yy / count);

    let eigen = SymmetricEigen::new(covariance);
    // the larger eigenvalue marks the major axis; ties take the first
    let major = if eigen.eigenvalues[1] > eigen.eigenvalues[0] {
        1
    } else {
        0
    };
    let axis = eigen.eigenvectors.column(major);
    let angle = axis[1].atan2(axis[0]);
    let rotation = Vec2::from_angle(-angle);

    let mut left = Vec::new();
    let mut right = Vec::new();
    for point in points {
        let rotated = rotation.rotate(*point - centroid);
        if rotated.x < 0.0 {
            left.push((*point, rotated));
        } else {
            right.push((*point, rotated));
        }
    }
    if left.is_empty() || right.is_empty() {
        return None;
    }

    Some((
        finish_half(left, centroid, angle),
        finish_half(right, centroid, angle),
    ))
}

fn finish_half(half: Vec<(Vec2, Vec2)>, centroid: Vec2, angle: f64) -> Half {
    let mut min = Vec2::splat(f64::INFINITY);
    let mut max = Vec2::splat(f64::NEG_INFINITY);
    for (_, rotated) in &half {
        min = min.min(*rotated);
        max = max.max(*rotated);
    }

    let back = Vec2::from_angle(angle);
    let corner = |x: f64, y: f64| back.rotate(vec2(x, y)) + centroid;
    let rectangle = [
        corner(min.x, min.y),
        corner(max.x, min.y),
        corner(max.x, max.y),
        corner(min.x, max.y),
    ];

    (half.into_iter().map(|(point, _)| point).collect(), rectangle)
}
