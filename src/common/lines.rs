use crate::common::geometry::{union_polygons, EMPTY_MULTI_POLYGON};
use ahash::{AHashMap, AHashSet};
use geo_types::MultiPolygon;
use glam::DVec2 as Vec2;

/// Insert evenly spaced points so no consecutive pair is farther apart than
/// `distance`. Endpoints are kept exactly; zero-length segments contribute
/// nothing.
pub fn densify(points: &[Vec2], distance: f64) -> Vec<Vec2> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let mut coords = vec![first];
    for &next in rest {
        let prev = coords[coords.len() - 1];
        let delta = next - prev;
        let steps = (delta.length() / distance).ceil();
        if steps < 1.0 {
            continue;
        }
        let count = steps as usize;
        for step in 1..count {
            coords.push(prev + delta * (step as f64 / steps));
        }
        coords.push(next);
    }
    coords
}

fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    0.5 * (b - a).perp_dot(c - a).abs()
}

/// Visvalingam-Whyatt simplification down to the given area.
///
/// Each pass removes every apex whose triangle falls below `min_area`,
/// smallest first, skipping apexes whose neighbors were already touched this
/// pass. Passes repeat until one removes nothing.
pub fn simplify_vw(points: &[Vec2], min_area: f64) -> Vec<Vec2> {
    let mut points = points.to_vec();
    while points.len() > 3 {
        let mut popped: AHashSet<usize> = AHashSet::new();
        let mut preserved: AHashSet<usize> = AHashSet::new();

        let mut areas: Vec<(f64, usize)> = points
            .windows(3)
            .enumerate()
            .map(|(index, triple)| (triangle_area(triple[0], triple[1], triple[2]), index))
            .collect();
        areas.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (area, index) in areas {
            if area > min_area {
                // nothing larger can be removed this pass
                break;
            }
            if preserved.contains(&(index + 1)) {
                // apex sits next to an earlier removal
                continue;
            }
            preserved.insert(index);
            popped.insert(index + 1);
            preserved.insert(index + 2);
        }

        if popped.is_empty() {
            break;
        }
        points = points
            .iter()
            .enumerate()
            .filter(|(index, _)| !popped.contains(index))
            .map(|(_, &point)| point)
            .collect();
    }
    points
}

/// Douglas-Peucker simplification with the classic anchor/floater stack.
///
/// Points whose projection falls outside the anchor-floater segment are
/// measured by raw distance to the nearer endpoint, which also covers the
/// degenerate case of coincident anchor and floater.
pub fn simplify_dp(points: &[Vec2], tolerance: f64) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    let mut stack = vec![(0, points.len() - 1)];

    while let Some((anchor, floater)) = stack.pop() {
        let delta = points[floater] - points[anchor];
        let axis = if delta.length() > 0.0 {
            delta / delta.length()
        } else {
            Vec2::ZERO
        };

        let mut max_dist = 0.0;
        let mut farthest = anchor + 1;
        for index in anchor + 1..floater {
            let to_anchor = points[index] - points[anchor];
            let projection = to_anchor.dot(axis);
            let dist_to_seg = if projection < 0.0 {
                to_anchor.length()
            } else {
                let to_floater = points[index] - points[floater];
                let back_projection = to_floater.dot(-axis);
                if back_projection < 0.0 {
                    to_floater.length()
                } else {
                    (to_floater.length_squared() - back_projection * back_projection)
                        .abs()
                        .sqrt()
                }
            };
            if dist_to_seg > max_dist {
                max_dist = dist_to_seg;
                farthest = index;
            }
        }

        if max_dist <= tolerance {
            keep[anchor] = true;
            keep[floater] = true;
        } else {
            stack.push((anchor, farthest));
            stack.push((farthest, floater));
        }
    }

    points
        .iter()
        .zip(&keep)
        .filter(|(_, &kept)| kept)
        .map(|(&point, _)| point)
        .collect()
}

/// Union a set of polygons pairwise as a balanced tree, keeping the merge
/// depth logarithmic on big inputs.
pub fn cascaded_union(polys: &[MultiPolygon]) -> MultiPolygon {
    match polys.len() {
        0 => EMPTY_MULTI_POLYGON,
        1 => polys[0].clone(),
        2 => union_polygons(&polys[0], &polys[1]),
        len => {
            let half = len / 2;
            union_polygons(&cascaded_union(&polys[..half]), &cascaded_union(&polys[half..]))
        }
    }
}

fn endpoint_key(point: Vec2) -> (u64, u64) {
    (point.x.to_bits(), point.y.to_bits())
}

/// Join line fragments that meet end-to-end into maximal polylines.
///
/// Fragments are only merged where exactly two line ends meet; junction
/// points stay as breaks so network topology survives.
pub fn merge_lines(lines: Vec<Vec<Vec2>>) -> Vec<Vec<Vec2>> {
    let lines: Vec<Vec<Vec2>> = lines.into_iter().filter(|line| line.len() >= 2).collect();

    let mut ends: AHashMap<(u64, u64), Vec<(usize, bool)>> = AHashMap::new();
    for (index, line) in lines.iter().enumerate() {
        ends.entry(endpoint_key(line[0])).or_default().push((index, true));
        ends.entry(endpoint_key(line[line.len() - 1]))
            .or_default()
            .push((index, false));
    }

    let mut consumed = vec![false; lines.len()];
    let mut merged = Vec::new();

    for start in 0..lines.len() {
        if consumed[start] {
            continue;
        }
        consumed[start] = true;
        let mut chain = lines[start].clone();

        // grow off the tail, flip, then grow off the other end
        for _ in 0..2 {
            loop {
                let tail = chain[chain.len() - 1];
                let Some(attached) = ends.get(&endpoint_key(tail)) else {
                    break;
                };
                let open: Vec<(usize, bool)> = attached
                    .iter()
                    .copied()
                    .filter(|&(index, _)| !consumed[index])
                    .collect();
                if attached.len() != 2 || open.len() != 1 {
                    break;
                }
                let (index, at_start) = open[0];
                consumed[index] = true;
                let mut part = lines[index].clone();
                if !at_start {
                    part.reverse();
                }
                chain.extend(part.into_iter().skip(1));
            }
            chain.reverse();
        }
        merged.push(chain);
    }
    merged
}
