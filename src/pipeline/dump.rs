use crate::pipeline::skeleton::SkeletonGraph;
use geo_types::MultiPolygon;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Side-channel files written when a subdivision or group fails, so the
/// offending geometry can be replayed offline.

pub fn write_voronoi_failure(
    dir: &Path,
    message: &str,
    density: f64,
    region: &MultiPolygon,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("qhull-failure-{}.txt", Uuid::new_v4()));
    let mut text = String::new();
    let _ = writeln!(text, "error: {message}");
    let _ = writeln!(text, "density: {density}");
    let _ = writeln!(text, "polygon: {}", region_text(region));
    fs::write(&path, text)?;
    Ok(path)
}

pub fn write_graph_overtime(
    dir: &Path,
    key: &str,
    graph: &SkeletonGraph,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("graph-overtime-{}.txt", Uuid::new_v4()));
    let mut text = String::new();
    let _ = writeln!(text, "key: {key}");
    text.push_str(&graph.to_dump_text());
    fs::write(&path, text)?;
    Ok(path)
}

fn region_text(region: &MultiPolygon) -> String {
    let ring_text = |ring: &geo_types::LineString| {
        let coords: Vec<String> = ring
            .coords()
            .map(|coord| format!("{} {}", coord.x, coord.y))
            .collect();
        format!("({})", coords.join(", "))
    };

    let polygons: Vec<String> = region
        .iter()
        .map(|polygon| {
            let mut rings = vec![ring_text(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(ring_text));
            format!("({})", rings.join(", "))
        })
        .collect();
    format!("MULTIPOLYGON ({})", polygons.join(", "))
}
