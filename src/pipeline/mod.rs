pub mod buffer;
pub mod carver;
pub mod dump;
pub mod error;
pub mod partition;
pub mod skeleton;
pub mod voronoi;

use crate::common::config::BufferConfig;
use crate::common::geometry::{polygon_rings, Geometry};
use crate::common::lines::{densify, simplify_vw};
use crate::pipeline::buffer::buffer_group;
use crate::pipeline::carver::carve_routes;
use crate::pipeline::error::CenterlineError;
use crate::pipeline::partition::partition_sites;
use crate::pipeline::skeleton::build_skeleton;
use crate::pipeline::voronoi::VoronoiDriver;
use geo_types::MultiPolygon;
use glam::DVec2 as Vec2;
use std::path::PathBuf;

fn dump_dir(config: &BufferConfig) -> PathBuf {
    config.dump_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Collapse one group of lines (or polygons) into its centerlines.
///
/// The group is buffered into a single region, each region part grows a
/// Voronoi skeleton from its densified perimeter, routes are carved out of
/// the skeleton longest-first, and the survivors are simplified. `label`
/// names the group in logs and failure dumps.
///
/// A Voronoi failure drops only its subdivision; carver overtime abandons
/// the whole group after dumping the offending graph.
pub fn multiline_centerline(
    parts: &[Geometry],
    driver: &dyn VoronoiDriver,
    config: &BufferConfig,
    label: &str,
) -> Result<Option<Vec<Vec<Vec2>>>, CenterlineError> {
    let buffered = buffer_group(parts, config)?;

    let mut lines: Vec<Vec<Vec2>> = Vec::new();

    for polygon in &buffered {
        let mut sites = Vec::new();
        for ring in polygon_rings(polygon) {
            sites.extend(densify(&ring, config.density));
        }
        if sites.len() <= 4 {
            continue;
        }

        let region: MultiPolygon = polygon.clone().into();
        for subdivision in partition_sites(&region, sites, config) {
            let diagram = match driver.compute(&subdivision.sites) {
                Ok(diagram) => diagram,
                Err(failure) => {
                    log::warn!("{label}: dropping subdivision: {failure}");
                    match dump::write_voronoi_failure(
                        &dump_dir(config),
                        &failure.to_string(),
                        config.density,
                        &subdivision.region,
                    ) {
                        Ok(path) => log::info!("{label}: wrote {}", path.display()),
                        Err(io_failure) => {
                            log::error!("{label}: could not write failure dump: {io_failure}");
                        }
                    }
                    continue;
                }
            };

            let skeleton = build_skeleton(&subdivision.region, &diagram, config.leaf_prune_depth);
            log::debug!(
                "{label}: skeleton with {} nodes, {} edges",
                skeleton.node_count(),
                skeleton.edge_count()
            );

            let routes = match carve_routes(&skeleton, true, config) {
                Ok(routes) => routes,
                Err(failure) => {
                    if matches!(failure, CenterlineError::CarverOvertime(_)) {
                        match dump::write_graph_overtime(&dump_dir(config), label, &skeleton) {
                            Ok(path) => log::warn!("{label}: {failure}, wrote {}", path.display()),
                            Err(io_failure) => {
                                log::error!("{label}: could not write overtime dump: {io_failure}");
                            }
                        }
                    }
                    return Err(failure);
                }
            };

            for route in routes {
                lines.push(simplify_vw(&route, config.min_area));
            }
        }
    }

    if lines.is_empty() {
        Ok(None)
    } else {
        Ok(Some(lines))
    }
}
