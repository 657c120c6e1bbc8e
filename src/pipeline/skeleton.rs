use crate::common::geometry::{point_within, segment_within, Line};
use crate::pipeline::voronoi::VoronoiDiagram;
use ahash::AHashMap;
use geo_types::MultiPolygon;
use glam::DVec2 as Vec2;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};

#[derive(Clone, Debug)]
pub struct NodePayload {
    pub point: Vec2,
}

#[derive(Clone, Debug)]
pub struct EdgePayload {
    pub length: f64,
    pub segment: Line,
}

/// The interior part of a Voronoi diagram: vertices inside the buffer region
/// connected by cell-boundary segments that stay inside it, with short leaf
/// chains trimmed off.
#[derive(Clone, Debug, Default)]
pub struct SkeletonGraph {
    pub graph: StableUnGraph<NodePayload, EdgePayload>,
}

impl SkeletonGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Plain-text form used by the overtime dump.
    pub fn to_dump_text(&self) -> String {
        let mut text = String::new();
        text.push_str("nodes:\n");
        for index in self.graph.node_indices() {
            let point = self.graph[index].point;
            text.push_str(&format!("  {}: {} {}\n", index.index(), point.x, point.y));
        }
        text.push_str("edges:\n");
        for edge in self.graph.edge_indices() {
            if let (Some((a, b)), Some(payload)) = (
                self.graph.edge_endpoints(edge),
                self.graph.edge_weight(edge),
            ) {
                text.push_str(&format!(
                    "  {} - {}: {}\n",
                    a.index(),
                    b.index(),
                    payload.length
                ));
            }
        }
        text
    }
}

/// Keep only the parts of `diagram` strictly inside `region` and prune
/// whiskers shorter than `leaf_prune_depth`.
pub fn build_skeleton(
    region: &MultiPolygon,
    diagram: &VoronoiDiagram,
    leaf_prune_depth: f64,
) -> SkeletonGraph {
    let mut graph = StableUnGraph::default();
    let mut retained: AHashMap<i64, NodeIndex> = AHashMap::new();

    for (index, &vertex) in diagram.vertices.iter().enumerate() {
        if point_within(vertex, region) {
            retained.insert(index as i64, graph.add_node(NodePayload { point: vertex }));
        }
    }

    for cell in &diagram.cells {
        if cell.is_empty() {
            continue;
        }
        // consecutive boundary pairs, wrapping back to close the cell
        for pair in 0..cell.len() {
            let v = cell[pair];
            let w = cell[(pair + 1) % cell.len()];
            if v == w {
                continue;
            }
            let (Some(&node_v), Some(&node_w)) = (retained.get(&v), retained.get(&w)) else {
                continue;
            };
            let start = graph[node_v].point;
            let end = graph[node_w].point;
            let length = start.distance(end);
            if length > 0.0 && segment_within(start, end, region) {
                graph.update_edge(
                    node_v,
                    node_w,
                    EdgePayload {
                        length,
                        segment: (start, end),
                    },
                );
            }
        }
    }

    prune_leaves(&mut graph, leaf_prune_depth);
    SkeletonGraph { graph }
}

/// Repeatedly strip degree-1 nodes whose accumulated chain length from the
/// terminus is still below `depth_limit`, handing the walked length to the
/// neighbor so erosion stops once a chain has proven itself long enough.
fn prune_leaves(graph: &mut StableUnGraph<NodePayload, EdgePayload>, depth_limit: f64) {
    let mut depths: AHashMap<NodeIndex, f64> = AHashMap::new();
    let mut removing = true;

    while removing {
        removing = false;
        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        for index in nodes {
            if graph.neighbors(index).count() != 1 {
                continue;
            }
            let depth = depths.get(&index).copied().unwrap_or(0.0);
            if depth >= depth_limit {
                continue;
            }
            let Some(neighbor) = graph.neighbors(index).next() else {
                continue;
            };
            let length = graph
                .find_edge(index, neighbor)
                .and_then(|edge| graph.edge_weight(edge))
                .map_or(0.0, |payload| payload.length);
            depths.insert(neighbor, depth + length);
            graph.remove_node(index);
            removing = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geometry::create_polygon;
    use glam::dvec2 as vec2;

    fn strip_region() -> MultiPolygon {
        create_polygon(&[
            vec2(-5.0, -5.0),
            vec2(105.0, -5.0),
            vec2(105.0, 9.0),
            vec2(-5.0, 9.0),
        ])
        .into()
    }

    /// Diagram whose cells chain consecutive vertices into a path.
    fn chain_diagram(vertices: Vec<Vec2>) -> VoronoiDiagram {
        let cells = (0..vertices.len().saturating_sub(1))
            .map(|index| vec![index as i64, index as i64 + 1])
            .collect();
        VoronoiDiagram { vertices, cells }
    }

    #[test]
    fn keeps_only_interior_vertices_and_segments() {
        let region = strip_region();
        let diagram = chain_diagram(vec![
            vec2(-50.0, 2.0),
            vec2(10.0, 2.0),
            vec2(50.0, 2.0),
            vec2(90.0, 2.0),
            vec2(150.0, 2.0),
        ]);
        let skeleton = build_skeleton(&region, &diagram, 0.0);
        assert_eq!(skeleton.node_count(), 3);
        assert_eq!(skeleton.edge_count(), 2);
        for index in skeleton.graph.node_indices() {
            assert!(point_within(skeleton.graph[index].point, &region));
        }
    }

    #[test]
    fn duplicate_cell_boundaries_share_one_edge() {
        let region = strip_region();
        let vertices = vec![vec2(10.0, 2.0), vec2(20.0, 2.0)];
        let diagram = VoronoiDiagram {
            vertices,
            cells: vec![vec![0, 1], vec![1, 0]],
        };
        let skeleton = build_skeleton(&region, &diagram, 0.0);
        assert_eq!(skeleton.edge_count(), 1);
    }

    #[test]
    fn negative_indices_are_skipped() {
        let region = strip_region();
        let diagram = VoronoiDiagram {
            vertices: vec![vec2(10.0, 2.0), vec2(20.0, 2.0)],
            cells: vec![vec![-1, 0, 1]],
        };
        let skeleton = build_skeleton(&region, &diagram, 0.0);
        assert_eq!(skeleton.node_count(), 2);
        assert_eq!(skeleton.edge_count(), 1);
    }

    #[test]
    fn pruning_removes_short_whiskers() {
        let region = strip_region();
        // trunk along y=2 with a 3m whisker hanging off the middle
        let diagram = VoronoiDiagram {
            vertices: vec![
                vec2(0.0, 2.0),
                vec2(30.0, 2.0),
                vec2(60.0, 2.0),
                vec2(90.0, 2.0),
                vec2(60.0, 5.0),
            ],
            cells: vec![vec![0, 1], vec![1, 2], vec![2, 3], vec![2, 4]],
        };
        let skeleton = build_skeleton(&region, &diagram, 20.0);
        // whisker tip and both trunk tips go, then erosion stops at depth 30
        for index in skeleton.graph.node_indices() {
            assert!(skeleton.graph[index].point.y < 5.0);
        }
        assert!(!skeleton
            .graph
            .node_indices()
            .any(|index| skeleton.graph[index].point == vec2(60.0, 5.0)));
    }

    #[test]
    fn no_leaf_remains_below_prune_depth() {
        let region = strip_region();
        let diagram = chain_diagram(
            (0..40)
                .map(|step| vec2(f64::from(step) * 2.5, 2.0))
                .collect(),
        );
        let skeleton = build_skeleton(&region, &diagram, 20.0);
        // erosion strips eight 2.5m links from each end before the
        // accumulated depth reaches the limit
        assert_eq!(skeleton.node_count(), 24);
        for index in skeleton.graph.node_indices() {
            assert_eq!(skeleton.graph.neighbors(index).count().min(2), {
                let x = skeleton.graph[index].point.x;
                if x == 20.0 || x == 77.5 {
                    1
                } else {
                    2
                }
            });
        }
    }
}
