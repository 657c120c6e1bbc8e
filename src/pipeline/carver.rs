use crate::common::config::BufferConfig;
use crate::pipeline::error::CenterlineError;
use crate::pipeline::skeleton::SkeletonGraph;
use itertools::Itertools;
use petgraph::algo::astar;
use petgraph::stable_graph::NodeIndex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WATCHDOG_POLL: Duration = Duration::from_millis(25);

/// Timer thread that raises a flag once the budget elapses. The carver polls
/// the flag between iterations; dropping the watchdog always cancels and
/// joins the thread.
struct Watchdog {
    fired: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    fn arm(budget: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = {
            let fired = Arc::clone(&fired);
            let cancel = Arc::clone(&cancel);
            thread::spawn(move || {
                let start = Instant::now();
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    if start.elapsed() >= budget {
                        fired.store(true, Ordering::Relaxed);
                        return;
                    }
                    thread::sleep(WATCHDOG_POLL);
                }
            })
        };
        Self {
            fired,
            cancel,
            handle: Some(handle),
        }
    }

    fn expired(&self) -> bool {
        self.fired.load(Ordering::Relaxed)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Carve routes out of the skeleton until no edges remain, longest-first when
/// `find_longest` is set, under a wall-clock budget proportional to the node
/// count.
///
/// Works on its own copy of the graph; every edge ends up in at most one
/// route. Routes shorter than `min_length` are dropped.
pub fn carve_routes(
    skeleton: &SkeletonGraph,
    find_longest: bool,
    config: &BufferConfig,
) -> Result<Vec<Vec<glam::DVec2>>, CenterlineError> {
    let mut graph = skeleton.graph.clone();

    let budget_secs = (config.time_coefficient * graph.node_count() as f64).max(1.0);
    let watchdog = Watchdog::arm(Duration::from_secs_f64(budget_secs));

    let mut routes = Vec::new();

    loop {
        if watchdog.expired() {
            return Err(CenterlineError::CarverOvertime(budget_secs));
        }
        if graph.edge_count() == 0 {
            break;
        }

        let degree = |index: NodeIndex| graph.neighbors(index).count();

        let mut candidates: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&index| degree(index) == 1)
            .collect();

        if candidates.len() == 1 || !find_longest {
            // with a single leaf we would get nowhere, so Y-junctions join in
            candidates.extend(graph.node_indices().filter(|&index| degree(index) == 3));
        }

        if candidates.is_empty() {
            // a cycle: seed from any degree-2 node and its neighbor
            if let Some(node) = graph.node_indices().find(|&index| degree(index) == 2) {
                if let Some(neighbor) = graph.neighbors(node).next() {
                    candidates = vec![node, neighbor];
                }
            }
        }

        let mut pairs: Vec<(f64, NodeIndex, NodeIndex)> = candidates
            .iter()
            .copied()
            .tuple_combinations()
            .map(|(v, w)| (graph[v].point.distance(graph[w].point), v, w))
            .collect();
        if find_longest {
            pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
        } else {
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        let mut carved = false;
        for (_, v, w) in pairs {
            let goal = graph[w].point;
            let Some((_, path)) = astar(
                &graph,
                v,
                |index| index == w,
                |edge| {
                    if find_longest {
                        edge.weight().length
                    } else {
                        1.0
                    }
                },
                |index| graph[index].point.distance(goal),
            ) else {
                // no path between this pair, try another
                continue;
            };

            for pair in path.windows(2) {
                if let Some(edge) = graph.find_edge(pair[0], pair[1]) {
                    graph.remove_edge(edge);
                }
            }
            routes.push(path.iter().map(|&index| graph[index].point).collect());
            carved = true;
            break;
        }

        if !carved {
            break;
        }
    }

    Ok(routes
        .into_iter()
        .filter(|route: &Vec<glam::DVec2>| {
            route
                .windows(2)
                .map(|pair| pair[0].distance(pair[1]))
                .sum::<f64>()
                > config.min_length
        })
        .collect())
}
