use thiserror::Error;

/// Failures the centerline pipeline can surface.
///
/// Voronoi failures are recovered per subdivision and overtime per group;
/// both are logged and dumped before processing moves on. Invalid input and
/// geometry-engine failures propagate to the caller, which skips the group.
#[derive(Debug, Error)]
pub enum CenterlineError {
    #[error("voronoi driver failed: {0}")]
    VoronoiFailure(String),

    #[error("route carving ran over its {0:.1}s budget")]
    CarverOvertime(f64),

    #[error("centerline input must be lines or polygons, got {0}")]
    InvalidInput(&'static str),

    #[error("geometry engine error: {0}")]
    GeometryEngine(String),
}
