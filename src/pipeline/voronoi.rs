use crate::pipeline::error::CenterlineError;
use glam::{dvec2 as vec2, DVec2 as Vec2};
use std::fmt::Write as _;
use std::io::Write as _;
use std::process::{Command, Stdio};

/// A 2D Voronoi diagram of a site set: vertex coordinates plus, per input
/// site, the vertex indices bounding that site's cell in order. Negative
/// indices mark vertices at infinity and are skipped downstream.
#[derive(Clone, Debug, Default)]
pub struct VoronoiDiagram {
    pub vertices: Vec<Vec2>,
    pub cells: Vec<Vec<i64>>,
}

/// The narrow seam to the Voronoi engine, so the external subprocess can be
/// swapped for an in-process implementation without touching the pipeline.
pub trait VoronoiDriver {
    fn compute(&self, sites: &[Vec2]) -> Result<VoronoiDiagram, CenterlineError>;
}

/// Production driver shelling out to qhull's `qvoronoi o`.
///
/// Sites go in on stdin as plain ASCII, the diagram comes back on stdout;
/// both streams are fully buffered around the call and the child never
/// outlives it.
pub struct QvoronoiDriver {
    command: String,
}

impl Default for QvoronoiDriver {
    fn default() -> Self {
        Self {
            command: "qvoronoi".to_owned(),
        }
    }
}

impl QvoronoiDriver {
    pub fn with_command(command: &str) -> Self {
        Self {
            command: command.to_owned(),
        }
    }
}

impl VoronoiDriver for QvoronoiDriver {
    fn compute(&self, sites: &[Vec2]) -> Result<VoronoiDiagram, CenterlineError> {
        let input = format_sites(sites);

        let mut child = Command::new(&self.command)
            .arg("o")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CenterlineError::VoronoiFailure(format!("spawn {}: {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| CenterlineError::VoronoiFailure(format!("write sites: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| CenterlineError::VoronoiFailure(format!("wait: {e}")))?;
        if !output.status.success() {
            return Err(CenterlineError::VoronoiFailure(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| CenterlineError::VoronoiFailure(format!("non-utf8 output: {e}")))?;
        parse_diagram(&text)
    }
}

/// rbox-style input: dimension, count, then one "x y" per site.
fn format_sites(sites: &[Vec2]) -> String {
    let mut input = String::with_capacity(16 + sites.len() * 20);
    let _ = writeln!(input, "2");
    let _ = writeln!(input, "{}", sites.len());
    for site in sites {
        let _ = writeln!(input, "{:.2} {:.2}", site.x, site.y);
    }
    input
}

/// Parse `qvoronoi o` output: a discarded dimension line, a counts line,
/// `|V|` vertex lines, then `|R|` cell lines of `k i1 .. ik`.
fn parse_diagram(text: &str) -> Result<VoronoiDiagram, CenterlineError> {
    let malformed = |detail: &str| CenterlineError::VoronoiFailure(format!("malformed output: {detail}"));

    let mut lines = text.lines();
    lines.next().ok_or_else(|| malformed("empty output"))?;

    let counts = lines.next().ok_or_else(|| malformed("missing counts"))?;
    let mut counts = counts.split_whitespace();
    let vertex_count: usize = counts
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| malformed("bad vertex count"))?;
    let cell_count: usize = counts
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| malformed("bad cell count"))?;

    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let line = lines.next().ok_or_else(|| malformed("truncated vertices"))?;
        let mut tokens = line.split_whitespace();
        let x: f64 = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| malformed("bad vertex x"))?;
        let y: f64 = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| malformed("bad vertex y"))?;
        vertices.push(vec2(x, y));
    }

    let mut cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        let line = lines.next().ok_or_else(|| malformed("truncated cells"))?;
        let mut tokens = line.split_whitespace();
        let len: usize = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| malformed("bad cell length"))?;
        let indices: Vec<i64> = tokens.filter_map(|token| token.parse().ok()).collect();
        if indices.len() != len {
            return Err(malformed("cell length mismatch"));
        }
        cells.push(indices);
    }

    Ok(VoronoiDiagram { vertices, cells })
}
