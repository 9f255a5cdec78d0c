//! Chart rendering capability for reportgen.
//!
//! The chart stage only depends on [`ChartRenderer`]. The bundled
//! [`SvgChartRenderer`] draws standalone SVG files with illustrative data
//! derived from the request, since reports carry no real datasets.

mod svg;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use reportgen_shared::{ChartKind, ChartRequest, ReportError, Result};
use tracing::debug;

/// Turns a chart request into a file on disk.
pub trait ChartRenderer: Send + Sync {
    /// Render `request` into `dir`.
    ///
    /// Returns `Ok(None)` when the renderer does not draw this kind.
    fn render(&self, request: &ChartRequest, dir: &Path) -> Result<Option<PathBuf>>;
}

/// Maximum characters of the title kept in file names.
const MAX_SLUG_LEN: usize = 20;

/// Renders bar, line, pie, scatter, and table charts as SVG.
#[derive(Debug, Default)]
pub struct SvgChartRenderer {
    counter: AtomicUsize,
}

impl SvgChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this renderer draws `kind`.
    pub fn supports(kind: ChartKind) -> bool {
        matches!(
            kind,
            ChartKind::Bar | ChartKind::Line | ChartKind::Pie | ChartKind::Scatter | ChartKind::Table
        )
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, request: &ChartRequest, dir: &Path) -> Result<Option<PathBuf>> {
        if !Self::supports(request.kind) {
            debug!(kind = %request.kind, title = %request.title, "chart kind not drawn");
            return Ok(None);
        }

        let data = svg::IllustrativeData::for_request(request);
        let document = match request.kind {
            ChartKind::Bar => svg::bar(&request.title, &data),
            ChartKind::Line => svg::line(&request.title, &data),
            ChartKind::Pie => svg::pie(&request.title, &data),
            ChartKind::Scatter => svg::scatter(&request.title, &data),
            ChartKind::Table => svg::table(&request.title, &data),
            ChartKind::Histogram | ChartKind::Box | ChartKind::Heatmap => return Ok(None),
        };

        std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let filename = format!("chart_{n:03}_{}_{}.svg", request.kind, slugify(&request.title));
        let path = dir.join(filename);
        std::fs::write(&path, document).map_err(|e| ReportError::io(&path, e))?;

        debug!(path = %path.display(), "chart rendered");
        Ok(Some(path))
    }
}

/// Filesystem-safe fragment of a title.
fn slugify(title: &str) -> String {
    let slug: String = title
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_SLUG_LEN)
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() { "chart".to_string() } else { slug }
}
