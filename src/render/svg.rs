// src/render/svg.rs

use std::{fmt::Write as _, fs, path::PathBuf};

use tracing::{debug, warn};

use super::{slug, Artifact, ChartLabels, ChartRenderer};
use crate::error::{FeedError, Result};
use crate::process::summary::FrequencyTable;

const WIDTH: usize = 960;
const ROW_HEIGHT: usize = 22;
const TOP: usize = 48;
const BOTTOM: usize = 56;
const RIGHT: usize = 48;
const CHAR_WIDTH: usize = 7;

/// Horizontal bar chart, largest count on top, written as `<slug>.svg`.
#[derive(Debug, Clone)]
pub struct SvgBarRenderer {
    out_dir: PathBuf,
}

impl SvgBarRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Build the SVG document without touching the filesystem.
    pub fn to_svg(&self, table: &FrequencyTable, labels: &ChartLabels) -> String {
        let longest = table.iter().map(|e| e.token.chars().count()).max().unwrap_or(0);
        let left = 24 + (longest.clamp(4, 40) * CHAR_WIDTH);
        let plot_width = WIDTH.saturating_sub(left + RIGHT).max(1);
        let height = TOP + BOTTOM + table.len().max(1) * ROW_HEIGHT;
        let max = table.max_count().max(1);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = WIDTH,
            h = height
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="28" font-size="16" text-anchor="middle">{}</text>"#,
            WIDTH / 2,
            escape(&labels.title)
        );

        for (row, entry) in table.descending().into_iter().enumerate() {
            let y = TOP + row * ROW_HEIGHT;
            let bar = entry.count * plot_width / max;
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#,
                left - 6,
                y + ROW_HEIGHT / 2 + 4,
                escape(&entry.token)
            );
            let _ = writeln!(
                svg,
                r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#1f77b4"/>"##,
                left,
                y + 3,
                bar.max(1),
                ROW_HEIGHT - 6
            );
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}">{}</text>"#,
                left + bar.max(1) + 4,
                y + ROW_HEIGHT / 2 + 4,
                entry.count
            );
        }

        let axis_y = height - BOTTOM + 4;
        let _ = writeln!(
            svg,
            r#"<line x1="{l}" y1="{top}" x2="{l}" y2="{y}" stroke="black"/><line x1="{l}" y1="{y}" x2="{r}" y2="{y}" stroke="black"/>"#,
            l = left,
            top = TOP,
            y = axis_y,
            r = left + plot_width
        );
        if let Some(x) = &labels.x_label {
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
                left + plot_width / 2,
                height - 16,
                escape(x)
            );
        }
        if let Some(y) = &labels.y_label {
            let _ = writeln!(
                svg,
                r#"<text transform="translate(14,{}) rotate(-90)" text-anchor="middle">{}</text>"#,
                TOP + (height - TOP - BOTTOM) / 2,
                escape(y)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl ChartRenderer for SvgBarRenderer {
    fn render(&self, table: &FrequencyTable, labels: &ChartLabels) -> Result<Artifact> {
        if table.is_empty() {
            warn!(title = %labels.title, "nothing above threshold; rendering empty chart");
        }
        fs::create_dir_all(&self.out_dir).map_err(|e| FeedError::io(&self.out_dir, e))?;
        let path = self.out_dir.join(format!("{}.svg", slug(&labels.title)));
        fs::write(&path, self.to_svg(table, labels)).map_err(|e| FeedError::io(&path, e))?;
        debug!(path = %path.display(), bars = table.len(), "wrote svg");
        Ok(Artifact {
            title: labels.title.clone(),
            path,
        })
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
