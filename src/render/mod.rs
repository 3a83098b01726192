//! Chart output for frequency tables.
//!
//! The pipeline only hands a [`FrequencyTable`] and its labels to a
//! [`ChartRenderer`]; how the chart is drawn and where it lands is up to the
//! renderer.

pub mod json;
pub mod svg;

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::process::summary::FrequencyTable;

pub use json::JsonRenderer;
pub use svg::SvgBarRenderer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

impl ChartLabels {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: None,
            y_label: None,
        }
    }
}

/// Handle to a rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub title: String,
    pub path: PathBuf,
}

pub trait ChartRenderer {
    fn render(&self, table: &FrequencyTable, labels: &ChartLabels) -> Result<Artifact>;
}

/// File-name friendly form of a title: `IP addresses (feed 2018-10-17 12:06)` →
/// `ip-addresses-feed-2018-10-17-12-06`.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "chart".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(
            slug("IP addresses of domains (feed 2018-10-17 12:06)"),
            "ip-addresses-of-domains-feed-2018-10-17-12-06"
        );
        assert_eq!(slug("  Malware  frequency!! "), "malware-frequency");
        assert_eq!(slug("???"), "chart");
    }
}
