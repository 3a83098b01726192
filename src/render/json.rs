// src/render/json.rs

use std::{fs::File, io::BufWriter, path::PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{slug, Artifact, ChartLabels, ChartRenderer};
use crate::error::{FeedError, Result};
use crate::process::summary::FrequencyTable;

/// Writes the chart data as `<slug>.json` for plotting elsewhere.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct ChartDocument<'a> {
    #[serde(flatten)]
    labels: &'a ChartLabels,
    entries: &'a FrequencyTable,
}

impl JsonRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl ChartRenderer for JsonRenderer {
    fn render(&self, table: &FrequencyTable, labels: &ChartLabels) -> Result<Artifact> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| FeedError::io(&self.out_dir, e))?;
        let path = self.out_dir.join(format!("{}.json", slug(&labels.title)));
        let file = File::create(&path).map_err(|e| FeedError::io(&path, e))?;

        let doc = ChartDocument {
            labels,
            entries: table,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &doc).map_err(|e| {
            FeedError::Render {
                title: labels.title.clone(),
                message: e.to_string(),
            }
        })?;
        debug!(path = %path.display(), entries = table.len(), "wrote json");

        Ok(Artifact {
            title: labels.title.clone(),
            path,
        })
    }
}
