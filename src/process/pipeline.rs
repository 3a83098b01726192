// src/process/pipeline.rs

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::{FeedConfig, SummarySpec};
use crate::error::{FeedError, Result};
use crate::fetch::FeedSource;
use crate::process::{
    flatten::flatten,
    header::{FeedMetadata, FeedText, HeaderExtractor},
    normalize::{FieldNormalizer, NormalizedTable},
    record::{MalformedLine, RecordParser},
    summary::{summarize, FrequencyTable},
};
use crate::render::{Artifact, ChartLabels, ChartRenderer};

/// Counters of one run. Anything that was dropped or degraded shows up here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_lines: usize,
    pub header_lines: usize,
    /// Non-blank lines after the header.
    pub data_lines: usize,
    pub records: usize,
    pub malformed: Vec<MalformedLine>,
    pub unmatched_descriptors: usize,
    pub max_fan_out: usize,
    pub metadata_missing: bool,
}

impl RunStats {
    pub fn malformed_records(&self) -> usize {
        self.malformed.len()
    }
}

/// One frequency table together with the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub spec: SummarySpec,
    /// Length of the flat token list before counting.
    pub tokens: usize,
    pub table: FrequencyTable,
}

#[derive(Debug)]
pub struct FeedReport {
    pub metadata: Option<FeedMetadata>,
    pub table: NormalizedTable,
    pub stats: RunStats,
    pub summaries: Vec<Summary>,
}

impl FeedReport {
    pub fn summary(&self, field: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.spec.field == field)
    }

    /// Chart title with the feed's last-update stamp appended.
    pub fn chart_title(&self, summary: &Summary) -> String {
        let label = FeedMetadata::label(self.metadata.as_ref());
        if self.metadata.is_some() {
            format!("{} (feed {})", summary.spec.title, label)
        } else {
            format!("{} ({})", summary.spec.title, label)
        }
    }
}

/// Parse one snapshot and compute every configured summary.
///
/// Pure: the same bytes and configuration always give the same report.
#[instrument(level = "info", skip_all, fields(bytes = bytes.len()))]
pub fn analyze(bytes: &[u8], config: &FeedConfig) -> Result<FeedReport> {
    // 1) resolve schema + pattern up front so a bad config fails before parsing
    let schema = config.resolve_schema()?;
    let pattern = config.compile_pattern()?;

    // 2) decode + strip header
    let feed = FeedText::decode(bytes)?;
    let (metadata, data) =
        HeaderExtractor::new(config.header_lines(), config.metadata_line).extract(&feed);
    if metadata.is_none() {
        warn!(
            line = config.metadata_line,
            "{}; summaries will say `unknown date`",
            FeedError::MissingMetadata
        );
    }

    // 3) records
    let parsed = RecordParser::new(&schema, config.malformed_policy).parse(data)?;
    let malformed = parsed.malformed;

    // 4) normalize
    let table = FieldNormalizer::new(&pattern).normalize(&schema, parsed.records);

    // 5) summaries
    let summaries = config
        .summaries()
        .into_iter()
        .map(|spec| {
            let tokens = match schema.parse_expansion_column(&spec.field) {
                Some(i) if i >= table.max_fan_out() => {
                    warn!(
                        field = %spec.field,
                        max_fan_out = table.max_fan_out(),
                        "expansion column absent from this snapshot; summary is empty"
                    );
                    Vec::new()
                }
                _ => flatten(&table, &spec.field)?,
            };
            let freq = summarize(&tokens, spec.threshold);
            info!(
                field = %spec.field,
                threshold = spec.threshold,
                tokens = tokens.len(),
                kept = freq.len(),
                "summarized"
            );
            Ok(Summary {
                spec,
                tokens: tokens.len(),
                table: freq,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let stats = RunStats {
        total_lines: feed.len(),
        header_lines: data.offset,
        data_lines: data.non_empty(),
        records: table.len(),
        malformed,
        unmatched_descriptors: table.unmatched_descriptors(),
        max_fan_out: table.max_fan_out(),
        metadata_missing: metadata.is_none(),
    };
    info!(
        records = stats.records,
        malformed = stats.malformed_records(),
        unmatched = stats.unmatched_descriptors,
        "feed analyzed"
    );

    Ok(FeedReport {
        metadata,
        table,
        stats,
        summaries,
    })
}

/// Result of [`run_once`].
#[derive(Debug)]
pub struct RunOutcome {
    pub report: FeedReport,
    pub artifacts: Vec<Artifact>,
}

/// Fetch the configured feed, analyze it and render every summary.
#[instrument(level = "info", skip_all)]
pub async fn run_once<S, R>(config: &FeedConfig, source: &S, renderer: &R) -> Result<RunOutcome>
where
    S: FeedSource,
    R: ChartRenderer,
{
    config.validate()?;
    let url = config.feed_url()?;

    let start = Instant::now();
    let bytes = source.fetch(&url).await?;
    info!(%url, bytes = bytes.len(), elapsed = ?start.elapsed(), "fetched feed");

    let report = analyze(&bytes, config)?;

    let mut artifacts = Vec::with_capacity(report.summaries.len());
    for summary in &report.summaries {
        let labels = ChartLabels {
            title: report.chart_title(summary),
            x_label: summary.spec.x_label.clone(),
            y_label: summary.spec.y_label.clone(),
        };
        let artifact = renderer.render(&summary.table, &labels)?;
        info!(path = %artifact.path.display(), "rendered chart");
        artifacts.push(artifact);
    }

    Ok(RunOutcome { report, artifacts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MalformedPolicy;
    use crate::process::normalize::UNMATCHED_TOKEN;

    fn feed(header: usize, rows: &[&str]) -> String {
        let mut text = String::new();
        for i in 0..header {
            if i == 4 {
                text.push_str("## Feed generated at: 2018-10-17 12:06\n");
            } else {
                text.push_str(&format!("## header {}\n", i));
            }
        }
        for r in rows {
            text.push_str(r);
            text.push('\n');
        }
        text
    }

    fn config(summaries: Vec<SummarySpec>) -> FeedConfig {
        FeedConfig {
            header_lines_to_skip: Some(15),
            summaries: Some(summaries),
            ..FeedConfig::default()
        }
    }

    #[test]
    fn stats_account_for_every_data_line() {
        let text = feed(
            15,
            &[
                "a.com,1.2.3.4,isp,5.6.7.8,Master Indicator Feed for zeus non-sinkholed domains,u",
                "broken,line",
                "",
                "b.com,1.2.3.4,isp,5.6.7.8,nothing,u",
            ],
        );
        let report = analyze(
            text.as_bytes(),
            &config(vec![SummarySpec::new("malware", 0, "Malware")]),
        )
        .unwrap();

        assert_eq!(report.stats.data_lines, 3);
        assert_eq!(report.stats.records, 2);
        assert_eq!(report.stats.malformed_records(), 1);
        assert_eq!(report.stats.malformed[0].line, 17);
        assert_eq!(
            report.stats.records,
            report.stats.data_lines - report.stats.malformed_records()
        );
        assert_eq!(report.stats.unmatched_descriptors, 1);
        assert!(!report.stats.metadata_missing);

        let malware = &report.summary("malware").unwrap().table;
        assert_eq!(malware.get("zeus"), Some(1));
        assert_eq!(malware.get(UNMATCHED_TOKEN), Some(1));
        assert_eq!(
            report.chart_title(&report.summaries[0]),
            "Malware (feed 2018-10-17 12:06)"
        );
    }

    #[test]
    fn strict_policy_aborts() {
        let text = feed(15, &["a,b,c,d,e,f", "x"]);
        let cfg = FeedConfig {
            malformed_policy: MalformedPolicy::Abort,
            ..config(vec![])
        };
        assert!(matches!(
            analyze(text.as_bytes(), &cfg),
            Err(FeedError::MalformedRecord { line: 17, .. })
        ));
    }

    #[test]
    fn missing_stamp_degrades_title_only() {
        // the url looks like a stamp, but it is on a data line
        let text = "#\n#\nx.com,1.1.1.1,isp,2.2.2.2,d,http://9.9.9.9:8080/2019-05-06\n";
        let cfg = FeedConfig {
            header_lines_to_skip: Some(2),
            summaries: Some(vec![SummarySpec::new("domain_ip", 0, "IPs")]),
            ..FeedConfig::default()
        };
        let report = analyze(text.as_bytes(), &cfg).unwrap();
        assert!(report.stats.metadata_missing);
        assert_eq!(
            report.chart_title(&report.summaries[0]),
            "IPs (unknown date)"
        );
    }

    #[test]
    fn expansion_column_beyond_fan_out_gives_empty_summary() {
        let text = feed(15, &["a.com,1.2.3.4,isp,5.6.7.8,d,u"]);
        let report = analyze(
            text.as_bytes(),
            &config(vec![
                SummarySpec::new("fqdn_isp_ip_5", 0, "Sixth provider IP"),
                SummarySpec::new("fqdn_isp_ip_0", 0, "First provider IP"),
            ]),
        )
        .unwrap();
        let sixth = report.summary("fqdn_isp_ip_5").unwrap();
        assert_eq!(sixth.tokens, 0);
        assert!(sixth.table.is_empty());
        assert_eq!(report.summary("fqdn_isp_ip_0").unwrap().table.get("5.6.7.8"), Some(1));
    }

    #[test]
    fn header_only_feed_is_empty() {
        let text = feed(15, &[""]);
        assert!(matches!(
            analyze(text.as_bytes(), &config(vec![])),
            Err(FeedError::EmptyFeed { header_lines: 15 })
        ));
    }
}
