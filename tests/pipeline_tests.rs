use std::io::Write;

use anyhow::Result;
use c2feed::{
    config::{FeedConfig, SummarySpec},
    fetch::FileFeedSource,
    process::{analyze, flatten, run_once, summarize},
    render::{ChartRenderer, JsonRenderer, SvgBarRenderer},
    FeedError,
};
use tempfile::{tempdir, NamedTempFile};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ROW_A: &str = "a.com,1.2.3.4,regA,5.6.7.8|9.9.9.9,Master Indicator Feed for abc non-sinkholed domains,http://x";
const ROW_B: &str = "b.com,1.2.3.4,regB,5.6.7.8,Master Indicator Feed for abc non-sinkholed domains,http://y";

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,c2feed=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 13 comment lines, the 5th carrying the generation stamp, then `rows`.
fn feed_text(rows: &[&str]) -> String {
    let mut text = String::new();
    for i in 0..13 {
        if i == 4 {
            text.push_str("## Feed generated at: 2018-10-17 12:06\n");
        } else {
            text.push_str(&format!("## comment line {}\n", i));
        }
    }
    for r in rows {
        text.push_str(r);
        text.push('\n');
    }
    text
}

fn config() -> FeedConfig {
    FeedConfig::from_yaml_str(
        r#"
header_lines_to_skip: 13
metadata_line: 4
schema: [domain, domain_ip, secondary_entity, secondary_entity_ip, malware_descriptor, url_feed]
descriptor_field: malware_descriptor
multi_valued_field: secondary_entity_ip
summaries:
  - field: domain_ip
    threshold: 0
    title: IP addresses of domains
  - field: secondary_entity_ip
    threshold: 1
    title: IP addresses of registrars
    x_label: Count
  - field: malware_descriptor
    threshold: 0
    title: Malware frequency
"#,
    )
    .expect("valid test config")
}

#[test]
fn two_record_feed_produces_expected_frequencies() -> Result<()> {
    init_test_logging();
    let text = feed_text(&[ROW_A, ROW_B]);
    let report = analyze(text.as_bytes(), &config())?;

    assert_eq!(report.table.len(), 2);
    assert_eq!(report.stats.malformed_records(), 0);
    assert_eq!(report.table.max_fan_out(), 2);

    let domain_ip = &report.summary("domain_ip").unwrap().table;
    assert_eq!(domain_ip.len(), 1);
    assert_eq!(domain_ip.get("1.2.3.4"), Some(2));

    assert_eq!(
        flatten(&report.table, "secondary_entity_ip")?,
        ["5.6.7.8", "9.9.9.9", "5.6.7.8"]
    );
    let provider_ips = &report.summary("secondary_entity_ip").unwrap().table;
    assert_eq!(provider_ips.len(), 1);
    assert_eq!(provider_ips.get("5.6.7.8"), Some(2));
    assert_eq!(provider_ips.get("9.9.9.9"), None);

    let malware = &report.summary("malware_descriptor").unwrap().table;
    assert_eq!(malware.get("abc"), Some(2));

    let meta = report.metadata.as_ref().unwrap();
    assert_eq!(meta.last_update_date.as_deref(), Some("2018-10-17"));
    assert_eq!(meta.last_update_time.as_deref(), Some("12:06"));
    Ok(())
}

#[test]
fn identical_snapshots_give_identical_tables() -> Result<()> {
    let text = feed_text(&[ROW_A, ROW_B, ROW_A, "broken"]);
    let first = analyze(text.as_bytes(), &config())?;
    let second = analyze(text.as_bytes(), &config())?;

    for (a, b) in first.summaries.iter().zip(&second.summaries) {
        assert_eq!(serde_json::to_string(&a.table)?, serde_json::to_string(&b.table)?);
    }
    assert_eq!(first.stats, second.stats);
    Ok(())
}

#[test]
fn header_only_feed_is_rejected() {
    let text = feed_text(&[""]);
    let err = analyze(text.as_bytes(), &config()).unwrap_err();
    assert!(matches!(err, FeedError::EmptyFeed { .. }));
}

#[test]
fn thresholds_are_monotone_over_real_tokens() -> Result<()> {
    let text = feed_text(&[ROW_A, ROW_B, ROW_A]);
    let report = analyze(text.as_bytes(), &config())?;
    let tokens = flatten(&report.table, "secondary_entity_ip")?;
    for t1 in 0..4 {
        let low = summarize(&tokens, t1);
        let high = summarize(&tokens, t1 + 1);
        assert!(high.iter().all(|e| low.get(&e.token) == Some(e.count)));
    }
    Ok(())
}

#[test]
fn renderers_accept_report_tables() -> Result<()> {
    let text = feed_text(&[ROW_A, ROW_B]);
    let report = analyze(text.as_bytes(), &config())?;
    let dir = tempdir()?;

    let summary = &report.summaries[1];
    let labels = c2feed::render::ChartLabels {
        title: report.chart_title(summary),
        x_label: summary.spec.x_label.clone(),
        y_label: None,
    };
    let svg = SvgBarRenderer::new(dir.path()).render(&summary.table, &labels)?;
    assert_eq!(
        svg.path.file_name().unwrap(),
        "ip-addresses-of-registrars-feed-2018-10-17-12-06.svg"
    );
    Ok(())
}

#[tokio::test]
async fn run_once_reads_snapshot_and_renders_every_summary() -> Result<()> {
    init_test_logging();
    let mut snapshot = NamedTempFile::new()?;
    snapshot.write_all(feed_text(&[ROW_A, ROW_B]).as_bytes())?;
    let out = tempdir()?;

    let mut cfg = config();
    cfg.summaries
        .as_mut()
        .unwrap()
        .push(SummarySpec::new("secondary_entity_ip_1", 0, "Second provider IP"));

    let outcome = run_once(
        &cfg,
        &FileFeedSource::new(snapshot.path()),
        &JsonRenderer::new(out.path()),
    )
    .await?;

    assert_eq!(outcome.artifacts.len(), 4);
    assert!(outcome.artifacts.iter().all(|a| a.path.exists()));
    let second = &outcome.report.summary("secondary_entity_ip_1").unwrap().table;
    assert_eq!(second.get("9.9.9.9"), Some(1));
    assert_eq!(second.len(), 1);
    Ok(())
}
