//! Run configuration for one feed snapshot.
//!
//! Everything a run needs is carried here: where the feed lives, which schema
//! generation it follows, how the descriptor is matched and which frequency
//! summaries are produced. Defaults reproduce the Bambenek C2 master list
//! analysis. A YAML file can override any subset of the fields.

use std::{fs, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FeedError, Result};
use crate::schema::{Schema, SchemaVersion};

pub const DEFAULT_OSINT_URL: &str = "https://osint.bambenekconsulting.com/feeds/";
pub const DEFAULT_FEED_FILE: &str = "c2-masterlist.txt";
pub const DEFAULT_MALWARE_PATTERN: &str =
    "Master Indicator Feed for ([a-z]+) non-sinkholed domains";

/// What to do with a data line whose field count does not match the schema.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the line, count it in the run statistics and keep going.
    #[default]
    Skip,
    /// Fail the run on the first malformed line.
    Abort,
}

/// One frequency chart to produce from the normalized table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SummarySpec {
    /// Schema field or `<multi_valued_field>_<i>` expansion column.
    pub field: String,
    /// Tokens must occur strictly more often than this to be kept.
    pub threshold: usize,
    pub title: String,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
}

impl SummarySpec {
    pub fn new(field: impl Into<String>, threshold: usize, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            threshold,
            title: title.into(),
            x_label: Some("Count".into()),
            y_label: None,
        }
    }
}

/// Upper bound on `fetch.max_retries`.
pub const MAX_FETCH_RETRIES: u32 = 10;

/// HTTP behaviour of the feed fetch.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub osint_url: String,
    pub feed_file_name: String,
    pub schema_version: SchemaVersion,
    /// Leading non-data lines; the schema generation's count when unset.
    pub header_lines_to_skip: Option<usize>,
    /// Explicit field list replacing the generation preset.
    pub schema: Option<Vec<String>>,
    pub descriptor_field: Option<String>,
    pub multi_valued_field: Option<String>,
    pub malware_pattern: String,
    /// Index of the header line that carries the "generated at" stamp.
    pub metadata_line: usize,
    pub malformed_policy: MalformedPolicy,
    /// Charts to produce; the generation's default set when unset.
    pub summaries: Option<Vec<SummarySpec>>,
    pub fetch: FetchConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            osint_url: DEFAULT_OSINT_URL.into(),
            feed_file_name: DEFAULT_FEED_FILE.into(),
            schema_version: SchemaVersion::default(),
            header_lines_to_skip: None,
            schema: None,
            descriptor_field: None,
            multi_valued_field: None,
            malware_pattern: DEFAULT_MALWARE_PATTERN.into(),
            metadata_line: 4,
            malformed_policy: MalformedPolicy::default(),
            summaries: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| FeedError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| FeedError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines_to_skip
            .unwrap_or_else(|| self.schema_version.header_lines())
    }

    /// The schema this run parses against: the generation preset with any
    /// explicit overrides applied.
    pub fn resolve_schema(&self) -> Result<Schema> {
        let preset = self.schema_version.schema();
        Schema::new(
            self.schema.clone().unwrap_or(preset.fields),
            self.descriptor_field
                .clone()
                .unwrap_or(preset.descriptor_field),
            self.multi_valued_field
                .clone()
                .unwrap_or(preset.multi_valued_field),
        )
    }

    /// Compile the descriptor pattern. It must carry exactly one capture group.
    pub fn compile_pattern(&self) -> Result<Regex> {
        let re = Regex::new(&self.malware_pattern)?;
        if re.captures_len() != 2 {
            return Err(FeedError::Config(format!(
                "malware pattern must have exactly one capture group, found {}",
                re.captures_len() - 1
            )));
        }
        Ok(re)
    }

    pub fn summaries(&self) -> Vec<SummarySpec> {
        self.summaries
            .clone()
            .unwrap_or_else(|| default_summaries(self.schema_version))
    }

    /// Full feed URL: `osint_url` joined with `feed_file_name`.
    pub fn feed_url(&self) -> Result<Url> {
        let mut base = self.osint_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|u| u.join(&self.feed_file_name))
            .map_err(|e| FeedError::Config(format!("bad feed url {}: {}", base, e)))
    }

    pub fn validate(&self) -> Result<()> {
        let schema = self.resolve_schema()?;
        self.compile_pattern()?;
        self.feed_url()?;

        let header_lines = self.header_lines();
        if header_lines > 0 && self.metadata_line >= header_lines {
            return Err(FeedError::Config(format!(
                "metadata_line {} is outside the {} header lines",
                self.metadata_line, header_lines
            )));
        }
        if self.fetch.max_retries > MAX_FETCH_RETRIES {
            return Err(FeedError::Config(format!(
                "fetch.max_retries {} exceeds {}",
                self.fetch.max_retries, MAX_FETCH_RETRIES
            )));
        }

        // `<field>_<i>` is accepted for any i; a snapshot with a lower fan-out
        // yields an empty summary for it
        for spec in self.summaries() {
            if schema.index_of(&spec.field).is_none()
                && schema.parse_expansion_column(&spec.field).is_none()
            {
                return Err(FeedError::UnknownField(spec.field));
            }
        }
        Ok(())
    }
}

/// The four charts of the standard C2 master list report.
pub fn default_summaries(version: SchemaVersion) -> Vec<SummarySpec> {
    let entity_title = match version {
        SchemaVersion::Isp => "Service Providers",
        SchemaVersion::Registrar => "Registrars",
    };
    vec![
        SummarySpec::new("domain_ip", 2, "IP addresses of domains"),
        SummarySpec::new("malware", 0, "Malware frequency"),
        SummarySpec::new(
            version.secondary_ip_field(),
            10,
            format!("IP addresses of {}", entity_title),
        ),
        SummarySpec::new(
            version.secondary_field(),
            5,
            format!("Frequency of Events by Domain Names of {}", entity_title),
        ),
    ]
}
