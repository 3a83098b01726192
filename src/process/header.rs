// src/process/header.rs

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+-\d+-\d+").expect("date regex"));
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+:\d+").expect("time regex"));

/// Placeholder shown wherever the feed's last-update stamp is unknown.
pub const UNKNOWN_DATE: &str = "unknown date";

/// The raw lines of one feed snapshot, borrowed from the decoded text.
#[derive(Debug, Clone)]
pub struct FeedText<'a> {
    lines: Vec<&'a str>,
}

impl<'a> FeedText<'a> {
    /// Strict UTF-8 decode. A leading byte-order mark is dropped.
    pub fn decode(bytes: &'a [u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    /// Split on `\n`, keeping a final empty element when the text ends with a newline.
    pub fn new(text: &'a str) -> Self {
        let lines = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Last-update stamp from the feed header. Each half is extracted independently.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeedMetadata {
    /// `YYYY-MM-DD`
    pub last_update_date: Option<String>,
    /// `HH:MM`, 24h
    pub last_update_time: Option<String>,
}

impl FeedMetadata {
    /// Parse both halves into a timestamp, when both exist and are valid.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let date = self.last_update_date.as_deref()?;
        let time = self.last_update_time.as_deref()?;
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").ok()
    }

    /// Human-readable stamp for chart titles.
    pub fn label(meta: Option<&FeedMetadata>) -> String {
        match meta {
            Some(m) => match (&m.last_update_date, &m.last_update_time) {
                (Some(d), Some(t)) => format!("{} {}", d, t),
                (Some(d), None) => d.clone(),
                (None, Some(t)) => format!("{} at {}", UNKNOWN_DATE, t),
                (None, None) => UNKNOWN_DATE.to_string(),
            },
            None => UNKNOWN_DATE.to_string(),
        }
    }
}

/// Data lines left after the header is dropped.
#[derive(Debug, Clone, Copy)]
pub struct DataLines<'f, 'a> {
    /// Configured header size, which may exceed the feed's length.
    pub header_lines: usize,
    /// Number of feed lines before the first data line.
    pub offset: usize,
    pub lines: &'f [&'a str],
}

impl DataLines<'_, '_> {
    /// 1-based feed line number of data line `idx`.
    pub fn line_number(&self, idx: usize) -> usize {
        self.offset + idx + 1
    }

    pub fn non_empty(&self) -> usize {
        self.lines.iter().filter(|l| !l.trim().is_empty()).count()
    }
}

/// Splits the comment header from the data and pulls the last-update stamp out of it.
#[derive(Debug, Clone, Copy)]
pub struct HeaderExtractor {
    header_lines: usize,
    metadata_line: usize,
}

impl HeaderExtractor {
    pub fn new(header_lines: usize, metadata_line: usize) -> Self {
        Self {
            header_lines,
            metadata_line,
        }
    }

    /// Returns the metadata (if any) and `feed[H..]` without its trailing empty line.
    pub fn extract<'f, 'a>(
        &self,
        feed: &'f FeedText<'a>,
    ) -> (Option<FeedMetadata>, DataLines<'f, 'a>) {
        let lines = feed.lines();
        let start = self.header_lines.min(lines.len());
        if start < self.header_lines {
            warn!(
                header_lines = self.header_lines,
                total = lines.len(),
                "feed is shorter than its header"
            );
        }

        let mut data = &lines[start..];
        if let Some((last, rest)) = data.split_last() {
            if last.is_empty() {
                data = rest;
            }
        }

        // the stamp only counts when it sits inside a header that is really there
        let metadata = if self.metadata_line < start {
            extract_metadata(lines[self.metadata_line])
        } else {
            if self.header_lines > 0 && self.metadata_line >= self.header_lines {
                warn!(
                    metadata_line = self.metadata_line,
                    header_lines = self.header_lines,
                    "metadata line is outside the header"
                );
            }
            None
        };
        debug!(?metadata, data_lines = data.len(), "header stripped");

        (
            metadata,
            DataLines {
                header_lines: self.header_lines,
                offset: start,
                lines: data,
            },
        )
    }
}

/// First `\d+-\d+-\d+` and first `\d+:\d+` on the line; `None` when neither is present.
pub fn extract_metadata(line: &str) -> Option<FeedMetadata> {
    let meta = FeedMetadata {
        last_update_date: DATE_RE.find(line).map(|m| m.as_str().to_string()),
        last_update_time: TIME_RE.find(line).map(|m| m.as_str().to_string()),
    };
    if meta.last_update_date.is_none() && meta.last_update_time.is_none() {
        None
    } else {
        Some(meta)
    }
}
