// src/error.rs

use std::io;

use thiserror::Error;

/// Errors raised while fetching, parsing or summarizing one feed snapshot.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Transport failure or non-success status while fetching the feed.
    #[error("failed to fetch feed from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed is not valid UTF-8: {0}")]
    Decoding(#[from] std::str::Utf8Error),

    /// A data line did not split into the schema's arity.
    #[error("malformed record at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Header line carried no last-update stamp. Only ever reported, never returned from a run.
    #[error("feed header has no last-update date/time")]
    MissingMetadata,

    #[error("feed has no data lines after skipping {header_lines} header lines")]
    EmptyFeed { header_lines: usize },

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("invalid malware pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("arrow conversion failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to render `{title}`: {message}")]
    Render { title: String, message: String },
}

impl FeedError {
    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FeedError::MissingMetadata)
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        FeedError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
