// src/process/record.rs

use serde::Serialize;
use tracing::{instrument, trace, warn};

use crate::config::MalformedPolicy;
use crate::error::{FeedError, Result};
use crate::process::header::DataLines;
use crate::schema::Schema;

/// One comma-delimited data line, values aligned with the schema's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the feed.
    pub line: usize,
    pub values: Vec<String>,
}

impl Record {
    pub fn get<'r>(&'r self, schema: &Schema, field: &str) -> Option<&'r str> {
        schema
            .index_of(field)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

/// A data line rejected under [`MalformedPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    pub line: usize,
    pub found: usize,
}

#[derive(Debug, Default)]
pub struct ParsedRecords {
    pub records: Vec<Record>,
    pub malformed: Vec<MalformedLine>,
}

pub struct RecordParser<'s> {
    schema: &'s Schema,
    policy: MalformedPolicy,
}

impl<'s> RecordParser<'s> {
    pub fn new(schema: &'s Schema, policy: MalformedPolicy) -> Self {
        Self { schema, policy }
    }

    /// Split every non-empty data line on `,` into exactly `schema.arity()` values.
    ///
    /// Blank lines are ignored. A feed with no non-blank data line is an
    /// [`FeedError::EmptyFeed`].
    #[instrument(level = "debug", skip_all, fields(lines = data.lines.len()))]
    pub fn parse(&self, data: DataLines<'_, '_>) -> Result<ParsedRecords> {
        if data.non_empty() == 0 {
            return Err(FeedError::EmptyFeed {
                header_lines: data.header_lines,
            });
        }

        let expected = self.schema.arity();
        let mut out = ParsedRecords {
            records: Vec::with_capacity(data.lines.len()),
            malformed: Vec::new(),
        };

        for (idx, raw) in data.lines.iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line = data.line_number(idx);
            let values: Vec<String> = raw.split(',').map(str::to_string).collect();

            if values.len() != expected {
                match self.policy {
                    MalformedPolicy::Abort => {
                        return Err(FeedError::MalformedRecord {
                            line,
                            expected,
                            found: values.len(),
                        })
                    }
                    MalformedPolicy::Skip => {
                        warn!(line, expected, found = values.len(), "skipping malformed record");
                        out.malformed.push(MalformedLine {
                            line,
                            found: values.len(),
                        });
                        continue;
                    }
                }
            }

            trace!(line, "parsed record");
            out.records.push(Record { line, values });
        }

        Ok(out)
    }
}
