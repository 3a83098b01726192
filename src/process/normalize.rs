// src/process/normalize.rs

use std::ops::Range;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{FeedError, Result};
use crate::process::record::Record;
use crate::schema::Schema;

/// Token standing in for an unmatched descriptor when the descriptor column is flattened.
pub const UNMATCHED_TOKEN: &str = "<unmatched>";

/// Outcome of matching the descriptor pattern against one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Descriptor {
    Matched(String),
    Unmatched,
}

impl Descriptor {
    pub fn family(&self) -> Option<&str> {
        match self {
            Descriptor::Matched(f) => Some(f),
            Descriptor::Unmatched => None,
        }
    }

    pub fn as_token(&self) -> &str {
        self.family().unwrap_or(UNMATCHED_TOKEN)
    }
}

/// Applies `pattern` and returns its first capture group.
pub fn extract_descriptor(pattern: &Regex, raw: &str) -> Descriptor {
    pattern
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| Descriptor::Matched(m.as_str().to_string()))
        .unwrap_or(Descriptor::Unmatched)
}

/// Value of one column for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Plain schema field.
    Field(usize),
    /// The descriptor field, read through its match result.
    Descriptor,
    /// Slot `i` of the multi-valued field.
    Expansion(usize),
}

/// Records plus their normalized descriptor and the ragged expansion of the
/// multi-valued field.
///
/// Expansion slots live in one arena; record `r` owns `slots[spans[r]]`. A
/// record with fewer values than the widest one simply has no slot for the
/// higher indices.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    schema: Schema,
    records: Vec<Record>,
    descriptors: Vec<Descriptor>,
    slots: Vec<String>,
    spans: Vec<Range<usize>>,
    max_fan_out: usize,
}

/// Non-null count of one column, the table overview printed after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub non_null: usize,
}

impl NormalizedTable {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn descriptor(&self, record: usize) -> Option<&Descriptor> {
        self.descriptors.get(record)
    }

    pub fn unmatched_descriptors(&self) -> usize {
        self.descriptors
            .iter()
            .filter(|d| **d == Descriptor::Unmatched)
            .count()
    }

    /// Slot `idx` of the multi-valued field of `record`, if that record has one.
    pub fn expansion(&self, record: usize, idx: usize) -> Option<&str> {
        let span = self.spans.get(record)?;
        if idx >= span.len() {
            return None;
        }
        self.slots.get(span.start + idx).map(String::as_str)
    }

    pub fn fan_out(&self, record: usize) -> usize {
        self.spans.get(record).map_or(0, |s| s.len())
    }

    pub fn max_fan_out(&self) -> usize {
        self.max_fan_out
    }

    /// `<field>_0 .. <field>_{max_fan_out - 1}`
    pub fn expansion_columns(&self) -> Vec<String> {
        (0..self.max_fan_out)
            .map(|i| self.schema.expansion_column(i))
            .collect()
    }

    /// Every column name: schema fields followed by expansion columns.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields
            .iter()
            .cloned()
            .chain(self.expansion_columns())
            .collect()
    }

    /// Resolve a column name. Schema fields win over expansion names.
    pub fn resolve(&self, name: &str) -> Result<Column> {
        if name == self.schema.descriptor_field {
            return Ok(Column::Descriptor);
        }
        if let Some(i) = self.schema.index_of(name) {
            return Ok(Column::Field(i));
        }
        match self.schema.parse_expansion_column(name) {
            Some(i) if i < self.max_fan_out => Ok(Column::Expansion(i)),
            _ => Err(FeedError::UnknownField(name.to_string())),
        }
    }

    /// Cell value; `None` for an unmatched descriptor or a missing slot.
    pub fn value(&self, record: usize, column: Column) -> Option<&str> {
        match column {
            Column::Field(i) => self
                .records
                .get(record)
                .and_then(|r| r.values.get(i))
                .map(String::as_str),
            Column::Descriptor => self.descriptor(record).and_then(Descriptor::family),
            Column::Expansion(i) => self.expansion(record, i),
        }
    }

    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.column_names()
            .into_iter()
            .filter_map(|name| {
                let col = self.resolve(&name).ok()?;
                let non_null = (0..self.len())
                    .filter(|&r| self.value(r, col).is_some())
                    .count();
                Some(ColumnSummary { name, non_null })
            })
            .collect()
    }
}

/// Extracts the malware family and expands the multi-valued field.
pub struct FieldNormalizer<'p> {
    pattern: &'p Regex,
}

impl<'p> FieldNormalizer<'p> {
    pub fn new(pattern: &'p Regex) -> Self {
        Self { pattern }
    }

    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn normalize(&self, schema: &Schema, records: Vec<Record>) -> NormalizedTable {
        let descriptor_idx = schema.descriptor_index();
        let multi_idx = schema.multi_valued_index();

        let mut descriptors = Vec::with_capacity(records.len());
        let mut slots = Vec::new();
        let mut spans = Vec::with_capacity(records.len());
        let mut max_fan_out = 0;

        for rec in &records {
            let raw_desc = rec.values.get(descriptor_idx).map_or("", String::as_str);
            descriptors.push(extract_descriptor(self.pattern, raw_desc));

            let start = slots.len();
            if let Some(raw) = rec.values.get(multi_idx) {
                slots.extend(raw.split('|').map(str::to_string));
            }
            max_fan_out = max_fan_out.max(slots.len() - start);
            spans.push(start..slots.len());
        }

        let table = NormalizedTable {
            schema: schema.clone(),
            records,
            descriptors,
            slots,
            spans,
            max_fan_out,
        };
        debug!(
            max_fan_out,
            unmatched = table.unmatched_descriptors(),
            "normalized table"
        );
        table
    }
}
