// src/process/arrow.rs

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema as ArrowSchema},
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};

use crate::error::Result;
use crate::process::normalize::NormalizedTable;

/// Arrow schema of a normalized table: every column nullable `Utf8`.
pub fn build_arrow_schema(table: &NormalizedTable) -> Arc<ArrowSchema> {
    let fields: Vec<Field> = table
        .column_names()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, /* nullable = */ true))
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

/// Columnar copy of the table. Unmatched descriptors and absent expansion
/// slots become nulls.
pub fn to_record_batch(table: &NormalizedTable) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let col = table.resolve(field.name())?;
        let arr: StringArray = (0..table.len()).map(|r| table.value(r, col)).collect();
        columns.push(Arc::new(arr));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Boxed text rendering of the first `limit` rows.
pub fn preview(table: &NormalizedTable, limit: usize) -> Result<String> {
    let batch = to_record_batch(table)?;
    let head = batch.slice(0, limit.min(batch.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MALWARE_PATTERN;
    use crate::process::normalize::FieldNormalizer;
    use crate::process::record::Record;
    use crate::schema::SchemaVersion;
    use arrow::array::Array;
    use regex::Regex;

    fn table() -> NormalizedTable {
        let re = Regex::new(DEFAULT_MALWARE_PATTERN).unwrap();
        let rows = [
            "a.com,1.2.3.4,ispA,5.6.7.8|9.9.9.9,Master Indicator Feed for abc non-sinkholed domains,http://x",
            "b.com,1.2.3.4,ispB,5.6.7.8,unrelated,http://y",
        ];
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, r)| Record {
                line: i + 1,
                values: r.split(',').map(str::to_string).collect(),
            })
            .collect();
        FieldNormalizer::new(&re).normalize(&SchemaVersion::Isp.schema(), records)
    }

    #[test]
    fn batch_has_one_column_per_field_and_slot() {
        let batch = to_record_batch(&table()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 8);
        assert_eq!(batch.schema().field(6).name(), "fqdn_isp_ip_0");
        assert_eq!(batch.schema().field(7).name(), "fqdn_isp_ip_1");
    }

    #[test]
    fn missing_slots_and_unmatched_descriptors_are_null() {
        let batch = to_record_batch(&table()).unwrap();
        let col = |name: &str| {
            batch
                .column_by_name(name)
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
                .clone()
        };

        let second_slot = col("fqdn_isp_ip_1");
        assert_eq!(second_slot.value(0), "9.9.9.9");
        assert!(second_slot.is_null(1));

        let malware = col("malware");
        assert_eq!(malware.value(0), "abc");
        assert!(malware.is_null(1));
    }

    #[test]
    fn preview_renders_header_row() {
        let text = preview(&table(), 1).unwrap();
        assert!(text.contains("fqdn_isp_ip_1"));
        assert!(text.contains("a.com"));
        assert!(!text.contains("b.com"));
    }
}
