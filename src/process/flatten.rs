// src/process/flatten.rs

use tracing::debug;

use crate::error::Result;
use crate::process::normalize::{Column, NormalizedTable};

/// One flat, ordered token list for `field` across every record.
///
/// * schema fields: the raw value split on `|` (an empty value yields one empty token)
/// * the descriptor field: the matched family, or [`UNMATCHED_TOKEN`](crate::process::normalize::UNMATCHED_TOKEN)
/// * `<field>_<i>` expansion columns: the present slots only
pub fn flatten(table: &NormalizedTable, field: &str) -> Result<Vec<String>> {
    let column = table.resolve(field)?;
    let mut tokens = Vec::with_capacity(table.len());

    for (r, rec) in table.records().iter().enumerate() {
        match column {
            Column::Field(i) => {
                let raw = rec.values.get(i).map_or("", String::as_str);
                tokens.extend(raw.split('|').map(str::to_string));
            }
            Column::Descriptor => {
                if let Some(d) = table.descriptor(r) {
                    tokens.push(d.as_token().to_string());
                }
            }
            Column::Expansion(i) => {
                if let Some(v) = table.expansion(r, i) {
                    tokens.push(v.to_string());
                }
            }
        }
    }

    debug!(field, tokens = tokens.len(), "flattened");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MALWARE_PATTERN;
    use crate::error::FeedError;
    use crate::process::normalize::{FieldNormalizer, UNMATCHED_TOKEN};
    use crate::process::record::Record;
    use crate::schema::SchemaVersion;
    use regex::Regex;

    fn table(rows: &[&str]) -> NormalizedTable {
        let schema = SchemaVersion::Isp.schema();
        let re = Regex::new(DEFAULT_MALWARE_PATTERN).unwrap();
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| Record {
                line: i + 1,
                values: row.split(',').map(str::to_string).collect(),
            })
            .collect();
        FieldNormalizer::new(&re).normalize(&schema, records)
    }

    #[test]
    fn multi_valued_field_is_flattened_in_record_order() {
        let t = table(&[
            "a.com,1.2.3.4,ispA,5.6.7.8|9.9.9.9,x,u",
            "b.com,1.2.3.4,ispB,5.6.7.8,x,u",
        ]);
        assert_eq!(
            flatten(&t, "fqdn_isp_ip").unwrap(),
            ["5.6.7.8", "9.9.9.9", "5.6.7.8"]
        );
        assert_eq!(flatten(&t, "domain_ip").unwrap(), ["1.2.3.4", "1.2.3.4"]);
    }

    #[test]
    fn token_count_follows_pipe_count() {
        let rows = [
            "a,1,i,p|q|r,x,u",
            "b,2,i,,x,u",
            "c,3,i,|,x,u",
            "d,4,i,s,x,u",
        ];
        let t = table(&rows);
        let tokens = flatten(&t, "fqdn_isp_ip").unwrap();
        let expected: usize = rows
            .iter()
            .map(|r| 1 + r.split(',').nth(3).unwrap().matches('|').count())
            .sum();
        assert_eq!(tokens.len(), expected);
        assert_eq!(tokens, ["p", "q", "r", "", "", "", "s"]);
    }

    #[test]
    fn descriptor_flattens_to_family_or_sentinel() {
        let t = table(&[
            "a,1,i,p,Master Indicator Feed for zeus non-sinkholed domains,u",
            "b,2,i,p,no template here,u",
        ]);
        assert_eq!(flatten(&t, "malware").unwrap(), ["zeus", UNMATCHED_TOKEN]);
    }

    #[test]
    fn expansion_column_skips_absent_slots() {
        let t = table(&["a,1,i,p|q,x,u", "b,2,i,r,x,u", "c,3,i,s|t,x,u"]);
        assert_eq!(flatten(&t, "fqdn_isp_ip_1").unwrap(), ["q", "t"]);
        assert_eq!(flatten(&t, "fqdn_isp_ip_0").unwrap(), ["p", "r", "s"]);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let t = table(&["a,1,i,p,x,u"]);
        assert!(matches!(
            flatten(&t, "asn"),
            Err(FeedError::UnknownField(f)) if f == "asn"
        ));
    }
}
