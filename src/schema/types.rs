// src/schema/types.rs

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

/// Ordered field layout of one feed generation.
///
/// Every data line must split into exactly `fields.len()` comma-delimited parts.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Schema {
    pub fields: Vec<String>,
    /// Templated text field the malware family is extracted from.
    pub descriptor_field: String,
    /// Pipe-delimited field expanded into `<field>_<i>` columns.
    pub multi_valued_field: String,
}

impl Schema {
    pub fn new(
        fields: Vec<String>,
        descriptor_field: impl Into<String>,
        multi_valued_field: impl Into<String>,
    ) -> Result<Self> {
        let schema = Self {
            fields,
            descriptor_field: descriptor_field.into(),
            multi_valued_field: multi_valued_field.into(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn descriptor_index(&self) -> usize {
        self.index_of(&self.descriptor_field).unwrap_or_default()
    }

    pub fn multi_valued_index(&self) -> usize {
        self.index_of(&self.multi_valued_field).unwrap_or_default()
    }

    /// Name of the expansion column for slot `idx` of the multi-valued field.
    pub fn expansion_column(&self, idx: usize) -> String {
        format!("{}_{}", self.multi_valued_field, idx)
    }

    /// Reverse of [`Schema::expansion_column`]: `fqdn_isp_ip_3` → `Some(3)`.
    pub fn parse_expansion_column(&self, name: &str) -> Option<usize> {
        name.strip_prefix(&self.multi_valued_field)?
            .strip_prefix('_')?
            .parse()
            .ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(FeedError::Config("schema has no fields".into()));
        }
        for (i, name) in self.fields.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(FeedError::Config(format!("schema field #{} is empty", i)));
            }
            if self.fields[..i].contains(name) {
                return Err(FeedError::Config(format!(
                    "schema field `{}` appears twice",
                    name
                )));
            }
        }
        for role in [&self.descriptor_field, &self.multi_valued_field] {
            if self.index_of(role).is_none() {
                return Err(FeedError::Config(format!(
                    "field `{}` is not part of the schema",
                    role
                )));
            }
        }
        Ok(())
    }
}
