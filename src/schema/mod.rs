pub mod types;

pub use types::Schema;

use serde::{Deserialize, Serialize};

/// Historical layouts of the C2 master feed.
///
/// The two generations differ only in how the secondary entity is named and in
/// how many comment lines precede the data.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// `domain,domain_ip,fqdn_isp,fqdn_isp_ip,malware,url_feed` behind 15 header lines.
    #[default]
    Isp,
    /// `domain,domain_ip,registrar,registrar_ip,malware,url_feed` behind 14 header lines.
    Registrar,
}

impl SchemaVersion {
    pub fn field_names(self) -> Vec<String> {
        let secondary = match self {
            SchemaVersion::Isp => ["fqdn_isp", "fqdn_isp_ip"],
            SchemaVersion::Registrar => ["registrar", "registrar_ip"],
        };
        ["domain", "domain_ip"]
            .into_iter()
            .chain(secondary)
            .chain(["malware", "url_feed"])
            .map(String::from)
            .collect()
    }

    pub fn header_lines(self) -> usize {
        match self {
            SchemaVersion::Isp => 15,
            SchemaVersion::Registrar => 14,
        }
    }

    /// Name of the secondary entity column (ISP or registrar).
    pub fn secondary_field(self) -> &'static str {
        match self {
            SchemaVersion::Isp => "fqdn_isp",
            SchemaVersion::Registrar => "registrar",
        }
    }

    /// Name of the pipe-delimited IP column of the secondary entity.
    pub fn secondary_ip_field(self) -> &'static str {
        match self {
            SchemaVersion::Isp => "fqdn_isp_ip",
            SchemaVersion::Registrar => "registrar_ip",
        }
    }

    pub fn schema(self) -> Schema {
        Schema {
            fields: self.field_names(),
            descriptor_field: "malware".into(),
            multi_valued_field: self.secondary_ip_field().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_schemas() {
        for v in [SchemaVersion::Isp, SchemaVersion::Registrar] {
            let schema = v.schema();
            schema.validate().unwrap();
            assert_eq!(schema.arity(), 6);
            assert_eq!(schema.index_of(v.secondary_field()), Some(2));
            assert_eq!(schema.multi_valued_index(), 3);
            assert_eq!(schema.descriptor_index(), 4);
        }
        assert_eq!(SchemaVersion::Isp.header_lines(), 15);
        assert_eq!(SchemaVersion::Registrar.header_lines(), 14);
    }

    #[test]
    fn expansion_column_names_round_trip() {
        let schema = SchemaVersion::Registrar.schema();
        assert_eq!(schema.expansion_column(2), "registrar_ip_2");
        assert_eq!(schema.parse_expansion_column("registrar_ip_2"), Some(2));
        assert_eq!(schema.parse_expansion_column("registrar_ip"), None);
        assert_eq!(schema.parse_expansion_column("registrar"), None);
        assert_eq!(schema.parse_expansion_column("registrar_ip_x"), None);
    }

    #[test]
    fn validate_rejects_duplicates_and_missing_roles() {
        let dup = Schema::new(vec!["a".into(), "a".into()], "a", "a");
        assert!(dup.is_err());

        let missing = Schema::new(vec!["a".into(), "b".into()], "a", "c");
        assert!(missing.is_err());

        let ok = Schema::new(vec!["a".into(), "b".into()], "a", "b").unwrap();
        assert_eq!(ok.arity(), 2);
    }

    #[test]
    fn version_deserializes_lowercase() {
        let v: SchemaVersion = serde_yaml::from_str("registrar").unwrap();
        assert_eq!(v, SchemaVersion::Registrar);
    }
}
