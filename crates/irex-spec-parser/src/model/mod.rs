//! Typed trees for the three specification kinds.

pub mod config;
pub mod schema;
pub mod service;

use std::fmt;
use std::path::Path;

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::Serialize;

pub use config::ConfigTree;
pub use schema::ModelCatalogue;
pub use service::ServiceTree;

/// The kind of a specification file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Config,
    Schema,
    Service,
}

impl SpecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecKind::Config => "config",
            SpecKind::Schema => "schema",
            SpecKind::Service => "service",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "config" => Some(Self::Config),
            "schema" => Some(Self::Schema),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    /// Infer the kind from a file location: `irex.yaml` is the config,
    /// otherwise the parent directory name decides.
    pub fn infer(path: &Path) -> Option<Self> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        if matches!(file_name, "irex.yaml" | "irex.yml") {
            return Some(Self::Config);
        }
        let parent = path.parent()?.file_name().and_then(|n| n.to_str())?;
        match parent {
            "schema" => Some(Self::Schema),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    /// Diagnostic code for a missing file of this kind.
    pub fn not_found_code(&self) -> &'static str {
        match self {
            SpecKind::Config => "config.not_found",
            SpecKind::Schema => "schema.not_found",
            SpecKind::Service => "service.not_found",
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decodable specification tree.
pub trait SpecDocument: DeserializeOwned + Serialize + Default {
    const KIND: SpecKind;
}

impl SpecDocument for ConfigTree {
    const KIND: SpecKind = SpecKind::Config;
}

impl SpecDocument for ModelCatalogue {
    const KIND: SpecKind = SpecKind::Schema;
}

impl SpecDocument for ServiceTree {
    const KIND: SpecKind = SpecKind::Service;
}

/// Accept any YAML scalar as a string, so `version: 1` and `version: "1"` agree.
pub(crate) fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_config_by_file_name() {
        assert_eq!(SpecKind::infer(Path::new("proj/irex.yaml")), Some(SpecKind::Config));
        assert_eq!(SpecKind::infer(Path::new("irex.yml")), Some(SpecKind::Config));
    }

    #[test]
    fn infer_by_parent_directory() {
        assert_eq!(SpecKind::infer(Path::new("spec/schema/user.yaml")), Some(SpecKind::Schema));
        assert_eq!(SpecKind::infer(Path::new("spec/service/api.yaml")), Some(SpecKind::Service));
        assert_eq!(SpecKind::infer(Path::new("spec/other/api.yaml")), None);
    }
}
