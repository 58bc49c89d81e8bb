//! Project configuration (`irex.yaml`).

use serde::{Deserialize, Serialize};

use crate::functions::OptionValue;
use crate::model::scalar_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigTree {
    pub project: Option<Project>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Project {
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub author: String,
    pub license: String,
    pub timezone: String,
    pub paths: Option<Paths>,
    pub generator: Option<Generator>,
    pub runtime: Option<Runtime>,
    pub meta: Option<Meta>,
}

/// Locations of specification sources, templates and generated output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub specifications: String,
    pub templates: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Generator {
    pub schema: Option<bool>,
    pub service: Option<bool>,
    pub dry_run: Option<bool>,
    pub clean_before: Option<bool>,
}

/// Target platform and framework choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Runtime {
    pub name: String,
    pub scaffold: Option<bool>,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub options: Option<RuntimeOptions>,
    pub schema: Option<SchemaRuntime>,
    pub service: Option<ServiceRuntime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    pub package_manager: String,
    pub entry: String,
    pub dev_nodemon: Option<bool>,
}

/// Data-layer framework, e.g. an ODM or ORM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaRuntime {
    pub framework: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub options: Option<SchemaRuntimeOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaRuntimeOptions {
    pub uri: Option<OptionValue>,
    pub db: Option<OptionValue>,
}

/// HTTP framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceRuntime {
    pub framework: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub options: Option<ServiceRuntimeOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceRuntimeOptions {
    pub logger: Option<bool>,
    pub port: Option<u16>,
    pub host: Option<OptionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Meta {
    /// RFC 3339 timestamp.
    pub created_at: String,
    #[serde(deserialize_with = "scalar_string")]
    pub generator_version: String,
}
