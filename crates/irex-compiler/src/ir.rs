//! The intermediate representation handed to code generators.
//!
//! Every registry is a `BTreeMap` so that the JSON projection is
//! deterministic.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use irex_spec_parser::model::schema::{FieldDb, ModelDb, RelationKind};
use irex_spec_parser::model::service::{
    PolicyEffect, PolicyScope, RateLimitAction, RateLimitResponse, RateLimitType,
};
use irex_spec_parser::OptionValue;

/// Fully resolved output of the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<IrConfig>,
    pub http: IrHttp,
    pub models: BTreeMap<String, IrModel>,
    pub services: BTreeMap<String, IrService>,
    pub operations: BTreeMap<String, IrOperation>,
    pub routes: BTreeMap<String, IrRoute>,
    pub request_policies: BTreeMap<String, IrPolicy>,
    pub resource_policies: BTreeMap<String, IrPolicy>,
    pub policy_groups: BTreeMap<String, IrPolicyGroup>,
    pub rate_limits: BTreeMap<String, IrRateLimit>,
}

impl IrBundle {
    /// Pretty JSON projection.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up a policy in either catalogue.
    pub fn policy(&self, name: &str) -> Option<&IrPolicy> {
        self.request_policies
            .get(name)
            .or_else(|| self.resource_policies.get(name))
    }

    /// Whether `name` is a policy or a policy group.
    pub fn resolves_policy(&self, name: &str) -> bool {
        self.policy(name).is_some() || self.policy_groups.contains_key(name)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrConfig {
    pub project: IrProject,
    pub paths: IrPaths,
    pub generator: IrGenerator,
    pub runtime: IrRuntime,
    pub meta: IrMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrProject {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub license: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrPaths {
    pub specifications: String,
    pub templates: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrGenerator {
    pub schema: bool,
    pub service: bool,
    pub dry_run: bool,
    pub clean_before: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRuntime {
    pub name: String,
    pub version: String,
    pub scaffold: bool,
    pub package_manager: String,
    pub entry: String,
    pub dev_nodemon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<IrFramework>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<IrFramework>,
}

/// A framework choice. Option values stay deferred; generators resolve env references.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrFramework {
    pub framework: String,
    pub version: String,
    pub options: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub generator_version: String,
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP and CORS settings from the top-level services block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrHttp {
    pub base_path: String,
    pub cors: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    pub cache_control: String,
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrModel {
    pub name: String,
    pub description: String,
    pub fields: Vec<IrField>,
    pub timestamps: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_strategy: Option<String>,
    pub indexes: Vec<IrIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<ModelDb>,
    pub relations: Vec<IrRelation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrField {
    pub name: String,
    /// `None` for embedded objects, which carry `fields` instead.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    pub required: bool,
    pub unique: bool,
    pub trim: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<IrField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<FieldDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrIndex {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRelation {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

// ---------------------------------------------------------------------------
// Services, operations, routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Model,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrService {
    pub name: String,
    pub kind: ServiceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose: Option<bool>,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Data,
    Custom,
}

/// The five inferred data actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl CrudAction {
    pub const ALL: [CrudAction; 5] = [
        CrudAction::Create,
        CrudAction::Read,
        CrudAction::Update,
        CrudAction::Delete,
        CrudAction::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Create => "create",
            CrudAction::Read => "read",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
            CrudAction::List => "list",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
    }

    /// Actions selected by a resolved list, in canonical order. `*` selects all.
    pub fn select(names: &[String]) -> Vec<CrudAction> {
        Self::ALL
            .into_iter()
            .filter(|a| {
                names
                    .iter()
                    .any(|n| n == "*" || a.as_str().eq_ignore_ascii_case(n))
            })
            .collect()
    }
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOperation {
    pub action: CrudAction,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns_entity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns_list: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrOperation {
    pub name: String,
    /// Owning service; empty for top-level operations.
    pub service: String,
    pub method: String,
    pub path: String,
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One `(method, path)` binding, keyed by [`route_id`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRoute {
    pub id: String,
    pub method: String,
    pub path: String,
    pub service: String,
    pub operation: String,
    pub request_policies: Vec<String>,
    pub base_rate_limits: Vec<String>,
    pub resource_policies: Vec<String>,
    pub middlewares: Vec<String>,
}

/// `service:METHOD:operation`.
pub fn route_id(service: &str, method: &str, operation: &str) -> String {
    format!("{service}:{method}:{operation}")
}

// ---------------------------------------------------------------------------
// Policies and rate limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrPolicy {
    pub name: String,
    pub rule: String,
    pub effect: PolicyEffect,
    pub description: String,
    /// Rule is implemented by hand in generated code.
    pub custom: bool,
}

/// A named bundle of policies. Routes carry the expanded members; the
/// group itself is kept so applied group names still resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrPolicyGroup {
    pub name: String,
    pub scope: Option<PolicyScope>,
    pub description: String,
    /// Members as declared, which may name other groups.
    pub policies: Vec<String>,
}

/// `requests` per `window`, parsed from `"N/window"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitWindow {
    pub requests: u64,
    pub window: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRateLimit {
    pub name: String,
    #[serde(rename = "type")]
    pub limit_type: RateLimitType,
    pub limit: LimitWindow,
    pub count_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refill_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u64>,
    pub action: RateLimitAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<RateLimitResponse>,
    pub custom: bool,
}
