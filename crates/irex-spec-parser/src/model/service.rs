//! Service tree (`<specifications>/service/*.yaml`): policies, rate limits
//! and the recursive service forest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::functions::Selection;
use crate::model::scalar_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceTree {
    pub policies: Option<Policies>,
    pub rate_limits: Option<RateLimits>,
    pub services: Option<ServicesBlock>,
}

impl ServiceTree {
    /// Merge another file's tree into this one.
    ///
    /// Lists are concatenated in order; scalar settings and single blocks
    /// keep the first value that was set.
    pub fn merge(self, other: ServiceTree) -> ServiceTree {
        ServiceTree {
            policies: merge_option(self.policies, other.policies, Policies::merge),
            rate_limits: merge_option(self.rate_limits, other.rate_limits, RateLimits::merge),
            services: merge_option(self.services, other.services, ServicesBlock::merge),
        }
    }

    /// Depth-first pre-order walk over every service, with its dotted spec path.
    pub fn walk_services<F>(&self, mut visit: F)
    where
        F: FnMut(&Service, &str, Option<&Service>),
    {
        fn recurse<F>(services: &[Service], prefix: &str, parent: Option<&Service>, visit: &mut F)
        where
            F: FnMut(&Service, &str, Option<&Service>),
        {
            for service in services {
                let path = format!("{prefix}.{}", service.name);
                visit(service, &path, parent);
                recurse(&service.services, &format!("{path}.services"), Some(service), visit);
            }
        }

        if let Some(block) = &self.services {
            recurse(&block.services, "services.services", None, &mut visit);
        }
    }
}

fn merge_option<T>(a: Option<T>, b: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(merge(a, b)),
        (a, b) => a.or(b),
    }
}

fn first_set(a: String, b: String) -> String {
    if a.is_empty() {
        b
    } else {
        a
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    #[default]
    Allow,
    Deny,
}

/// Request-scoped policies see only request context; resource-scoped
/// policies are evaluated against a loaded resource instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    #[default]
    Request,
    Resource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policies {
    pub mode: String,
    pub precedence: String,
    pub short_circuit: Option<bool>,
    pub defaults: Option<PolicyDefaults>,
    pub presets: Vec<PolicyPreset>,
    pub customs: Vec<CustomPolicy>,
    pub groups: Vec<PolicyGroup>,
}

impl Policies {
    fn merge(mut self, other: Policies) -> Policies {
        self.mode = first_set(self.mode, other.mode);
        self.precedence = first_set(self.precedence, other.precedence);
        self.short_circuit = self.short_circuit.or(other.short_circuit);
        self.defaults = self.defaults.or(other.defaults);
        self.presets.extend(other.presets);
        self.customs.extend(other.customs);
        self.groups.extend(other.groups);
        self
    }

    /// Declared scope of a preset, custom or group by name.
    pub fn scope_of(&self, name: &str) -> Option<Option<PolicyScope>> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.scope)
            .or_else(|| self.customs.iter().find(|c| c.name == name).map(|c| c.scope))
            .or_else(|| self.groups.iter().find(|g| g.name == name).map(|g| g.scope))
    }

    pub fn group(&self, name: &str) -> Option<&PolicyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope_of(name).is_some()
    }
}

/// Values inherited by every preset and custom policy that leaves them unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyDefaults {
    pub effect: Option<PolicyEffect>,
    pub scope: Option<PolicyScope>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyPreset {
    pub name: String,
    pub effect: Option<PolicyEffect>,
    pub scope: Option<PolicyScope>,
    pub rule: String,
    pub description: String,
}

/// A policy whose rule is hand-written in generated code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomPolicy {
    pub name: String,
    pub scope: Option<PolicyScope>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyGroup {
    pub name: String,
    pub scope: Option<PolicyScope>,
    pub description: String,
    pub policies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rate limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitType {
    #[default]
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    #[default]
    Throttle,
    Block,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimits {
    pub defaults: Option<RateLimitDefaults>,
    pub presets: Vec<RateLimitPreset>,
    pub customs: Vec<CustomRateLimit>,
}

impl RateLimits {
    fn merge(mut self, other: RateLimits) -> RateLimits {
        self.defaults = self.defaults.or(other.defaults);
        self.presets.extend(other.presets);
        self.customs.extend(other.customs);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.iter().any(|p| p.name == name) || self.customs.iter().any(|c| c.name == name)
    }
}

/// Response sent when a limit is exceeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitResponse {
    pub status_code: Option<u16>,
    pub body: BTreeMap<String, serde_json::Value>,
}

/// Shape shared by every preset that leaves a field unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitDefaults {
    #[serde(rename = "type")]
    pub limit_type: Option<RateLimitType>,
    pub action: Option<RateLimitAction>,
    #[serde(deserialize_with = "scalar_string")]
    pub limit: String,
    pub count_key: Vec<String>,
    pub bucket_size: Option<u64>,
    #[serde(deserialize_with = "scalar_string")]
    pub refill_rate: String,
    pub burst: Option<u64>,
    pub response: Option<RateLimitResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitPreset {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub limit_type: Option<RateLimitType>,
    pub action: Option<RateLimitAction>,
    /// `"N/window"`, e.g. `100/1m`.
    #[serde(deserialize_with = "scalar_string")]
    pub limit: String,
    pub count_key: Vec<String>,
    pub bucket_size: Option<u64>,
    #[serde(deserialize_with = "scalar_string")]
    pub refill_rate: String,
    pub burst: Option<u64>,
    pub response: Option<RateLimitResponse>,
}

/// A limiter implemented by hand in generated code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomRateLimit {
    pub name: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Top-level `services` block: HTTP settings plus the service forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesBlock {
    pub base_path: String,
    pub cors: Option<bool>,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: Option<bool>,
    pub max_age: Option<u64>,
    pub cache_control: String,
    pub defaults: Option<ServiceDefaults>,
    pub operations: Vec<Operation>,
    pub services: Vec<Service>,
}

impl ServicesBlock {
    fn merge(mut self, other: ServicesBlock) -> ServicesBlock {
        self.base_path = first_set(self.base_path, other.base_path);
        self.cors = self.cors.or(other.cors);
        if self.allowed_origins.is_empty() {
            self.allowed_origins = other.allowed_origins;
        }
        if self.allowed_methods.is_empty() {
            self.allowed_methods = other.allowed_methods;
        }
        if self.allowed_headers.is_empty() {
            self.allowed_headers = other.allowed_headers;
        }
        if self.expose_headers.is_empty() {
            self.expose_headers = other.expose_headers;
        }
        self.allow_credentials = self.allow_credentials.or(other.allow_credentials);
        self.max_age = self.max_age.or(other.max_age);
        self.cache_control = first_set(self.cache_control, other.cache_control);
        self.defaults = self.defaults.or(other.defaults);
        self.operations.extend(other.operations);
        self.services.extend(other.services);
        self
    }
}

/// Inheritable settings. Every field is optional so that a deliberate
/// `false` or empty list is distinguishable from "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceDefaults {
    pub pagination: Option<bool>,
    pub expose: Option<bool>,
    pub soft_delete: Option<bool>,
    pub crud_operations: Option<Selection>,
    pub batch_operations: Option<Selection>,
    pub middlewares: Option<Selection>,
    pub sorting: Option<Selection>,
    pub filtering: Option<Selection>,
    pub search: Option<Selection>,
    pub policies: Option<Selection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Service {
    pub name: String,
    pub description: String,
    pub model: String,
    pub path: String,
    pub expose: Option<bool>,
    pub pagination: Option<bool>,
    pub soft_delete: Option<bool>,
    pub crud_operations: Option<Selection>,
    pub batch_operations: Option<Selection>,
    pub middlewares: Option<Selection>,
    pub sorting: Option<Selection>,
    pub filtering: Option<Selection>,
    pub search: Option<Selection>,
    pub policies: Option<Selection>,
    pub defaults: Option<ServiceDefaults>,
    pub apply: Vec<ApplyBlock>,
    pub operations: Vec<Operation>,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Operation {
    pub name: String,
    pub method: String,
    pub path: String,
    pub description: String,
    pub action: String,
    pub apply: Vec<ApplyBlock>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyKind {
    #[default]
    Policy,
    RateLimit,
}

impl ApplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyKind::Policy => "policy",
            ApplyKind::RateLimit => "rate_limit",
        }
    }
}

/// Binds a named policy or rate limit to a service or operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplyBlock {
    #[serde(rename = "type")]
    pub kind: ApplyKind,
    pub name: String,
    /// Operations the binding is limited to; empty means all.
    pub to_operations: Vec<String>,
    /// Rate limits attached through a policy binding.
    pub rate_limits: Vec<String>,
}

impl ApplyBlock {
    /// Whether this block targets the operation `short` (or its qualified `full` name).
    pub fn targets(&self, short: &str, full: &str) -> bool {
        self.to_operations.is_empty()
            || self
                .to_operations
                .iter()
                .any(|t| t == "*" || t.eq_ignore_ascii_case(short) || t.eq_ignore_ascii_case(full))
    }
}
