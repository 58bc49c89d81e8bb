//! Cross-reference checks over the normalized service tree and the model
//! catalogue. Every finding is an error.

use std::collections::HashSet;

use irex_diagnostics::{Diagnostic, Reporter};
use irex_spec_parser::model::service::{
    ApplyBlock, ApplyKind, Policies, PolicyScope, RateLimits, Service,
};
use irex_spec_parser::{ModelCatalogue, ServiceTree};

use crate::ir::CrudAction;

/// Resolve every model, policy and rate-limit reference, and check that
/// operation names cannot collide.
pub fn validate_semantics(tree: &ServiceTree, catalogue: &ModelCatalogue) -> Vec<Diagnostic> {
    let r = Reporter::new();
    let refs = References {
        policies: tree.policies.as_ref(),
        rate_limits: tree.rate_limits.as_ref(),
    };

    if let Some(policies) = refs.policies {
        check_group_members(&r, policies);
    }

    tree.walk_services(|service, path, _| {
        if !service.model.is_empty() && catalogue.find(&service.model).is_none() {
            r.error(
                format!(
                    "Service '{}' references unknown model '{}'.",
                    service.name, service.model
                ),
                None,
                "service.model.not_found",
                path,
            );
        }

        let policy_names = service
            .policies
            .as_ref()
            .and_then(|s| s.names())
            .unwrap_or_default();
        for name in policy_names {
            if !refs.has_policy(name) {
                r.error(
                    format!("Referenced policy does not exist: {name}"),
                    None,
                    "service.policy.not_found",
                    &format!("{path}.policies"),
                );
            }
        }

        refs.check_apply(&r, &service.apply, path);
        for op in &service.operations {
            refs.check_apply(&r, &op.apply, &format!("{path}.operations.{}", op.name));
        }

        check_operation_names(&r, service, path);
    });

    if let Some(block) = &tree.services {
        let mut seen = HashSet::new();
        for op in &block.operations {
            refs.check_apply(&r, &op.apply, &format!("services.operations.{}", op.name));
            if !op.name.is_empty() && !seen.insert(op.name.as_str()) {
                r.error(
                    format!("Duplicate operation name: {}", op.name),
                    None,
                    "service.operation.duplicate",
                    &format!("services.operations.{}", op.name),
                );
            }
        }
    }

    r.into_diagnostics()
}

struct References<'a> {
    policies: Option<&'a Policies>,
    rate_limits: Option<&'a RateLimits>,
}

impl References<'_> {
    fn has_policy(&self, name: &str) -> bool {
        self.policies.is_some_and(|p| p.contains(name))
    }

    fn has_rate_limit(&self, name: &str) -> bool {
        self.rate_limits.is_some_and(|r| r.contains(name))
    }

    fn check_apply(&self, r: &Reporter, blocks: &[ApplyBlock], path: &str) {
        for (idx, block) in blocks.iter().enumerate() {
            let block_path = format!("{path}.apply[{idx}]");
            match block.kind {
                ApplyKind::Policy => {
                    match self.policies.and_then(|p| p.scope_of(&block.name)) {
                        None => r.error(
                            format!("Referenced policy does not exist: {}", block.name),
                            None,
                            "service.apply.policy.not_found",
                            &block_path,
                        ),
                        Some(Some(PolicyScope::Resource)) if !block.rate_limits.is_empty() => r.error(
                            format!(
                                "Policy '{}': resource-scoped policies must not apply rate limits",
                                block.name
                            ),
                            None,
                            "service.apply.scope_conflict",
                            &block_path,
                        ),
                        Some(_) => {}
                    }
                    for limit in &block.rate_limits {
                        self.check_rate_limit(r, limit, &block_path);
                    }
                }
                ApplyKind::RateLimit => self.check_rate_limit(r, &block.name, &block_path),
            }
        }
    }

    fn check_rate_limit(&self, r: &Reporter, name: &str, path: &str) {
        if !self.has_rate_limit(name) {
            r.error(
                format!("Referenced rate limit does not exist: {name}"),
                None,
                "service.apply.rate_limit.not_found",
                path,
            );
        }
    }
}

fn check_group_members(r: &Reporter, policies: &Policies) {
    for group in &policies.groups {
        for member in &group.policies {
            if !policies.contains(member) {
                r.error(
                    format!(
                        "Policy group '{}' references unknown policy '{member}'.",
                        group.name
                    ),
                    None,
                    "service.policies.group.member.not_found",
                    &format!("policies.groups.{}", group.name),
                );
            }
        }
    }
}

fn check_operation_names(r: &Reporter, service: &Service, path: &str) {
    let mut names = HashSet::new();

    if !service.model.is_empty() {
        let selected = service
            .crud_operations
            .as_ref()
            .and_then(|s| s.names())
            .unwrap_or_default();
        for name in selected {
            if name != "*" && CrudAction::parse(name).is_none() {
                r.error(
                    format!("Unknown CRUD action '{name}' in service '{}'.", service.name),
                    None,
                    "service.crud_operation.invalid",
                    &format!("{path}.crud_operations"),
                );
            }
        }
        for action in CrudAction::select(selected) {
            names.insert(action.as_str().to_string());
        }
    }

    for op in &service.operations {
        if op.name.is_empty() {
            continue;
        }
        if !names.insert(op.name.clone()) {
            r.error(
                format!(
                    "Duplicate operation name: {}.{}",
                    service.name, op.name
                ),
                None,
                "service.operation.duplicate",
                &format!("{path}.operations.{}", op.name),
            );
        }
    }
}
