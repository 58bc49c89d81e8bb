use std::collections::HashSet;

use irex_diagnostics::{Diagnostic, Reporter};
use irex_spec_parser::model::service::{
    ApplyBlock, Operation, Policies, RateLimitType, RateLimits, ServicesBlock,
};
use irex_spec_parser::ServiceTree;

/// HTTP methods accepted on explicit operations.
pub(crate) const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Validate a (possibly merged) service tree.
pub fn validate_service(tree: &ServiceTree) -> Vec<Diagnostic> {
    check_tree(tree, true)
}

/// Validate one service file on its own. The required blocks and the base
/// path may live in sibling files, so their absence is not reported here.
pub fn validate_service_file(tree: &ServiceTree) -> Vec<Diagnostic> {
    check_tree(tree, false)
}

fn check_tree(tree: &ServiceTree, whole: bool) -> Vec<Diagnostic> {
    let r = Reporter::new();

    if *tree == ServiceTree::default() {
        r.error("Service specification is empty.", None, "service.root.missing", "");
        return r.into_diagnostics();
    }

    match &tree.policies {
        Some(policies) => check_policies(&r, policies),
        None if !whole => {}
        None => r.error("Missing required 'policies' block.", None, "service.policies.missing", "policies"),
    }
    match &tree.rate_limits {
        Some(rate_limits) => check_rate_limits(&r, rate_limits),
        None if !whole => {}
        None => r.error(
            "Missing required 'rate_limits' block.",
            None,
            "service.rate_limits.missing",
            "rate_limits",
        ),
    }
    match &tree.services {
        Some(services) => check_services(&r, tree, services, whole),
        None if !whole => {}
        None => r.error("Missing required 'services' block.", None, "service.services.missing", "services"),
    }

    r.into_diagnostics()
}

/// Presets, customs and groups share one namespace.
fn check_policies(r: &Reporter, policies: &Policies) {
    let mut names = HashSet::new();
    let default_scope = policies.defaults.as_ref().and_then(|d| d.scope);

    for (idx, preset) in policies.presets.iter().enumerate() {
        let path = named_path("policies.presets", &preset.name, idx);
        check_policy_name(r, &mut names, &preset.name, "preset", &path);
        if preset.scope.is_none() && default_scope.is_none() {
            r.warn(
                format!("Policy preset '{}' should declare a scope.", preset.name),
                None,
                "service.policies.preset.scope.recommended",
                &path,
            );
        }
    }
    for (idx, custom) in policies.customs.iter().enumerate() {
        let path = named_path("policies.customs", &custom.name, idx);
        check_policy_name(r, &mut names, &custom.name, "custom", &path);
    }
    for (idx, group) in policies.groups.iter().enumerate() {
        let path = named_path("policies.groups", &group.name, idx);
        check_policy_name(r, &mut names, &group.name, "group", &path);
        if group.scope.is_none() {
            r.error(
                format!("Policy group '{}' must declare a scope.", group.name),
                None,
                "service.policies.group.scope.required",
                &path,
            );
        }
        if group.policies.is_empty() {
            r.warn(
                format!("Policy group '{}' contains no policies.", group.name),
                None,
                "service.policies.group.policies.empty",
                &path,
            );
        }
    }
}

fn check_policy_name<'a>(r: &Reporter, names: &mut HashSet<&'a str>, name: &'a str, kind: &str, path: &str) {
    if name.is_empty() {
        r.error(
            format!("Policy {kind} name is required."),
            None,
            &format!("service.policies.{kind}.name.required"),
            path,
        );
    } else if !names.insert(name) {
        r.error(
            format!("Duplicate policy name: {name}"),
            None,
            &format!("service.policies.{kind}.name.duplicate"),
            path,
        );
    }
}

fn check_rate_limits(r: &Reporter, rate_limits: &RateLimits) {
    let mut names = HashSet::new();
    let defaults = rate_limits.defaults.as_ref();
    let default_limit = defaults.is_some_and(|d| !d.limit.is_empty());
    let default_type = defaults.and_then(|d| d.limit_type);

    for (idx, preset) in rate_limits.presets.iter().enumerate() {
        let path = named_path("rate_limits.presets", &preset.name, idx);
        check_rate_limit_name(r, &mut names, &preset.name, "preset", &path);

        let is_bucket = preset.limit_type.or(default_type) == Some(RateLimitType::TokenBucket);
        if preset.limit.is_empty() && !default_limit && !is_bucket {
            r.warn(
                format!("Rate limit preset '{}' should declare a limit such as \"100/1m\".", preset.name),
                None,
                "service.rate_limits.preset.limit.recommended",
                &path,
            );
        } else if !preset.limit.is_empty() && !has_request_count(&preset.limit) {
            r.warn(
                format!(
                    "Rate limit preset '{}' has limit '{}'; expected a request count such as \"100/1m\".",
                    preset.name, preset.limit
                ),
                None,
                "service.rate_limits.preset.limit.invalid",
                &path,
            );
        }
    }
    for (idx, custom) in rate_limits.customs.iter().enumerate() {
        let path = named_path("rate_limits.customs", &custom.name, idx);
        check_rate_limit_name(r, &mut names, &custom.name, "custom", &path);
    }
}

fn has_request_count(limit: &str) -> bool {
    let count = limit.split_once('/').map_or(limit, |(count, _)| count);
    count.trim().parse::<u64>().is_ok()
}

fn check_rate_limit_name<'a>(r: &Reporter, names: &mut HashSet<&'a str>, name: &'a str, kind: &str, path: &str) {
    if name.is_empty() {
        r.error(
            format!("Rate limit {kind} name is required."),
            None,
            &format!("service.rate_limits.{kind}.name.required"),
            path,
        );
    } else if !names.insert(name) {
        r.error(
            format!("Duplicate rate limit name: {name}"),
            None,
            &format!("service.rate_limits.{kind}.name.duplicate"),
            path,
        );
    }
}

fn check_services(r: &Reporter, tree: &ServiceTree, block: &ServicesBlock, whole: bool) {
    if whole && block.base_path.is_empty() {
        r.warn(
            "A base path for all services is recommended.",
            None,
            "service.services.base_path.recommended",
            "services.base_path",
        );
    }

    for (idx, op) in block.operations.iter().enumerate() {
        let path = named_path("services.operations", &op.name, idx);
        check_operation(r, op, "service.services.operation", &path);
    }

    let mut names = HashSet::new();
    let mut unnamed = 0usize;
    tree.walk_services(|svc, path, _parent| {
        if svc.name.is_empty() {
            r.error(
                "Service name is required.",
                None,
                "service.services.service.name.required",
                &format!("{path}[{unnamed}]"),
            );
            unnamed += 1;
        } else if !names.insert(svc.name.clone()) {
            r.error(
                format!("Duplicate service name: {}", svc.name),
                None,
                "service.services.service.name.duplicate",
                path,
            );
        }
        if svc.path.is_empty() {
            r.warn(
                format!("Service '{}' should declare a path.", svc.name),
                None,
                "service.services.service.path.recommended",
                path,
            );
        }
        if svc.model.is_empty() {
            r.warn(
                format!("Service '{}' should declare a model.", svc.name),
                None,
                "service.services.service.model.recommended",
                path,
            );
        }
        for (idx, block) in svc.apply.iter().enumerate() {
            check_apply(r, block, &format!("{path}.apply[{idx}]"));
        }
        for (idx, op) in svc.operations.iter().enumerate() {
            let op_path = named_path(&format!("{path}.operations"), &op.name, idx);
            check_operation(r, op, "service.services.service.operation", &op_path);
        }
    });
}

fn check_operation(r: &Reporter, op: &Operation, code: &str, path: &str) {
    if op.name.is_empty() {
        r.error("Operation name is required.", None, &format!("{code}.name.required"), path);
    }
    if op.method.is_empty() {
        r.warn(
            format!("Operation '{}' should declare a method; GET is assumed.", op.name),
            None,
            &format!("{code}.method.recommended"),
            path,
        );
    } else if !HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(&op.method)) {
        r.error(
            format!("Operation '{}' has unsupported HTTP method '{}'.", op.name, op.method),
            None,
            &format!("{code}.method.invalid"),
            path,
        );
    }
    if op.path.is_empty() {
        r.warn(
            format!("Operation '{}' should declare a path; '/' is assumed.", op.name),
            None,
            &format!("{code}.path.recommended"),
            path,
        );
    }
    for (idx, block) in op.apply.iter().enumerate() {
        check_apply(r, block, &format!("{path}.apply[{idx}]"));
    }
}

fn check_apply(r: &Reporter, block: &ApplyBlock, path: &str) {
    if block.name.is_empty() {
        r.error(
            format!("Apply block of type '{}' must name what it applies.", block.kind.as_str()),
            None,
            "service.apply.name.required",
            path,
        );
    }
}

fn named_path(prefix: &str, name: &str, idx: usize) -> String {
    if name.is_empty() {
        format!("{prefix}[{idx}]")
    } else {
        format!("{prefix}.{name}")
    }
}
