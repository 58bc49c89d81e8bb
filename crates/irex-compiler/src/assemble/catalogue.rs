use irex_spec_parser::model::service::{
    Policies, PolicyEffect, PolicyScope, RateLimitPreset, RateLimits,
};

use crate::ir::{IrBundle, IrPolicy, IrPolicyGroup, IrRateLimit, LimitWindow};

pub(super) fn assemble_policies(ir: &mut IrBundle, policies: &Policies) {
    for preset in &policies.presets {
        let policy = IrPolicy {
            name: preset.name.clone(),
            rule: preset.rule.clone(),
            effect: preset.effect.unwrap_or_default(),
            description: preset.description.clone(),
            custom: false,
        };
        insert_policy(ir, policy, preset.scope.unwrap_or_default());
    }
    for custom in &policies.customs {
        let policy = IrPolicy {
            name: custom.name.clone(),
            rule: String::new(),
            effect: PolicyEffect::Allow,
            description: custom.description.clone(),
            custom: true,
        };
        insert_policy(ir, policy, custom.scope.unwrap_or_default());
    }
    for group in &policies.groups {
        if group.name.is_empty() {
            continue;
        }
        if ir.resolves_policy(&group.name) {
            tracing::warn!(policy = %group.name, "duplicate policy, keeping the first definition");
            continue;
        }
        ir.policy_groups.insert(
            group.name.clone(),
            IrPolicyGroup {
                name: group.name.clone(),
                scope: group.scope,
                description: group.description.clone(),
                policies: group.policies.clone(),
            },
        );
    }
}

fn insert_policy(ir: &mut IrBundle, policy: IrPolicy, scope: PolicyScope) {
    if policy.name.is_empty() {
        return;
    }
    if ir.resolves_policy(&policy.name) {
        tracing::warn!(policy = %policy.name, "duplicate policy, keeping the first definition");
        return;
    }
    let catalogue = match scope {
        PolicyScope::Request => &mut ir.request_policies,
        PolicyScope::Resource => &mut ir.resource_policies,
    };
    catalogue.insert(policy.name.clone(), policy);
}

pub(super) fn assemble_rate_limits(ir: &mut IrBundle, rate_limits: &RateLimits) {
    let presets = rate_limits.presets.iter().map(preset_ir);
    let customs = rate_limits.customs.iter().map(|custom| IrRateLimit {
        name: custom.name.clone(),
        limit_type: Default::default(),
        limit: LimitWindow::default(),
        count_keys: Vec::new(),
        bucket_size: None,
        refill_rate: None,
        burst: None,
        action: Default::default(),
        response: None,
        custom: true,
    });

    for limit in presets.chain(customs) {
        if limit.name.is_empty() {
            continue;
        }
        if ir.rate_limits.contains_key(&limit.name) {
            tracing::warn!(rate_limit = %limit.name, "duplicate rate limit, keeping the first definition");
            continue;
        }
        ir.rate_limits.insert(limit.name.clone(), limit);
    }
}

fn preset_ir(preset: &RateLimitPreset) -> IrRateLimit {
    IrRateLimit {
        name: preset.name.clone(),
        limit_type: preset.limit_type.unwrap_or_default(),
        limit: parse_limit(&preset.limit),
        count_keys: preset.count_key.clone(),
        bucket_size: preset.bucket_size,
        refill_rate: (!preset.refill_rate.is_empty()).then(|| preset.refill_rate.clone()),
        burst: preset.burst,
        action: preset.action.unwrap_or_default(),
        response: preset.response.clone(),
        custom: false,
    }
}

/// Parse `"N/window"` (e.g. `100/1m`).
///
/// A left side that is not a number yields zero requests with the whole
/// input as the window; a bare number yields an empty window.
pub fn parse_limit(limit: &str) -> LimitWindow {
    let limit = limit.trim();
    let (count, window) = match limit.split_once('/') {
        Some((count, window)) => (count.trim(), window.trim()),
        None => (limit, ""),
    };
    match count.parse::<u64>() {
        Ok(requests) => LimitWindow {
            requests,
            window: window.to_string(),
        },
        Err(_) => LimitWindow {
            requests: 0,
            window: limit.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use irex_spec_parser::model::service::{RateLimitAction, RateLimitType};

    use super::*;

    fn window(requests: u64, window: &str) -> LimitWindow {
        LimitWindow {
            requests,
            window: window.to_string(),
        }
    }

    #[test]
    fn parse_limit_forms() {
        assert_eq!(parse_limit("100/1m"), window(100, "1m"));
        assert_eq!(parse_limit("5 / 1s"), window(5, "1s"));
        assert_eq!(parse_limit("250"), window(250, ""));
        assert_eq!(parse_limit("lots/1h"), window(0, "lots/1h"));
        assert_eq!(parse_limit(""), window(0, ""));
    }

    #[test]
    fn policies_are_split_by_scope() {
        let policies: Policies = serde_yaml::from_str(
            r#"
presets:
  - { name: authenticated, rule: "user != null" }
  - { name: banned, effect: deny, scope: request }
  - { name: sameTeam, scope: resource }
customs:
  - { name: ownerOnly, scope: resource }
"#,
        )
        .unwrap();
        let mut ir = IrBundle::default();
        assemble_policies(&mut ir, &policies);

        assert_eq!(ir.request_policies.len(), 2);
        assert_eq!(ir.request_policies["authenticated"].effect, PolicyEffect::Allow);
        assert_eq!(ir.request_policies["banned"].effect, PolicyEffect::Deny);
        assert!(ir.resource_policies.contains_key("sameTeam"));
        let owner = &ir.resource_policies["ownerOnly"];
        assert!(owner.custom);
        assert!(owner.rule.is_empty());
    }

    #[test]
    fn groups_are_kept_beside_the_policies() {
        let policies: Policies = serde_yaml::from_str(
            r#"
presets:
  - { name: authenticated, scope: request }
customs:
  - { name: ownerOnly, scope: resource }
groups:
  - { name: staff, scope: request, policies: [authenticated, ownerOnly] }
  - { name: authenticated, scope: request, policies: [ownerOnly] }
"#,
        )
        .unwrap();
        let mut ir = IrBundle::default();
        assemble_policies(&mut ir, &policies);

        assert_eq!(ir.policy_groups.len(), 1);
        let staff = &ir.policy_groups["staff"];
        assert_eq!(staff.scope, Some(PolicyScope::Request));
        assert_eq!(staff.policies, ["authenticated", "ownerOnly"]);
        assert!(ir.policy("staff").is_none());
        assert!(ir.resolves_policy("staff"));
        assert!(ir.request_policies.contains_key("authenticated"));
    }

    #[test]
    fn rate_limits_default_type_and_action() {
        let limits: RateLimits = serde_yaml::from_str(
            r#"
presets:
  - { name: standard, limit: 100/1m }
  - { name: strict, limit: 10/1s, type: sliding_window, action: block }
customs:
  - { name: perTenant }
"#,
        )
        .unwrap();
        let mut ir = IrBundle::default();
        assemble_rate_limits(&mut ir, &limits);

        let standard = &ir.rate_limits["standard"];
        assert_eq!(standard.limit, window(100, "1m"));
        assert_eq!(standard.limit_type, RateLimitType::FixedWindow);
        assert_eq!(standard.action, RateLimitAction::Throttle);
        assert_eq!(ir.rate_limits["strict"].action, RateLimitAction::Block);
        assert!(ir.rate_limits["perTenant"].custom);
    }
}
