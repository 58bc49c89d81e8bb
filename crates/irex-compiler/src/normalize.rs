//! Defaults normalization.
//!
//! Propagates inheritable settings down the service forest. For every
//! node, depth-first pre-order:
//!
//! 1. `effective = merge(parent_effective, node.defaults)`, where a field
//!    the node sets always wins;
//! 2. the node's `defaults` becomes `effective`;
//! 3. the node's own settable fields are back-filled from `effective`
//!    where unset.
//!
//! The root's parent is the top-level `services.defaults` block. Selection
//! functions (`!except`, `!only`, ...) are resolved to plain lists on the
//! way, so a normalized tree normalizes to itself.

use irex_spec_parser::model::service::{
    Policies, PolicyDefaults, RateLimitDefaults, RateLimitPreset, RateLimits, Service,
    ServiceDefaults,
};
use irex_spec_parser::{Selection, ServiceTree, CRUD_ACTIONS};

/// Normalize a service tree. Produces no diagnostics.
pub fn normalize(mut tree: ServiceTree) -> ServiceTree {
    if let Some(policies) = tree.policies.as_mut() {
        normalize_policies(policies);
    }
    if let Some(rate_limits) = tree.rate_limits.as_mut() {
        normalize_rate_limits(rate_limits);
    }
    if let Some(block) = tree.services.as_mut() {
        let root = block
            .defaults
            .take()
            .map(|own| merge_defaults(&ServiceDefaults::default(), own));
        let parent = root.clone().unwrap_or_default();
        for service in &mut block.services {
            normalize_service(service, &parent);
        }
        block.defaults = root;
    }
    tree
}

fn normalize_service(service: &mut Service, parent: &ServiceDefaults) {
    let own = service.defaults.take().unwrap_or_default();
    let effective = merge_defaults(parent, own);

    service.pagination = service.pagination.or(effective.pagination);
    service.expose = service.expose.or(effective.expose);
    service.soft_delete = service.soft_delete.or(effective.soft_delete);
    service.crud_operations = merge_selection(
        service.crud_operations.take(),
        effective.crud_operations.as_ref(),
        &CRUD_ACTIONS,
    );
    service.batch_operations =
        merge_selection(service.batch_operations.take(), effective.batch_operations.as_ref(), &[]);
    service.middlewares =
        merge_selection(service.middlewares.take(), effective.middlewares.as_ref(), &[]);
    service.sorting = merge_selection(service.sorting.take(), effective.sorting.as_ref(), &[]);
    service.filtering = merge_selection(service.filtering.take(), effective.filtering.as_ref(), &[]);
    service.search = merge_selection(service.search.take(), effective.search.as_ref(), &[]);
    service.policies = merge_selection(service.policies.take(), effective.policies.as_ref(), &[]);

    for child in &mut service.services {
        normalize_service(child, &effective);
    }
    service.defaults = Some(effective);
}

/// Field-wise merge: `own` wins wherever it is set.
fn merge_defaults(parent: &ServiceDefaults, own: ServiceDefaults) -> ServiceDefaults {
    ServiceDefaults {
        pagination: own.pagination.or(parent.pagination),
        expose: own.expose.or(parent.expose),
        soft_delete: own.soft_delete.or(parent.soft_delete),
        crud_operations: merge_selection(
            own.crud_operations,
            parent.crud_operations.as_ref(),
            &CRUD_ACTIONS,
        ),
        batch_operations: merge_selection(own.batch_operations, parent.batch_operations.as_ref(), &[]),
        middlewares: merge_selection(own.middlewares, parent.middlewares.as_ref(), &[]),
        sorting: merge_selection(own.sorting, parent.sorting.as_ref(), &[]),
        filtering: merge_selection(own.filtering, parent.filtering.as_ref(), &[]),
        search: merge_selection(own.search, parent.search.as_ref(), &[]),
        policies: merge_selection(own.policies, parent.policies.as_ref(), &[]),
    }
}

/// A set selection is resolved against the inherited one; an unset one inherits it.
fn merge_selection(
    own: Option<Selection>,
    inherited: Option<&Selection>,
    universe: &[&str],
) -> Option<Selection> {
    match own {
        Some(selection) => {
            let base = inherited.and_then(Selection::names);
            Some(Selection::Names(selection.resolve(base, universe)))
        }
        None => inherited.cloned(),
    }
}

fn normalize_rate_limits(rate_limits: &mut RateLimits) {
    let Some(defaults) = rate_limits.defaults.as_ref() else {
        return;
    };
    for preset in &mut rate_limits.presets {
        merge_rate_limit(preset, defaults);
    }
}

fn merge_rate_limit(preset: &mut RateLimitPreset, defaults: &RateLimitDefaults) {
    preset.limit_type = preset.limit_type.or(defaults.limit_type);
    preset.action = preset.action.or(defaults.action);
    if preset.limit.is_empty() {
        preset.limit = defaults.limit.clone();
    }
    if preset.count_key.is_empty() {
        preset.count_key = defaults.count_key.clone();
    }
    preset.bucket_size = preset.bucket_size.or(defaults.bucket_size);
    if preset.refill_rate.is_empty() {
        preset.refill_rate = defaults.refill_rate.clone();
    }
    preset.burst = preset.burst.or(defaults.burst);
    if preset.response.is_none() {
        preset.response = defaults.response.clone();
    }
}

fn normalize_policies(policies: &mut Policies) {
    let Some(defaults) = policies.defaults.clone() else {
        return;
    };
    merge_policy(policies, &defaults);
}

fn merge_policy(policies: &mut Policies, defaults: &PolicyDefaults) {
    for preset in &mut policies.presets {
        preset.effect = preset.effect.or(defaults.effect);
        preset.scope = preset.scope.or(defaults.scope);
    }
    for custom in &mut policies.customs {
        custom.scope = custom.scope.or(defaults.scope);
    }
}

#[cfg(test)]
mod tests {
    use irex_spec_parser::model::service::{PolicyEffect, PolicyScope, RateLimitType};

    use super::*;

    fn tree(yaml: &str) -> ServiceTree {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn names(selection: &Option<Selection>) -> Vec<String> {
        selection
            .as_ref()
            .and_then(Selection::names)
            .map(|n| n.to_vec())
            .unwrap_or_default()
    }

    const NESTED: &str = r#"
services:
  defaults:
    pagination: true
    crud_operations: "*"
    middlewares: [auth, audit]
  services:
    - name: accounts
      model: Account
      defaults:
        pagination: false
        crud_operations: !except [delete]
      services:
        - name: sessions
          model: Session
          crud_operations: [READ, LIST]
          services:
            - name: tokens
              model: Token
              middlewares: !without audit
    - name: reports
      expose: false
"#;

    fn find<'a>(services: &'a [Service], name: &str) -> Option<&'a Service> {
        for svc in services {
            if svc.name == name {
                return Some(svc);
            }
            if let Some(found) = find(&svc.services, name) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn deliberate_false_wins_over_inherited_true() {
        let out = normalize(tree(NESTED));
        let services = &out.services.as_ref().unwrap().services;
        let accounts = find(services, "accounts").unwrap();

        assert_eq!(accounts.pagination, Some(false));
        assert_eq!(accounts.defaults.as_ref().unwrap().pagination, Some(false));
        assert_eq!(find(services, "tokens").unwrap().pagination, Some(false));
        assert_eq!(find(services, "reports").unwrap().pagination, Some(true));
    }

    #[test]
    fn except_resolves_against_parent_effective() {
        let out = normalize(tree(NESTED));
        let services = &out.services.as_ref().unwrap().services;

        let accounts = find(services, "accounts").unwrap();
        assert_eq!(names(&accounts.crud_operations), ["create", "read", "update", "list"]);
        assert_eq!(names(&find(services, "reports").unwrap().crud_operations), ["*"]);
    }

    #[test]
    fn explicit_node_field_is_kept_but_children_inherit_defaults() {
        let out = normalize(tree(NESTED));
        let services = &out.services.as_ref().unwrap().services;

        let sessions = find(services, "sessions").unwrap();
        assert_eq!(names(&sessions.crud_operations), ["READ", "LIST"]);
        // children inherit from defaults, not from the node's own field
        let tokens = find(services, "tokens").unwrap();
        assert_eq!(names(&tokens.crud_operations), ["create", "read", "update", "list"]);
        assert_eq!(names(&tokens.middlewares), ["auth"]);
    }

    #[test]
    fn unset_fields_match_parent_effective() {
        let out = normalize(tree(NESTED));
        let root = out.services.as_ref().unwrap().defaults.clone().unwrap();
        let reports = find(&out.services.as_ref().unwrap().services, "reports").unwrap();
        let effective = reports.defaults.as_ref().unwrap();

        assert_eq!(effective.pagination, root.pagination);
        assert_eq!(effective.middlewares, root.middlewares);
        assert_eq!(reports.expose, Some(false));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize(tree(NESTED));
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn rate_limit_presets_inherit_unset_fields() {
        let out = normalize(tree(
            r#"
rate_limits:
  defaults:
    type: sliding_window
    limit: 100/1m
    count_key: [ip]
  presets:
    - name: standard
    - name: burst
      limit: 10/1s
      type: token_bucket
"#,
        ));
        let presets = &out.rate_limits.as_ref().unwrap().presets;
        assert_eq!(presets[0].limit, "100/1m");
        assert_eq!(presets[0].limit_type, Some(RateLimitType::SlidingWindow));
        assert_eq!(presets[0].count_key, ["ip"]);
        assert_eq!(presets[1].limit, "10/1s");
        assert_eq!(presets[1].limit_type, Some(RateLimitType::TokenBucket));
        assert_eq!(presets[1].count_key, ["ip"]);
    }

    #[test]
    fn policy_defaults_fill_presets_and_customs() {
        let out = normalize(tree(
            r#"
policies:
  defaults: { effect: deny, scope: resource }
  presets:
    - { name: a }
    - { name: b, scope: request, effect: allow }
  customs:
    - { name: c }
"#,
        ));
        let policies = out.policies.as_ref().unwrap();
        assert_eq!(policies.presets[0].effect, Some(PolicyEffect::Deny));
        assert_eq!(policies.presets[0].scope, Some(PolicyScope::Resource));
        assert_eq!(policies.presets[1].scope, Some(PolicyScope::Request));
        assert_eq!(policies.customs[0].scope, Some(PolicyScope::Resource));
    }

    #[test]
    fn absent_root_defaults_stay_absent() {
        let out = normalize(tree("services:\n  services:\n    - name: a\n"));
        let block = out.services.as_ref().unwrap();
        assert!(block.defaults.is_none());
        assert_eq!(block.services[0].defaults, Some(ServiceDefaults::default()));
    }
}
