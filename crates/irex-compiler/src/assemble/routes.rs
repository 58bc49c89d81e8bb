use std::collections::HashSet;

use irex_spec_parser::model::service::{
    ApplyBlock, ApplyKind, Operation, Policies, PolicyScope, Service, ServiceTree,
};
use irex_spec_parser::Selection;

use crate::ir::{
    route_id, Cardinality, CrudAction, DataOperation, IrBundle, IrOperation, IrRoute, IrService,
    OperationKind, ServiceKind,
};

/// Method, path segment and cardinality of each inferred data operation.
fn crud_shape(action: CrudAction) -> (&'static str, &'static str, Cardinality) {
    match action {
        CrudAction::Create => ("POST", "/", Cardinality::Single),
        CrudAction::Read => ("GET", "/:id", Cardinality::Single),
        CrudAction::Update => ("PATCH", "/:id", Cardinality::Single),
        CrudAction::Delete => ("DELETE", "/:id", Cardinality::Single),
        CrudAction::List => ("GET", "/", Cardinality::Many),
    }
}

/// Join two URL path pieces with exactly one slash; the result always
/// starts with `/`.
pub fn join_path(base: &str, segment: &str) -> String {
    let base = base.trim_matches('/');
    let segment = segment.trim_matches('/');
    match (base.is_empty(), segment.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{segment}"),
        (false, true) => format!("/{base}"),
        (false, false) => format!("/{base}/{segment}"),
    }
}

fn names(selection: Option<&Selection>) -> &[String] {
    selection.and_then(Selection::names).unwrap_or_default()
}

pub(super) struct RouteBuilder<'a> {
    ir: &'a mut IrBundle,
    policies: Option<&'a Policies>,
}

impl<'a> RouteBuilder<'a> {
    pub(super) fn new(ir: &'a mut IrBundle, tree: &'a ServiceTree) -> Self {
        Self {
            ir,
            policies: tree.policies.as_ref(),
        }
    }

    pub(super) fn build(mut self, tree: &ServiceTree) {
        let Some(block) = &tree.services else {
            return;
        };
        for service in &block.services {
            self.service(service, None);
        }

        let root = block.defaults.as_ref();
        let middlewares = names(root.and_then(|d| d.middlewares.as_ref()));
        let policies = names(root.and_then(|d| d.policies.as_ref()));
        for op in &block.operations {
            let path = join_path("", &op.path);
            let mut route = new_route("", &op.name, op, &path, middlewares);
            for name in policies {
                self.bind_policy(&mut route, name, &[]);
            }
            self.bind_operation_apply(&mut route, &op.name, &op.name, &op.apply);
            self.insert_operation(custom_operation(op, "", op.name.clone(), path));
            self.insert_route(route);
        }
    }

    fn service(&mut self, service: &Service, parent: Option<&str>) {
        let has_model = !service.model.is_empty();
        let ir_service = IrService {
            name: service.name.clone(),
            kind: if has_model {
                ServiceKind::Model
            } else {
                ServiceKind::Custom
            },
            parent: parent.map(str::to_string),
            model: has_model.then(|| service.model.clone()),
            expose: service.expose,
            path: service.path.clone(),
            description: service.description.clone(),
        };
        if self.ir.services.contains_key(&service.name) {
            tracing::warn!(service = %service.name, "duplicate service, keeping the first definition");
        } else {
            self.ir.services.insert(service.name.clone(), ir_service);
        }

        if has_model {
            for action in CrudAction::select(names(service.crud_operations.as_ref())) {
                self.crud_route(service, action);
            }
        }
        for op in &service.operations {
            self.explicit_route(service, op);
        }

        for child in &service.services {
            self.service(child, Some(&service.name));
        }
    }

    fn crud_route(&mut self, service: &Service, action: CrudAction) {
        let (method, segment, cardinality) = crud_shape(action);
        let short = action.as_str();
        let full = format!("{}.{short}", service.name);
        let path = join_path(&service.path, segment);

        let many = cardinality == Cardinality::Many;
        let operation = IrOperation {
            name: full.clone(),
            service: service.name.clone(),
            method: method.to_string(),
            path: path.clone(),
            kind: OperationKind::Data,
            data: Some(DataOperation {
                action,
                cardinality,
                paginated: many.then(|| service.pagination.unwrap_or(false)),
                returns_entity: matches!(
                    action,
                    CrudAction::Create | CrudAction::Read | CrudAction::Update
                )
                .then_some(true),
                returns_list: many.then_some(true),
            }),
            action: None,
            description: None,
        };

        let mut route = IrRoute {
            id: route_id(&service.name, method, &full),
            method: method.to_string(),
            path,
            service: service.name.clone(),
            operation: full.clone(),
            middlewares: names(service.middlewares.as_ref()).to_vec(),
            ..Default::default()
        };
        self.bind_service(&mut route, service, short, &full);
        self.insert_operation(operation);
        self.insert_route(route);
    }

    fn explicit_route(&mut self, service: &Service, op: &Operation) {
        let full = format!("{}.{}", service.name, op.name);
        let path = join_path(&service.path, &op.path);
        let middlewares = names(service.middlewares.as_ref());

        let mut route = new_route(&service.name, &full, op, &path, middlewares);
        self.bind_service(&mut route, service, &op.name, &full);
        self.bind_operation_apply(&mut route, &op.name, &full, &op.apply);
        self.insert_operation(custom_operation(op, &service.name, full, path));
        self.insert_route(route);
    }

    /// Service-level `policies` and apply blocks that target this operation.
    fn bind_service(&self, route: &mut IrRoute, service: &Service, short: &str, full: &str) {
        for name in names(service.policies.as_ref()) {
            self.bind_policy(route, name, &[]);
        }
        for block in service.apply.iter().filter(|b| b.targets(short, full)) {
            self.bind_block(route, block);
        }
    }

    fn bind_operation_apply(&self, route: &mut IrRoute, short: &str, full: &str, blocks: &[ApplyBlock]) {
        for block in blocks.iter().filter(|b| b.targets(short, full)) {
            self.bind_block(route, block);
        }
    }

    fn bind_block(&self, route: &mut IrRoute, block: &ApplyBlock) {
        match block.kind {
            ApplyKind::Policy => self.bind_policy(route, &block.name, &block.rate_limits),
            ApplyKind::RateLimit => push_unique(&mut route.base_rate_limits, &block.name),
        }
    }

    /// Bind a policy (groups expand to their members) plus the rate limits
    /// attached to it. Limits attached to a resource-scoped policy are dropped.
    fn bind_policy(&self, route: &mut IrRoute, name: &str, rate_limits: &[String]) {
        let Some(policies) = self.policies else {
            return;
        };
        let mut expanded = Vec::new();
        expand(policies, name, None, &mut expanded, &mut HashSet::new());
        for (member, scope) in expanded {
            match scope {
                PolicyScope::Request => push_unique(&mut route.request_policies, &member),
                PolicyScope::Resource => push_unique(&mut route.resource_policies, &member),
            }
        }

        let scope = policies.scope_of(name).flatten().unwrap_or_default();
        if scope == PolicyScope::Request {
            for limit in rate_limits {
                push_unique(&mut route.base_rate_limits, limit);
            }
        }
    }

    fn insert_operation(&mut self, operation: IrOperation) {
        if self.ir.operations.contains_key(&operation.name) {
            tracing::warn!(operation = %operation.name, "duplicate operation, keeping the first definition");
            return;
        }
        self.ir.operations.insert(operation.name.clone(), operation);
    }

    fn insert_route(&mut self, route: IrRoute) {
        if self.ir.routes.contains_key(&route.id) {
            tracing::warn!(route = %route.id, "duplicate route id, keeping the first route");
            return;
        }
        self.ir.routes.insert(route.id.clone(), route);
    }
}

/// Flatten a policy or group into `(policy, scope)` pairs. A member without
/// its own scope takes the enclosing group's.
fn expand(
    policies: &Policies,
    name: &str,
    inherited: Option<PolicyScope>,
    out: &mut Vec<(String, PolicyScope)>,
    seen: &mut HashSet<String>,
) {
    if !seen.insert(name.to_string()) {
        return;
    }
    if let Some(group) = policies.group(name) {
        let scope = group.scope.or(inherited);
        for member in &group.policies {
            expand(policies, member, scope, out, seen);
        }
        return;
    }
    if let Some(scope) = policies.scope_of(name) {
        out.push((name.to_string(), scope.or(inherited).unwrap_or_default()));
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

fn new_route(service: &str, full: &str, op: &Operation, path: &str, middlewares: &[String]) -> IrRoute {
    let method = method_of(op);
    IrRoute {
        id: route_id(service, &method, full),
        method,
        path: path.to_string(),
        service: service.to_string(),
        operation: full.to_string(),
        middlewares: middlewares.to_vec(),
        ..Default::default()
    }
}

fn method_of(op: &Operation) -> String {
    if op.method.is_empty() {
        "GET".to_string()
    } else {
        op.method.to_ascii_uppercase()
    }
}

fn custom_operation(op: &Operation, service: &str, name: String, path: String) -> IrOperation {
    IrOperation {
        name,
        service: service.to_string(),
        method: method_of(op),
        path,
        kind: OperationKind::Custom,
        data: None,
        action: (!op.action.is_empty()).then(|| op.action.clone()),
        description: (!op.description.is_empty()).then(|| op.description.clone()),
    }
}
