//! IR assembly: turns the validated, normalized trees into an [`IrBundle`].
//!
//! Assembly never fails. It tolerates trees that were never validated;
//! collisions keep the first entry and are logged.

mod catalogue;
mod models;
mod routes;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use irex_spec_parser::model::config::Project;
use irex_spec_parser::model::service::ServicesBlock;
use irex_spec_parser::{ConfigTree, ModelCatalogue, OptionValue, ServiceTree};

use crate::ir::{
    IrBundle, IrConfig, IrFramework, IrGenerator, IrHttp, IrMeta, IrPaths, IrProject, IrRuntime,
};

pub use catalogue::parse_limit;
pub use routes::join_path;

/// Assemble the IR. `config` is optional so a bundle can be built from
/// schema and service trees alone.
pub fn assemble(
    config: Option<&ConfigTree>,
    catalogue: &ModelCatalogue,
    tree: &ServiceTree,
) -> IrBundle {
    let mut ir = IrBundle {
        config: config.and_then(|c| c.project.as_ref()).map(config_ir),
        ..Default::default()
    };

    if let Some(block) = &tree.services {
        ir.http = http_ir(block);
    }
    models::assemble_models(&mut ir, catalogue);
    if let Some(policies) = &tree.policies {
        catalogue::assemble_policies(&mut ir, policies);
    }
    if let Some(rate_limits) = &tree.rate_limits {
        catalogue::assemble_rate_limits(&mut ir, rate_limits);
    }
    routes::RouteBuilder::new(&mut ir, tree).build(tree);

    ir
}

fn http_ir(block: &ServicesBlock) -> IrHttp {
    IrHttp {
        base_path: block.base_path.clone(),
        cors: block.cors.unwrap_or(false),
        allowed_origins: block.allowed_origins.clone(),
        allowed_methods: block.allowed_methods.clone(),
        allowed_headers: block.allowed_headers.clone(),
        expose_headers: block.expose_headers.clone(),
        allow_credentials: block.allow_credentials.unwrap_or(false),
        max_age: block.max_age,
        cache_control: block.cache_control.clone(),
    }
}

fn config_ir(project: &Project) -> IrConfig {
    let paths = project.paths.clone().unwrap_or_default();
    let generator = project.generator.clone().unwrap_or_default();
    let runtime = project.runtime.clone().unwrap_or_default();
    let runtime_options = runtime.options.clone().unwrap_or_default();
    let meta = project.meta.clone().unwrap_or_default();

    let schema = runtime.schema.as_ref().map(|schema| {
        let mut options = BTreeMap::new();
        if let Some(opts) = &schema.options {
            insert_option(&mut options, "uri", opts.uri.clone());
            insert_option(&mut options, "db", opts.db.clone());
        }
        IrFramework {
            framework: schema.framework.clone(),
            version: schema.version.clone(),
            options,
        }
    });
    let service = runtime.service.as_ref().map(|service| {
        let mut options = BTreeMap::new();
        if let Some(opts) = &service.options {
            let logger = opts.logger.map(|b| OptionValue::Literal(b.to_string()));
            let port = opts.port.map(|p| OptionValue::Literal(p.to_string()));
            insert_option(&mut options, "logger", logger);
            insert_option(&mut options, "port", port);
            insert_option(&mut options, "host", opts.host.clone());
        }
        IrFramework {
            framework: service.framework.clone(),
            version: service.version.clone(),
            options,
        }
    });

    IrConfig {
        project: IrProject {
            name: project.name.clone(),
            description: project.description.clone(),
            version: project.version.clone(),
            author: project.author.clone(),
            license: project.license.clone(),
            timezone: project.timezone.clone(),
        },
        paths: IrPaths {
            specifications: paths.specifications,
            templates: paths.templates,
            output: paths.output,
        },
        generator: IrGenerator {
            schema: generator.schema.unwrap_or(true),
            service: generator.service.unwrap_or(true),
            dry_run: generator.dry_run.unwrap_or(false),
            clean_before: generator.clean_before.unwrap_or(false),
        },
        runtime: IrRuntime {
            name: runtime.name,
            version: runtime.version,
            scaffold: runtime.scaffold.unwrap_or(false),
            package_manager: runtime_options.package_manager,
            entry: runtime_options.entry,
            dev_nodemon: runtime_options.dev_nodemon.unwrap_or(false),
            schema,
            service,
        },
        meta: IrMeta {
            created_at: DateTime::parse_from_rfc3339(&meta.created_at)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            generator_version: meta.generator_version,
        },
    }
}

fn insert_option(options: &mut BTreeMap<String, OptionValue>, key: &str, value: Option<OptionValue>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        options.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use irex_spec_parser::{EnvRef, OptionValue};

    use super::*;
    use crate::ir::{Cardinality, CrudAction, OperationKind, ServiceKind};
    use crate::normalize::normalize;

    const MODELS: &str = r#"
models:
  - name: Account
    fields: [{ name: email, type: string }]
  - name: Session
    fields: [{ name: token, type: string }]
"#;

    fn build(yaml: &str) -> IrBundle {
        let tree: ServiceTree = serde_yaml::from_str(yaml).unwrap();
        let catalogue: ModelCatalogue = serde_yaml::from_str(MODELS).unwrap();
        assemble(None, &catalogue, &normalize(tree))
    }

    #[test]
    fn selected_crud_actions_become_routes() {
        let ir = build(
            r#"
services:
  defaults: { pagination: true }
  services:
    - name: accounts
      model: Account
      crud_operations: [READ, LIST]
"#,
        );

        let ops: Vec<_> = ir.operations.keys().map(String::as_str).collect();
        assert_eq!(ops, ["accounts.list", "accounts.read"]);

        let read = &ir.routes["accounts:GET:accounts.read"];
        assert_eq!(read.path, "/:id");
        let list = &ir.routes["accounts:GET:accounts.list"];
        assert_eq!(list.path, "/");
        assert_eq!(ir.routes.len(), 2);

        let data = ir.operations["accounts.list"].data.as_ref().unwrap();
        assert_eq!(data.action, CrudAction::List);
        assert_eq!(data.cardinality, Cardinality::Many);
        assert_eq!(data.paginated, Some(true));
        assert_eq!(ir.services["accounts"].kind, ServiceKind::Model);
    }

    #[test]
    fn resource_policy_rate_limits_are_not_attached() {
        let ir = build(
            r#"
policies:
  presets:
    - { name: authenticated, scope: request }
  customs:
    - { name: ownerOnly, scope: resource }
rate_limits:
  presets:
    - { name: burstLimit, limit: 10/1s }
    - { name: standard, limit: 100/1m }
services:
  services:
    - name: accounts
      model: Account
      crud_operations: [read]
      apply:
        - { type: policy, name: ownerOnly, rate_limits: [burstLimit] }
        - { type: policy, name: authenticated, rate_limits: [standard] }
"#,
        );

        let route = &ir.routes["accounts:GET:accounts.read"];
        assert_eq!(route.resource_policies, ["ownerOnly"]);
        assert_eq!(route.request_policies, ["authenticated"]);
        assert_eq!(route.base_rate_limits, ["standard"]);
        assert!(ir.resource_policies.contains_key("ownerOnly"));
    }

    #[test]
    fn rate_limit_window_is_parsed() {
        let ir = build("rate_limits:\n  presets:\n    - { name: standard, limit: 100/1m }\n");
        let limit = &ir.rate_limits["standard"].limit;
        assert_eq!(limit.requests, 100);
        assert_eq!(limit.window, "1m");
    }

    #[test]
    fn bindings_respect_to_operations_and_groups() {
        let ir = build(
            r#"
policies:
  presets:
    - { name: authenticated, scope: request }
    - { name: admin, scope: request }
  customs:
    - { name: ownerOnly, scope: resource }
  groups:
    - { name: staff, scope: request, policies: [authenticated, admin] }
rate_limits:
  presets:
    - { name: exports, limit: 5/1h }
services:
  defaults: { middlewares: [auth] }
  services:
    - name: accounts
      model: Account
      path: /accounts
      crud_operations: "*"
      policies: [authenticated]
      apply:
        - { type: policy, name: ownerOnly, to_operations: [read, accounts.update] }
        - { type: policy, name: staff, to_operations: [delete] }
      operations:
        - name: export
          method: post
          path: /export
          apply: [{ type: rate_limit, name: exports }]
"#,
        );

        assert_eq!(ir.routes.len(), 6);
        let read = &ir.routes["accounts:GET:accounts.read"];
        assert_eq!(read.path, "/accounts/:id");
        assert_eq!(read.resource_policies, ["ownerOnly"]);
        assert_eq!(read.middlewares, ["auth"]);
        assert_eq!(ir.routes["accounts:PATCH:accounts.update"].resource_policies, ["ownerOnly"]);
        assert!(ir.routes["accounts:GET:accounts.list"].resource_policies.is_empty());
        assert_eq!(
            ir.routes["accounts:DELETE:accounts.delete"].request_policies,
            ["authenticated", "admin"]
        );
        assert!(ir.resolves_policy("staff"));
        assert_eq!(ir.policy_groups["staff"].policies, ["authenticated", "admin"]);

        let export = &ir.routes["accounts:POST:accounts.export"];
        assert_eq!(export.path, "/accounts/export");
        assert_eq!(export.base_rate_limits, ["exports"]);
        assert_eq!(export.request_policies, ["authenticated"]);
        assert_eq!(ir.operations["accounts.export"].kind, OperationKind::Custom);
    }

    #[test]
    fn nested_and_top_level_operations() {
        let ir = build(
            r#"
services:
  operations:
    - { name: health, path: /health }
  services:
    - name: accounts
      model: Account
      crud_operations: [list]
      services:
        - name: sessions
          model: Session
          path: /sessions
          crud_operations: [create]
"#,
        );

        assert_eq!(ir.services["sessions"].parent.as_deref(), Some("accounts"));
        assert!(ir.routes.contains_key("sessions:POST:sessions.create"));
        let health = &ir.routes[":GET:health"];
        assert_eq!(health.service, "");
        assert_eq!(health.path, "/health");
    }

    #[test]
    fn colliding_routes_keep_the_first() {
        let ir = build(
            r#"
services:
  services:
    - name: reports
      operations:
        - { name: run, method: GET, path: /a }
        - { name: run, method: GET, path: /b }
"#,
        );
        assert_eq!(ir.routes.len(), 1);
        assert_eq!(ir.routes["reports:GET:reports.run"].path, "/a");
    }

    #[test]
    fn config_projection_keeps_env_references() {
        let config: ConfigTree = serde_yaml::from_str(
            r#"
project:
  name: shop
  version: 1.0.0
  paths: { specifications: ./spec, output: ./out }
  runtime:
    name: node
    schema: { framework: mongoose, options: { uri: !env MONGO_URI } }
    service: { framework: fastify, options: { port: 3000 } }
  meta: { created_at: 2026-01-01T00:00:00Z }
"#,
        )
        .unwrap();
        let ir = assemble(Some(&config), &ModelCatalogue::default(), &ServiceTree::default());
        let config = ir.config.unwrap();

        assert_eq!(config.project.name, "shop");
        assert!(config.generator.schema);
        let schema = config.runtime.schema.unwrap();
        assert_eq!(schema.options["uri"], OptionValue::EnvRef(EnvRef::env("MONGO_URI")));
        let service = config.runtime.service.unwrap();
        assert_eq!(service.options["port"], OptionValue::Literal("3000".into()));
        assert!(config.meta.created_at.is_some());
    }
}
