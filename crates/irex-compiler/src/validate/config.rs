use chrono::DateTime;
use irex_diagnostics::{Diagnostic, Reporter};
use irex_spec_parser::model::config::{Project, Runtime};
use irex_spec_parser::ConfigTree;

/// Validate the project configuration.
///
/// Missing required blocks and fields are errors, missing recommended
/// fields are warnings, and missing creation metadata is informational.
pub fn validate_config(tree: &ConfigTree) -> Vec<Diagnostic> {
    let r = Reporter::new();

    match &tree.project {
        Some(project) => check_project(&r, project),
        None => r.error("Missing required 'project' block.", None, "project.missing", "project"),
    }

    r.into_diagnostics()
}

fn check_project(r: &Reporter, project: &Project) {
    if project.name.is_empty() {
        r.error("Project name is required.", None, "project.name.required", "project.name");
    }
    if project.version.is_empty() {
        r.error("Project version is required.", None, "project.version.required", "project.version");
    }
    if project.author.is_empty() {
        r.warn("Project author is recommended.", None, "project.author.required", "project.author");
    }
    if project.license.is_empty() {
        r.warn("Project license is recommended.", None, "project.license.required", "project.license");
    }

    match &project.paths {
        None => r.error("Missing required 'paths' block.", None, "project.paths.missing", "project.paths"),
        Some(paths) => {
            if paths.specifications.is_empty() {
                r.error(
                    "Specifications path is required.",
                    None,
                    "project.paths.specifications.required",
                    "project.paths.specifications",
                );
            }
            if paths.output.is_empty() {
                r.error(
                    "Output path is required.",
                    None,
                    "project.paths.output.required",
                    "project.paths.output",
                );
            }
            if paths.templates.is_empty() {
                r.warn(
                    "Templates path is recommended.",
                    None,
                    "project.paths.templates.required",
                    "project.paths.templates",
                );
            }
        }
    }

    if project.generator.is_none() {
        r.error(
            "Missing required 'generator' block.",
            None,
            "project.generator.missing",
            "project.generator",
        );
    }

    match &project.runtime {
        None => r.error(
            "Missing required 'runtime' block.",
            None,
            "project.runtime.missing",
            "project.runtime",
        ),
        Some(runtime) => check_runtime(r, runtime),
    }

    match &project.meta {
        None => r.info(
            "No 'meta' block; creation metadata will not be recorded.",
            None,
            "project.meta.missing",
            "project.meta",
        ),
        Some(meta) => {
            if meta.created_at.is_empty() {
                r.info(
                    "Creation timestamp is recommended.",
                    None,
                    "project.meta.created_at.recommended",
                    "project.meta.created_at",
                );
            } else if DateTime::parse_from_rfc3339(&meta.created_at).is_err() {
                r.warn(
                    format!("Creation timestamp '{}' is not an RFC 3339 date-time.", meta.created_at),
                    None,
                    "project.meta.created_at.invalid",
                    "project.meta.created_at",
                );
            }
            if meta.generator_version.is_empty() {
                r.warn(
                    "Generator version is recommended.",
                    None,
                    "project.meta.generator_version.recommended",
                    "project.meta.generator_version",
                );
            }
        }
    }
}

fn check_runtime(r: &Reporter, runtime: &Runtime) {
    if runtime.name.is_empty() {
        r.error(
            "Runtime name is required.",
            None,
            "project.runtime.name.required",
            "project.runtime.name",
        );
    }
    if runtime.version.is_empty() {
        r.warn(
            "Runtime version is recommended.",
            None,
            "project.runtime.version.required",
            "project.runtime.version",
        );
    }

    match &runtime.options {
        None => r.error(
            "Missing required 'runtime.options' block.",
            None,
            "project.runtime.options.missing",
            "project.runtime.options",
        ),
        Some(options) => {
            if options.package_manager.is_empty() {
                r.warn(
                    "Package manager is recommended.",
                    None,
                    "project.runtime.options.package_manager.required",
                    "project.runtime.options.package_manager",
                );
            }
            if options.entry.is_empty() {
                r.warn(
                    "Entry point is recommended.",
                    None,
                    "project.runtime.options.entry.required",
                    "project.runtime.options.entry",
                );
            }
        }
    }

    match &runtime.schema {
        None => r.error(
            "Missing required 'runtime.schema' block.",
            None,
            "project.runtime.schema.missing",
            "project.runtime.schema",
        ),
        Some(schema) => {
            if schema.framework.is_empty() {
                r.error(
                    "Schema framework is required.",
                    None,
                    "project.runtime.schema.framework.required",
                    "project.runtime.schema.framework",
                );
            }
            if schema.options.is_none() {
                r.error(
                    "Missing required 'runtime.schema.options' block.",
                    None,
                    "project.runtime.schema.options.missing",
                    "project.runtime.schema.options",
                );
            }
        }
    }

    match &runtime.service {
        None => r.error(
            "Missing required 'runtime.service' block.",
            None,
            "project.runtime.service.missing",
            "project.runtime.service",
        ),
        Some(service) => {
            if service.framework.is_empty() {
                r.error(
                    "Service framework is required.",
                    None,
                    "project.runtime.service.framework.required",
                    "project.runtime.service.framework",
                );
            }
            match &service.options {
                None => r.error(
                    "Missing required 'runtime.service.options' block.",
                    None,
                    "project.runtime.service.options.missing",
                    "project.runtime.service.options",
                ),
                Some(options) => {
                    if options.port.unwrap_or(0) == 0 {
                        r.warn(
                            "Service port must be > 0.",
                            None,
                            "project.runtime.service.options.port.required",
                            "project.runtime.service.options.port",
                        );
                    }
                    if options.host.as_ref().map_or(true, |h| h.is_empty()) {
                        r.warn(
                            "Service host is recommended.",
                            None,
                            "project.runtime.service.options.host.required",
                            "project.runtime.service.options.host",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use irex_diagnostics::Severity;

    use super::*;

    fn validate(yaml: &str) -> Vec<Diagnostic> {
        let tree: ConfigTree = serde_yaml::from_str(yaml).unwrap();
        validate_config(&tree)
    }

    fn codes(diags: &[Diagnostic], severity: Severity) -> Vec<&str> {
        diags
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.code.as_str())
            .collect()
    }

    const COMPLETE: &str = r#"
project:
  name: shop
  version: 1.0.0
  author: Ada
  license: MIT
  paths: { specifications: ./spec, templates: ./templates, output: ./out }
  generator: { schema: true, service: true }
  runtime:
    name: node
    version: 20
    options: { package_manager: pnpm, entry: src/server.ts }
    schema: { framework: mongoose, options: { uri: !env MONGO_URI } }
    service: { framework: fastify, options: { port: 3000, host: 0.0.0.0 } }
  meta: { created_at: 2026-01-01T00:00:00Z, generator_version: 0.1.0 }
"#;

    #[test]
    fn complete_config_is_clean() {
        assert!(validate(COMPLETE).is_empty());
    }

    #[test]
    fn missing_project_is_single_error() {
        let diags = validate("{}");
        assert_eq!(codes(&diags, Severity::Error), ["project.missing"]);
    }

    #[test]
    fn required_blocks_are_errors() {
        let diags = validate("project:\n  name: shop\n  version: 1\n");
        let errors = codes(&diags, Severity::Error);
        assert!(errors.contains(&"project.paths.missing"));
        assert!(errors.contains(&"project.generator.missing"));
        assert!(errors.contains(&"project.runtime.missing"));
    }

    #[test]
    fn recommended_fields_are_warnings_and_meta_is_information() {
        let diags = validate(
            r#"
project:
  name: shop
  version: 1.0.0
  paths: { specifications: ./spec, output: ./out }
  generator: {}
  runtime:
    name: node
    options: {}
    schema: { framework: mongoose, options: {} }
    service: { framework: fastify, options: { port: 0 } }
"#,
        );
        assert!(codes(&diags, Severity::Error).is_empty());
        let warnings = codes(&diags, Severity::Warning);
        for code in [
            "project.author.required",
            "project.license.required",
            "project.paths.templates.required",
            "project.runtime.version.required",
            "project.runtime.options.package_manager.required",
            "project.runtime.options.entry.required",
            "project.runtime.service.options.port.required",
            "project.runtime.service.options.host.required",
        ] {
            assert!(warnings.contains(&code), "missing warning {code}");
        }
        assert_eq!(codes(&diags, Severity::Information), ["project.meta.missing"]);
    }

    #[test]
    fn invalid_timestamp_warns() {
        let yaml = COMPLETE.replace("2026-01-01T00:00:00Z", "yesterday");
        let diags = validate(&yaml);
        assert_eq!(codes(&diags, Severity::Warning), ["project.meta.created_at.invalid"]);
    }

    #[test]
    fn missing_generator_version_warns() {
        let yaml = COMPLETE.replace(", generator_version: 0.1.0", "");
        let diags = validate(&yaml);
        assert_eq!(
            codes(&diags, Severity::Warning),
            ["project.meta.generator_version.recommended"]
        );
    }
}
