//! TestProject: writes a throwaway IREX project and builds it.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use irex_compiler::{build, validate, BuildOptions, IrBundle};
use irex_diagnostics::Diagnostic;

/// Errors from TestProject operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("compilation failed: {0}")]
    Compile(#[from] irex_compiler::CompileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A complete, valid project config. Specifications live under `./spec`.
pub const DEFAULT_CONFIG: &str = r#"project:
  name: test-project
  version: 1.0.0
  author: Test
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

/// A project on disk in a temp directory, removed on drop.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// An empty project containing only [`DEFAULT_CONFIG`].
    pub fn new() -> Result<Self, TestError> {
        Self::with_config(DEFAULT_CONFIG)
    }

    /// An empty project with a custom `irex.yaml`.
    pub fn with_config(config: &str) -> Result<Self, TestError> {
        let project = TestProject {
            dir: TempDir::new()?,
        };
        project.write("irex.yaml", config)?;
        Ok(project)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> Result<&Self, TestError> {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(self)
    }

    /// Add a schema file under `spec/schema`.
    pub fn schema(&self, name: &str, content: &str) -> Result<&Self, TestError> {
        self.write(&format!("spec/schema/{name}.yaml"), content)
    }

    /// Add a service file under `spec/service`.
    pub fn service(&self, name: &str, content: &str) -> Result<&Self, TestError> {
        self.write(&format!("spec/service/{name}.yaml"), content)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("irex.yaml")
    }

    /// Build the project, failing on any error diagnostic.
    pub fn build(&self) -> Result<IrBundle, TestError> {
        Ok(build(&BuildOptions::new(self.config_path())).into_result()?)
    }

    /// Run every check and return all diagnostics.
    pub fn validate(&self) -> Vec<Diagnostic> {
        validate(&BuildOptions::new(self.config_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "models:\n  - name: Account\n    fields: [{ name: email, type: string }]\n";

    const SERVICE: &str = r#"policies:
  presets:
    - { name: authenticated, scope: request }
rate_limits:
  presets:
    - { name: standard, limit: 100/1m }
services:
  base_path: /api
  defaults: { crud_operations: !only [read, list] }
  services:
    - name: accounts
      model: Account
      path: /accounts
      apply: [{ type: policy, name: authenticated, rate_limits: [standard] }]
"#;

    #[test]
    fn builds_a_written_project() {
        let project = TestProject::new().unwrap();
        project.schema("account", ACCOUNT).unwrap();
        project.service("main", SERVICE).unwrap();

        let ir = project.build().unwrap();
        assert_eq!(ir.routes.len(), 2);
        let read = &ir.routes["accounts:GET:accounts.read"];
        assert_eq!(read.path, "/accounts/:id");
        assert_eq!(read.request_policies, ["authenticated"]);
        assert_eq!(read.base_rate_limits, ["standard"]);
    }

    #[test]
    fn build_error_carries_diagnostics() {
        let project = TestProject::new().unwrap();
        project.schema("account", ACCOUNT).unwrap();
        project
            .service("main", &SERVICE.replace("model: Account", "model: Missing"))
            .unwrap();

        let err = project.build().unwrap_err();
        let TestError::Compile(err) = err else {
            panic!("expected a compile error, got {err}");
        };
        assert!(err
            .diagnostics()
            .iter()
            .any(|d| d.code == "service.model.not_found"));
    }

    #[test]
    fn validate_reports_missing_directories() {
        let project = TestProject::new().unwrap();
        let codes: Vec<_> = project.validate().into_iter().map(|d| d.code).collect();
        assert_eq!(codes, ["schema.path_not_found", "service.path_not_found"]);
    }

    #[test]
    fn service_files_are_merged() {
        let project = TestProject::new().unwrap();
        project.schema("account", ACCOUNT).unwrap();
        project
            .service(
                "a-catalogue",
                "policies:\n  presets:\n    - { name: authenticated, scope: request }\nrate_limits: {}\n",
            )
            .unwrap();
        project
            .service(
                "b-services",
                "services:\n  services:\n    - { name: accounts, model: Account, path: /accounts, crud_operations: [list], policies: [authenticated] }\n",
            )
            .unwrap();

        let ir = project.build().unwrap();
        assert_eq!(
            ir.routes["accounts:GET:accounts.list"].request_policies,
            ["authenticated"]
        );
    }
}
