//! The compile pipeline: decode, validate structure, normalize, validate
//! semantics, assemble. Stages run in order and the pipeline halts after
//! any stage that reported an error.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use irex_diagnostics::{Diagnostic, Reporter, Severity};
use irex_spec_parser::{
    decode, decode_source, ConfigTree, ModelCatalogue, ServiceTree, SpecDocument, SpecKind,
};
use irex_telemetry::{log_files_discovered, log_ir_assembled, log_pipeline_halted, log_stage_completed};

use crate::assemble::assemble;
use crate::error::CompileError;
use crate::ir::IrBundle;
use crate::normalize::normalize;
use crate::semantic::validate_semantics;
use crate::validate::{
    validate_config, validate_schema, validate_schema_files, validate_service, validate_service_file,
};

/// Inputs to a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Path to the project config (`irex.yaml`). Specification
    /// directories are resolved relative to its parent.
    pub config_path: PathBuf,
}

impl BuildOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

/// Result of a build: the IR when every stage passed, plus every
/// diagnostic reported on the way.
#[derive(Debug)]
pub struct BuildOutput {
    pub ir: Option<IrBundle>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutput {
    pub fn has_errors(&self) -> bool {
        irex_diagnostics::has_errors(&self.diagnostics)
    }

    pub fn into_result(self) -> Result<IrBundle, CompileError> {
        match self.ir {
            Some(ir) if !irex_diagnostics::has_errors(&self.diagnostics) => Ok(ir),
            _ => Err(CompileError::Diagnostics(self.diagnostics)),
        }
    }
}

/// Run the whole pipeline and assemble the IR.
pub fn build(options: &BuildOptions) -> BuildOutput {
    run(options, true)
}

/// Run every check without assembling the IR.
pub fn validate(options: &BuildOptions) -> Vec<Diagnostic> {
    run(options, false).diagnostics
}

fn run(options: &BuildOptions, assemble_ir: bool) -> BuildOutput {
    let r = Reporter::new();
    let config_path = options.config_path.as_path();
    let config_source = config_path.display().to_string();

    let decoded = decode::<ConfigTree>(config_path);
    r.extend(decoded.diagnostics);
    let Some(config) = decoded.tree else {
        return halt(r, "decode_config");
    };
    r.extend_with_source(validate_config(&config), &config_source);
    if halted(&r, "validate_config") {
        return halt(r, "validate_config");
    }

    let Some(specifications) = specifications_dir(config_path, &config) else {
        return halt(r, "validate_config");
    };
    let schema_files = load_schema(&r, &specifications.join("schema"));
    let service = load_service(&r, &specifications.join("service"));
    let (Some(schema_files), Some((service_source, tree))) = (schema_files, service) else {
        return halt(r, "decode");
    };
    if halted(&r, "decode") {
        return halt(r, "decode");
    }

    r.extend(validate_schema_files(&schema_files));
    r.extend_with_source(validate_service(&tree), &service_source);
    if halted(&r, "validate_structure") {
        return halt(r, "validate_structure");
    }

    let catalogue = ModelCatalogue::concat(schema_files.into_iter().map(|(_, c)| c));
    let tree = normalize(tree);
    log_stage_completed!(stage = "normalize");

    r.extend_with_source(validate_semantics(&tree, &catalogue), &service_source);
    if halted(&r, "validate_semantics") {
        return halt(r, "validate_semantics");
    }

    let ir = assemble_ir.then(|| {
        let ir = assemble(Some(&config), &catalogue, &tree);
        log_ir_assembled!(
            models = ir.models.len(),
            services = ir.services.len(),
            routes = ir.routes.len(),
            "IR assembled"
        );
        ir
    });

    BuildOutput {
        ir,
        diagnostics: r.into_diagnostics(),
    }
}

/// Whether the pipeline must stop after `stage`.
fn halted(r: &Reporter, stage: &str) -> bool {
    if r.has_errors() {
        return true;
    }
    log_stage_completed!(stage = stage, warnings = r.count(Severity::Warning));
    false
}

fn halt(r: Reporter, stage: &str) -> BuildOutput {
    log_pipeline_halted!(stage = stage, errors = r.count(Severity::Error), "pipeline halted");
    BuildOutput {
        ir: None,
        diagnostics: r.into_diagnostics(),
    }
}

fn specifications_dir(config_path: &Path, config: &ConfigTree) -> Option<PathBuf> {
    let paths = config.project.as_ref()?.paths.as_ref()?;
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));
    Some(base.join(&paths.specifications))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Every YAML file under `dir`, sorted by path.
fn scan(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_yaml(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry"),
        }
    }
    files.sort();
    files
}

fn missing_dir(r: &Reporter, code: &str, what: &str, dir: &Path) {
    r.add(
        Diagnostic::error(code, format!("{what} directory not found: {}", dir.display()))
            .with_source(dir.display().to_string()),
    );
}

/// Decode every schema file in parallel. Results keep scan order.
fn load_schema(r: &Reporter, dir: &Path) -> Option<Vec<(String, ModelCatalogue)>> {
    if !dir.is_dir() {
        missing_dir(r, "schema.path_not_found", "Schema", dir);
        return None;
    }
    let files = scan(dir);
    log_files_discovered!(kind = "schema", count = files.len(), dir = %dir.display());

    let decoded: Vec<_> = files
        .par_iter()
        .map(|path| (path.display().to_string(), decode::<ModelCatalogue>(path)))
        .collect();

    let mut catalogues = Vec::with_capacity(decoded.len());
    for (source, file) in decoded {
        r.extend(file.diagnostics);
        if let Some(catalogue) = file.tree {
            catalogues.push((source, catalogue));
        }
    }
    Some(catalogues)
}

/// Decode and merge every service file. Returns the source label used for
/// tree-level diagnostics: the file itself when there is only one.
fn load_service(r: &Reporter, dir: &Path) -> Option<(String, ServiceTree)> {
    if !dir.is_dir() {
        missing_dir(r, "service.path_not_found", "Service", dir);
        return None;
    }
    let files = scan(dir);
    log_files_discovered!(kind = "service", count = files.len(), dir = %dir.display());
    if files.is_empty() {
        r.add(
            Diagnostic::error(
                SpecKind::Service.not_found_code(),
                format!("No service files found in {}", dir.display()),
            )
            .with_source(dir.display().to_string()),
        );
        return None;
    }

    let source = match files.as_slice() {
        [single] => single.display().to_string(),
        _ => dir.display().to_string(),
    };
    let mut merged = ServiceTree::default();
    for path in &files {
        let file = decode::<ServiceTree>(path);
        r.extend(file.diagnostics);
        if let Some(tree) = file.tree {
            merged = merged.merge(tree);
        }
    }
    Some((source, merged))
}

// ---------------------------------------------------------------------------
// Single documents
// ---------------------------------------------------------------------------

/// Decoded tree and diagnostics for one in-memory document.
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub kind: SpecKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<serde_json::Value>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode and structurally validate one document, inferring its kind
/// from its path.
pub fn check_source(path: &Path, content: &str) -> Vec<Diagnostic> {
    let source = path.display().to_string();
    let Some(kind) = SpecKind::infer(path) else {
        return vec![Diagnostic::error(
            "source.kind.unknown",
            format!("Cannot tell which kind of specification {source} is."),
        )
        .with_source(source)];
    };
    match kind {
        SpecKind::Config => check_document::<ConfigTree>(content, &source, validate_config).1,
        SpecKind::Schema => check_document::<ModelCatalogue>(content, &source, validate_schema).1,
        SpecKind::Service => check_document::<ServiceTree>(content, &source, validate_service_file).1,
    }
}

/// Like [`check_source`] with an explicit kind, also returning the
/// decoded tree's JSON projection.
pub fn inspect_source(kind: SpecKind, content: &str, source: &str) -> Result<Inspection, CompileError> {
    match kind {
        SpecKind::Config => inspection(kind, check_document::<ConfigTree>(content, source, validate_config)),
        SpecKind::Schema => inspection(kind, check_document::<ModelCatalogue>(content, source, validate_schema)),
        SpecKind::Service => inspection(kind, check_document::<ServiceTree>(content, source, validate_service_file)),
    }
}

fn check_document<T: SpecDocument>(
    content: &str,
    source: &str,
    validate: fn(&T) -> Vec<Diagnostic>,
) -> (Option<T>, Vec<Diagnostic>) {
    let decoded = decode_source::<T>(content, source);
    let r = Reporter::for_source(source);
    r.extend(decoded.diagnostics);
    if let Some(tree) = &decoded.tree {
        r.extend_with_source(validate(tree), source);
    }
    (decoded.tree, r.into_diagnostics())
}

fn inspection<T: Serialize>(
    kind: SpecKind,
    (tree, diagnostics): (Option<T>, Vec<Diagnostic>),
) -> Result<Inspection, CompileError> {
    let tree = tree.map(|t| serde_json::to_value(&t)).transpose()?;
    Ok(Inspection {
        kind,
        tree,
        diagnostics,
    })
}
