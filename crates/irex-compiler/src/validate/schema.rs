use std::collections::{HashMap, HashSet};

use irex_diagnostics::{Diagnostic, Reporter};
use irex_spec_parser::model::schema::{Field, Model};
use irex_spec_parser::ModelCatalogue;

/// Validate one model catalogue.
pub fn validate_schema(catalogue: &ModelCatalogue) -> Vec<Diagnostic> {
    let r = Reporter::new();

    if catalogue.models.is_empty() {
        r.warn("No models defined.", None, "schema.models.empty", "models");
    }

    let mut seen = HashSet::new();
    for (idx, model) in catalogue.models.iter().enumerate() {
        let path = model_path(model, idx);
        if model.name.is_empty() {
            r.error("Model name is required.", None, "schema.model.name.required", &path);
        } else if !seen.insert(model.name.as_str()) {
            r.error(
                format!("Duplicate model name: {}", model.name),
                None,
                "schema.model.name.duplicate",
                &path,
            );
        }
        check_model(&r, model, &path);
    }

    r.into_diagnostics()
}

/// Validate every decoded schema file, stamping each file's diagnostics
/// with its source and flagging model names redefined across files.
pub fn validate_schema_files(files: &[(String, ModelCatalogue)]) -> Vec<Diagnostic> {
    let r = Reporter::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut reported: HashSet<(&str, &str)> = HashSet::new();

    for (source, catalogue) in files {
        r.extend_with_source(validate_schema(catalogue), source);

        for (idx, model) in catalogue.models.iter().enumerate() {
            if model.name.is_empty() {
                continue;
            }
            match owners.get(model.name.as_str()) {
                Some(owner) if *owner != source.as_str() => {
                    if reported.insert((model.name.as_str(), source.as_str())) {
                        r.add(
                            Diagnostic::error(
                                "schema.model.name.duplicate",
                                format!("Duplicate model name: {} (first defined in {owner})", model.name),
                            )
                            .with_source(source.as_str())
                            .with_spec_path(model_path(model, idx)),
                        );
                    }
                }
                Some(_) => {}
                None => {
                    owners.insert(model.name.as_str(), source.as_str());
                }
            }
        }
    }

    r.into_diagnostics()
}

fn model_path(model: &Model, idx: usize) -> String {
    if model.name.is_empty() {
        format!("models[{idx}]")
    } else {
        format!("models.{}", model.name)
    }
}

fn check_model(r: &Reporter, model: &Model, path: &str) {
    let label = if model.name.is_empty() {
        "<unnamed>"
    } else {
        model.name.as_str()
    };

    if model.fields.is_empty() {
        r.error(
            format!("Model '{label}' must have at least one field."),
            None,
            "schema.model.fields.required",
            &format!("{path}.fields"),
        );
    }
    check_fields(r, label, &model.fields, &format!("{path}.fields"));

    if let Some(config) = &model.config {
        if config.db.as_ref().is_some_and(|db| db.is_empty()) {
            r.warn(
                format!("Model '{label}' has an empty db block."),
                None,
                "schema.model.config.db.empty",
                &format!("{path}.config.db"),
            );
        }
        for (idx, index) in config.indexes.iter().enumerate() {
            if index.fields.is_empty() {
                r.error(
                    format!("Index {} in model '{label}' must list at least one field.", index_label(&index.name, idx)),
                    None,
                    "schema.model.config.index.fields.required",
                    &format!("{path}.config.indexes[{idx}]"),
                );
            }
        }
    }

    if let Some(relations) = &model.relations {
        for (kind, relation) in relations.iter() {
            let kind = kind.as_str();
            let rel_path = format!("{path}.relations.{kind}");
            if relation.name.is_empty() {
                r.error(
                    format!("A {kind} relation in model '{label}' is missing a name."),
                    None,
                    &format!("schema.model.relation.{kind}.name.required"),
                    &rel_path,
                );
            }
            if relation.target.is_empty() {
                r.error(
                    format!("Relation '{}' in model '{label}' must reference a model.", relation.name),
                    None,
                    &format!("schema.model.relation.{kind}.ref.required"),
                    &format!("{rel_path}.{}", relation.name),
                );
            }
        }
    }
}

fn index_label(name: &str, idx: usize) -> String {
    if name.is_empty() {
        format!("#{idx}")
    } else {
        format!("'{name}'")
    }
}

fn check_fields(r: &Reporter, model: &str, fields: &[Field], path: &str) {
    let mut seen = HashSet::new();
    for (idx, field) in fields.iter().enumerate() {
        if field.name.is_empty() {
            r.error(
                format!("Field name is required in model '{model}'."),
                None,
                "schema.model.field.name.required",
                &format!("{path}[{idx}]"),
            );
            continue;
        }
        let field_path = format!("{path}.{}", field.name);
        if !seen.insert(field.name.as_str()) {
            r.error(
                format!("Duplicate field '{}' in model '{model}'.", field.name),
                None,
                "schema.model.field.name.duplicate",
                &field_path,
            );
        }
        if field.field_type.is_empty() && field.fields.is_empty() {
            r.error(
                format!("Field '{}' in model '{model}' must have a type or nested fields.", field.name),
                None,
                "schema.model.field.type_or_nested.required",
                &field_path,
            );
        }
        if let (Some(min), Some(max)) = (field.min_length, field.max_length) {
            if min > max {
                r.error(
                    format!("Field '{}' in model '{model}' has min_length ({min}) greater than max_length ({max}).", field.name),
                    None,
                    "schema.model.field.length.invalid",
                    &field_path,
                );
            }
        }
        if let (Some(min), Some(max)) = (field.min, field.max) {
            if min > max {
                r.error(
                    format!("Field '{}' in model '{model}' has min ({min}) greater than max ({max}).", field.name),
                    None,
                    "schema.model.field.range.invalid",
                    &field_path,
                );
            }
        }
        check_fields(r, model, &field.fields, &format!("{field_path}.fields"));
    }
}
