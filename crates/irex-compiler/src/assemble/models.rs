use irex_spec_parser::model::schema::{Field, Model};
use irex_spec_parser::ModelCatalogue;

use crate::ir::{IrBundle, IrField, IrIndex, IrModel, IrRelation};

pub(super) fn assemble_models(ir: &mut IrBundle, catalogue: &ModelCatalogue) {
    for model in &catalogue.models {
        if model.name.is_empty() {
            continue;
        }
        if ir.models.contains_key(&model.name) {
            tracing::warn!(model = %model.name, "duplicate model, keeping the first definition");
            continue;
        }
        ir.models.insert(model.name.clone(), model_ir(model));
    }
}

fn model_ir(model: &Model) -> IrModel {
    let config = model.config.clone().unwrap_or_default();
    let relations = model
        .relations
        .as_ref()
        .map(|relations| {
            relations
                .iter()
                .map(|(kind, rel)| IrRelation {
                    name: rel.name.clone(),
                    kind,
                    target: rel.target.clone(),
                    on_delete: non_empty(&rel.on_delete),
                    on_update: non_empty(&rel.on_update),
                })
                .collect()
        })
        .unwrap_or_default();

    IrModel {
        name: model.name.clone(),
        description: if model.description.is_empty() {
            config.description.clone()
        } else {
            model.description.clone()
        },
        fields: model.fields.iter().map(field_ir).collect(),
        timestamps: config.timestamps.unwrap_or(false),
        table: non_empty(&config.table),
        strict: config.strict,
        id_strategy: non_empty(&config.id_strategy),
        indexes: config
            .indexes
            .iter()
            .map(|index| IrIndex {
                name: index.name.clone(),
                fields: index.fields.clone(),
                unique: index.unique.unwrap_or(false),
            })
            .collect(),
        db: config.db.filter(|db| !db.is_empty()),
        relations,
    }
}

fn field_ir(field: &Field) -> IrField {
    IrField {
        name: field.name.clone(),
        field_type: non_empty(&field.field_type),
        required: field.required.unwrap_or(false),
        unique: field.unique.unwrap_or(false),
        trim: field.trim.unwrap_or(false),
        min_length: field.min_length,
        max_length: field.max_length,
        min: field.min,
        max: field.max,
        default: field.default.clone(),
        pattern: non_empty(&field.pattern),
        message: non_empty(&field.message),
        visibility: non_empty(&field.visibility),
        description: non_empty(&field.description),
        fields: field.fields.iter().map(field_ir).collect(),
        db: field.db.clone(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
