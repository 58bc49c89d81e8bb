//! Model catalogue (`<specifications>/schema/*.yaml`).

use serde::{Deserialize, Serialize};

use crate::model::scalar_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelCatalogue {
    pub models: Vec<Model>,
}

impl ModelCatalogue {
    pub fn find(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Concatenate catalogues, preserving order.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = ModelCatalogue>,
    {
        Self {
            models: parts.into_iter().flat_map(|c| c.models).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Model {
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub config: Option<ModelConfig>,
    pub relations: Option<Relations>,
}

/// A model field. Embedded objects nest further fields instead of a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: Option<bool>,
    pub unique: Option<bool>,
    pub trim: Option<bool>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<serde_json::Value>,
    #[serde(rename = "match")]
    pub pattern: String,
    pub message: String,
    pub visibility: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub db: Option<FieldDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldDb {
    pub mongo: Option<MongoFieldOptions>,
    pub mysql: Option<MysqlFieldOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MongoFieldOptions {
    pub index: Option<bool>,
    pub unique: Option<bool>,
    pub collation: Option<Collation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Collation {
    pub locale: String,
    pub case_level: Option<bool>,
    pub case_first: String,
    pub strength: Option<u8>,
    pub numeric_ordering: Option<bool>,
    pub alternate: String,
    pub max_variable: String,
    pub backwards: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MysqlFieldOptions {
    pub index: Option<bool>,
    pub unique: Option<bool>,
    pub collate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub timestamps: Option<bool>,
    pub table: String,
    pub strict: Option<bool>,
    pub id_strategy: String,
    pub description: String,
    pub indexes: Vec<Index>,
    pub db: Option<ModelDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDb {
    pub mongo: Option<MongoModelOptions>,
    pub mysql: Option<MysqlModelOptions>,
}

impl ModelDb {
    pub fn is_empty(&self) -> bool {
        self.mongo.is_none() && self.mysql.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MongoModelOptions {
    pub version_key: Option<bool>,
    pub collection: String,
    pub to_json_getters: Option<bool>,
    pub minimize: Option<bool>,
    pub auto_index: Option<bool>,
    pub auto_create: Option<bool>,
    pub strict_query: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MysqlModelOptions {
    pub engine: String,
    #[serde(deserialize_with = "scalar_string")]
    pub collate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Relations {
    pub has_many: Vec<Relation>,
    pub belongs_to: Vec<Relation>,
    pub many_to_many: Vec<Relation>,
}

impl Relations {
    /// Relations tagged with their kind, in declaration order per kind.
    pub fn iter(&self) -> impl Iterator<Item = (RelationKind, &Relation)> {
        self.has_many
            .iter()
            .map(|r| (RelationKind::HasMany, r))
            .chain(self.belongs_to.iter().map(|r| (RelationKind::BelongsTo, r)))
            .chain(self.many_to_many.iter().map(|r| (RelationKind::ManyToMany, r)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasMany,
    BelongsTo,
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasMany => "has_many",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::ManyToMany => "many_to_many",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Relation {
    pub name: String,
    #[serde(rename = "ref")]
    pub target: String,
    pub on_delete: String,
    pub on_update: String,
}
