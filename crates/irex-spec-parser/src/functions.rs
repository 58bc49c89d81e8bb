//! Extension functions evaluated during decoding.
//!
//! In YAML sources they appear as tags:
//!
//! ```yaml
//! crud_operations: !except [delete]
//! middlewares: !only auth
//! uri: !env MONGO_URI
//! ```
//!
//! `!only`/`!with` select exactly the given names; `!except`/`!without`
//! start from the inherited value and drop the given names; `!env` produces
//! a deferred environment reference that the compiler never resolves.

use std::fmt;

use serde::de::{
    self, value::MapAccessDeserializer, value::SeqAccessDeserializer, Deserializer, EnumAccess,
    MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::{Deserialize, Serialize};

/// The five CRUD actions, in canonical order. `*` in a CRUD selection expands to these.
pub const CRUD_ACTIONS: [&str; 5] = ["create", "read", "update", "delete", "list"];

const SELECTION_FUNCTIONS: &str = "!only, !with, !except, !without";

/// Result of `!only`/`!with`/`!except`/`!without`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub merge_defaults: bool,
}

impl NameFilter {
    /// `only(names)` / `with(names)`.
    pub fn only(names: Vec<String>) -> Self {
        Self {
            include: names,
            exclude: Vec::new(),
            merge_defaults: false,
        }
    }

    /// `except(names)` / `without(names)`.
    pub fn except(names: Vec<String>) -> Self {
        Self {
            include: Vec::new(),
            exclude: names,
            merge_defaults: true,
        }
    }
}

/// A list-valued setting: either written out or computed by a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    Names(Vec<String>),
    Filter(NameFilter),
}

impl Selection {
    /// The plain list, if this selection has already been resolved.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Selection::Names(names) => Some(names.as_slice()),
            Selection::Filter(_) => None,
        }
    }

    /// Resolve against the inherited list.
    ///
    /// A merging filter starts from `inherited`, or from `universe` when
    /// nothing is inherited. If `universe` is non-empty, `*` in the starting
    /// list expands to it. Name comparison is case-insensitive.
    pub fn resolve(&self, inherited: Option<&[String]>, universe: &[&str]) -> Vec<String> {
        match self {
            Selection::Names(names) => names.clone(),
            Selection::Filter(filter) if !filter.merge_defaults => filter.include.clone(),
            Selection::Filter(filter) => {
                let mut base: Vec<String> = match inherited {
                    Some(list) => list.to_vec(),
                    None => universe.iter().map(|s| s.to_string()).collect(),
                };
                if !universe.is_empty() && base.iter().any(|n| n == "*") {
                    base = universe.iter().map(|s| s.to_string()).collect();
                }
                base.retain(|n| !filter.exclude.iter().any(|x| x.eq_ignore_ascii_case(n)));
                for name in &filter.include {
                    if !base.iter().any(|b| b.eq_ignore_ascii_case(name)) {
                        base.push(name.clone());
                    }
                }
                base
            }
        }
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SelectionVisitor)
    }
}

struct SelectionVisitor;

impl<'de> Visitor<'de> for SelectionVisitor {
    type Value = Selection;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a list of names or one of {SELECTION_FUNCTIONS}")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Selection::Names(vec![v.to_string()]))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        Vec::<String>::deserialize(SeqAccessDeserializer::new(seq)).map(Selection::Names)
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Self::Value, A::Error> {
        let (tag, variant): (String, A::Variant) = data.variant()?;
        let merge = match tag.trim_start_matches('!') {
            "only" | "with" => false,
            "except" | "without" => true,
            other => {
                return Err(de::Error::custom(format!(
                    "unknown function `!{other}`, expected one of {SELECTION_FUNCTIONS}"
                )))
            }
        };
        let NameArgs(names) = variant.newtype_variant()?;
        Ok(Selection::Filter(if merge {
            NameFilter::except(names)
        } else {
            NameFilter::only(names)
        }))
    }
}

/// Function arguments: one name or a list of names.
struct NameArgs(Vec<String>);

impl<'de> Deserialize<'de> for NameArgs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ArgsVisitor;

        impl<'de> Visitor<'de> for ArgsVisitor {
            type Value = NameArgs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a name or a list of names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(NameArgs(vec![v.to_string()]))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(NameArgs(Vec::new()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                Vec::<String>::deserialize(SeqAccessDeserializer::new(seq)).map(NameArgs)
            }
        }

        deserializer.deserialize_any(ArgsVisitor)
    }
}

/// Where a deferred reference is looked up at generation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    #[default]
    Env,
    Var,
    Secret,
}

/// A deferred reference to an environment value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvRef {
    pub name: String,
    #[serde(default)]
    pub kind: EnvKind,
}

impl EnvRef {
    pub fn env(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EnvKind::Env,
        }
    }
}

/// An option value: a literal, or a reference resolved later by generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Literal(String),
    EnvRef(EnvRef),
}

impl OptionValue {
    pub fn is_empty(&self) -> bool {
        match self {
            OptionValue::Literal(s) => s.is_empty(),
            OptionValue::EnvRef(r) => r.name.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OptionValueVisitor)
    }
}

struct OptionValueVisitor;

impl<'de> Visitor<'de> for OptionValueVisitor {
    type Value = OptionValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, `!env NAME`, or a {name, kind} reference")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(OptionValue::Literal(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(OptionValue::Literal(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(OptionValue::Literal(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(OptionValue::Literal(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(OptionValue::Literal(v.to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        EnvRef::deserialize(MapAccessDeserializer::new(map)).map(OptionValue::EnvRef)
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Self::Value, A::Error> {
        let (tag, variant): (String, A::Variant) = data.variant()?;
        match tag.trim_start_matches('!') {
            "env" => {
                let name: String = variant.newtype_variant()?;
                Ok(OptionValue::EnvRef(EnvRef::env(name)))
            }
            other => Err(de::Error::custom(format!(
                "unknown function `!{other}`, expected `!env`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        sel: Selection,
    }

    #[derive(Debug, Deserialize)]
    struct OptHolder {
        value: OptionValue,
    }

    fn sel(yaml: &str) -> Selection {
        serde_yaml::from_str::<Holder>(yaml).unwrap().sel
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_list_is_names() {
        assert_eq!(sel("sel: [read, list]"), Selection::Names(strings(&["read", "list"])));
    }

    #[test]
    fn only_and_with_do_not_merge() {
        for tag in ["only", "with"] {
            let s = sel(&format!("sel: !{tag} [read]"));
            assert_eq!(s, Selection::Filter(NameFilter::only(strings(&["read"]))));
        }
    }

    #[test]
    fn except_and_without_merge() {
        for tag in ["except", "without"] {
            let s = sel(&format!("sel: !{tag} delete"));
            let expected = NameFilter {
                include: vec![],
                exclude: strings(&["delete"]),
                merge_defaults: true,
            };
            assert_eq!(s, Selection::Filter(expected));
        }
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = serde_yaml::from_str::<Holder>("sel: !pick [a]").unwrap_err();
        assert!(err.to_string().contains("unknown function `!pick`"));
    }

    #[test]
    fn except_resolves_against_inherited() {
        let s = Selection::Filter(NameFilter::except(strings(&["DELETE"])));
        let inherited = strings(&["create", "read", "delete"]);
        assert_eq!(s.resolve(Some(inherited.as_slice()), &CRUD_ACTIONS), strings(&["create", "read"]));
    }

    #[test]
    fn except_expands_wildcard_and_falls_back_to_universe() {
        let s = Selection::Filter(NameFilter::except(strings(&["delete"])));
        let all = strings(&["*"]);
        let expected = strings(&["create", "read", "update", "list"]);
        assert_eq!(s.resolve(Some(all.as_slice()), &CRUD_ACTIONS), expected);
        assert_eq!(s.resolve(None, &CRUD_ACTIONS), expected);
    }

    #[test]
    fn except_without_universe_starts_empty() {
        let s = Selection::Filter(NameFilter::except(strings(&["auth"])));
        assert!(s.resolve(None, &[]).is_empty());
    }

    #[test]
    fn env_tag_is_deferred_reference() {
        let v = serde_yaml::from_str::<OptHolder>("value: !env MONGO_URI").unwrap().value;
        assert_eq!(v, OptionValue::EnvRef(EnvRef::env("MONGO_URI")));
    }

    #[test]
    fn mapping_form_spells_secret_references() {
        let v = serde_yaml::from_str::<OptHolder>("value: {name: DB_PASS, kind: secret}")
            .unwrap()
            .value;
        assert_eq!(
            v,
            OptionValue::EnvRef(EnvRef {
                name: "DB_PASS".into(),
                kind: EnvKind::Secret
            })
        );
    }

    #[test]
    fn scalars_become_literals() {
        let v = serde_yaml::from_str::<OptHolder>("value: 27017").unwrap().value;
        assert_eq!(v, OptionValue::Literal("27017".into()));
    }

    #[test]
    fn json_projection_of_filter() {
        let s = Selection::Filter(NameFilter::only(strings(&["read"])));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["include"][0], "read");
        assert_eq!(json["mergeDefaults"], false);
    }
}
