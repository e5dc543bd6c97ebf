//! Relation graph describing models, their fields and relation targets
//!
//! The graph is built once from an external description and is read-only
//! afterwards. Every "is this name a relation, and of what model" question
//! in the query pipeline is answered here.

use indexmap::IndexMap;

/// Field kind as seen by the query pipeline
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Stored scalar column
    Scalar,
    /// Stored enum column, treated like a scalar for selection purposes
    Enum,
    /// Relation to another model of the same graph
    Relation {
        /// Target model name
        target: String,
        /// Relation identifier shared by both sides of the relation
        relation_name: String,
    },
}

/// A single model field
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawField"))]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    /// Scalar type name, enum name or target model name
    pub type_name: String,
    pub is_list: bool,
}

impl Field {
    /// Create a scalar field
    #[must_use]
    pub fn scalar(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
            type_name: type_name.into(),
            is_list: false,
        }
    }

    /// Create an enum field
    #[must_use]
    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Enum,
            type_name: enum_name.into(),
            is_list: false,
        }
    }

    /// Create a to-one relation field
    #[must_use]
    pub fn relation(
        name: impl Into<String>,
        target: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Self {
        let target = target.into();
        Self {
            name: name.into(),
            type_name: target.clone(),
            kind: FieldKind::Relation {
                target,
                relation_name: relation_name.into(),
            },
            is_list: false,
        }
    }

    /// Mark the field as a list
    #[must_use]
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Returns `true` if the field points at another model
    #[inline]
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation { .. })
    }

    /// Target model name for relation fields
    #[must_use]
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Relation identifier for relation fields
    #[must_use]
    pub fn relation_name(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { relation_name, .. } => Some(relation_name),
            _ => None,
        }
    }
}

/// A model with its fields in declaration order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    fields: Vec<Field>,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }
    }

    /// All fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks a field up by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Looks a relation field up by name, ignoring scalars
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Field> {
        self.field(name).filter(|field| field.is_relation())
    }

    /// Stored non-relation fields in declaration order
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.is_relation())
    }
}

/// Error raised when a relation graph description is inconsistent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("model `{0}` is declared more than once")]
    DuplicateModel(String),

    #[error("field `{field}` is declared more than once on model `{model}`")]
    DuplicateField { model: String, field: String },

    #[error("relation `{model}.{field}` points at unknown model `{target}`")]
    UnknownRelationTarget {
        model: String,
        field: String,
        target: String,
    },

    #[error("unknown field kind `{kind}` on `{model}.{field}`")]
    UnknownFieldKind {
        model: String,
        field: String,
        kind: String,
    },

    /// The description could not be parsed
    #[error("invalid data model description: {0}")]
    Parse(String),
}

/// The read-only relation graph
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataModel {
    models: IndexMap<String, Model>,
}

impl DataModel {
    /// Builds a validated graph
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_types::{DataModel, Field, Model};
    ///
    /// let graph = DataModel::new([
    ///     Model::new("User", [
    ///         Field::scalar("id", "String"),
    ///         Field::relation("posts", "Post", "UserToPost").list(),
    ///     ]),
    ///     Model::new("Post", [
    ///         Field::scalar("id", "String"),
    ///         Field::relation("author", "User", "UserToPost"),
    ///     ]),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(graph.relation_target("User", "posts"), Some("Post"));
    /// assert_eq!(graph.relation_target("User", "id"), None);
    /// ```
    pub fn new(models: impl IntoIterator<Item = Model>) -> Result<Self, SchemaError> {
        let mut map = IndexMap::new();
        for model in models {
            if map.contains_key(&model.name) {
                return Err(SchemaError::DuplicateModel(model.name));
            }
            map.insert(model.name.clone(), model);
        }
        let graph = Self { models: map };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for model in self.models.values() {
            for (i, field) in model.fields.iter().enumerate() {
                if model.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(SchemaError::DuplicateField {
                        model: model.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if let Some(target) = field.relation_target()
                    && !self.models.contains_key(target)
                {
                    return Err(SchemaError::UnknownRelationTarget {
                        model: model.name.clone(),
                        field: field.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parses and validates the runtime data-model JSON description
    ///
    /// ```json
    /// { "models": { "User": { "fields": [
    ///     { "name": "id", "kind": "scalar", "type": "String" },
    ///     { "name": "posts", "kind": "object", "type": "Post",
    ///       "relationName": "UserToPost", "isList": true }
    /// ] } } }
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let raw: RawDataModel =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::new(
            raw.models
                .into_iter()
                .map(|(name, model)| Model::new(name, model.fields)),
        )
    }

    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// All models in declaration order
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Looks a field up on a model
    #[must_use]
    pub fn field(&self, model: &str, field: &str) -> Option<&Field> {
        self.model(model)?.field(field)
    }

    /// Target model of `model.field` when that field is a relation
    #[must_use]
    pub fn relation_target(&self, model: &str, field: &str) -> Option<&str> {
        self.field(model, field)?.relation_target()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDataModel {
    models: IndexMap<String, RawModel>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawModel {
    fields: Vec<Field>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    kind: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    relation_name: Option<String>,
    #[serde(default)]
    is_list: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<RawField> for Field {
    type Error = SchemaError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_str() {
            "scalar" => FieldKind::Scalar,
            "enum" => FieldKind::Enum,
            "object" => FieldKind::Relation {
                target: raw.type_name.clone(),
                relation_name: raw.relation_name.unwrap_or_default(),
            },
            other => {
                return Err(SchemaError::UnknownFieldKind {
                    model: String::new(),
                    field: raw.name,
                    kind: other.to_string(),
                });
            }
        };
        Ok(Field {
            name: raw.name,
            kind,
            type_name: raw.type_name,
            is_list: raw.is_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Model {
        Model::new(
            "User",
            [
                Field::scalar("id", "String"),
                Field::scalar("name", "String"),
                Field::enumeration("role", "Role"),
                Field::relation("posts", "Post", "UserToPost").list(),
            ],
        )
    }

    fn post() -> Model {
        Model::new(
            "Post",
            [
                Field::scalar("id", "String"),
                Field::relation("author", "User", "UserToPost"),
            ],
        )
    }

    #[test]
    fn test_lookup() {
        let graph = DataModel::new([user(), post()]).unwrap();
        let user = graph.model("User").unwrap();

        assert!(user.field("posts").unwrap().is_relation());
        assert!(user.relation("name").is_none());
        assert_eq!(user.relation("posts").unwrap().relation_name(), Some("UserToPost"));
        assert!(user.field("posts").unwrap().is_list);
        assert_eq!(
            user.scalar_fields().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            ["id", "name", "role"]
        );
        assert_eq!(graph.relation_target("Post", "author"), Some("User"));
        assert_eq!(graph.relation_target("Nope", "author"), None);
    }

    #[test]
    fn test_duplicate_field() {
        let model = Model::new(
            "User",
            [Field::scalar("id", "String"), Field::scalar("id", "Int")],
        );
        assert_eq!(
            DataModel::new([model]),
            Err(SchemaError::DuplicateField {
                model: "User".into(),
                field: "id".into()
            })
        );
    }

    #[test]
    fn test_duplicate_model() {
        assert_eq!(
            DataModel::new([post(), user(), post()]),
            Err(SchemaError::DuplicateModel("Post".into()))
        );
    }

    #[test]
    fn test_unknown_relation_target() {
        let err = DataModel::new([user()]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownRelationTarget {
                model: "User".into(),
                field: "posts".into(),
                target: "Post".into()
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_str() {
        let graph = DataModel::from_json_str(
            r#"{
                "models": {
                    "User": { "fields": [
                        { "name": "id", "kind": "scalar", "type": "String" },
                        { "name": "role", "kind": "enum", "type": "Role" },
                        { "name": "posts", "kind": "object", "type": "Post",
                          "relationName": "UserToPost", "isList": true }
                    ] },
                    "Post": { "fields": [
                        { "name": "id", "kind": "scalar", "type": "String" },
                        { "name": "author", "kind": "object", "type": "User",
                          "relationName": "UserToPost" }
                    ] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(graph.models().count(), 2);
        assert_eq!(graph.field("User", "role").unwrap().kind, FieldKind::Enum);
        assert_eq!(graph.relation_target("User", "posts"), Some("Post"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_str_rejects_dangling_relation() {
        let err = DataModel::from_json_str(
            r#"{ "models": { "User": { "fields": [
                { "name": "posts", "kind": "object", "type": "Post", "isList": true }
            ] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRelationTarget { .. }));
    }
}
