use indexmap::IndexMap;
use quarry_types::WireAction;
use serde::{Deserialize, Serialize};

/// Selection marker for every scalar field of a model
pub const SCALARS: &str = "$scalars";

/// Selection marker for every composite field of a model
pub const COMPOSITES: &str = "$composites";

/// Query as sent to the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub action: WireAction,
    pub query: FieldSelection,
}

/// Arguments and selection of one query node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub selection: SelectionSet,
}

pub type SelectionSet = IndexMap<String, SelectionValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    Include(bool),
    Nested(FieldSelection),
}

impl SelectionValue {
    /// Nested selection, if this entry is one
    pub fn nested(&self) -> Option<&FieldSelection> {
        match self {
            SelectionValue::Nested(selection) => Some(selection),
            SelectionValue::Include(_) => None,
        }
    }
}

impl From<bool> for SelectionValue {
    fn from(value: bool) -> Self {
        SelectionValue::Include(value)
    }
}

impl From<FieldSelection> for SelectionValue {
    fn from(value: FieldSelection) -> Self {
        SelectionValue::Nested(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let mut selection = SelectionSet::new();
        selection.insert(SCALARS.into(), true.into());
        selection.insert("posts".into(), FieldSelection::default().into());
        let query = WireQuery {
            model_name: Some("User".into()),
            action: WireAction::CreateOne,
            query: FieldSelection {
                arguments: serde_json::Map::new(),
                selection,
            },
        };

        let wire = serde_json::to_value(&query).unwrap();
        assert_eq!(
            wire,
            json!({
                "modelName": "User",
                "action": "createOne",
                "query": {
                    "arguments": {},
                    "selection": { "$scalars": true, "posts": { "arguments": {}, "selection": {} } }
                }
            })
        );
        assert_eq!(serde_json::from_value::<WireQuery>(wire).unwrap(), query);
    }

    #[test]
    fn test_model_name_skipped_when_absent() {
        let query = WireQuery {
            model_name: None,
            action: WireAction::QueryRaw,
            query: FieldSelection::default(),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({ "action": "queryRaw", "query": { "arguments": {}, "selection": {} } })
        );
    }
}
