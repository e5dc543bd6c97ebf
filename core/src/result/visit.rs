use quarry_types::DataModel;

use crate::error::Result;
use crate::value::Value;

/// Walks a result tree alongside the arguments that shaped it
///
/// Lists are visited element by element. For a record, `visitor` runs
/// first and its return value replaces the record; then every relation
/// named by a truthy `include` or `select` entry is visited with the
/// relation's target model and nested arguments (`{}` for a bare `true`).
/// `null` relations and entries that are not relations are skipped.
pub fn visit_query_result<F>(
    result: Value,
    args: &Value,
    model: &str,
    graph: &DataModel,
    visitor: &mut F,
) -> Result<Value>
where
    F: FnMut(Value, &str, &Value) -> Result<Value>,
{
    crate::quarry_profile_scope!("quarry", "visit_query_result");

    if let Value::List(items) = result {
        return items
            .into_iter()
            .map(|item| visit_query_result(item, args, model, graph, visitor))
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }

    let mut result = visitor(result, model, args)?;
    for key in ["include", "select"] {
        if let Some(Value::Object(nested)) = args.get_truthy(key) {
            visit_nested(&mut result, nested, model, graph, visitor)?;
        }
    }
    Ok(result)
}

fn visit_nested<F>(
    result: &mut Value,
    selection: &crate::value::Object,
    model: &str,
    graph: &DataModel,
    visitor: &mut F,
) -> Result<()>
where
    F: FnMut(Value, &str, &Value) -> Result<Value>,
{
    let empty = Value::Object(Default::default());
    for (field, config) in selection {
        if !config.is_truthy() {
            continue;
        }
        let Some(target) = graph.relation_target(model, field) else {
            continue;
        };
        let Some(slot) = result.member_mut(field) else {
            continue;
        };
        if slot.is_nullish() {
            continue;
        }
        let nested_args = match config {
            Value::Object(_) => config,
            _ => &empty,
        };
        let child = core::mem::take(slot);
        *slot = visit_query_result(child, nested_args, target, graph, visitor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_types::{Field, Model};
    use serde_json::json;

    fn graph() -> DataModel {
        DataModel::new([
            Model::new(
                "User",
                [
                    Field::scalar("id", "String"),
                    Field::relation("posts", "Post", "UserToPost").list(),
                    Field::relation("profile", "Profile", "UserToProfile"),
                ],
            ),
            Model::new(
                "Post",
                [
                    Field::scalar("id", "String"),
                    Field::relation("author", "User", "UserToPost"),
                ],
            ),
            Model::new(
                "Profile",
                [
                    Field::scalar("id", "String"),
                    Field::relation("user", "User", "UserToProfile"),
                ],
            ),
        ])
        .unwrap()
    }

    fn visits(result: serde_json::Value, args: serde_json::Value) -> Vec<(String, serde_json::Value)> {
        let mut seen = Vec::new();
        let mut visitor = |value: Value, model: &str, args: &Value| -> Result<Value> {
            seen.push((model.to_string(), serde_json::to_value(args).unwrap()));
            Ok(value)
        };
        visit_query_result(Value::from(result), &Value::from(args), "User", &graph(), &mut visitor).unwrap();
        seen
    }

    #[test]
    fn test_visits_nested_relations() {
        let seen = visits(
            json!([{ "id": "1", "posts": [{ "id": "p1", "author": { "id": "1" } }, { "id": "p2", "author": null }] }]),
            json!({ "include": { "posts": { "select": { "id": true, "author": true } } } }),
        );
        let models: Vec<_> = seen.iter().map(|(model, _)| model.as_str()).collect();
        assert_eq!(models, ["User", "Post", "User", "Post"]);
        assert_eq!(seen[2].1, json!({}));
    }

    #[test]
    fn test_skips_falsy_null_and_scalar_entries() {
        let seen = visits(
            json!({ "id": "1", "profile": null, "posts": [{ "id": "p1" }] }),
            json!({ "select": { "id": true, "profile": true, "posts": false } }),
        );
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_visitor_replacement_is_kept() {
        let mut visitor = |value: Value, model: &str, _: &Value| -> Result<Value> {
            let mut value = value;
            if let Value::Object(map) = &mut value {
                map.insert("model".into(), Value::from(model));
            }
            Ok(value)
        };
        let result = visit_query_result(
            Value::from(json!({ "id": "1", "profile": { "id": "x" } })),
            &Value::from(json!({ "include": { "profile": true } })),
            "User",
            &graph(),
            &mut visitor,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "id": "1", "profile": { "id": "x", "model": "Profile" }, "model": "User" })
        );
    }
}
