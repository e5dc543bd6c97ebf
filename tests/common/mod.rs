#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use quarry::prelude::*;

/// `User` has posts and a profile; `Post` points back at its author
pub fn graph() -> DataModel {
    DataModel::new([
        Model::new(
            "User",
            [
                Field::scalar("id", "String"),
                Field::scalar("firstName", "String"),
                Field::scalar("lastName", "String"),
                Field::scalar("password", "String"),
                Field::relation("posts", "Post", "UserToPost").list(),
            ],
        ),
        Model::new(
            "Post",
            [
                Field::scalar("id", "String"),
                Field::scalar("title", "String"),
                Field::scalar("views", "Int"),
                Field::relation("author", "User", "UserToPost"),
            ],
        ),
    ])
    .expect("fixture graph is valid")
}

fn text(record: &dyn FieldSource, field: &str) -> quarry::Result<String> {
    Ok(record.get(field)?.as_str().unwrap_or_default().to_string())
}

/// `User.fullName` from `firstName` and `lastName`
pub fn full_name_layer() -> ExtensionLayer {
    ExtensionLayer::builder()
        .name("names")
        .computed_field(
            "User",
            ComputedFieldDef::new("fullName")
                .needs(["firstName", "lastName"])
                .compute(|user| Ok(format!("{} {}", text(user, "firstName")?, text(user, "lastName")?).into())),
        )
        .build()
        .expect("layer builds")
}

/// Engine answering every query with `response`, recording what it saw
pub fn recording_engine(
    response: serde_json::Value,
) -> (
    impl Fn(&WireQuery) -> quarry::Result<serde_json::Value>,
    Arc<Mutex<Vec<serde_json::Value>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let engine = move |query: &WireQuery| -> quarry::Result<serde_json::Value> {
        log.lock().unwrap().push(serde_json::to_value(query)?);
        Ok(response.clone())
    };
    (engine, seen)
}

pub fn args(json: serde_json::Value) -> Value {
    Value::from(json)
}

pub fn path(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}
