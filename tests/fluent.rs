use common::{args, full_name_layer, graph, path, recording_engine};
use quarry::prelude::*;
use serde_json::json;

mod common;

fn slug_layer() -> ExtensionLayer {
    ExtensionLayer::builder()
        .computed_field(
            "Post",
            ComputedFieldDef::new("slug").needs(["title"]).compute(|post| {
                let title = post.get("title")?;
                Ok(title.as_str().unwrap_or_default().to_lowercase().replace(' ', "-").into())
            }),
        )
        .build()
        .unwrap()
}

#[test]
fn test_relation_hop_is_extended_with_its_own_model() {
    let client = Client::new(graph()).extend(slug_layer());
    let (engine, seen) = recording_engine(json!({
        "posts": [{ "title": "Hello World" }, { "title": "Second Post" }]
    }));

    let posts = client
        .request(
            &engine,
            Some("User"),
            Action::FindUniqueOrThrow,
            args(json!({ "where": { "id": "1" }, "select": { "posts": { "select": { "slug": true } } } })),
            &path(&["select", "posts"]),
        )
        .unwrap();

    assert_eq!(
        seen.lock().unwrap()[0]["query"]["selection"],
        json!({ "posts": { "arguments": {}, "selection": { "title": true } } })
    );
    assert_eq!(
        serde_json::to_value(&posts).unwrap(),
        json!([{ "slug": "hello-world" }, { "slug": "second-post" }])
    );
}

#[test]
fn test_two_hops_back_to_the_root_model() {
    let client = Client::new(graph()).extend(full_name_layer());
    let response = json!({
        "author": { "id": "1", "firstName": "Grace", "lastName": "Hopper" }
    });

    let author = client
        .process_result(
            Some("Post"),
            &args(json!({ "where": { "id": "p1" }, "select": { "author": true } })),
            &path(&["select", "author"]),
            response,
        )
        .unwrap();

    assert_eq!(
        serde_json::to_value(&author).unwrap(),
        json!({ "id": "1", "firstName": "Grace", "lastName": "Hopper", "fullName": "Grace Hopper" })
    );
}

#[test]
fn test_null_hop_yields_null() {
    let client = Client::new(graph()).extend(full_name_layer());
    let author = client
        .process_result(
            Some("Post"),
            &args(json!({ "select": { "author": true } })),
            &path(&["select", "author"]),
            json!({ "author": null }),
        )
        .unwrap();
    assert_eq!(author, Value::Null);
}

#[test]
fn test_hop_through_missing_field_is_an_error() {
    let client = Client::new(graph());
    let err = client
        .process_result(
            Some("User"),
            &args(json!({ "select": { "comments": true } })),
            &path(&["select", "comments"]),
            json!({ "comments": [] }),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::DataPath { ref model, ref field } if model == "User" && field == "comments"
    ));
}
