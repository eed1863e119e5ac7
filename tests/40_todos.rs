mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;

async fn add_todo(app: &TestApp, token: &str, description: &str) -> Result<Value> {
    let (status, body) = app.post("/api/todos", token, json!({ "description": description })).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "todo create failed: {}", body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn todos_list_newest_first() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    add_todo(&app, &token, "Book dentist").await?;
    add_todo(&app, &token, "Renew prescription").await?;

    let (status, body) = app.get("/api/todos", &token).await?;
    assert_eq!(status, StatusCode::OK);
    let descriptions: Vec<&str> = body["data"]
        .as_array()
        .map(|todos| todos.iter().filter_map(|t| t["description"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(descriptions, vec!["Renew prescription", "Book dentist"]);
    Ok(())
}

#[tokio::test]
async fn completing_is_idempotent_and_updates_the_count() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let todo = add_todo(&app, &token, "Book dentist").await?;
    add_todo(&app, &token, "Renew prescription").await?;

    let (_, body) = app.get("/api/todos/active-count", &token).await?;
    assert_eq!(body["data"]["count"], json!(2));

    let uri = format!("/api/todos/{}/complete", todo["id"].as_str().unwrap_or_default());
    let (status, first) = app.post(&uri, &token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["completed"], json!(true));
    assert!(first["data"]["completedAt"].is_string());

    let (status, second) = app.post(&uri, &token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["completedAt"], first["data"]["completedAt"]);

    let (_, body) = app.get("/api/todos/active-count", &token).await?;
    assert_eq!(body["data"]["count"], json!(1));
    Ok(())
}

#[tokio::test]
async fn assignees_must_be_family_members() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let (_, me) = app.get("/api/members/me", &token).await?;
    let my_id = me["data"]["id"].clone();

    let (status, body) = app
        .post("/api/todos", &token, json!({ "description": "Flu shot", "assignedMemberIds": [my_id] }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["assignedMemberIds"], json!([my_id]));

    let (status, body) = app
        .post(
            "/api/todos",
            &token,
            json!({ "description": "Flu shot", "assignedMemberIds": ["00000000-0000-0000-0000-000000000000"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "One or more assigned members not found");
    Ok(())
}

#[tokio::test]
async fn todo_descriptions_are_validated() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;

    let (status, body) = app.post("/api/todos", &token, json!({ "description": "   " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Description is required");

    let todo = add_todo(&app, &token, "Book dentist").await?;
    let uri = format!("/api/todos/{}", todo["id"].as_str().unwrap_or_default());
    let (status, body) = app.patch(&uri, &token, json!({ "description": "x".repeat(501) })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Description must be less than 500 characters");

    let (status, body) = app.patch(&uri, &token, json!({ "description": " Book orthodontist " })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Book orthodontist");
    Ok(())
}

#[tokio::test]
async fn deleted_todos_are_gone() -> Result<()> {
    let app = TestApp::new();
    let (alice, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let (carol, _) = app.onboard("user-carol", "Carol", "Joneses").await?;
    let todo = add_todo(&app, &alice, "Book dentist").await?;
    let uri = format!("/api/todos/{}", todo["id"].as_str().unwrap_or_default());

    let (status, _) = app.delete(&uri, &carol).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.delete(&uri, &alice).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], todo["id"]);

    let (status, body) = app.delete(&uri, &alice).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Todo not found");
    Ok(())
}
