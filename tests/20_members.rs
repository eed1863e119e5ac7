mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;

async fn add_member(app: &TestApp, token: &str, name: &str, relationship: &str) -> Result<Value> {
    let (status, body) = app
        .post("/api/members", token, json!({ "name": name, "relationship": relationship }))
        .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "member create failed: {} {}", status, body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn new_members_take_the_next_free_color() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;

    let (status, body) = app.get("/api/members/available-color", &token).await?;
    assert_eq!(status, StatusCode::OK);
    let suggested = body["data"]["color"].clone();

    let emma = add_member(&app, &token, "Emma", "Child").await?;
    assert_eq!(emma["color"], suggested);
    assert_eq!(emma["relationship"], "Child");
    assert!(emma.get("userId").is_none());

    let (_, body) = app.get("/api/members", &token).await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .map(|members| members.iter().filter_map(|m| m["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Alice", "Emma"]);
    Ok(())
}

#[tokio::test]
async fn member_input_is_validated() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;

    let (status, body) = app.post("/api/members", &token, json!({ "name": "Emma" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Relationship is required");

    let (status, body) = app
        .post("/api/members", &token, json!({ "name": "Emma", "relationship": "Child", "color": "red" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please select a valid color");

    let (status, body) = app
        .post("/api/members", &token, json!({ "name": "x".repeat(51), "relationship": "Child" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name must be less than 50 characters");
    Ok(())
}

#[tokio::test]
async fn members_can_be_renamed() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let emma = add_member(&app, &token, "Emma", "Child").await?;
    let uri = format!("/api/members/{}", emma["id"].as_str().unwrap_or_default());

    let (status, body) = app.patch(&uri, &token, json!({ "name": "Emma Rose" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Emma Rose");

    let (status, body) = app.patch(&uri, &token, json!({ "name": "  " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name cannot be empty");
    Ok(())
}

#[tokio::test]
async fn account_members_cannot_be_deleted() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let (_, me) = app.get("/api/members/me", &token).await?;

    let uri = format!("/api/members/{}", me["data"]["id"].as_str().unwrap_or_default());
    let (status, body) = app.delete(&uri, &token).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Cannot delete a family member linked to a user account. Ask them to leave the family instead."
    );
    Ok(())
}

#[tokio::test]
async fn deleting_a_member_returns_its_id() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let emma = add_member(&app, &token, "Emma", "Child").await?;
    let id = emma["id"].as_str().unwrap_or_default();

    let (status, body) = app.delete(&format!("/api/members/{}", id), &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, body) = app.delete(&format!("/api/members/{}", id), &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Family member not found");
    Ok(())
}

#[tokio::test]
async fn sole_member_of_a_provider_is_kept() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let emma = add_member(&app, &token, "Emma", "Child").await?;

    let (status, _) = app
        .post(
            "/api/providers",
            &token,
            json!({
                "providerName": "Kids Clinic",
                "portalUrl": "https://kids.example.com",
                "specialty": "Pediatrics",
                "familyMemberIds": [emma["id"]]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/members/{}", emma["id"].as_str().unwrap_or_default());
    let (status, body) = app.delete(&uri, &token).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Emma is the only family member for Kids Clinic. Reassign or delete the provider first."
    );
    Ok(())
}

#[tokio::test]
async fn members_are_scoped_to_their_family() -> Result<()> {
    let app = TestApp::new();
    let (alice, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let (carol, _) = app.onboard("user-carol", "Carol", "Joneses").await?;
    let emma = add_member(&app, &alice, "Emma", "Child").await?;
    let uri = format!("/api/members/{}", emma["id"].as_str().unwrap_or_default());

    let (status, _) = app.patch(&uri, &carol, json!({ "name": "Stolen" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&uri, &carol).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/members", &carol).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn default_member_must_belong_to_the_caller() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.onboard("user-alice", "Alice", "Smiths").await?;
    let emma = add_member(&app, &token, "Emma", "Child").await?;

    let uri = format!("/api/members/{}/default", emma["id"].as_str().unwrap_or_default());
    let (status, body) = app.put(&uri, &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only set your own family members as default");

    let (_, me) = app.get("/api/members/me", &token).await?;
    let uri = format!("/api/members/{}/default", me["data"]["id"].as_str().unwrap_or_default());
    let (status, body) = app.put(&uri, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDefault"], json!(true));

    let (_, body) = app.get("/api/members/default", &token).await?;
    assert_eq!(body["data"]["id"], me["data"]["id"]);
    Ok(())
}
