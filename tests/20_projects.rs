mod common;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use interior_tracker::database::models::{ProjectChanges, ProjectStatus};
use interior_tracker::database::Repository;

#[tokio::test]
async fn projects_require_a_session() {
    let app = TestApp::new();
    assert_eq!(app.get("/api/projects", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.post("/api/create-proj", None, json!({ "name": "x" })).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn create_generates_access_code_and_bucket() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;

    let res = app
        .post(
            "/api/create-proj",
            Some(&cookie),
            json!({
                "name": "  Condo Sukhumvit  ",
                "budget": "150000",
                "progress_percentage": "30",
                "start_date": "2024-02-01",
                "status": "active",
                "description": ""
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let code = res.body["access_code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(res.body["bucket_name"], res.body["project_id"]);

    let id = Uuid::parse_str(res.body["project_id"].as_str().unwrap()).unwrap();
    let project = app.repo.project(id).unwrap();
    assert_eq!(project.name, "Condo Sukhumvit");
    assert_eq!(project.created_by, Some(owner));
    assert_eq!(project.progress_percentage, Some(30));
    assert_eq!(project.budget, Some(rust_decimal::Decimal::from(150000)));
    assert_eq!(project.description, None);
}

#[tokio::test]
async fn create_validates_input() {
    let app = TestApp::new();
    let (_, cookie) = app.guest();

    let res = app.post("/api/create-proj", Some(&cookie), json!({ "name": " " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "กรุณาระบุชื่อโปรเจ็ค");

    let res = app
        .post("/api/create-proj", Some(&cookie), json!({ "name": "a", "progress_percentage": 120 }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post("/api/create-proj", Some(&cookie), json!({ "name": "a", "status": "archived" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post("/api/create-proj", Some(&cookie), json!({ "name": "a", "budget": "lots" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "budget ต้องเป็นตัวเลข");
}

#[tokio::test]
async fn create_rejects_duplicate_access_code() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;
    app.seed_project(owner, "First", "SAME01").await;

    let res = app
        .post("/api/create-proj", Some(&cookie), json!({ "name": "Second", "access_code": "SAME01" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "access_code นี้มีอยู่แล้ว กรุณาใช้ access_code อื่น");
}

#[tokio::test]
async fn unique_index_rejects_code_that_slipped_past_the_check() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;
    app.seed_project(owner, "First", "RACE01").await;
    let other = app.seed_project(owner, "Other", "RACE02").await;
    app.repo.stale_code_checks.store(true, Ordering::SeqCst);

    let res = app
        .post("/api/create-proj", Some(&cookie), json!({ "name": "Second", "access_code": "RACE01" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "access_code นี้มีอยู่แล้ว กรุณาใช้ access_code อื่น");
    assert_eq!(res.body["code"], "BAD_REQUEST");

    let res = app
        .put("/api/edit-proj", Some(&cookie), json!({ "id": other.id, "access_code": "RACE01" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "access_code นี้มีอยู่แล้ว กรุณาใช้ access_code อื่น");
    assert_eq!(app.repo.project(other.id).unwrap().access_code, "RACE02");
}

#[tokio::test]
async fn list_is_newest_first_and_filterable() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;
    let first = app.seed_project(owner, "Condo Sukhumvit", "AAA111").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.seed_project(owner, "House Bangna", "BBB222").await;
    app.repo
        .update_project(
            second.id,
            ProjectChanges {
                status: Some(Some(ProjectStatus::Completed)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let res = app.get("/api/projects", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::OK);
    let ids: Vec<String> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![second.id.to_string(), first.id.to_string()]);

    let res = app.get("/api/projects?search=sukhu", Some(&cookie)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["id"], first.id.to_string());

    let res = app.get("/api/projects?search=bbb2", Some(&cookie)).await;
    assert_eq!(res.body[0]["id"], second.id.to_string());

    let res = app.get("/api/projects?status=completed", Some(&cookie)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["status"], "completed");

    let res = app.get("/api/projects?status=archived", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_count_by_status() {
    let app = TestApp::new();
    let (_, cookie) = app.admin().await;
    for (name, budget) in [("a", "1000"), ("b", "250.5")] {
        let res = app
            .post("/api/create-proj", Some(&cookie), json!({ "name": name, "budget": budget, "status": "active" }))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let res = app.get("/api/projects/stats", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], 2);
    assert_eq!(res.body["active"], 2);
    assert_eq!(res.body["completed"], 0);
    assert_eq!(res.body["totalBudget"], json!(1250.5));
}

#[tokio::test]
async fn public_project_lookup() {
    let app = TestApp::new();
    let (owner, _) = app.admin().await;
    let project = app.seed_project(owner, "Condo", "PUB123").await;

    let res = app.get(&format!("/api/project/{}", project.id), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["access_code"], "PUB123");

    let res = app.get(&format!("/api/project/{}", Uuid::new_v4()), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "ไม่พบโปรเจ็ค");

    let res = app.get("/api/project/not-a-uuid", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_edits_project() {
    let app = TestApp::new();
    let (owner, _) = app.guest();
    let cookie = app.cookie_for(owner);
    let project = app.seed_project(owner, "Condo", "EDIT01").await;

    let res = app
        .put(
            "/api/edit-proj",
            Some(&cookie),
            json!({
                "id": project.id,
                "name": "Condo (renovated)",
                "progress_percentage": 80,
                "budget": null,
                "status": "completed"
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "อัปเดตโปรเจ็คสำเร็จ");
    assert_eq!(res.body["project"]["name"], "Condo (renovated)");
    assert_eq!(res.body["project"]["progress_percentage"], 80);
    assert_eq!(res.body["project"]["status"], "completed");
    assert!(res.body["project"]["budget"].is_null());
    assert_eq!(res.body["project"]["access_code"], "EDIT01");
}

#[tokio::test]
async fn admin_may_edit_other_projects_but_guests_may_not() {
    let app = TestApp::new();
    let (owner, _) = app.guest();
    let (_, admin_cookie) = app.admin().await;
    let (_, stranger_cookie) = app.guest();
    let project = app.seed_project(owner, "Condo", "OWN001").await;

    let res = app
        .put("/api/edit-proj", Some(&stranger_cookie), json!({ "id": project.id, "name": "Mine" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "ไม่มีสิทธิ์ในการแก้ไขโปรเจ็คนี้");

    let res = app
        .put("/api/edit-proj", Some(&admin_cookie), json!({ "id": project.id, "name": "Admin edit" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.repo.project(project.id).unwrap().name, "Admin edit");
}

#[tokio::test]
async fn edit_validates_request() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;
    let project = app.seed_project(owner, "Condo", "VAL001").await;
    app.seed_project(owner, "Other", "VAL002").await;

    let res = app.put("/api/edit-proj", Some(&cookie), json!({ "name": "x" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "กรุณาระบุ ID ของโปรเจ็ค");

    let res = app.put("/api/edit-proj", Some(&cookie), json!({ "id": project.id })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "ไม่มีข้อมูลที่จะอัปเดต");

    let res = app
        .put("/api/edit-proj", Some(&cookie), json!({ "id": Uuid::new_v4(), "name": "x" }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .put("/api/edit-proj", Some(&cookie), json!({ "id": project.id, "access_code": "VAL002" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Re-sending the project's own code is not a conflict.
    let res = app
        .put(
            "/api/edit-proj",
            Some(&cookie),
            json!({ "id": project.id, "access_code": "VAL001", "name": "Same code" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn delete_project() {
    let app = TestApp::new();
    let (owner, cookie) = app.admin().await;
    let (_, stranger_cookie) = app.guest();
    let project = app.seed_project(owner, "Condo", "DEL001").await;

    let res = app.delete("/api/edit-proj", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/edit-proj?id={}", project.id);
    let res = app.delete(&uri, Some(&stranger_cookie)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete(&uri, Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "ลบโปรเจ็คสำเร็จ");

    let res = app.get(&format!("/api/project/{}", project.id), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(&uri, Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
