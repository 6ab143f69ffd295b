use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

fn valid_course_body() -> serde_json::Value {
    json!({
        "name": "Rust for Backend Engineers",
        "description": "A generated course covering ownership, async, and web services.",
        "chapters": 5,
        "category": "Programming",
        "difficulty": "Intermediate",
    })
}

#[tokio::test]
async fn create_course_without_token_returns_401() {
    let app = common::create_test_app().await;

    let (status, _) = common::send(&app, "POST", "/api/courses", None, Some(valid_course_body())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_courses_without_token_returns_401() {
    let app = common::create_test_app().await;

    let (status, _) = common::send(&app, "GET", "/api/courses", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_course_with_short_name_returns_field_errors() {
    let app = common::create_test_app().await;
    let token = common::auth_token(&format!("user-{}", Uuid::new_v4()));

    let mut body = valid_course_body();
    body["name"] = json!("ab");

    let (status, json) = common::send(&app, "POST", "/api/courses", Some(&token), Some(body)).await;

    // Validation failures never reach storage
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Validation failed");
    assert!(json["errors"]["name"].is_array());
}

#[tokio::test]
async fn create_course_with_too_many_chapters_returns_400() {
    let app = common::create_test_app().await;
    let token = common::auth_token(&format!("user-{}", Uuid::new_v4()));

    let mut body = valid_course_body();
    body["chapters"] = json!(21);

    let (status, json) = common::send(&app, "POST", "/api/courses", Some(&token), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["errors"]["chapters"].is_array());
}

#[tokio::test]
async fn create_course_with_unknown_category_returns_400() {
    let app = common::create_test_app().await;
    let token = common::auth_token(&format!("user-{}", Uuid::new_v4()));

    let mut body = valid_course_body();
    body["category"] = json!("Cooking");

    let (status, json) = common::send(&app, "POST", "/api/courses", Some(&token), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Failed to parse JSON request body"));
}

#[tokio::test]
async fn course_status_patch_rejects_unknown_values() {
    let app = common::create_test_app().await;
    let token = common::auth_token(&format!("user-{}", Uuid::new_v4()));

    let (status, json) = common::send(
        &app,
        "PATCH",
        "/api/courses/65a1b2c3d4e5f6a7b8c9d0e1/status",
        Some(&token),
        Some(json!({ "status": "retired" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid status value");
}

#[tokio::test]
async fn health_endpoint_reports_service_identity() {
    let app = common::create_test_app().await;

    let (status, json) = common::send(&app, "GET", "/health", None, None).await;

    // Healthy with a reachable MongoDB, degraded without one
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {}",
        status
    );
    assert_eq!(json["service"], "courseforge-api");
    assert!(json["dependencies"]["mongodb"].is_object());
}

#[tokio::test]
async fn metrics_endpoint_requires_basic_auth() {
    let app = common::create_test_app().await;

    let (status, _) = common::send(&app, "GET", "/metrics", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (set MONGO_URI or use .env.test)"]
async fn course_crud_lifecycle() {
    let app = common::create_test_app().await;
    let owner = format!("owner-{}", Uuid::new_v4());
    let token = common::auth_token(&owner);

    // Create
    let (status, created) =
        common::send(&app, "POST", "/api/courses", Some(&token), Some(valid_course_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let course_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "draft");
    assert_eq!(created["createdBy"], owner);

    // Get
    let (status, fetched) = common::send(
        &app,
        "GET",
        &format!("/api/courses/{}", course_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Rust for Backend Engineers");

    // Update
    let (status, updated) = common::send(
        &app,
        "PUT",
        &format!("/api/courses/{}", course_id),
        Some(&token),
        Some(json!({ "name": "Rust for Busy Backend Engineers" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Rust for Busy Backend Engineers");

    // Publish
    let (status, published) = common::send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/status", course_id),
        Some(&token),
        Some(json!({ "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "published");

    // Listed for the owner with pagination metadata
    let (status, listing) =
        common::send(&app, "GET", "/api/courses?page=1&limit=10", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listing["pagination"]["totalItems"].as_u64().unwrap() >= 1);
    assert_eq!(listing["pagination"]["currentPage"], 1);
    assert_eq!(listing["pagination"]["itemsPerPage"], 10);

    // Delete
    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/api/courses/{}", course_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone afterwards
    let (status, _) = common::send(
        &app,
        "GET",
        &format!("/api/courses/{}", course_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (set MONGO_URI or use .env.test)"]
async fn courses_are_owner_scoped() {
    let app = common::create_test_app().await;
    let owner_token = common::auth_token(&format!("owner-{}", Uuid::new_v4()));
    let other_token = common::auth_token(&format!("other-{}", Uuid::new_v4()));

    let (status, created) = common::send(
        &app,
        "POST",
        "/api/courses",
        Some(&owner_token),
        Some(valid_course_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let course_id = created["id"].as_str().unwrap();

    // Not-owned reads as not-found, with no hint the course exists
    let (status, json) = common::send(
        &app,
        "GET",
        &format!("/api/courses/{}", course_id),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Course not found");

    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/api/courses/{}", course_id),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (set MONGO_URI or use .env.test)"]
async fn explore_filters_and_searches_published_courses() {
    let app = common::create_test_app().await;
    let owner_token = common::auth_token(&format!("owner-{}", Uuid::new_v4()));

    let marker = Uuid::new_v4().simple().to_string();
    let mut body = valid_course_body();
    body["name"] = json!(format!("Exploring {}", marker));

    let (status, created) =
        common::send(&app, "POST", "/api/courses", Some(&owner_token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let course_id = created["id"].as_str().unwrap();

    let (status, _) = common::send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/status", course_id),
        Some(&owner_token),
        Some(json!({ "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Explore is public: no token required
    let (status, listing) = common::send(
        &app,
        "GET",
        &format!("/api/courses/explore?status=published&search={}", marker),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["pagination"]["totalItems"], 1);
    assert_eq!(
        listing["data"][0]["name"],
        format!("Exploring {}", marker)
    );

    // "all" disables the status filter
    let (status, listing) = common::send(
        &app,
        "GET",
        &format!("/api/courses/explore?status=all&search={}", marker),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["pagination"]["totalItems"], 1);
}
