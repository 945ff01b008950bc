//! Integration tests for the event catalogue.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_create_requires_admin() {
    let app = helpers::TestApp::new().await;
    let (token, _) = app.register_user("alice", "user").await;

    let response = app
        .request(
            "POST",
            "/api/events",
            Some(helpers::event_body("Concert", 10)),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("POST", "/api/events", Some(helpers::event_body("Concert", 10)), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let id = app.create_event(&admin, "Concert", 10).await;

    let response = app
        .request("GET", &format!("/api/events/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["title"], "Concert");
    assert_eq!(data["total_seats"], 10);
    assert_eq!(data["available_seats"], 10);
    assert_eq!(data["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_create_rejects_invalid_event() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;

    let response = app
        .request(
            "POST",
            "/api/events",
            Some(helpers::event_body("Concert", 0)),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let mut past = helpers::event_body("Yesterday", 5);
    past["date"] = json!("2000-01-01T00:00:00Z");
    let response = app
        .request("POST", "/api/events", Some(past), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_event() {
    let app = helpers::TestApp::new().await;
    let response = app
        .request(
            "GET",
            &format!("/api/events/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    app.create_event(&admin, "Jazz Night", 10).await;
    app.create_event(&admin, "Rock Night", 10).await;
    app.create_event(&admin, "Poetry Reading", 10).await;

    let response = app
        .request("GET", "/api/events?title=night&sort_by=title", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["total_items"], 2);
    assert_eq!(data["items"][0]["title"], "Jazz Night");
    assert_eq!(data["items"][1]["title"], "Rock Night");

    let response = app
        .request("GET", "/api/events?page=2&limit=2", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(response.body["data"]["total_pages"], 2);

    let response = app
        .request("GET", "/api/events?sort_by=venue", None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_is_visible_after_cached_read() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let id = app.create_event(&admin, "Concert", 10).await;

    // Warm the cache.
    app.request("GET", &format!("/api/events/{id}"), None, None)
        .await;
    app.request("GET", "/api/events", None, None).await;

    let response = app
        .request(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "title": "Renamed Concert" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", &format!("/api/events/{id}"), None, None)
        .await;
    assert_eq!(response.body["data"]["title"], "Renamed Concert");
    let response = app.request("GET", "/api/events", None, None).await;
    assert_eq!(response.body["data"]["items"][0]["title"], "Renamed Concert");
}

#[tokio::test]
async fn test_update_cannot_change_capacity() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let id = app.create_event(&admin, "Concert", 10).await;

    let response = app
        .request(
            "PATCH",
            &format!("/api/events/{id}"),
            Some(json!({ "total_seats": 50 })),
            Some(&admin),
        )
        .await;
    assert!(response.status.is_client_error());
    assert_eq!(app.available_seats(id).await, 10);
}

#[tokio::test]
async fn test_delete_event() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (user, _) = app.register_user("alice", "user").await;
    let id = app.create_event(&admin, "Concert", 10).await;

    let response = app
        .request("DELETE", &format!("/api/events/{id}"), None, Some(&user))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("DELETE", &format!("/api/events/{id}"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", &format!("/api/events/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_capacity_upper_bound() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;

    let response = app
        .request(
            "POST",
            "/api/events",
            Some(helpers::event_body("Stadium", 10001)),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/api/events",
            Some(helpers::event_body("Arena", 10000)),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["available_seats"], 10000);
}

#[tokio::test]
async fn test_page_far_beyond_the_end_is_empty() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    app.create_event(&admin, "Concert", 10).await;

    let response = app
        .request("GET", "/api/events?page=184467440737095518&limit=100", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(response.body["data"]["total_items"], 1);
}
