//! Integration tests for seat registration.

mod helpers;

use axum::http::StatusCode;

#[tokio::test]
async fn test_register_and_cancel() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (alice, alice_id) = app.register_user("alice", "user").await;
    let event = app.create_event(&admin, "Concert", 3).await;

    let response = app
        .request("POST", &format!("/api/events/{event}/register"), None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["status"], "confirmed");
    assert_eq!(response.body["data"]["user_id"], alice_id.to_string());
    let registration = response.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.available_seats(event).await, 2);

    let response = app
        .request("GET", "/api/registrations/me", None, Some(&alice))
        .await;
    assert_eq!(response.body["data"].as_array().map(Vec::len), Some(1));

    let response = app
        .request("DELETE", &format!("/api/registrations/{registration}"), None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "cancelled");
    assert_eq!(app.available_seats(event).await, 3);

    let response = app
        .request("DELETE", &format!("/api/registrations/{registration}"), None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_duplicate_registration() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (alice, _) = app.register_user("alice", "user").await;
    let event = app.create_event(&admin, "Concert", 3).await;
    let path = format!("/api/events/{event}/register");

    let response = app.request("POST", &path, None, Some(&alice)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let response = app.request("POST", &path, None, Some(&alice)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.available_seats(event).await, 2);
}

#[tokio::test]
async fn test_two_seat_scenario() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (a, _) = app.register_user("a", "user").await;
    let (b, _) = app.register_user("b", "user").await;
    let (c, _) = app.register_user("c", "user").await;
    let event = app.create_event(&admin, "Small Room", 2).await;
    let path = format!("/api/events/{event}/register");

    let response = app.request("POST", &path, None, Some(&a)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let reg_a = response.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.request("POST", &path, None, Some(&b)).await.status, StatusCode::CREATED);

    let response = app.request("POST", &path, None, Some(&c)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.available_seats(event).await, 0);

    let response = app
        .request("GET", &format!("/api/events/{event}"), None, None)
        .await;
    assert_eq!(response.body["data"]["status"], "SOLD_OUT");

    let response = app
        .request("DELETE", &format!("/api/registrations/{reg_a}"), None, Some(&a))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.request("POST", &path, None, Some(&c)).await.status, StatusCode::CREATED);
    assert_eq!(app.available_seats(event).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_overbook() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let event = app.create_event(&admin, "Hot Ticket", 3).await;
    let path = format!("/api/events/{event}/register");

    let mut tokens = Vec::new();
    for i in 0..8 {
        tokens.push(app.register_user(&format!("fan{i}"), "user").await.0);
    }

    let requests = tokens
        .iter()
        .map(|token| app.request("POST", &path, None, Some(token)));
    let responses = futures::future::join_all(requests).await;

    let created = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    let conflicts = responses
        .iter()
        .filter(|r| r.status == StatusCode::CONFLICT)
        .count();
    assert_eq!(created, 3);
    assert_eq!(conflicts, 5);
    assert_eq!(app.available_seats(event).await, 0);

    let response = app
        .request("GET", &format!("/api/events/{event}/registrations"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_cancel_permissions() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (alice, _) = app.register_user("alice", "user").await;
    let (mallory, _) = app.register_user("mallory", "user").await;
    let event = app.create_event(&admin, "Concert", 3).await;

    let response = app
        .request("POST", &format!("/api/events/{event}/register"), None, Some(&alice))
        .await;
    let registration = response.body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request("DELETE", &format!("/api/registrations/{registration}"), None, Some(&mallory))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.available_seats(event).await, 2);

    let response = app
        .request("DELETE", &format!("/api/registrations/{registration}"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.available_seats(event).await, 3);
}

#[tokio::test]
async fn test_event_roster_is_admin_only() {
    let app = helpers::TestApp::new().await;
    let (admin, _) = app.register_user("root", "admin").await;
    let (alice, _) = app.register_user("alice", "user").await;
    let event = app.create_event(&admin, "Concert", 3).await;

    let response = app
        .request("GET", &format!("/api/events/{event}/registrations"), None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "POST",
            &format!("/api/events/{}/register", uuid::Uuid::new_v4()),
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
