//! Router tests against the in-memory store with static tokens

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use habit_core::models::UserId;
use habit_server::auth::StaticTokens;
use habit_server::{build_router, AppState, Repositories, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

fn app() -> Router {
    let verifier = StaticTokens::new()
        .with(ALICE, UserId::new("user_alice").unwrap())
        .with(BOB, UserId::new("user_bob").unwrap());
    let state = AppState {
        repos: Repositories::memory(),
        verifier: Arc::new(verifier),
        default_tz: chrono_tz::UTC,
        storage: "memory",
    };
    build_router(Arc::new(state), &ServerConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create_habit(app: &Router, token: &str, body: Value) -> Value {
    let (status, body) = send(app, request("POST", "/api/habits", token, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"].clone()
}

fn daily(name: &str, category: &str) -> Value {
    json!({"name": name, "category": category, "frequency": {"type": "daily"}})
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn missing_or_unknown_token_is_401() {
    let app = app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/habits").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(&app, request("GET", "/api/habits", "nope", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_category_is_400_with_issues() {
    let app = app();
    let (status, body) = send(
        &app,
        request("POST", "/api/habits", ALICE, Some(daily("Nap", "sleep"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["issues"][0]["field"], "category");
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/habits")
        .header("authorization", format!("Bearer {}", ALICE))
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_json");
}

#[tokio::test]
async fn create_get_update_delete_habit() {
    let app = app();
    let habit = create_habit(&app, ALICE, daily("Drink water", "nutrition")).await;
    assert_eq!(habit["color"], "blue");
    assert_eq!(habit["streak"], 0);
    let uri = format!("/api/habits/{}", habit["id"].as_str().unwrap());

    let (status, body) = send(&app, request("GET", &uri, ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Drink water");

    let (status, body) = send(
        &app,
        request("PUT", &uri, ALICE, Some(json!({"color": "teal", "notes": "8 glasses"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["color"], "teal");
    assert_eq!(body["data"]["name"], "Drink water");

    let (status, _) = send(&app, request("PUT", &uri, ALICE, Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request("DELETE", &uri, ALICE, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request("GET", &uri, ALICE, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_path_id_is_400() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/api/habits/not-a-uuid", ALICE, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_path");
}

#[tokio::test]
async fn list_filters_and_archive() {
    let app = app();
    let run = create_habit(&app, ALICE, daily("Run", "fitness")).await;
    create_habit(&app, ALICE, daily("Salad", "nutrition")).await;
    create_habit(&app, BOB, daily("Bob's run", "fitness")).await;

    let (_, body) = send(&app, request("GET", "/api/habits?category=fitness", ALICE, None)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Run");

    let (_, body) = send(&app, request("GET", "/api/habits?search=SAL", ALICE, None)).await;
    assert_eq!(body["total"], 1);

    let archive = format!("/api/habits/{}/archive", run["id"].as_str().unwrap());
    let (status, body) = send(&app, request("POST", &archive, ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isArchived"], true);
    assert_eq!(body["data"]["isActive"], false);

    let (_, body) = send(&app, request("GET", "/api/habits", ALICE, None)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Salad");

    let (_, body) = send(&app, request("GET", "/api/habits?archived=true", ALICE, None)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Run");

    let (_, body) = send(
        &app,
        request("GET", "/api/habits?sort=name&order=asc&perPage=1", ALICE, None),
    )
    .await;
    assert_eq!(body["perPage"], 1);
    assert_eq!(body["hasNext"], false);
}

#[tokio::test]
async fn toggle_twice_leaves_no_log() {
    let app = app();
    let habit = create_habit(&app, ALICE, daily("Meditate", "mindfulness")).await;
    let id = habit["id"].as_str().unwrap();
    let toggle = format!("/api/habits/{}/toggle", id);

    let (status, body) = send(&app, request("POST", &toggle, ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
    assert_eq!(body["data"]["habit"]["streak"], 1);

    let (_, body) = send(&app, request("GET", "/api/habits/today", ALICE, None)).await;
    assert_eq!(body["data"][0]["completedToday"], true);

    let (_, body) = send(&app, request("POST", &toggle, ALICE, None)).await;
    assert_eq!(body["data"]["completed"], false);
    assert_eq!(body["data"]["habit"]["streak"], 0);
    assert_eq!(body["data"]["habit"]["longestStreak"], 1);

    let logs = format!("/api/habits/{}/logs", id);
    let (_, body) = send(&app, request("GET", &logs, ALICE, None)).await;
    assert_eq!(body["data"], json!([]));

    let future = format!("{}?date=2999-01-01", toggle);
    let (status, body) = send(&app, request("POST", &future, ALICE, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "date");
}

#[tokio::test]
async fn toggle_before_supported_years_is_400_and_stores_nothing() {
    let app = app();
    let habit = create_habit(
        &app,
        ALICE,
        json!({"name": "Yoga", "category": "fitness", "frequency": {"type": "weekly", "times": 2}}),
    )
    .await;
    let id = habit["id"].as_str().unwrap();

    let ancient = format!("/api/habits/{}/toggle?date=-262143-01-01", id);
    let (status, body) = send(&app, request("POST", &ancient, ALICE, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "date");

    let (status, body) = send(&app, request("GET", &format!("/api/habits/{}/logs", id), ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    let (status, _) = send(&app, request("GET", "/api/analytics/dashboard", ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn log_timestamps_outside_bounds_are_400() {
    let app = app();
    let habit = create_habit(&app, ALICE, daily("Stretch", "fitness")).await;
    let id = habit["id"].as_str().unwrap();
    let logs = format!("/api/habits/{}/logs", id);

    for at in ["9999-12-31T00:00:00Z", "0000-01-01T00:00:00Z"] {
        let (status, body) = send(
            &app,
            request("POST", &logs, ALICE, Some(json!({"completedAt": at}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", at);
        assert_eq!(body["error"]["issues"][0]["field"], "completedAt");
    }

    let (status, body) = send(&app, request("POST", &logs, ALICE, Some(json!({})))).await;
    assert_eq!(status, StatusCode::CREATED);
    let log_uri = format!("{}/{}", logs, body["data"]["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        request("PUT", &log_uri, ALICE, Some(json!({"completedAt": "9999-12-31T00:00:00Z"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "completedAt");

    let (_, body) = send(&app, request("GET", &format!("/api/habits/{}", id), ALICE, None)).await;
    assert_ne!(body["data"]["lastCompleted"], "9999-12-31T00:00:00Z");
}

#[tokio::test]
async fn other_users_habit_is_404() {
    let app = app();
    let habit = create_habit(&app, ALICE, daily("Read", "productivity")).await;
    let id = habit["id"].as_str().unwrap();

    for (method, uri) in [
        ("GET", format!("/api/habits/{}", id)),
        ("DELETE", format!("/api/habits/{}", id)),
        ("POST", format!("/api/habits/{}/toggle", id)),
        ("GET", format!("/api/habits/{}/logs", id)),
    ] {
        let (status, body) = send(&app, request(method, &uri, BOB, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["error"]["code"], "not_found");
    }

    let (status, _) = send(
        &app,
        request("POST", &format!("/api/habits/{}/logs", id), BOB, Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logs_create_list_delete() {
    let app = app();
    let habit = create_habit(
        &app,
        ALICE,
        json!({
            "name": "Push-ups",
            "category": "fitness",
            "frequency": {"type": "weekly", "days": ["mon", "wed", "fri"]},
            "metricType": "count",
            "goal": 20
        }),
    )
    .await;
    let logs = format!("/api/habits/{}/logs", habit["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        request(
            "POST",
            &logs,
            ALICE,
            Some(json!({"completedAt": "2024-03-04T07:00:00Z", "value": 25, "feeling": "great"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let log_id = body["data"]["id"].as_str().unwrap().to_owned();
    assert_eq!(body["data"]["feeling"], "great");

    let (status, body) = send(
        &app,
        request("POST", &logs, ALICE, Some(json!({"difficulty": 7}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "difficulty");

    let (_, body) = send(
        &app,
        request("GET", &format!("{}?from=2024-03-01&to=2024-03-31", logs), ALICE, None),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        request("GET", &format!("{}?from=2024-04-01", logs), ALICE, None),
    )
    .await;
    assert_eq!(body["data"], json!([]));

    let log_uri = format!("{}/{}", logs, log_id);
    let (status, body) = send(
        &app,
        request("PUT", &log_uri, ALICE, Some(json!({"notes": "felt strong"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "felt strong");
    assert_eq!(body["data"]["value"], 25.0);

    let (status, _) = send(&app, request("DELETE", &log_uri, BOB, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, request("DELETE", &log_uri, ALICE, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn goals_ownership_and_progress() {
    let app = app();
    let alice_habit = create_habit(&app, ALICE, daily("Run", "fitness")).await;
    let bob_habit = create_habit(&app, BOB, daily("Swim", "fitness")).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/goals",
            ALICE,
            Some(json!({"name": "Swim more", "relatedHabits": [{"habitId": bob_habit["id"]}]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "relatedHabits");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/goals",
            ALICE,
            Some(json!({
                "name": "Run 10km",
                "targetValue": 10,
                "unit": "km",
                "relatedHabits": [{"habitId": alice_habit["id"], "relationship": "primary"}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let goal_uri = format!("/api/goals/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app, request("DELETE", &goal_uri, BOB, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request("PUT", &goal_uri, BOB, Some(json!({"name": "mine now"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let progress = format!("{}/progress", goal_uri);
    let (_, body) = send(
        &app,
        request("POST", &progress, ALICE, Some(json!({"increment": 4}))),
    )
    .await;
    assert_eq!(body["data"]["currentValue"], 4.0);
    assert_eq!(body["data"]["isCompleted"], false);

    let (_, body) = send(
        &app,
        request("POST", &progress, ALICE, Some(json!({"increment": 6}))),
    )
    .await;
    assert_eq!(body["data"]["isCompleted"], true);

    let (_, body) = send(&app, request("GET", "/api/goals?completed=true", ALICE, None)).await;
    assert_eq!(body["total"], 1);
    let (_, body) = send(&app, request("GET", "/api/goals?completed=false", ALICE, None)).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, request("DELETE", &goal_uri, ALICE, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn goal_update_past_target_completes() {
    let app = app();
    let (_, body) = send(
        &app,
        request("POST", "/api/goals", ALICE, Some(json!({"name": "Read 10 books", "targetValue": 10}))),
    )
    .await;
    let goal_uri = format!("/api/goals/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        request("PUT", &goal_uri, ALICE, Some(json!({"currentValue": 12}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCompleted"], true);
}

#[tokio::test]
async fn overflowing_goal_increment_is_400() {
    let app = app();
    let (_, body) = send(
        &app,
        request("POST", "/api/goals", ALICE, Some(json!({"name": "Save money"}))),
    )
    .await;
    let goal_uri = format!("/api/goals/{}", body["data"]["id"].as_str().unwrap());
    let progress = format!("{}/progress", goal_uri);

    let (status, _) = send(
        &app,
        request("POST", &progress, ALICE, Some(json!({"increment": f64::MAX}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        request("POST", &progress, ALICE, Some(json!({"increment": f64::MAX}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "increment");

    let (_, body) = send(&app, request("GET", &goal_uri, ALICE, None)).await;
    assert_eq!(body["data"]["currentValue"], f64::MAX);
}

#[tokio::test]
async fn analytics_endpoints() {
    let app = app();
    let habit = create_habit(&app, ALICE, daily("Journal", "mindfulness")).await;
    let toggle = format!("/api/habits/{}/toggle", habit["id"].as_str().unwrap());
    send(&app, request("POST", &toggle, ALICE, None)).await;

    let (status, body) = send(&app, request("GET", "/api/analytics/dashboard", ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalHabits"], 1);
    assert_eq!(body["data"]["dueToday"], 1);
    assert_eq!(body["data"]["completedToday"], 1);
    assert_eq!(body["data"]["bestStreak"]["streak"], 1);

    let (status, _) = send(
        &app,
        request("GET", "/api/analytics/completion?groupBy=week", ALICE, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("GET", "/api/analytics/streaks", ALICE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request("GET", "/api/analytics/completion?from=2024-02-01&to=2024-01-01", ALICE, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "from");
}

#[tokio::test]
async fn unknown_timezone_is_400() {
    let app = app();
    let mut req = request("GET", "/api/habits/today", ALICE, None);
    req.headers_mut()
        .insert("x-timezone", "Mars/Olympus_Mons".parse().unwrap());
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["issues"][0]["field"], "X-Timezone");
}
