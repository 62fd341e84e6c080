//! Integration tests for the game API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tharsis_core::Game;
use tharsis_core::config::GameConfig;
use tharsis_core::store::{MemoryStore, SharedStore};
use tharsis_events::EventBus;
use tharsis_server::router::build_router;
use tharsis_server::state::AppState;
use tharsis_types::GameDocument;
use tower::ServiceExt;

fn make_test_state(players: &[&str]) -> Arc<AppState> {
    let store = SharedStore::new(MemoryStore::new(GameDocument::seeded(
        players.iter().copied(),
    )));
    let game = Game::new(store, Arc::new(EventBus::new()), &GameConfig::default());
    Arc::new(AppState::new(Arc::new(game)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn join(router: &Router, user: &str, board: Value) {
    let path = format!("/users/{user}/board");
    let (status, _) = send(router, "POST", &path, Some(board)).await;
    assert_eq!(status, StatusCode::OK, "{user} should be able to join");
}

fn board(money: i64, money_production: i64, terraformation: i64) -> Value {
    json!({
        "TERRAFORMATION": { "amount": terraformation, "generation": 0 },
        "MONEY": { "amount": money, "generation": money_production },
        "TITANIUM": { "amount": 0, "generation": 0 },
        "PLANTS": { "amount": 0, "generation": 0 },
        "ENERGY": { "amount": 0, "generation": 0 },
        "HEAT": { "amount": 0, "generation": 0 },
    })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_current_generation_starts_at_one() {
    let router = build_router(make_test_state(&["Ivan"]));

    let response = router
        .oneshot(
            Request::get("/currentGeneration")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, json!({ "gen": 1 }));
}

#[tokio::test]
async fn test_boards_lists_only_joined_players() {
    let router = build_router(make_test_state(&["Javier", "Ivan", "Alex"]));

    join(&router, "Alex", board(0, 0, 20)).await;
    join(&router, "Javier", board(0, 0, 20)).await;

    let (status, json) = send(&router, "GET", "/boards", None).await;
    assert_eq!(status, StatusCode::OK);
    // Seat order, not join order.
    assert_eq!(json, json!(["Javier", "Alex"]));
}

#[tokio::test]
async fn test_get_board_of_empty_seat_is_empty_object() {
    let router = build_router(make_test_state(&["Ivan"]));

    let (status, json) = send(&router, "GET", "/users/Ivan/board", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));
}

#[tokio::test]
async fn test_get_board_not_found() {
    let router = build_router(make_test_state(&["Ivan"]));

    let (status, json) = send(&router, "GET", "/users/Nobody/board", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_create_on_seeded_seat_conflicts() {
    let router = build_router(make_test_state(&["Ivan"]));

    let (status, json) = send(&router, "PUT", "/users/Ivan/board", Some(board(5, 1, 20))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let (_, json) = send(&router, "GET", "/users/Ivan/board", None).await;
    assert_eq!(json, json!({}));
    let (_, json) = send(&router, "GET", "/boards", None).await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_create_board_then_conflict() {
    let router = build_router(make_test_state(&[]));

    let (status, json) = send(&router, "PUT", "/users/Ivan/board", Some(board(5, 1, 20))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["MONEY"]["amount"], 5);

    let (status, json) = send(&router, "PUT", "/users/Ivan/board", Some(board(0, 0, 0))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let (_, json) = send(&router, "GET", "/users/Ivan/board", None).await;
    assert_eq!(json["MONEY"]["amount"], 5);
}

#[tokio::test]
async fn test_create_simple_board_sets_flag() {
    let router = build_router(make_test_state(&[]));

    let (status, json) = send(&router, "PUT", "/users/Marc/board/simple", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["simpleBoard"], true);

    let (_, json) = send(&router, "GET", "/boards", None).await;
    assert_eq!(json, json!(["Marc"]));
}

#[tokio::test]
async fn test_legacy_amount_spelling_is_accepted() {
    let router = build_router(make_test_state(&[]));

    let legacy = json!({ "MONEY": { "ammount": 7, "generation": 2 } });
    let (status, json) = send(&router, "PUT", "/users/Sergi/board", Some(legacy)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["MONEY"], json!({ "amount": 7, "generation": 2 }));
}

#[tokio::test]
async fn test_replace_board() {
    let router = build_router(make_test_state(&["Ivan"]));

    let (status, _) = send(&router, "POST", "/users/Ivan/board", Some(board(1, 0, 0))).await;
    assert_eq!(status, StatusCode::OK, "an empty seat can be replaced");

    let (status, json) = send(&router, "POST", "/users/Ivan/board", Some(board(9, 0, 0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["MONEY"]["amount"], 9);

    let (status, _) = send(&router, "POST", "/users/Nobody/board", Some(board(0, 0, 0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replace_with_empty_object_leaves_seat() {
    let router = build_router(make_test_state(&["Ivan", "Alex"]));
    join(&router, "Ivan", board(1, 0, 0)).await;
    join(&router, "Alex", board(1, 0, 0)).await;

    let (status, json) = send(&router, "POST", "/users/Alex/board", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));

    let (_, json) = send(&router, "GET", "/boards", None).await;
    assert_eq!(json, json!(["Ivan"]));
}

#[tokio::test]
async fn test_empty_patch_on_unjoined_seat_does_not_block_generation() {
    let router = build_router(make_test_state(&["Ivan", "Ghost"]));
    join(&router, "Ivan", board(0, 0, 20)).await;

    let (status, json) = send(&router, "PATCH", "/users/Ghost/board", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));

    let (_, json) = send(&router, "GET", "/boards", None).await;
    assert_eq!(json, json!(["Ivan"]));

    let (status, _) = send(&router, "POST", "/users/Ivan/board/finishGen", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(&router, "GET", "/currentGeneration", None).await;
    assert_eq!(json["gen"], 2);
}

#[tokio::test]
async fn test_patch_board_merges_top_level_fields() {
    let router = build_router(make_test_state(&["Adrian"]));

    let mut initial = board(3, 2, 20);
    initial["cards"] = json!(["Mohole"]);
    join(&router, "Adrian", initial).await;

    let patch = json!({ "HEAT": { "amount": 4, "generation": 1 } });
    let (status, json) = send(&router, "PATCH", "/users/Adrian/board", Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["HEAT"]["amount"], 4);
    assert_eq!(json["MONEY"]["amount"], 3);
    assert_eq!(json["cards"], json!(["Mohole"]));

    let (status, _) = send(&router, "PATCH", "/users/Nobody/board", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_with_invalid_flag_is_bad_request() {
    let router = build_router(make_test_state(&["Adrian"]));
    join(&router, "Adrian", board(0, 0, 0)).await;

    let (status, json) = send(
        &router,
        "PATCH",
        "/users/Adrian/board",
        Some(json!({ "doneGen": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_finish_generation_waits_for_everyone() {
    let router = build_router(make_test_state(&["Ivan", "Alex"]));
    for user in ["Ivan", "Alex"] {
        join(&router, user, board(10, 2, 20)).await;
    }

    let (status, json) = send(&router, "POST", "/users/Ivan/board/finishGen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doneGen"], true);
    assert_eq!(json["MONEY"]["amount"], 10);

    let (_, json) = send(&router, "GET", "/currentGeneration", None).await;
    assert_eq!(json["gen"], 1);

    let (status, json) = send(&router, "POST", "/users/Alex/board/finishGen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doneGen"], false);
    // 10 + terraform rating 20 + production 2
    assert_eq!(json["MONEY"]["amount"], 32);

    let (_, json) = send(&router, "GET", "/currentGeneration", None).await;
    assert_eq!(json["gen"], 2);

    let (_, json) = send(&router, "GET", "/users/Ivan/board", None).await;
    assert_eq!(json["doneGen"], false);
    assert_eq!(json["MONEY"]["amount"], 32);
}

#[tokio::test]
async fn test_finish_generation_unknown_player() {
    let router = build_router(make_test_state(&["Ivan"]));
    let (status, _) = send(&router, "POST", "/users/Ivan/board/finishGen", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_end_turn_passes_to_next_player() {
    let router = build_router(make_test_state(&["Javier", "Ivan", "Alex"]));
    for user in ["Javier", "Alex"] {
        join(&router, user, board(0, 0, 20)).await;
    }

    let (status, json) = send(&router, "POST", "/users/Javier/board/endTurn", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "passed", "from": "Javier", "to": "Alex" }));

    let (_, json) = send(&router, "GET", "/users/Alex/board", None).await;
    assert_eq!(json["ownTurn"], true);
    let (_, json) = send(&router, "GET", "/users/Javier/board", None).await;
    assert_eq!(json["ownTurn"], false);
}

#[tokio::test]
async fn test_end_turn_with_nobody_left() {
    let router = build_router(make_test_state(&["Javier", "Alex"]));
    for user in ["Javier", "Alex"] {
        join(&router, user, board(0, 0, 20)).await;
    }
    let (status, _) = send(&router, "POST", "/users/Alex/board/finishGen", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&router, "POST", "/users/Javier/board/endTurn", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "noEligiblePlayer" }));
}

#[tokio::test]
async fn test_end_turn_unknown_player() {
    let router = build_router(make_test_state(&["Javier"]));
    let (status, _) = send(&router, "POST", "/users/Javier/board/endTurn", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let state = make_test_state(&[]);
    let state = Arc::new(
        AppState::new(Arc::clone(&state.game))
            .with_cors_origin(Some(String::from("http://localhost:3000"))),
    );
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/boards")
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allowed = response
        .headers()
        .get("access-control-allow-origin")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(allowed, "http://localhost:3000");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let router = build_router(make_test_state(&[]));
    let (status, _) = send(&router, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
