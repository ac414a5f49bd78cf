//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/games", get(http::http_get_games))
        .route("/api/v1/challenges", get(http::http_get_challenges))
        .route("/api/v1/validate", post(http::http_post_validate))
        .route("/api/v1/hint", get(http::http_get_hint))
        .route("/api/v1/session", post(http::http_post_session))
        .route("/api/v1/session/submit", post(http::http_post_submit))
        .route("/api/v1/session/hint", post(http::http_post_session_hint))
        .route("/api/v1/session/restart", post(http::http_post_session_restart))
        .route("/api/v1/progress", get(http::http_get_progress).delete(http::http_delete_progress))
        .route("/api/v1/progress/complete", post(http::http_post_complete))
        .route("/api/v1/progress/stats", get(http::http_get_stats))
        .route("/api/v1/progress/score", post(http::http_post_score))
        .route("/api/v1/progress/playtime", post(http::http_post_play_time))
        .route("/api/v1/scores", get(http::http_get_scores))
        .route("/api/v1/achievements", get(http::http_get_achievements))
        .route("/api/v1/settings", get(http::http_get_settings).put(http::http_put_settings))
        .route("/api/v1/export", get(http::http_get_export))
        .route("/api/v1/import", post(http::http_post_import))
        .route("/api/v1/drill", get(http::http_get_drill))
        .route("/api/v1/drill/check", post(http::http_post_drill_check))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::progress::{MemoryBackend, ProgressStore, STORAGE_KEY};
    use crate::seeds::seed_catalog;

    fn app() -> Router {
        let store = ProgressStore::create(Box::new(MemoryBackend::new()), STORAGE_KEY, seed_catalog());
        build_router(Arc::new(AppState::new(&AppConfig::default(), store)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_games() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (_, games) = call(&app, "GET", "/api/v1/games", None).await;
        assert_eq!(games.as_array().unwrap().len(), 7);
        assert_eq!(games[0]["id"], "regex");
        assert_eq!(games[0]["unlocked"], true);
        assert_eq!(games[1]["unlocked"], false);
    }

    #[tokio::test]
    async fn test_challenges_hide_solution() {
        let (_, body) = call(&app(), "GET", "/api/v1/challenges", None).await;
        assert_eq!(body[0]["title"], "Email Detective");
        assert!(body[0].get("canonicalSolution").is_none());
        assert_eq!(body[0]["hintCount"], 4);
    }

    #[tokio::test]
    async fn test_validate_endpoint() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/validate",
            Some(json!({ "challengeId": 1, "pattern": r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allPass"], true);
        assert_eq!(body["matchedCount"], 7);

        let (_, body) = call(&app, "POST", "/api/v1/validate", Some(json!({ "challengeId": 1, "pattern": "[invalid(" }))).await;
        assert_eq!(body["isValidRegex"], false);
        assert_eq!(body["matchedCount"], 0);

        let (status, _) = call(&app, "POST", "/api/v1/validate", Some(json!({ "challengeId": 77, "pattern": "a" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_flow_over_http() {
        let app = app();
        let (status, session) = call(&app, "POST", "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        let id = session["sessionId"].as_str().unwrap().to_string();
        assert_eq!(session["total"], 3);

        let (_, hints) = call(&app, "POST", "/api/v1/session/hint", Some(json!({ "sessionId": id }))).await;
        assert_eq!(hints["hints"].as_array().unwrap().len(), 4);

        let (_, out) = call(&app, "POST", "/api/v1/session/submit", Some(json!({ "sessionId": id, "pattern": "@" }))).await;
        assert_eq!(out["accepted"], false);
        assert_eq!(out["session"]["index"], 0);

        let (_, out) = call(
            &app,
            "POST",
            "/api/v1/session/submit",
            Some(json!({ "sessionId": id, "pattern": r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$" })),
        )
        .await;
        assert_eq!(out["accepted"], true);
        assert_eq!(out["awarded"], 100);
        assert_eq!(out["session"]["challenge"]["id"], 2);

        let (status, _) = call(&app, "POST", "/api/v1/session/submit", Some(json!({ "sessionId": "missing", "pattern": "a" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_export_import() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/v1/progress/complete", Some(json!({ "gameId": "snake", "score": 5 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, out) = call(&app, "POST", "/api/v1/progress/complete", Some(json!({ "gameId": "regex", "score": 100 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["unlockedNext"], "tetris");
        assert_eq!(out["record"]["bestScore"], 100);

        let (_, doc) = call(&app, "GET", "/api/v1/progress", None).await;
        assert_eq!(doc["gameProgress"]["regex"]["completed"], true);
        assert_eq!(doc["unlockedLevels"], json!([1, 2]));

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/export").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let exported = String::from_utf8(to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
        assert!(exported.contains("\"exportedAt\""));

        let bad = Request::builder().method("POST").uri("/api/v1/import").body(Body::from("{ broken")).unwrap();
        let res = app.clone().oneshot(bad).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "DELETE", "/api/v1/progress", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, doc) = call(&app, "GET", "/api/v1/progress", None).await;
        assert_eq!(doc["unlockedLevels"], json!([1]));

        let good = Request::builder().method("POST").uri("/api/v1/import").body(Body::from(exported)).unwrap();
        let res = app.clone().oneshot(good).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let (_, doc) = call(&app, "GET", "/api/v1/progress", None).await;
        assert_eq!(doc["unlockedLevels"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_scores_and_achievements() {
        let app = app();
        let (_, top) = call(&app, "POST", "/api/v1/progress/score", Some(json!({ "gameId": "regex", "score": 70 }))).await;
        assert_eq!(top[0]["score"], 70);
        let (_, top) = call(&app, "GET", "/api/v1/scores?gameId=regex", None).await;
        assert_eq!(top.as_array().unwrap().len(), 1);

        let (_, earned) = call(&app, "POST", "/api/v1/progress/playtime", Some(json!({ "seconds": 4000 }))).await;
        assert_eq!(earned[0]["id"], "playtime_1_hour");
        let (_, all) = call(&app, "GET", "/api/v1/achievements", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (_, stats) = call(&app, "GET", "/api/v1/progress/stats", None).await;
        assert_eq!(stats["totalPlayTime"], 4000);
        assert_eq!(stats["totalScore"], 70);
        assert_eq!(stats["achievementsCount"], 1);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let app = app();
        let (_, s) = call(&app, "PUT", "/api/v1/settings", Some(json!({ "musicEnabled": false }))).await;
        assert_eq!(s["musicEnabled"], false);
        assert_eq!(s["difficulty"], "normal");
        let (status, _) = call(&app, "PUT", "/api/v1/settings", Some(json!("loud"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_drill_endpoints() {
        let app = app();
        let (_, drill) = call(&app, "GET", "/api/v1/drill", None).await;
        let text = drill["text"].as_str().unwrap().to_string();
        let (_, verdict) = call(
            &app,
            "POST",
            "/api/v1/drill/check",
            Some(json!({ "drillId": drill["drillId"], "input": text })),
        )
        .await;
        assert_eq!(verdict["verdict"], "literal");
    }
}
