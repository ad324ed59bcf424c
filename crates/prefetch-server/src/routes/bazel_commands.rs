use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;

use crate::state::AppState;

/// `GET /restapi/v1/bazelcommands`: the full command list.
pub async fn list(State(state): State<AppState>) -> Response {
    let commands = state.commands.lock();
    Json(commands.clone()).into_response()
}

/// `GET /restapi/v1/bazelcommands/{index}`: one command by index.
pub async fn get_one(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    let commands = state.commands.lock();
    match commands.get(index) {
        Some(cmd) => Json(cmd.clone()).into_response(),
        None => (StatusCode::BAD_REQUEST, "invalid index").into_response(),
    }
}

/// `POST /restapi/v1/bazelcommands`: append a new command. Rejects an
/// exact-duplicate entry unless `?f=1` is present.
pub async fn create(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>, Json(new_command): Json<Vec<String>>) -> Response {
    let force = query.get("f").is_some_and(|v| v == "1");
    let mut commands = state.commands.lock();
    if !force && commands.iter().any(|existing| existing == &new_command) {
        return (StatusCode::BAD_REQUEST, "duplicate command").into_response();
    }
    commands.push(new_command);
    StatusCode::NO_CONTENT.into_response()
}

/// `PUT /restapi/v1/bazelcommands/{index}`: replace one command in place.
pub async fn update(State(state): State<AppState>, Path(index): Path<usize>, Json(updated): Json<Vec<String>>) -> Response {
    let mut commands = state.commands.lock();
    match commands.get_mut(index) {
        Some(slot) => {
            *slot = updated;
            StatusCode::NO_CONTENT.into_response()
        }
        None => (StatusCode::BAD_REQUEST, "invalid index").into_response(),
    }
}

/// `DELETE /restapi/v1/bazelcommands/{index}`: remove one command.
pub async fn delete(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    let mut commands = state.commands.lock();
    if index >= commands.len() {
        return (StatusCode::BAD_REQUEST, "invalid index").into_response();
    }
    commands.remove(index);
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::routing::{get, post, put};
    use axum::Router;
    use tower::ServiceExt;

    fn router() -> Router {
        let state = AppState::new(std::env::temp_dir());
        Router::new()
            .route("/restapi/v1/bazelcommands", get(list).post(create))
            .route("/restapi/v1/bazelcommands/{index}", get(get_one).put(update).delete(delete))
            .with_state(state)
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let app = router();
        let req = axum::http::Request::post("/restapi/v1/bazelcommands")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&vec!["build", "//..."]).unwrap()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = axum::http::Request::get("/restapi/v1/bazelcommands").body(axum::body::Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_without_force_is_rejected() {
        let app = router();
        let body = || axum::body::Body::from(serde_json::to_vec(&vec!["test", "//foo"]).unwrap());
        let req = axum::http::Request::post("/restapi/v1/bazelcommands").header("content-type", "application/json").body(body()).unwrap();
        app.clone().oneshot(req).await.unwrap();

        let req = axum::http::Request::post("/restapi/v1/bazelcommands").header("content-type", "application/json").body(body()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = axum::http::Request::post("/restapi/v1/bazelcommands?f=1").header("content-type", "application/json").body(body()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn delete_with_out_of_range_index_is_a_bad_request() {
        let app = router();
        let req = axum::http::Request::delete("/restapi/v1/bazelcommands/0").body(axum::body::Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
