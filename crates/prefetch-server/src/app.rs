use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::routes::{bazel_commands, files};
use crate::state::AppState;

/// Per-request read/write/idle bound, matching the reference `http.Server`'s
/// `ReadTimeout`/`WriteTimeout`/`IdleTimeout` (all set to the same value
/// there). `tower_http::timeout::TimeoutLayer` covers the handler's own
/// execution time; connection-level idle timeout is left to the listener
/// defaults since `axum::serve` doesn't expose a separate knob for it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/files/{*path}", get(files::serve_file))
        .route("/files/", get(root_files))
        .route("/files", get(root_files))
        .route("/restapi/v1/files", get(files::list_files))
        .route("/restapi/v1/bazelcommands", get(bazel_commands::list).post(bazel_commands::create))
        .route(
            "/restapi/v1/bazelcommands/{index}",
            get(bazel_commands::get_one).put(bazel_commands::update).delete(bazel_commands::delete),
        )
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

async fn root_files(state: axum::extract::State<AppState>) -> axum::response::Response {
    files::serve_file(state, axum::extract::Path(String::new())).await
}
