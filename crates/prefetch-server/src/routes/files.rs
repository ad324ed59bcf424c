use std::path::{Path, PathBuf};

use axum::extract::{Path as AxumPath, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
#[cfg(test)]
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// Joins `requested` onto `root`, rejecting any `..` or empty/`.` path
/// segment so a request can never resolve outside `root` — the reference
/// server only runs `filepath.Clean`+`Join`, which does not itself bound
/// the result to stay under `rootDir`.
fn resolve_within(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in requested.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => resolved.push(s),
        }
    }
    Some(resolved)
}

/// `GET /files/<path>`: serves a regular file as an attachment, or a
/// minimal HTML directory listing for a directory.
pub async fn serve_file(State(state): State<AppState>, AxumPath(requested): AxumPath<String>) -> Response {
    let Some(full_path) = resolve_within(&state.data_root, &requested) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let metadata = match tokio::fs::metadata(&full_path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(path = %full_path.display(), error = %e, "failed to stat requested path");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if metadata.is_dir() {
        return directory_listing(&full_path, &requested).await;
    }

    let bytes = match tokio::fs::read(&full_path).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(path = %full_path.display(), error = %e, "failed to read requested file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let filename = full_path.file_name().and_then(|n| n.to_str()).unwrap_or("download").to_string();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={filename}")),
        ],
        bytes,
    )
        .into_response()
}

async fn directory_listing(dir_path: &Path, web_path: &str) -> Response {
    let mut entries = match tokio::fs::read_dir(dir_path).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(path = %dir_path.display(), error = %e, "failed to read directory");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let web_path = if web_path.is_empty() { "/".to_string() } else { format!("/{web_path}") };

    let mut html = String::new();
    html.push_str(&format!("<html><head><title>Directory listing for {web_path}</title></head><body>"));
    html.push_str(&format!("<h1>Directory listing for {web_path}</h1><hr><ul>"));

    if web_path != "/" {
        let parent = Path::new(&web_path).parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|| "/".to_string());
        let parent = if parent.is_empty() { "/".to_string() } else { parent };
        html.push_str(&format!("<li><a href=\"{parent}\">../</a></li>"));
    }

    let trimmed = web_path.trim_start_matches('/');
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(e)) => e,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "error walking directory entries");
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let link_path = if trimmed.is_empty() { name.clone() } else { format!("{trimmed}/{name}") };
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            html.push_str(&format!("<li><a href=\"{link_path}\">{name}/</a></li>"));
        } else {
            html.push_str(&format!("<li><a href=\"{link_path}\" download>{name}</a></li>"));
        }
    }

    html.push_str("</ul><hr></body></html>");
    Html(html).into_response()
}

/// `GET /restapi/v1/files`: recursive JSON listing of every regular file
/// under the data root.
pub async fn list_files(State(state): State<AppState>) -> Response {
    let root = state.data_root.clone();
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<FileEntry>> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&root).into_iter() {
            let entry = entry.map_err(std::io::Error::other)?;
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                out.push(FileEntry { name: rel.to_string_lossy().replace('\\', "/"), size: entry.metadata().map(|m| m.len()).unwrap_or(0) });
            }
        }
        Ok(out)
    })
    .await;

    match result {
        Ok(Ok(files)) => Json(files).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to walk data directory");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "file listing task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolve_within_rejects_parent_traversal() {
        let root = Path::new("/data");
        assert!(resolve_within(root, "../../etc/passwd").is_none());
        assert!(resolve_within(root, "a/../../b").is_none());
    }

    #[test]
    fn resolve_within_joins_clean_relative_paths() {
        let root = Path::new("/data");
        assert_eq!(resolve_within(root, "content_addressable/sha256/abc/file").unwrap(), root.join("content_addressable/sha256/abc/file"));
        assert_eq!(resolve_within(root, "").unwrap(), root.to_path_buf());
        assert_eq!(resolve_within(root, "/leading/slash").unwrap(), root.join("leading/slash"));
    }

    #[tokio::test]
    async fn serve_file_404s_on_missing_path() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(tmp.path().to_path_buf());
        let resp = serve_file(State(state), AxumPath("nope.txt".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_file_returns_attachment_headers_for_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.bin"), b"hello").unwrap();
        let state = AppState::new(tmp.path().to_path_buf());
        let resp = serve_file(State(state), AxumPath("a.bin".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/octet-stream");
        assert_eq!(resp.headers().get(header::CONTENT_DISPOSITION).unwrap(), "attachment; filename=a.bin");
    }

    #[tokio::test]
    async fn list_files_returns_every_nested_regular_file_with_its_size() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("content_addressable/sha256/abc")).unwrap();
        std::fs::write(tmp.path().join("content_addressable/sha256/abc/file"), b"1234").unwrap();
        std::fs::write(tmp.path().join("top_level.txt"), b"hi").unwrap();

        let state = AppState::new(tmp.path().to_path_buf());
        let resp = list_files(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let mut entries: Vec<FileEntry> = serde_json::from_slice(&body).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "content_addressable/sha256/abc/file");
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[1].name, "top_level.txt");
        assert_eq!(entries[1].size, 2);
    }
}
