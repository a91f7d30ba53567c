//! # Client Asset Server
//!
//! Serves the phone client's static files over HTTP on the same port number
//! as the telemetry endpoint.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::Result;

/// File served for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Map a request target to a file below `root`
///
/// Query and fragment are dropped, the path is percent-decoded, and `..`
/// never climbs above `root`. Components that are not a plain name (empty,
/// `.`, containing `\` or `:`) are skipped. A trailing slash selects the
/// directory index.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use yoke_bridge::assets::resolve_request_path;
///
/// let root = Path::new("/srv/joypad");
/// assert_eq!(resolve_request_path(root, "/../../etc/passwd"), root.join("etc/passwd"));
/// assert_eq!(resolve_request_path(root, "/"), root.join("index.html"));
/// ```
pub fn resolve_request_path(root: &Path, request: &str) -> PathBuf {
    let path = request.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let trailing_slash = decoded.trim_end().ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s if s.contains('\\') || s.contains(':') => {}
            s => parts.push(s),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(&parts);
    if parts.is_empty() || trailing_slash {
        resolved.push(INDEX_FILE);
    }
    resolved
}

/// Content type for a file, chosen by extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Read an asset, following a directory to its index file
///
/// Returns `None` when nothing servable exists at `path`.
pub async fn load_asset(path: &Path) -> Option<(PathBuf, Vec<u8>)> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    let file = if metadata.is_dir() {
        path.join(INDEX_FILE)
    } else {
        path.to_path_buf()
    };

    let body = tokio::fs::read(&file).await.ok()?;
    Some((file, body))
}

async fn serve_asset(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    let path = resolve_request_path(&root, uri.path());

    match load_asset(&path).await {
        Some((file, body)) => {
            debug!("GET {} -> {}", uri, file.display());
            ([(header::CONTENT_TYPE, content_type(&file))], body).into_response()
        }
        None => {
            debug!("GET {} -> 404", uri);
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}

/// Router serving every path from `root`
pub fn router(root: PathBuf) -> Router {
    Router::new()
        .fallback(serve_asset)
        .with_state(Arc::new(root))
}

/// Bind the asset listener
///
/// # Errors
///
/// Returns `Io` if the TCP port cannot be bound
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    Ok(TcpListener::bind(addr).await?)
}

/// Serve `root` on `listener` until the task is dropped
///
/// # Errors
///
/// Returns `Io` if the server stops with an error
pub async fn serve(listener: TcpListener, root: PathBuf) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Serving client assets from {} on http://{}", root.display(), addr);
    axum::serve(listener, router(root)).await?;
    Ok(())
}
