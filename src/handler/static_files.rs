//! Static file serving module
//!
//! Serves `dir` and `file` routes: index file lookup, traversal protection,
//! MIME detection and `ETag` revalidation.

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve static files from a directory mounted at `route_prefix`
pub async fn serve_directory(
    ctx: &RequestContext<'_>,
    dir: &Path,
    route_prefix: &str,
    index_files: &[String],
) -> Response<Full<Bytes>> {
    match load_from_directory(dir, ctx.path, route_prefix, index_files).await {
        Some((content, file_path)) => {
            build_static_file_response(ctx, content, mime::content_type_for(&file_path))
        }
        None => http::build_404_response(),
    }
}

/// Serve a single file
pub async fn serve_file(ctx: &RequestContext<'_>, file_path: &Path) -> Response<Full<Bytes>> {
    match fs::read(file_path).await {
        Ok(content) => {
            build_static_file_response(ctx, Bytes::from(content), mime::content_type_for(file_path))
        }
        Err(e) => {
            tracing::warn!(path = %file_path.display(), error = %e, "file route unreadable");
            http::build_404_response()
        }
    }
}

/// Resolve `path` below `static_dir` and read it
///
/// Returns the file content and the resolved path. Directories resolve to
/// their first existing index file.
pub async fn load_from_directory(
    static_dir: &Path,
    path: &str,
    route_prefix: &str,
    index_files: &[String],
) -> Option<(Bytes, PathBuf)> {
    let relative_path = strip_route_prefix(path, route_prefix).trim_start_matches('/');

    if relative_path.split('/').any(|segment| segment == "..") {
        tracing::warn!(path, "path traversal attempt blocked");
        return None;
    }

    let static_dir_canonical = match fs::canonicalize(static_dir).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(
                dir = %static_dir.display(),
                error = %e,
                "static directory not found or inaccessible"
            );
            return None;
        }
    };

    let mut file_path = static_dir.join(relative_path);
    if is_dir(&file_path).await {
        file_path = find_index_file(&file_path, index_files).await?;
    }

    // Missing files are an ordinary 404
    let file_path_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_path_canonical.starts_with(&static_dir_canonical) {
        tracing::warn!(
            path,
            resolved = %file_path_canonical.display(),
            "path escapes static directory"
        );
        return None;
    }

    match fs::read(&file_path_canonical).await {
        Ok(content) => Some((Bytes::from(content), file_path)),
        Err(e) => {
            tracing::error!(path = %file_path.display(), error = %e, "failed to read file");
            None
        }
    }
}

/// Path below the route prefix; a `/` route keeps the whole path
fn strip_route_prefix<'a>(path: &'a str, route_prefix: &str) -> &'a str {
    if route_prefix == "/" {
        return path;
    }
    path.strip_prefix(route_prefix).unwrap_or(path)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn find_index_file(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for index_file in index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}

/// Build a 200 or 304 for file content
fn build_static_file_response(
    ctx: &RequestContext<'_>,
    data: Bytes,
    content_type: &str,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&data);

    if cache::check_etag_match(ctx.if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_file_response(data, content_type, &etag, ctx.is_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::{header, StatusCode};
    use std::fs as std_fs;

    fn index_files() -> Vec<String> {
        vec!["index.html".to_string(), "index.htm".to_string()]
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std_fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std_fs::create_dir(dir.path().join("about")).unwrap();
        std_fs::write(dir.path().join("about/index.htm"), "about").unwrap();
        std_fs::write(dir.path().join("style.css"), "body{}").unwrap();
        dir
    }

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            is_head: false,
            if_none_match: None,
        }
    }

    #[tokio::test]
    async fn test_bare_prefix_serves_index() {
        let dir = site();
        let (content, path) =
            load_from_directory(dir.path(), "/portfolio", "/portfolio", &index_files())
                .await
                .unwrap();
        assert_eq!(content, "<h1>home</h1>");
        assert!(path.ends_with("index.html"));
    }

    #[tokio::test]
    async fn test_subdirectory_falls_back_to_second_index() {
        let dir = site();
        let (content, _) =
            load_from_directory(dir.path(), "/portfolio/about/", "/portfolio", &index_files())
                .await
                .unwrap();
        assert_eq!(content, "about");
    }

    #[tokio::test]
    async fn test_root_route_keeps_full_path() {
        let dir = site();
        let (content, _) = load_from_directory(dir.path(), "/style.css", "/", &index_files())
            .await
            .unwrap();
        assert_eq!(content, "body{}");
    }

    #[tokio::test]
    async fn test_traversal_blocked() {
        let outer = tempfile::tempdir().unwrap();
        std_fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let inner = outer.path().join("site");
        std_fs::create_dir(&inner).unwrap();

        let found =
            load_from_directory(&inner, "/portfolio/../secret.txt", "/portfolio", &index_files())
                .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = site();
        let resp = serve_directory(
            &ctx("/portfolio/nope.js"),
            dir.path(),
            "/portfolio",
            &index_files(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_etag_revalidation() {
        let dir = site();
        let resp =
            serve_directory(&ctx("/portfolio/style.css"), dir.path(), "/portfolio", &index_files())
                .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
        let etag = resp.headers()[header::ETAG].to_str().unwrap().to_string();

        let revalidate = RequestContext {
            path: "/portfolio/style.css",
            is_head: false,
            if_none_match: Some(&etag),
        };
        let resp = serve_directory(&revalidate, dir.path(), "/portfolio", &index_files()).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = site();
        let head = RequestContext {
            path: "/x",
            is_head: true,
            if_none_match: None,
        };
        let resp = serve_file(&head, &dir.path().join("style.css")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "6");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
