//! Paths the host router never touches
//!
//! API routes, build assets, the favicon and static images are served as-is
//! regardless of which product host they were requested on.

const EXCLUDED_PREFIXES: [&str; 3] = ["/api", "/_next/static", "/_next/image"];

const EXCLUDED_PATHS: [&str; 1] = ["/favicon.ico"];

const STATIC_IMAGE_EXTENSIONS: [&str; 6] = ["svg", "png", "jpg", "jpeg", "gif", "webp"];

/// Check whether a request path bypasses host-based rewriting
pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p))
        || EXCLUDED_PATHS.contains(&path)
        || has_image_extension(path)
}

/// Extension match is ASCII case-insensitive
fn has_image_extension(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        STATIC_IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}
