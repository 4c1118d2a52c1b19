//! `ETag` generation and conditional request handling

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strong `ETag` of the form `"<len>-<hash>"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Check a client's `If-None-Match` against the current `ETag`
///
/// Accepts comma-separated lists, `*`, and weak validators (`W/"..."`),
/// which compare equal to their strong form for GET/HEAD.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}
