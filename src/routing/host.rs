//! Host-based namespace rewriting
//!
//! Decides, from the request's Host header and path, which product namespace
//! a request belongs to and what internal path it should resolve to.
//!
//! Evaluation order:
//! 1. Excluded paths (API, build assets, favicon, images) pass through
//! 2. Exact product host match: portfolio, askdocs, movies
//! 3. Local development host fallback
//! 4. Anything else passes through

use hyper::Uri;
use serde::Serialize;

use super::domain::{DomainTable, Product};
use super::exclude::is_excluded;

/// Why a request was rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteReason {
    /// Host matched a product domain
    ProductHost,
    /// Root request on a local development host
    DevDefault,
}

/// Why a request was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    Excluded,
    AlreadyPrefixed,
    DevHost,
    UnknownHost,
}

/// Outcome of a routing decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Serve `path` internally; the client-visible URL stays the same
    Rewrite {
        product: Product,
        path: String,
        reason: RewriteReason,
    },
    /// Continue with the original path
    PassThrough {
        reason: PassReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        product: Option<Product>,
    },
}

impl RouteDecision {
    const fn pass(reason: PassReason) -> Self {
        Self::PassThrough {
            reason,
            product: None,
        }
    }

    /// The rewritten path, if any
    pub fn rewritten_path(&self) -> Option<&str> {
        match self {
            Self::Rewrite { path, .. } => Some(path),
            Self::PassThrough { .. } => None,
        }
    }

    pub const fn product(&self) -> Option<Product> {
        match self {
            Self::Rewrite { product, .. } => Some(*product),
            Self::PassThrough { product, .. } => *product,
        }
    }
}

/// Stateless host router over an immutable domain table
#[derive(Debug, Clone)]
pub struct HostRouter {
    domains: DomainTable,
    /// Product served at `/` on localhost; `None` disables the fallback
    dev_default: Option<Product>,
}

impl HostRouter {
    pub const fn new(domains: DomainTable, dev_default: Option<Product>) -> Self {
        Self {
            domains,
            dev_default,
        }
    }

    pub const fn domains(&self) -> &DomainTable {
        &self.domains
    }

    /// Decide how to route `path` requested on `host`.
    ///
    /// Never fails and performs no I/O.
    pub fn route(&self, host: &str, path: &str) -> RouteDecision {
        if is_excluded(path) {
            return RouteDecision::pass(PassReason::Excluded);
        }

        let host = normalize_host(host);

        if let Some(product) = self.domains.lookup(&host) {
            return route_into(product, path, RewriteReason::ProductHost);
        }

        if is_local_dev_host(&host) {
            return match self.dev_default {
                Some(product) if path == "/" => RouteDecision::Rewrite {
                    product,
                    path: product.namespace().to_string(),
                    reason: RewriteReason::DevDefault,
                },
                _ => RouteDecision::pass(PassReason::DevHost),
            };
        }

        RouteDecision::pass(PassReason::UnknownHost)
    }
}

fn route_into(product: Product, path: &str, reason: RewriteReason) -> RouteDecision {
    let namespace = product.namespace();

    if has_namespace(path, namespace) {
        return RouteDecision::PassThrough {
            reason: PassReason::AlreadyPrefixed,
            product: Some(product),
        };
    }

    RouteDecision::Rewrite {
        product,
        path: prefix_path(namespace, path),
        reason,
    }
}

/// `/portfolio` and `/portfolio/...` count as prefixed; `/portfolios` does not
fn has_namespace(path: &str, namespace: &str) -> bool {
    path.strip_prefix(namespace)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Root maps to the bare namespace, never `namespace + "/"`
fn prefix_path(namespace: &str, path: &str) -> String {
    if path == "/" {
        namespace.to_string()
    } else {
        format!("{namespace}{path}")
    }
}

/// Strip port, lowercase and drop a single leading `www.`
pub fn normalize_host(host: &str) -> String {
    let host = strip_port(host.trim()).to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Remove `:port`; bracketed IPv6 literals keep their brackets
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// Local development hosts, port already stripped
pub fn is_local_dev_host(normalized: &str) -> bool {
    matches!(normalized, "localhost" | "127.0.0.1")
}

/// Replace the path of `uri`, keeping scheme, authority and query intact
pub fn rewrite_uri(uri: &Uri, new_path: &str) -> Result<Uri, hyper::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> HostRouter {
        HostRouter::new(DomainTable::default(), Some(Product::Portfolio))
    }

    fn rewrite(product: Product, path: &str) -> RouteDecision {
        RouteDecision::Rewrite {
            product,
            path: path.to_string(),
            reason: RewriteReason::ProductHost,
        }
    }

    const HOSTS: [(&str, Product); 3] = [
        ("portfolio.mindefy.tech", Product::Portfolio),
        ("ask.mindefy.tech", Product::AskDocs),
        ("movie-recommendation.mindefy.tech", Product::Movies),
    ];

    #[test]
    fn test_root_rewrites_to_bare_namespace() {
        let router = router();
        for (host, product) in HOSTS {
            assert_eq!(
                router.route(host, "/"),
                rewrite(product, product.namespace())
            );
        }
    }

    #[test]
    fn test_paths_get_namespace_prefix() {
        let router = router();
        for (host, product) in HOSTS {
            for path in ["/about", "/login", "/a/b/c", "/inception"] {
                let expected = format!("{}{path}", product.namespace());
                assert_eq!(router.route(host, path), rewrite(product, &expected));
            }
        }
    }

    #[test]
    fn test_already_prefixed_passes_through() {
        let router = router();
        for (host, product) in HOSTS {
            let ns = product.namespace();
            for path in [ns.to_string(), format!("{ns}/"), format!("{ns}/about")] {
                assert_eq!(
                    router.route(host, &path),
                    RouteDecision::PassThrough {
                        reason: PassReason::AlreadyPrefixed,
                        product: Some(product),
                    },
                    "{host} {path}"
                );
            }
        }
    }

    #[test]
    fn test_namespace_check_respects_segments() {
        let decision = router().route("portfolio.mindefy.tech", "/portfolios");
        assert_eq!(
            decision,
            rewrite(Product::Portfolio, "/portfolio/portfolios")
        );
    }

    #[test]
    fn test_foreign_namespace_is_still_prefixed() {
        // Cross-product paths are rewritten, not redirected
        let decision = router().route("ask.mindefy.tech", "/movies/42");
        assert_eq!(decision, rewrite(Product::AskDocs, "/askdocs/movies/42"));
    }

    #[test]
    fn test_exact_host_match_only() {
        let router = router();
        for host in [
            "notportfolio.mindefy.tech",
            "evilportfolio.mindefy.tech",
            "portfolio.mindefy.tech.evil.com",
            "mindefy.tech",
            "api.ask.mindefy.tech",
        ] {
            assert_eq!(
                router.route(host, "/x"),
                RouteDecision::pass(PassReason::UnknownHost),
                "{host}"
            );
        }
    }

    #[test]
    fn test_www_and_port_are_stripped() {
        let router = router();
        let expected = rewrite(Product::AskDocs, "/askdocs/login");
        assert_eq!(router.route("www.ask.mindefy.tech:443", "/login"), expected);
        assert_eq!(router.route("ask.mindefy.tech", "/login"), expected);
        assert_eq!(router.route("ask.mindefy.tech:8080", "/login"), expected);
        assert_eq!(router.route("ASK.Mindefy.Tech", "/login"), expected);
    }

    #[test]
    fn test_www_stripped_once() {
        assert_eq!(
            router().route("www.www.portfolio.mindefy.tech", "/"),
            RouteDecision::pass(PassReason::UnknownHost)
        );
    }

    #[test]
    fn test_localhost_root_defaults_to_portfolio() {
        let router = router();
        for host in ["localhost", "localhost:3000", "127.0.0.1:8080", "127.0.0.1"] {
            assert_eq!(
                router.route(host, "/"),
                RouteDecision::Rewrite {
                    product: Product::Portfolio,
                    path: "/portfolio".to_string(),
                    reason: RewriteReason::DevDefault,
                },
                "{host}"
            );
        }
    }

    #[test]
    fn test_localhost_other_paths_pass_through() {
        let router = router();
        for path in ["/askdocs/chat", "/movies", "/portfolio/about", "/about"] {
            assert_eq!(
                router.route("localhost:3000", path),
                RouteDecision::pass(PassReason::DevHost),
                "{path}"
            );
        }
    }

    #[test]
    fn test_dev_fallback_disabled() {
        let router = HostRouter::new(DomainTable::default(), None);
        assert_eq!(
            router.route("localhost:3000", "/"),
            RouteDecision::pass(PassReason::DevHost)
        );
    }

    #[test]
    fn test_dev_default_product_configurable() {
        let router = HostRouter::new(DomainTable::default(), Some(Product::Movies));
        assert_eq!(
            router.route("localhost", "/").rewritten_path(),
            Some("/movies")
        );
    }

    #[test]
    fn test_excluded_paths_ignore_host() {
        let router = router();
        for (host, path) in [
            ("portfolio.mindefy.tech", "/logo.svg"),
            ("ask.mindefy.tech", "/api/chat"),
            ("movie-recommendation.mindefy.tech", "/_next/static/app.js"),
            ("localhost:3000", "/favicon.ico"),
        ] {
            assert_eq!(
                router.route(host, path),
                RouteDecision::pass(PassReason::Excluded),
                "{host} {path}"
            );
        }
    }

    #[test]
    fn test_unknown_host_passes_through() {
        assert_eq!(
            router().route("random.example.com", "/anything"),
            RouteDecision::pass(PassReason::UnknownHost)
        );
        assert_eq!(
            router().route("", "/"),
            RouteDecision::pass(PassReason::UnknownHost)
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let router = router();
        let first = router.route("portfolio.mindefy.tech", "/about");
        let path = first.rewritten_path().unwrap().to_string();
        assert!(matches!(
            router.route("portfolio.mindefy.tech", &path),
            RouteDecision::PassThrough {
                reason: PassReason::AlreadyPrefixed,
                ..
            }
        ));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("www.Example.com:8080"), "example.com");
        assert_eq!(normalize_host("[::1]:3000"), "[::1]");
        assert_eq!(normalize_host("localhost"), "localhost");
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn test_rewrite_uri_keeps_query() {
        let uri: Uri = "/inception?tab=similar&page=2".parse().unwrap();
        let rewritten = rewrite_uri(&uri, "/movies/inception").unwrap();
        assert_eq!(rewritten.path(), "/movies/inception");
        assert_eq!(rewritten.query(), Some("tab=similar&page=2"));

        let uri: Uri = "http://ask.mindefy.tech/login".parse().unwrap();
        let rewritten = rewrite_uri(&uri, "/askdocs/login").unwrap();
        assert_eq!(rewritten.to_string(), "http://ask.mindefy.tech/askdocs/login");
    }

    #[test]
    fn test_decision_serializes_for_api() {
        let json = serde_json::to_value(router().route("ask.mindefy.tech", "/")).unwrap();
        assert_eq!(json["action"], "rewrite");
        assert_eq!(json["product"], "askdocs");
        assert_eq!(json["path"], "/askdocs");
        assert_eq!(json["reason"], "product_host");

        let json = serde_json::to_value(router().route("example.com", "/")).unwrap();
        assert_eq!(json["action"], "pass_through");
        assert_eq!(json["reason"], "unknown_host");
        assert!(json.get("product").is_none());
    }
}
