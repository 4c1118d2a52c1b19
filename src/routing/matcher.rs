//! Route table matching
//!
//! After host rewriting, the internal path is resolved against the configured
//! route table. Longest prefix wins; prefixes only match on path-segment
//! boundaries.

use hyper::header::HeaderValue;
use hyper::StatusCode;
use std::path::PathBuf;

use crate::config::{ConfigError, RouteAction, RouteRule};
use crate::handler::proxy::Upstream;

/// What a matched route does
#[derive(Debug, Clone)]
pub enum RouteTarget {
    Dir(PathBuf),
    File(PathBuf),
    Redirect {
        target: HeaderValue,
        code: StatusCode,
    },
    Proxy(Upstream),
}

impl RouteTarget {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Dir(_) => "dir",
            Self::File(_) => "file",
            Self::Redirect { .. } => "redirect",
            Self::Proxy(_) => "proxy",
        }
    }
}

/// A resolved route
#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub target: RouteTarget,
}

/// Routes ordered longest prefix first
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    index_files: Vec<String>,
}

impl RouteTable {
    /// Validate route rules and build the lookup table
    pub fn from_rules(rules: &[RouteRule], index_files: &[String]) -> Result<Self, ConfigError> {
        let mut routes: Vec<Route> = Vec::with_capacity(rules.len());

        for rule in rules {
            if !rule.prefix.starts_with('/') {
                return Err(ConfigError::InvalidRoutePrefix {
                    prefix: rule.prefix.clone(),
                });
            }
            let prefix = normalize_prefix(&rule.prefix);
            if routes.iter().any(|r| r.prefix == prefix) {
                return Err(ConfigError::DuplicateRoutePrefix { prefix });
            }

            let target = match &rule.action {
                RouteAction::Dir { path } => RouteTarget::Dir(PathBuf::from(path)),
                RouteAction::File { path } => RouteTarget::File(PathBuf::from(path)),
                RouteAction::Redirect { target, code } => RouteTarget::Redirect {
                    target: HeaderValue::from_str(target).map_err(|_| {
                        ConfigError::InvalidRedirectTarget {
                            prefix: prefix.clone(),
                            target: target.clone(),
                        }
                    })?,
                    code: redirect_code(*code).ok_or_else(|| {
                        ConfigError::InvalidRedirectCode {
                            prefix: prefix.clone(),
                            code: *code,
                        }
                    })?,
                },
                RouteAction::Proxy { upstream } => {
                    RouteTarget::Proxy(Upstream::parse(upstream).map_err(|reason| {
                        ConfigError::InvalidUpstream {
                            prefix: prefix.clone(),
                            upstream: upstream.clone(),
                            reason,
                        }
                    })?)
                }
            };

            routes.push(Route { prefix, target });
        }

        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self {
            routes,
            index_files: index_files.to_vec(),
        })
    }

    /// Find the route with the longest prefix matching `path`
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| match_prefix(&r.prefix, path))
    }

    pub fn index_files(&self) -> &[String] {
        &self.index_files
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Check if `path` lives under `prefix`
pub fn match_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Drop trailing slashes, keeping a lone `/`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn redirect_code(code: u16) -> Option<StatusCode> {
    StatusCode::from_u16(code)
        .ok()
        .filter(StatusCode::is_redirection)
}
