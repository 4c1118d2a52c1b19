//! Routing module
//!
//! - Host-based rewriting into product namespaces
//! - Exclusion set for API routes and static assets
//! - Route table matching for the rewritten path

pub mod domain;
pub mod exclude;
pub mod host;
mod matcher;

pub use domain::{DomainEntry, DomainTable, Product};
pub use host::{rewrite_uri, HostRouter, PassReason, RewriteReason, RouteDecision};
pub use matcher::{match_prefix, Route, RouteTable, RouteTarget};
