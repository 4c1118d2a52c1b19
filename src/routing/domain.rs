//! Product domain table
//!
//! Maps the three public product hostnames to the namespace segment their
//! pages live under. The table is built once from validated configuration and
//! never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DomainsConfig;

/// One of the product surfaces served from this deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Portfolio,
    AskDocs,
    Movies,
}

impl Product {
    /// All products in matching priority order
    pub const ALL: [Self; 3] = [Self::Portfolio, Self::AskDocs, Self::Movies];

    /// Path prefix under which the product's route tree lives
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Portfolio => "/portfolio",
            Self::AskDocs => "/askdocs",
            Self::Movies => "/movies",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Portfolio => "portfolio",
            Self::AskDocs => "askdocs",
            Self::Movies => "movies",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single row of the domain table
#[derive(Debug, Clone, Serialize)]
pub struct DomainEntry {
    pub product: Product,
    pub host: String,
    pub namespace: &'static str,
    pub base_url: String,
}

/// Immutable hostname → product table
#[derive(Debug, Clone)]
pub struct DomainTable {
    entries: Vec<DomainEntry>,
}

impl DomainTable {
    /// Find the product whose hostname equals `host` exactly.
    ///
    /// `host` must already be normalized (no port, no `www.`, lowercase).
    pub fn lookup(&self, host: &str) -> Option<Product> {
        self.entries
            .iter()
            .find(|entry| entry.host == host)
            .map(|entry| entry.product)
    }

    pub fn entries(&self) -> &[DomainEntry] {
        &self.entries
    }

    pub fn host(&self, product: Product) -> &str {
        self.entry(product).map_or("", |e| e.host.as_str())
    }

    pub fn base_url(&self, product: Product) -> &str {
        self.entry(product).map_or("", |e| e.base_url.as_str())
    }

    fn entry(&self, product: Product) -> Option<&DomainEntry> {
        self.entries.iter().find(|e| e.product == product)
    }
}

impl From<&DomainsConfig> for DomainTable {
    fn from(domains: &DomainsConfig) -> Self {
        let entries = Product::ALL
            .iter()
            .map(|&product| {
                let domain = domains.get(product);
                DomainEntry {
                    product,
                    host: domain.host.clone(),
                    namespace: product.namespace(),
                    base_url: domain.base_url(),
                }
            })
            .collect();
        Self { entries }
    }
}

impl Default for DomainTable {
    fn default() -> Self {
        Self::from(&DomainsConfig::default())
    }
}
