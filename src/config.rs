//! Compiler configuration.
//!
//! Loading configuration files is the host's concern; this struct only
//! deserializes and supplies defaults.

use std::collections::HashMap;

use serde::Deserialize;

/// Recognized configuration options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Hydrator used by `get` when none is named: `generic`, `typed`, or a
    /// custom registration.
    pub default_hydrator: String,

    /// Promotes soft violations (relation count, wildcard column selection)
    /// to errors.
    pub strict_mode: bool,

    /// Emit `tracing` warnings when soft limits are exceeded or wildcard
    /// resolution falls back to introspection.
    pub log_fallbacks: bool,

    /// Soft cap on registered relations per query.
    pub max_relations: usize,

    /// Soft cap on `limit`.
    pub max_limit: u64,

    /// Promotes `max_limit` violations to [`LimitExceeded`](crate::AggrelError::LimitExceeded).
    pub strict_limit_validation: bool,

    /// Dialect identifiers the deployment supports. Advisory.
    pub supported_dialects: Vec<String>,

    /// Minimum engine version per dialect. Advisory; not enforced at runtime.
    pub minimum_versions: HashMap<String, String>,

    /// Reserved for a future compiled-SQL cache. Unused.
    pub cache_enabled: bool,
    /// Reserved for a future compiled-SQL cache. Unused.
    pub cache_ttl: u64,

    /// Pre-known column listings per table, consulted before live schema
    /// introspection during wildcard resolution.
    pub column_cache: HashMap<String, Vec<String>>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_hydrator: "generic".to_string(),
            strict_mode: false,
            log_fallbacks: true,
            max_relations: 15,
            max_limit: 500,
            strict_limit_validation: false,
            supported_dialects: vec!["mysql".to_string(), "pgsql".to_string()],
            minimum_versions: HashMap::from([
                ("mysql".to_string(), "8.0".to_string()),
                ("pgsql".to_string(), "12.0".to_string()),
            ]),
            cache_enabled: false,
            cache_ttl: 3600,
            column_cache: HashMap::new(),
        }
    }
}
