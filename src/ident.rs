//! Injection-safe identifier validation.
//!
//! Every relation, column, and filter identifier passes through here at
//! registration time. Nothing that fails the pattern ever reaches generated
//! SQL text.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AggrelError, Result};

/// Wildcard sentinel meaning "all columns", resolved before SQL generation.
pub const WILDCARD: &str = "*";

static SAFE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("valid identifier pattern"));

/// Whether `name` is the wildcard or matches the safety pattern.
pub fn is_safe(name: &str) -> bool {
    name == WILDCARD || SAFE_IDENT.is_match(name)
}

/// Validates a column identifier, allowing qualified (`table.column`) names.
pub fn ensure_safe_column(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AggrelError::InvalidRequest("column name cannot be empty".into()));
    }
    if !is_safe(name) {
        return Err(AggrelError::UnsafeIdentifier(name.to_string()));
    }
    Ok(())
}

/// Validates a relation name: non-empty, no nesting separator, safe pattern.
pub fn ensure_relation_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AggrelError::InvalidRequest("relation name cannot be empty".into()));
    }
    if name.contains('.') {
        return Err(AggrelError::InvalidRequest(format!(
            "nested relations are not supported, received {name:?}; load each relation separately"
        )));
    }
    if !SAFE_IDENT.is_match(name) {
        return Err(AggrelError::UnsafeIdentifier(name.to_string()));
    }
    Ok(())
}
