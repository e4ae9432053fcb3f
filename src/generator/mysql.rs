//! MySQL-family generator. Also serves SQLite, where the host registers
//! `JSON_OBJECT` / `JSON_ARRAY` / `JSON_ARRAYAGG` functions with the same
//! names and semantics.

use std::collections::HashMap;

use super::{Dialect, SqlGenerator};
use crate::entity::SchemaIntrospector;
use crate::error::Result;

pub struct MySqlGenerator {
    base_alias: String,
}

impl MySqlGenerator {
    pub fn new(base_alias: &str) -> Self {
        Self {
            base_alias: base_alias.to_string(),
        }
    }
}

impl SqlGenerator for MySqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    fn base_alias(&self) -> &str {
        &self.base_alias
    }

    fn json_object_fn(&self) -> &'static str {
        "JSON_OBJECT"
    }

    fn json_array_agg_fn(&self) -> &'static str {
        "JSON_ARRAYAGG"
    }

    fn empty_array_literal(&self) -> &'static str {
        "JSON_ARRAY()"
    }

    /// MySQL exposes no batched column-listing API worth using here, so each
    /// pending table costs one introspection query.
    fn resolve_column_listings(
        &self,
        schema: &dyn SchemaIntrospector,
        tables: &[&str],
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut listings = HashMap::with_capacity(tables.len());
        for table in tables {
            listings.insert((*table).to_string(), schema.list_columns(table)?);
        }
        Ok(listings)
    }
}
