//! PostgreSQL generator: `json_build_object` / `json_agg`, batched catalog
//! introspection via `information_schema`.

use std::collections::HashMap;

use super::{Dialect, SqlGenerator};
use crate::entity::SchemaIntrospector;
use crate::error::Result;

pub struct PostgresGenerator {
    base_alias: String,
}

impl PostgresGenerator {
    pub fn new(base_alias: &str) -> Self {
        Self {
            base_alias: base_alias.to_string(),
        }
    }
}

impl SqlGenerator for PostgresGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    fn base_alias(&self) -> &str {
        &self.base_alias
    }

    fn json_object_fn(&self) -> &'static str {
        "json_build_object"
    }

    fn json_array_agg_fn(&self) -> &'static str {
        "json_agg"
    }

    fn empty_array_literal(&self) -> &'static str {
        "'[]'::json"
    }

    /// One batched `information_schema.columns` query covers every pending
    /// table.
    fn resolve_column_listings(
        &self,
        schema: &dyn SchemaIntrospector,
        tables: &[&str],
    ) -> Result<HashMap<String, Vec<String>>> {
        schema.list_columns_batch(tables)
    }
}
