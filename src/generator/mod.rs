//! Dialect-specific SQL generation.
//!
//! [`SqlGenerator`] is the generator contract: pure functions from relation
//! metadata and column lists to SQL fragments. Fragment structure and the
//! NULL/empty-array guards are shared; dialect variance is confined to the
//! JSON constructor name, the JSON array-aggregate name, and the empty-array
//! literal, plus the schema-introspection batching policy.

mod mysql;
mod postgres;

use std::collections::HashMap;

pub use mysql::MySqlGenerator;
pub use postgres::PostgresGenerator;

use crate::entity::SchemaIntrospector;
use crate::error::{AggrelError, Result};
use crate::relation::{RelationKind, RelationMode, RelationRequest};

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySQL,
    SQLite,
    PostgreSQL,
}

impl Dialect {
    /// Parses a driver/dialect identifier as reported by the host connection.
    pub fn parse(identifier: &str) -> Result<Self> {
        match identifier {
            "mysql" => Ok(Dialect::MySQL),
            "sqlite" => Ok(Dialect::SQLite),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::PostgreSQL),
            other => Err(AggrelError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Selects the generator implementation for a dialect identifier.
///
/// SQLite shares the MySQL generator: the host registers `JSON_OBJECT` /
/// `JSON_ARRAYAGG` polyfills there, so the emitted SQL is identical.
pub fn make_generator(identifier: &str, base_alias: &str) -> Result<Box<dyn SqlGenerator>> {
    match Dialect::parse(identifier)? {
        Dialect::MySQL | Dialect::SQLite => Ok(Box::new(MySqlGenerator::new(base_alias))),
        Dialect::PostgreSQL => Ok(Box::new(PostgresGenerator::new(base_alias))),
    }
}

/// Generator contract, one implementation per dialect.
pub trait SqlGenerator {
    fn dialect(&self) -> Dialect;

    /// Alias the root table is selected under.
    fn base_alias(&self) -> &str;

    /// JSON object constructor, e.g. `JSON_OBJECT` / `json_build_object`.
    fn json_object_fn(&self) -> &'static str;

    /// JSON array aggregate, e.g. `JSON_ARRAYAGG` / `json_agg`.
    fn json_array_agg_fn(&self) -> &'static str;

    /// Literal producing an empty JSON array, e.g. `JSON_ARRAY()` / `'[]'::json`.
    fn empty_array_literal(&self) -> &'static str;

    /// Resolves column listings for the given tables.
    ///
    /// Whether this is one batched catalog query or one query per table is
    /// dialect policy and belongs here, not in the composer.
    fn resolve_column_listings(
        &self,
        schema: &dyn SchemaIntrospector,
        tables: &[&str],
    ) -> Result<HashMap<String, Vec<String>>>;

    /// `CASE WHEN alias.pk IS NULL THEN NULL ELSE json_object(...) END AS key`.
    ///
    /// The NULL guard is mandatory: after a left outer join an unmatched root
    /// row yields an all-NULL joined row, and without the guard the JSON
    /// constructor would emit an object of null fields instead of a true null.
    fn single_object_expr(
        &self,
        meta: &crate::relation::RelationMetadata,
        columns: &[String],
        output_key: &str,
    ) -> String {
        let alias = &meta.related_alias;
        let pairs = json_column_pairs(alias, columns);
        format!(
            "CASE WHEN {alias}.{pk} IS NULL THEN NULL ELSE {obj}({pairs}) END AS {output_key}",
            pk = meta.related_primary_key,
            obj = self.json_object_fn(),
        )
    }

    /// Correlated subquery aggregating matching related rows into a JSON
    /// array. `COALESCE` to the empty-array literal guarantees zero matches
    /// yield `[]`, never a null scalar.
    fn collection_expr(
        &self,
        meta: &crate::relation::RelationMetadata,
        columns: &[String],
        output_key: &str,
    ) -> String {
        let table = &meta.related_table;
        let pairs = json_column_pairs(table, columns);
        format!(
            "(SELECT COALESCE({agg}({obj}({pairs})), {empty}) FROM {table} \
             WHERE {table}.{fk} = {base}.{local}) AS {output_key}",
            agg = self.json_array_agg_fn(),
            obj = self.json_object_fn(),
            empty = self.empty_array_literal(),
            fk = meta.foreign_key,
            base = self.base_alias(),
            local = meta.local_key,
        )
    }

    /// Correlated `COUNT(*)` subquery. Dialect-invariant.
    fn count_expr(&self, meta: &crate::relation::RelationMetadata, output_key: &str) -> String {
        format!(
            "(SELECT COUNT(*) FROM {table} WHERE {table}.{fk} = {base}.{local}) AS {output_key}",
            table = meta.related_table,
            fk = meta.foreign_key,
            base = self.base_alias(),
            local = meta.local_key,
        )
    }

    /// Select list: root columns first, then one fragment per relation
    /// request per its mode, in registration order.
    fn build_select_list(&self, base_columns: &[String], requests: &[RelationRequest]) -> String {
        let mut selects: Vec<String> = base_columns.to_vec();
        for request in requests {
            let fragment = match request.mode {
                RelationMode::Single => self.single_object_expr(
                    &request.metadata,
                    request.columns.columns(),
                    &request.output_key,
                ),
                RelationMode::Collection => self.collection_expr(
                    &request.metadata,
                    request.columns.columns(),
                    &request.output_key,
                ),
                RelationMode::Count => self.count_expr(&request.metadata, &request.output_key),
            };
            selects.push(fragment);
        }
        selects.join(",\n       ")
    }

    /// Join list: exactly one `LEFT JOIN` per single-object request.
    ///
    /// Collection and count requests never join — a has-many join would
    /// duplicate root rows per match, so those stay correlated subqueries.
    fn build_join_list(&self, requests: &[RelationRequest]) -> Result<String> {
        let base = self.base_alias();
        let mut clauses = Vec::new();
        for request in requests.iter().filter(|r| r.mode == RelationMode::Single) {
            let meta = &request.metadata;
            let alias = &meta.related_alias;
            let on = match meta.kind {
                RelationKind::BelongsToOne => {
                    let owner = meta.owner_key.as_deref().unwrap_or(&meta.related_primary_key);
                    format!("{alias}.{owner} = {base}.{fk}", fk = meta.foreign_key)
                }
                RelationKind::HasOne => {
                    format!(
                        "{alias}.{fk} = {base}.{local}",
                        fk = meta.foreign_key,
                        local = meta.local_key
                    )
                }
                RelationKind::HasMany => {
                    return Err(AggrelError::UnsupportedRelationKind(format!(
                        "relation kind has-many cannot be joined for {:?}",
                        request.name
                    )));
                }
            };
            clauses.push(format!("LEFT JOIN {table} {alias} ON {on}", table = meta.related_table));
        }
        Ok(clauses.join("\n"))
    }
}

/// `'col', qualifier.col, ...` pairs for a JSON object constructor.
fn json_column_pairs(qualifier: &str, columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| format!("'{column}', {qualifier}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}
