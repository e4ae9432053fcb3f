//! Facades onto the host object-relational mapping layer.
//!
//! The compiler never reflects over host types. The host exposes a narrow,
//! declarative description of each entity ([`EntityMeta`]) and of each
//! declared relation ([`RelationDescriptor`]), plus raw-SQL execution and
//! schema-introspection facades. Connection handling, transactions, and
//! timeouts all stay on the host's side of these traits.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::value::{Bindings, Row};

/// Declarative metadata for one mapped entity type.
pub trait EntityMeta: Send + Sync {
    /// Stable handle identifying the entity type, used to tag hydrated
    /// instances (e.g. `"partner"`).
    fn type_handle(&self) -> &str;

    /// Backing table name.
    fn table(&self) -> &str;

    /// Primary key column.
    fn primary_key(&self) -> &str;

    /// Mass-assignable columns. An empty slice means the mapping does not
    /// declare them, and wildcard resolution falls through to the column
    /// cache or live introspection.
    fn writable_columns(&self) -> &[String];

    /// Created-at / updated-at columns when the entity keeps timestamps.
    fn timestamp_columns(&self) -> Option<(&str, &str)> {
        None
    }

    /// Soft-delete marker column, if the entity uses one.
    fn soft_delete_column(&self) -> Option<&str> {
        None
    }

    /// Looks up the relation accessor declared under `name`.
    fn relation(&self, name: &str) -> RelationAccess;
}

/// Outcome of looking up a relation accessor on an entity.
#[derive(Clone)]
pub enum RelationAccess {
    /// No accessor of that name exists.
    NotFound,
    /// The accessor exists but requires arguments and cannot be used here.
    RequiresArguments,
    /// The accessor exists but does not yield a relation descriptor.
    NotARelation,
    /// A usable relation declaration.
    Relation(RelationDescriptor),
}

/// Relation kind as declared by the host mapping.
///
/// `Other` carries kinds the host knows about but this compiler does not
/// (many-to-many, polymorphic, ...); resolution rejects them explicitly
/// instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    BelongsTo,
    HasOne,
    HasMany,
    Other(&'static str),
}

/// A declared relation: kind, target entity, and key columns.
///
/// `owner_key` is set for belongs-to relations (key on the related side);
/// `local_key` for has-one / has-many (key on the owning side). Unset keys
/// default to the respective entity's primary key during resolution.
#[derive(Clone)]
pub struct RelationDescriptor {
    pub kind: DeclaredKind,
    pub related: Arc<dyn EntityMeta>,
    pub foreign_key: String,
    pub owner_key: Option<String>,
    pub local_key: Option<String>,
}

/// Raw-SQL execution facade.
///
/// Receives compiled SQL text with `?` placeholders plus bind values in
/// order, returns raw rows. Transactions, retries, and cancellation are the
/// implementor's concern; failures surface unmodified as
/// [`AggrelError::Execution`](crate::AggrelError::Execution).
pub trait Executor {
    fn execute(&self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>>;
}

/// Schema-introspection facade used as the last wildcard-resolution fallback.
pub trait SchemaIntrospector {
    /// Ordered column names for one table.
    fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Column names for several tables at once.
    ///
    /// Dialects with a queryable catalog (Postgres `information_schema`)
    /// override this with a single batched query; the default loops.
    fn list_columns_batch(&self, tables: &[&str]) -> Result<HashMap<String, Vec<String>>> {
        let mut out = HashMap::with_capacity(tables.len());
        for table in tables {
            out.insert((*table).to_string(), self.list_columns(table)?);
        }
        Ok(out)
    }
}
