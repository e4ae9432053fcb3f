//! Relation-aggregation SQL compiler.
//!
//! Describes, declaratively, which related records of a root entity should be
//! attached to query results — as single nested objects, nested collections,
//! or counts — and compiles the description into **one** SQL statement per
//! dialect using native JSON aggregation, avoiding per-row follow-up queries.
//!
//! The pipeline: [`AggregateQuery`] accumulates relation requests and
//! filter/order directives with eager validation; [`resolve_relation`] turns
//! each relation name into [`RelationMetadata`] against the host mapping's
//! declarative descriptors; a dialect [`SqlGenerator`] renders select and
//! join fragments; the host [`Executor`] runs the statement; a [`Hydrator`]
//! decodes the embedded JSON back into structured records or typed entities.
//!
//! Single-object relations ride a `LEFT JOIN` with a NULL guard so an absent
//! relation decodes to a true null; collections and counts are correlated
//! subqueries so root rows are never multiplied, with `COALESCE` pinning zero
//! matches to `[]`.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use aggrel::{AggregateQuery, EntityMeta};
//! # fn demo(partner: Arc<dyn EntityMeta>) -> aggrel::Result<()> {
//! let mut query = AggregateQuery::new(partner, "mysql")?;
//! query
//!     .with_single("profile", &["id", "name"])?
//!     .with_collection("promocodes", &["id", "code"])?
//!     .with_count("promocodes")?
//!     .filter("status", "active")?
//!     .order_by("created_at", "desc")?
//!     .limit(25)?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod generator;
pub mod hydrate;
pub mod ident;
pub mod relation;
pub mod value;

pub use builder::{
    AggregateQuery, BASE_ALIAS, BaseQuery, FilterClause, FilterOp, OrderClause, OrderDirection,
    Page,
};
pub use config::QueryConfig;
pub use entity::{
    DeclaredKind, EntityMeta, Executor, RelationAccess, RelationDescriptor, SchemaIntrospector,
};
pub use error::{AggrelError, Result};
pub use generator::{Dialect, MySqlGenerator, PostgresGenerator, SqlGenerator, make_generator};
pub use hydrate::{
    EntityHydrator, EntityInstance, Hydrated, HydratedEntity, Hydrator, HydratorRegistry,
    RecordHydrator, RelationValue,
};
pub use relation::{
    ColumnSet, RelationKind, RelationMetadata, RelationMode, RelationRequest, resolve_relation,
};
pub use value::{Bindings, Row, Scalar};
