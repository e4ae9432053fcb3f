use thiserror::Error;

/// Errors surfaced by the relation-aggregation compiler.
///
/// Structural validation (identifiers, operators, directions, counts) fails at
/// the call that introduces the violation. Soft limits (`max_limit`,
/// `max_relations`) only become errors in strict mode; otherwise they log a
/// warning and the operation proceeds.
#[derive(Debug, Error)]
pub enum AggrelError {
    /// Empty/blank identifier, empty column list, invalid operator or
    /// direction, or another structurally invalid registration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Column or relation name fails the injection-safety pattern.
    #[error("unsafe identifier {0:?}: only [A-Za-z0-9_.] starting with a letter or underscore is allowed")]
    UnsafeIdentifier(String),

    /// No relation accessor of that name exists on the root entity.
    #[error("relation {relation:?} does not exist on entity {entity:?}")]
    RelationNotFound { relation: String, entity: String },

    /// The accessor exists but cannot be used as a relation source.
    #[error("invalid relation accessor: {0}")]
    InvalidRelationAccessor(String),

    /// The relation resolves to a kind outside belongs-to-one / has-one /
    /// has-many, or a kind the requested mode cannot express.
    #[error("unsupported relation kind: {0}")]
    UnsupportedRelationKind(String),

    /// Requested limit exceeds the configured maximum (strict mode only).
    #[error("limit {limit} exceeds the configured maximum {max}")]
    LimitExceeded { limit: u64, max: u64 },

    /// Registered relation count exceeds the configured maximum (strict mode only).
    #[error("{count} registered relations exceed the configured maximum {max}")]
    TooManyRelations { count: usize, max: usize },

    /// The dialect identifier maps to no known SQL generator.
    #[error("database dialect {0:?} is not supported")]
    UnsupportedDialect(String),

    /// Hydrator name is not registered.
    #[error("hydrator {0:?} is not registered")]
    InvalidHydrator(String),

    /// Schema introspection failed while resolving wildcard columns.
    #[error("schema introspection failed: {0}")]
    Introspection(String),

    /// The execution facade reported a database-level failure.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Result type for aggregation operations.
pub type Result<T> = core::result::Result<T, AggrelError>;
