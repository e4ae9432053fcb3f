//! Relation requests and metadata resolution.
//!
//! [`resolve_relation`] turns a relation name on a root entity into
//! [`RelationMetadata`]: a closed, fully-derived description the SQL
//! generators consume. Resolution is pure — it only reads the host mapping's
//! declarative descriptors and never touches the database.

use std::sync::Arc;

use crate::entity::{DeclaredKind, EntityMeta, RelationAccess, RelationDescriptor};
use crate::error::{AggrelError, Result};

/// Supported relation kinds, as a closed tagged variant.
///
/// New kinds extend this enum and the exhaustive matches over it; there is
/// deliberately no open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsToOne,
    HasOne,
    HasMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::BelongsToOne => "belongs-to-one",
            RelationKind::HasOne => "has-one",
            RelationKind::HasMany => "has-many",
        }
    }
}

/// How a requested relation is attached to the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMode {
    /// One nested JSON object (belongs-to-one / has-one), joined.
    Single,
    /// A nested JSON array (has-many), correlated subquery.
    Collection,
    /// A `COUNT(*)` scalar (has-many), correlated subquery.
    Count,
}

/// Requested columns for a relation: explicit, or the wildcard pending
/// resolution. The wildcard transitions to an explicit list exactly once,
/// lazily, at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSet {
    Wildcard,
    Explicit(Vec<String>),
}

impl ColumnSet {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, ColumnSet::Wildcard)
    }

    /// The concrete column list; empty for a still-unresolved wildcard.
    pub fn columns(&self) -> &[String] {
        match self {
            ColumnSet::Wildcard => &[],
            ColumnSet::Explicit(cols) => cols,
        }
    }
}

/// Resolved shape of one relation. Derived once, never mutated afterwards.
#[derive(Clone)]
pub struct RelationMetadata {
    pub kind: RelationKind,
    pub related_table: String,
    /// Alias the related table is joined under; defaults to the relation name.
    pub related_alias: String,
    /// Type handle used to tag hydrated related instances.
    pub related_type_handle: String,
    /// Key on the root for belongs-to-one, on the related side otherwise.
    pub foreign_key: String,
    /// Key on the related side; belongs-to-one only.
    pub owner_key: Option<String>,
    /// Key on the root side; has-one / has-many.
    pub local_key: String,
    pub related_primary_key: String,
    /// Related entity metadata, kept for column auto-discovery and hydration.
    pub related: Arc<dyn EntityMeta>,
}

impl std::fmt::Debug for RelationMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationMetadata")
            .field("kind", &self.kind)
            .field("related_table", &self.related_table)
            .field("related_alias", &self.related_alias)
            .field("related_type_handle", &self.related_type_handle)
            .field("foreign_key", &self.foreign_key)
            .field("owner_key", &self.owner_key)
            .field("local_key", &self.local_key)
            .field("related_primary_key", &self.related_primary_key)
            .finish_non_exhaustive()
    }
}

/// One registered relation attachment.
///
/// Immutable after registration except `columns`, which moves from wildcard
/// to explicit at most once during compilation.
#[derive(Debug, Clone)]
pub struct RelationRequest {
    pub name: String,
    pub mode: RelationMode,
    /// Field name results are keyed under: the relation name, or
    /// `{name}_count` for counts.
    pub output_key: String,
    pub columns: ColumnSet,
    pub metadata: RelationMetadata,
}

/// Resolves `name` on the root entity into [`RelationMetadata`].
pub fn resolve_relation(root: &dyn EntityMeta, name: &str) -> Result<RelationMetadata> {
    match root.relation(name) {
        RelationAccess::NotFound => Err(AggrelError::RelationNotFound {
            relation: name.to_string(),
            entity: root.type_handle().to_string(),
        }),
        RelationAccess::RequiresArguments => Err(AggrelError::InvalidRelationAccessor(format!(
            "relation accessor {name:?} on {:?} must not require arguments",
            root.type_handle()
        ))),
        RelationAccess::NotARelation => Err(AggrelError::InvalidRelationAccessor(format!(
            "accessor {name:?} on {:?} does not return a relation descriptor",
            root.type_handle()
        ))),
        RelationAccess::Relation(descriptor) => from_descriptor(root, name, descriptor),
    }
}

/// Kind dispatch over the host descriptor. The match is total: any declared
/// kind outside the supported set is rejected here, not papered over.
fn from_descriptor(
    root: &dyn EntityMeta,
    name: &str,
    descriptor: RelationDescriptor,
) -> Result<RelationMetadata> {
    let related = descriptor.related;
    let related_primary_key = related.primary_key().to_string();

    let (kind, foreign_key, owner_key, local_key) = match descriptor.kind {
        DeclaredKind::BelongsTo => (
            RelationKind::BelongsToOne,
            descriptor.foreign_key,
            Some(descriptor.owner_key.unwrap_or_else(|| related_primary_key.clone())),
            root.primary_key().to_string(),
        ),
        DeclaredKind::HasOne => (
            RelationKind::HasOne,
            descriptor.foreign_key,
            None,
            descriptor.local_key.unwrap_or_else(|| root.primary_key().to_string()),
        ),
        DeclaredKind::HasMany => (
            RelationKind::HasMany,
            descriptor.foreign_key,
            None,
            descriptor.local_key.unwrap_or_else(|| root.primary_key().to_string()),
        ),
        DeclaredKind::Other(kind) => {
            return Err(AggrelError::UnsupportedRelationKind(format!(
                "relation {name:?} on {:?} is declared as {kind:?}",
                root.type_handle()
            )));
        }
    };

    Ok(RelationMetadata {
        kind,
        related_table: related.table().to_string(),
        related_alias: name.to_string(),
        related_type_handle: related.type_handle().to_string(),
        foreign_key,
        owner_key,
        local_key,
        related_primary_key,
        related,
    })
}
