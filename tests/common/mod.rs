//! Shared fixtures: a static entity mapping (partner / profile / avatar /
//! promocode), a canned-row executor, and a call-logging schema introspector.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use aggrel::{
    AggrelError, Bindings, ColumnSet, DeclaredKind, EntityMeta, Executor, RelationAccess,
    RelationDescriptor, RelationMode, RelationRequest, Result, Row, Scalar, SchemaIntrospector,
    resolve_relation,
};

/// Declarative entity fixture backing the [`EntityMeta`] facade.
pub struct StaticEntity {
    handle: &'static str,
    table: &'static str,
    pk: &'static str,
    writable: Vec<String>,
    timestamps: Option<(&'static str, &'static str)>,
    soft_delete: Option<&'static str>,
    relations: HashMap<String, RelationAccess>,
}

impl StaticEntity {
    pub fn new(handle: &'static str, table: &'static str, pk: &'static str) -> Self {
        Self {
            handle,
            table,
            pk,
            writable: Vec::new(),
            timestamps: None,
            soft_delete: None,
            relations: HashMap::new(),
        }
    }

    pub fn writable(mut self, columns: &[&str]) -> Self {
        self.writable = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn timestamps(mut self) -> Self {
        self.timestamps = Some(("created_at", "updated_at"));
        self
    }

    pub fn soft_deletes(mut self) -> Self {
        self.soft_delete = Some("deleted_at");
        self
    }

    pub fn relation_def(mut self, name: &str, access: RelationAccess) -> Self {
        self.relations.insert(name.to_string(), access);
        self
    }
}

impl EntityMeta for StaticEntity {
    fn type_handle(&self) -> &str {
        self.handle
    }
    fn table(&self) -> &str {
        self.table
    }
    fn primary_key(&self) -> &str {
        self.pk
    }
    fn writable_columns(&self) -> &[String] {
        &self.writable
    }
    fn timestamp_columns(&self) -> Option<(&str, &str)> {
        self.timestamps
    }
    fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete
    }
    fn relation(&self, name: &str) -> RelationAccess {
        self.relations.get(name).cloned().unwrap_or(RelationAccess::NotFound)
    }
}

pub fn belongs_to(related: Arc<dyn EntityMeta>, foreign_key: &str) -> RelationAccess {
    RelationAccess::Relation(RelationDescriptor {
        kind: DeclaredKind::BelongsTo,
        related,
        foreign_key: foreign_key.to_string(),
        owner_key: None,
        local_key: None,
    })
}

pub fn has_one(related: Arc<dyn EntityMeta>, foreign_key: &str) -> RelationAccess {
    RelationAccess::Relation(RelationDescriptor {
        kind: DeclaredKind::HasOne,
        related,
        foreign_key: foreign_key.to_string(),
        owner_key: None,
        local_key: None,
    })
}

pub fn has_many(related: Arc<dyn EntityMeta>, foreign_key: &str) -> RelationAccess {
    RelationAccess::Relation(RelationDescriptor {
        kind: DeclaredKind::HasMany,
        related,
        foreign_key: foreign_key.to_string(),
        owner_key: None,
        local_key: None,
    })
}

pub fn profile_entity() -> Arc<StaticEntity> {
    Arc::new(StaticEntity::new("profile", "profiles", "id"))
}

pub fn promocode_entity() -> Arc<StaticEntity> {
    Arc::new(StaticEntity::new("promocode", "promocodes", "id"))
}

/// Promocode mapping that declares its writable columns, so wildcard
/// resolution succeeds without any schema round trip.
pub fn promocode_entity_with_columns() -> Arc<StaticEntity> {
    Arc::new(
        StaticEntity::new("promocode", "promocodes", "id")
            .writable(&["code", "partner_id"])
            .timestamps()
            .soft_deletes(),
    )
}

/// The root fixture: a partner with a belongs-to profile, a has-one avatar,
/// has-many promocodes, and a few deliberately broken accessors.
pub fn partner() -> Arc<StaticEntity> {
    partner_with_promocode(promocode_entity())
}

pub fn partner_with_promocode(promocode: Arc<StaticEntity>) -> Arc<StaticEntity> {
    let avatar = Arc::new(StaticEntity::new("avatar", "avatars", "id"));
    Arc::new(
        StaticEntity::new("partner", "partners", "id")
            .relation_def("profile", belongs_to(profile_entity(), "profile_id"))
            .relation_def("avatar", has_one(avatar, "partner_id"))
            .relation_def("promocodes", has_many(promocode.clone(), "partner_id"))
            .relation_def("scoped", RelationAccess::RequiresArguments)
            .relation_def("settings", RelationAccess::NotARelation)
            .relation_def(
                "tags",
                RelationAccess::Relation(RelationDescriptor {
                    kind: DeclaredKind::Other("belongs-to-many"),
                    related: promocode,
                    foreign_key: "partner_id".to_string(),
                    owner_key: None,
                    local_key: None,
                }),
            ),
    )
}

/// Builds a resolved [`RelationRequest`] with explicit columns for driving
/// generators and hydrators directly.
pub fn request(
    model: &dyn EntityMeta,
    name: &str,
    mode: RelationMode,
    columns: &[&str],
) -> RelationRequest {
    let metadata = resolve_relation(model, name).expect("fixture relation resolves");
    let output_key = match mode {
        RelationMode::Count => format!("{name}_count"),
        _ => name.to_string(),
    };
    RelationRequest {
        name: name.to_string(),
        mode,
        output_key,
        columns: ColumnSet::Explicit(columns.iter().map(|c| c.to_string()).collect()),
        metadata,
    }
}

/// Schema introspector over a fixed column map, logging every call.
pub struct FakeSchema {
    pub columns: HashMap<String, Vec<String>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeSchema {
    pub fn new(columns: &[(&str, &[&str])]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(table, cols)| {
                    (table.to_string(), cols.iter().map(|c| c.to_string()).collect())
                })
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    fn lookup(&self, table: &str) -> Result<Vec<String>> {
        self.columns
            .get(table)
            .cloned()
            .ok_or_else(|| AggrelError::Introspection(format!("unknown table {table:?}")))
    }
}

impl SchemaIntrospector for FakeSchema {
    fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        self.calls.borrow_mut().push(format!("list:{table}"));
        self.lookup(table)
    }

    fn list_columns_batch(&self, tables: &[&str]) -> Result<HashMap<String, Vec<String>>> {
        self.calls.borrow_mut().push(format!("batch:{}", tables.join("+")));
        tables
            .iter()
            .map(|table| Ok((table.to_string(), self.lookup(table)?)))
            .collect()
    }
}

/// Executor returning canned rows, with a fixed total for companion count
/// queries. Logs every statement with its bindings.
pub struct FakeExecutor {
    pub rows: Vec<Row>,
    pub count: i64,
    pub log: RefCell<Vec<(String, Bindings)>>,
}

impl FakeExecutor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            count: 0,
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().iter().map(|(sql, _)| sql.clone()).collect()
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>> {
        self.log.borrow_mut().push((sql.to_string(), bindings.clone()));
        if sql.starts_with("SELECT COUNT(*) AS aggregate") {
            return Ok(vec![Row::new(vec![(
                "aggregate".to_string(),
                Scalar::Int(self.count),
            )])]);
        }
        Ok(self.rows.clone())
    }
}

/// Convenience row constructor.
pub fn row(columns: &[(&str, Scalar)]) -> Row {
    Row::new(columns.iter().map(|(name, value)| (name.to_string(), value.clone())).collect())
}
