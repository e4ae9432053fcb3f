//! The query composer: a fluent accumulator that collects relation requests
//! and filter/order/pagination directives, then drives the dialect generator
//! to assemble one SQL statement with bindings.
//!
//! An [`AggregateQuery`] is request-scoped and exclusively owned by its
//! caller: the column-listing cache and the wildcard-resolution memo are
//! unguarded instance state, and sharing one instance across tasks is not
//! supported. Every registration validates eagerly; compile only performs
//! wildcard resolution and text assembly.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::entity::{EntityMeta, Executor, SchemaIntrospector};
use crate::error::{AggrelError, Result};
use crate::generator::{SqlGenerator, make_generator};
use crate::hydrate::{Hydrated, Hydrator, HydratorRegistry};
use crate::ident;
use crate::relation::{
    ColumnSet, RelationKind, RelationMetadata, RelationMode, RelationRequest, resolve_relation,
};
use crate::value::{Bindings, Scalar};

/// Alias the root table (or base subquery) is selected under.
pub const BASE_ALIAS: &str = "base";

/// Whitelisted comparison operators for filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    NeAlt,
    Lt,
    Gt,
    Le,
    Ge,
}

impl FilterOp {
    pub fn parse(operator: &str) -> Result<Self> {
        match operator.trim() {
            "=" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            "<>" => Ok(FilterOp::NeAlt),
            "<" => Ok(FilterOp::Lt),
            ">" => Ok(FilterOp::Gt),
            "<=" => Ok(FilterOp::Le),
            ">=" => Ok(FilterOp::Ge),
            other => Err(AggrelError::InvalidRequest(format!(
                "operator {other:?} is not allowed"
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::NeAlt => "<>",
            FilterOp::Lt => "<",
            FilterOp::Gt => ">",
            FilterOp::Le => "<=",
            FilterOp::Ge => ">=",
        }
    }
}

/// Sort direction, parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn parse(direction: &str) -> Result<Self> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(AggrelError::InvalidRequest(format!(
                "direction {other:?} must be either asc or desc"
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One validated WHERE predicate, stored in registration order.
#[derive(Debug, Clone)]
pub struct FilterClause {
    pub column: String,
    pub op: FilterOp,
    pub value: Scalar,
}

/// One validated ORDER BY directive, stored in registration order.
#[derive(Debug, Clone)]
pub struct OrderClause {
    pub column: String,
    pub direction: OrderDirection,
}

/// A pre-built base subquery replacing the root table.
///
/// The subquery is assumed to already encode its own ordering and windowing,
/// so the composer suppresses its ORDER BY / LIMIT / OFFSET while one is set.
#[derive(Debug, Clone)]
pub struct BaseQuery {
    pub sql: String,
    pub bindings: Vec<Scalar>,
}

/// One page of paginated results with its companion total.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<Hydrated>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

/// Fluent relation-aggregation query over one root entity.
pub struct AggregateQuery {
    model: Arc<dyn EntityMeta>,
    generator: Box<dyn SqlGenerator>,
    config: QueryConfig,
    hydrators: HydratorRegistry,
    relations: Vec<RelationRequest>,
    filters: Vec<FilterClause>,
    orders: Vec<OrderClause>,
    limit: Option<u64>,
    offset: Option<u64>,
    base_table: String,
    base_query: Option<BaseQuery>,
    /// Metadata resolved per relation name, at most once per instance.
    resolved: HashMap<String, RelationMetadata>,
    /// Column listings per table, instance-owned (never process-global).
    column_listings: HashMap<String, Vec<String>>,
    wildcards_resolved: bool,
}

impl AggregateQuery {
    /// Starts a query against `model` for the given dialect identifier.
    pub fn new(model: Arc<dyn EntityMeta>, dialect: &str) -> Result<Self> {
        Self::with_config(model, dialect, QueryConfig::default())
    }

    pub fn with_config(
        model: Arc<dyn EntityMeta>,
        dialect: &str,
        config: QueryConfig,
    ) -> Result<Self> {
        let generator = make_generator(dialect, BASE_ALIAS)?;
        let base_table = model.table().to_string();
        Ok(Self {
            model,
            generator,
            config,
            hydrators: HydratorRegistry::default(),
            relations: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            base_table,
            base_query: None,
            resolved: HashMap::new(),
            column_listings: HashMap::new(),
            wildcards_resolved: false,
        })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn requests(&self) -> &[RelationRequest] {
        &self.relations
    }

    /// Replaces the root table with a pre-built subquery. Its bindings come
    /// first in [`bindings`](Self::bindings), and this layer's own
    /// ORDER BY / LIMIT / OFFSET are suppressed.
    pub fn base_query(&mut self, base: BaseQuery) -> &mut Self {
        self.base_query = Some(base);
        self
    }

    /// Registers a custom hydrator under `name`.
    pub fn register_hydrator(&mut self, name: &str, hydrator: Box<dyn Hydrator>) -> &mut Self {
        self.hydrators.register(name, hydrator);
        self
    }

    // ==================== relation registration ====================

    /// Attaches a belongs-to-one / has-one relation as a nested JSON object
    /// with the given columns.
    pub fn with_single(&mut self, name: &str, columns: &[&str]) -> Result<&mut Self> {
        self.add_relation(name, RelationMode::Single, Some(columns))
    }

    /// Like [`with_single`](Self::with_single), selecting all related columns.
    pub fn with_single_all(&mut self, name: &str) -> Result<&mut Self> {
        self.add_relation(name, RelationMode::Single, None)
    }

    /// Attaches a has-many relation as a nested JSON array with the given
    /// columns.
    pub fn with_collection(&mut self, name: &str, columns: &[&str]) -> Result<&mut Self> {
        self.add_relation(name, RelationMode::Collection, Some(columns))
    }

    /// Like [`with_collection`](Self::with_collection), selecting all related
    /// columns.
    pub fn with_collection_all(&mut self, name: &str) -> Result<&mut Self> {
        self.add_relation(name, RelationMode::Collection, None)
    }

    /// Attaches a `COUNT(*)` of a has-many relation under `{name}_count`.
    pub fn with_count(&mut self, name: &str) -> Result<&mut Self> {
        self.add_relation(name, RelationMode::Count, None)
    }

    fn add_relation(
        &mut self,
        name: &str,
        mode: RelationMode,
        columns: Option<&[&str]>,
    ) -> Result<&mut Self> {
        ident::ensure_relation_name(name)?;
        let name = name.trim();

        let columns = match mode {
            RelationMode::Count => ColumnSet::Explicit(Vec::new()),
            RelationMode::Single | RelationMode::Collection => {
                self.validate_columns(name, columns)?
            }
        };

        let metadata = self.resolve_cached(name)?;
        match (mode, metadata.kind) {
            (RelationMode::Single, RelationKind::BelongsToOne | RelationKind::HasOne) => {}
            (RelationMode::Single, other) => {
                return Err(AggrelError::UnsupportedRelationKind(format!(
                    "relation {name:?} must be belongs-to-one or has-one for a single object, got {}",
                    other.as_str()
                )));
            }
            (RelationMode::Collection | RelationMode::Count, RelationKind::HasMany) => {}
            (RelationMode::Collection, other) => {
                return Err(AggrelError::UnsupportedRelationKind(format!(
                    "relation {name:?} must be has-many for a collection, got {}",
                    other.as_str()
                )));
            }
            (RelationMode::Count, other) => {
                return Err(AggrelError::UnsupportedRelationKind(format!(
                    "relation {name:?} must be has-many to be counted, got {}",
                    other.as_str()
                )));
            }
        }

        let output_key = match mode {
            RelationMode::Count => format!("{name}_count"),
            _ => name.to_string(),
        };
        if self.relations.iter().any(|r| r.output_key == output_key) {
            return Err(AggrelError::InvalidRequest(format!(
                "output key {output_key:?} is already registered"
            )));
        }

        // Wildcards try static model metadata, then the configured column
        // cache; only what is still unresolved hits the schema at compile.
        let columns = match columns {
            ColumnSet::Wildcard => self.discover_columns(&metadata),
            explicit => explicit,
        };

        self.relations.push(RelationRequest {
            name: name.to_string(),
            mode,
            output_key,
            columns,
            metadata,
        });
        self.check_relation_count()?;
        Ok(self)
    }

    fn resolve_cached(&mut self, name: &str) -> Result<RelationMetadata> {
        if let Some(metadata) = self.resolved.get(name) {
            return Ok(metadata.clone());
        }
        let metadata = resolve_relation(self.model.as_ref(), name)?;
        self.resolved.insert(name.to_string(), metadata.clone());
        Ok(metadata)
    }

    fn validate_columns(&self, relation: &str, columns: Option<&[&str]>) -> Result<ColumnSet> {
        let Some(columns) = columns else {
            self.note_wildcard(relation)?;
            return Ok(ColumnSet::Wildcard);
        };
        if columns.is_empty() {
            return Err(AggrelError::InvalidRequest(format!(
                "columns cannot be empty for relation {relation:?}"
            )));
        }
        if columns.contains(&ident::WILDCARD) {
            if columns.len() > 1 {
                return Err(AggrelError::InvalidRequest(format!(
                    "the wildcard cannot be mixed with explicit columns for relation {relation:?}"
                )));
            }
            self.note_wildcard(relation)?;
            return Ok(ColumnSet::Wildcard);
        }
        for column in columns {
            ident::ensure_safe_column(column)?;
        }
        Ok(ColumnSet::Explicit(
            columns.iter().map(|c| c.trim().to_string()).collect(),
        ))
    }

    /// Wildcard selection may expose sensitive data and widen payloads;
    /// strict mode rejects it, otherwise it is logged and allowed.
    fn note_wildcard(&self, relation: &str) -> Result<()> {
        if self.config.strict_mode {
            return Err(AggrelError::InvalidRequest(format!(
                "wildcard column selection for relation {relation:?} is rejected in strict mode"
            )));
        }
        if self.config.log_fallbacks {
            warn!(
                relation,
                "selecting all columns for a relation; consider an explicit column list"
            );
        }
        Ok(())
    }

    /// Static column discovery from the related mapping: primary key,
    /// writable fields, timestamps, soft-delete marker. Falls back to the
    /// configured per-table cache, then stays wildcard for introspection.
    fn discover_columns(&self, metadata: &RelationMetadata) -> ColumnSet {
        let related = metadata.related.as_ref();
        let writable = related.writable_columns();
        if !writable.is_empty() {
            let mut columns = vec![related.primary_key().to_string()];
            columns.extend(writable.iter().cloned());
            if let Some((created_at, updated_at)) = related.timestamp_columns() {
                columns.push(created_at.to_string());
                columns.push(updated_at.to_string());
            }
            if let Some(deleted_at) = related.soft_delete_column() {
                columns.push(deleted_at.to_string());
            }
            let mut seen = Vec::with_capacity(columns.len());
            for column in columns {
                if !column.is_empty() && !seen.contains(&column) {
                    seen.push(column);
                }
            }
            return ColumnSet::Explicit(seen);
        }
        if let Some(cached) = self.config.column_cache.get(&metadata.related_table) {
            if !cached.is_empty() {
                return ColumnSet::Explicit(cached.clone());
            }
        }
        ColumnSet::Wildcard
    }

    fn check_relation_count(&self) -> Result<()> {
        let count = self.relations.len();
        let max = self.config.max_relations;
        if count > max {
            if self.config.strict_mode {
                return Err(AggrelError::TooManyRelations { count, max });
            }
            if self.config.log_fallbacks {
                warn!(count, max, "relation count exceeds the recommended maximum");
            }
        }
        Ok(())
    }

    // ==================== filters / ordering / windowing ====================

    /// `WHERE column = value`. Two-argument form of [`filter_op`](Self::filter_op).
    pub fn filter(&mut self, column: &str, value: impl Into<Scalar>) -> Result<&mut Self> {
        self.filter_op(column, "=", value)
    }

    pub fn filter_op(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Scalar>,
    ) -> Result<&mut Self> {
        ident::ensure_safe_column(column)?;
        let op = FilterOp::parse(operator)?;
        self.filters.push(FilterClause {
            column: column.trim().to_string(),
            op,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn order_by(&mut self, column: &str, direction: &str) -> Result<&mut Self> {
        ident::ensure_safe_column(column)?;
        let direction = OrderDirection::parse(direction)?;
        self.orders.push(OrderClause {
            column: column.trim().to_string(),
            direction,
        });
        Ok(self)
    }

    /// Caps the result count. Values above `max_limit` raise
    /// [`LimitExceeded`](AggrelError::LimitExceeded) under strict limit
    /// validation, otherwise warn and proceed.
    pub fn limit(&mut self, limit: u64) -> Result<&mut Self> {
        let max = self.config.max_limit;
        if limit > max {
            if self.config.strict_limit_validation {
                return Err(AggrelError::LimitExceeded { limit, max });
            }
            if self.config.log_fallbacks {
                warn!(limit, max, "query limit exceeds the recommended maximum");
            }
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: u64) -> Result<&mut Self> {
        self.offset = Some(offset);
        Ok(self)
    }

    // ==================== compilation ====================

    /// Compiles the accumulated state into SQL text plus bindings.
    ///
    /// Idempotent: wildcard columns resolve at most once per instance and
    /// repeated calls yield byte-identical text.
    pub fn compile(&mut self, schema: &dyn SchemaIntrospector) -> Result<(String, Bindings)> {
        let sql = self.to_sql(schema)?;
        Ok((sql, self.bindings()))
    }

    /// The SQL text that would be executed.
    pub fn to_sql(&mut self, schema: &dyn SchemaIntrospector) -> Result<String> {
        self.resolve_wildcard_columns(schema)?;

        let select = self
            .generator
            .build_select_list(&[format!("{BASE_ALIAS}.*")], &self.relations);
        let mut sql = format!("SELECT {select} FROM {}", self.base_source());

        let joins = self.generator.build_join_list(&self.relations)?;
        if !joins.is_empty() {
            sql.push('\n');
            sql.push_str(&joins);
        }

        if !self.filters.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&self.compile_filters());
        }

        // A pre-built base subquery owns ordering and windowing.
        if self.base_query.is_none() {
            if !self.orders.is_empty() {
                sql.push_str("\nORDER BY ");
                sql.push_str(&self.compile_orders());
            }
            if let Some(limit) = self.limit {
                sql.push_str("\nLIMIT ");
                sql.push_str(&limit.to_string());
            }
            if let Some(offset) = self.offset {
                sql.push_str("\nOFFSET ");
                sql.push_str(&offset.to_string());
            }
        }

        Ok(sql)
    }

    /// Bind values in placeholder order: base-subquery bindings first, then
    /// filter values in registration order.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        if let Some(base) = &self.base_query {
            bindings.extend(base.bindings.iter().cloned());
        }
        bindings.extend(self.filters.iter().map(|f| f.value.clone()));
        bindings
    }

    fn resolve_wildcard_columns(&mut self, schema: &dyn SchemaIntrospector) -> Result<()> {
        if self.wildcards_resolved {
            return Ok(());
        }

        let mut pending: Vec<String> = Vec::new();
        for request in self.relations.iter().filter(|r| r.columns.is_wildcard()) {
            let table = &request.metadata.related_table;
            if !pending.contains(table) && !self.column_listings.contains_key(table) {
                pending.push(table.clone());
            }
        }

        if !pending.is_empty() {
            if self.config.log_fallbacks {
                warn!(
                    tables = ?pending,
                    "resolving wildcard columns through live schema introspection"
                );
            }
            let tables: Vec<&str> = pending.iter().map(String::as_str).collect();
            let listings = self.generator.resolve_column_listings(schema, &tables)?;
            for (table, columns) in listings {
                self.column_listings.insert(table, columns);
            }
        }

        for request in self.relations.iter_mut().filter(|r| r.columns.is_wildcard()) {
            let table = &request.metadata.related_table;
            match self.column_listings.get(table) {
                Some(columns) if !columns.is_empty() => {
                    request.columns = ColumnSet::Explicit(columns.clone());
                }
                _ => {
                    return Err(AggrelError::Introspection(format!(
                        "no columns found for table {table:?}"
                    )));
                }
            }
        }

        self.wildcards_resolved = true;
        Ok(())
    }

    fn base_source(&self) -> String {
        match &self.base_query {
            Some(base) => format!("({}) {BASE_ALIAS}", base.sql),
            None => format!("{} {BASE_ALIAS}", self.base_table),
        }
    }

    fn compile_filters(&self) -> String {
        self.filters
            .iter()
            .map(|f| format!("{} {} ?", qualify(&f.column), f.op.as_sql()))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn compile_orders(&self) -> String {
        self.orders
            .iter()
            .map(|o| format!("{} {}", qualify(&o.column), o.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ==================== execution ====================

    /// Compiles, executes, and hydrates with the configured default hydrator.
    pub fn get(
        &mut self,
        db: &dyn Executor,
        schema: &dyn SchemaIntrospector,
    ) -> Result<Vec<Hydrated>> {
        let hydrator = self.config.default_hydrator.clone();
        self.get_with(db, schema, &hydrator)
    }

    /// Compiles, executes, and hydrates with the named hydrator.
    pub fn get_with(
        &mut self,
        db: &dyn Executor,
        schema: &dyn SchemaIntrospector,
        hydrator: &str,
    ) -> Result<Vec<Hydrated>> {
        let (sql, bindings) = self.compile(schema)?;
        debug!(sql = %sql, params = bindings.len(), "aggrel.query");
        let rows = db.execute(&sql, &bindings)?;
        let hydrator = self.hydrators.resolve(hydrator)?;
        hydrator.hydrate(rows, self.model.type_handle(), &self.relations)
    }

    /// First hydrated result, if any.
    pub fn first(
        &mut self,
        db: &dyn Executor,
        schema: &dyn SchemaIntrospector,
    ) -> Result<Option<Hydrated>> {
        Ok(self.get(db, schema)?.into_iter().next())
    }

    /// Paginates via a companion `COUNT(*)` query plus a windowed data query.
    ///
    /// Incompatible with a pre-built base subquery, whose windowing this
    /// layer cannot rewrite.
    pub fn paginate(
        &mut self,
        db: &dyn Executor,
        schema: &dyn SchemaIntrospector,
        per_page: u64,
        page: u64,
    ) -> Result<Page> {
        if per_page == 0 {
            return Err(AggrelError::InvalidRequest("per_page must be positive".into()));
        }
        if self.base_query.is_some() {
            return Err(AggrelError::InvalidRequest(
                "pagination cannot be combined with a pre-built base query".into(),
            ));
        }
        let page = page.max(1);

        let mut count_sql = format!("SELECT COUNT(*) AS aggregate FROM {}", self.base_source());
        if !self.filters.is_empty() {
            count_sql.push_str("\nWHERE ");
            count_sql.push_str(&self.compile_filters());
        }
        debug!(sql = %count_sql, "aggrel.paginate.count");
        let rows = db.execute(&count_sql, &self.bindings())?;
        let total = rows
            .first()
            .and_then(|row| row.get("aggregate"))
            .map(|value| match value {
                Scalar::Int(n) => (*n).max(0) as u64,
                Scalar::Text(text) => text.parse().unwrap_or(0),
                _ => 0,
            })
            .unwrap_or(0);

        let (saved_limit, saved_offset) = (self.limit, self.offset);
        self.limit = Some(per_page);
        self.offset = Some((page - 1) * per_page);
        let items = self.get(db, schema);
        self.limit = saved_limit;
        self.offset = saved_offset;

        Ok(Page {
            items: items?,
            total,
            per_page,
            current_page: page,
            last_page: total.div_ceil(per_page).max(1),
        })
    }
}

/// Qualifies a bare column with the base alias; already-qualified names pass
/// through.
fn qualify(column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{BASE_ALIAS}.{column}")
    }
}
