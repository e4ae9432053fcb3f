//! Result hydration: decoding raw rows with embedded JSON text back into
//! structured values or reconstructed typed entities.

mod entity;
mod record;

use hashbrown::HashMap;
use serde_json::Value;

pub use entity::{EntityHydrator, EntityInstance, HydratedEntity, RelationValue};
pub use record::RecordHydrator;

use crate::error::{AggrelError, Result};
use crate::relation::{RelationMode, RelationRequest};
use crate::value::{Row, Scalar};

/// A hydrated output record.
#[derive(Debug, Clone, PartialEq)]
pub enum Hydrated {
    /// Generic structured record: column name to decoded JSON value.
    Record(serde_json::Map<String, Value>),
    /// Reconstructed typed root entity with attached relations.
    Entity(HydratedEntity),
}

/// Hydration contract. Implementations are interchangeable and may be
/// registered under custom names.
pub trait Hydrator {
    /// Decodes raw rows into output records. `root_handle` identifies the
    /// root entity type; `requests` describe which columns carry embedded
    /// JSON and how to shape them.
    fn hydrate(
        &self,
        rows: Vec<Row>,
        root_handle: &str,
        requests: &[RelationRequest],
    ) -> Result<Vec<Hydrated>>;
}

/// Decodes one relation column value according to its mode.
///
/// JSON text decodes to a structured value; anything that fails to parse
/// passes through unchanged. A collection that decodes to null (or arrives
/// as SQL NULL) becomes an empty array, matching the SQL-side `COALESCE`
/// guarantee for dialects that slip a null scalar through.
pub(crate) fn decode_relation_value(value: Scalar, mode: RelationMode) -> Value {
    match value {
        Scalar::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Null) if mode == RelationMode::Collection => Value::Array(Vec::new()),
            Ok(decoded) => decoded,
            Err(_) => Value::String(text),
        },
        Scalar::Null if mode == RelationMode::Collection => Value::Array(Vec::new()),
        other => other.into_json(),
    }
}

/// Named hydrator registry. `generic` and `typed` are built in; hosts may
/// register custom implementations under additional names.
pub struct HydratorRegistry {
    entries: HashMap<String, Box<dyn Hydrator>>,
}

impl HydratorRegistry {
    pub fn register(&mut self, name: &str, hydrator: Box<dyn Hydrator>) {
        self.entries.insert(name.to_string(), hydrator);
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn Hydrator> {
        self.entries
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| AggrelError::InvalidHydrator(name.to_string()))
    }
}

impl Default for HydratorRegistry {
    fn default() -> Self {
        let mut entries: HashMap<String, Box<dyn Hydrator>> = HashMap::new();
        entries.insert("generic".to_string(), Box::new(RecordHydrator));
        entries.insert("typed".to_string(), Box::new(EntityHydrator));
        Self { entries }
    }
}
