//! Typed-entity hydrator: reconstructs tagged entity instances from decoded
//! JSON, wiring relations back onto the root.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Hydrated, Hydrator, decode_relation_value};
use crate::error::Result;
use crate::relation::{RelationMode, RelationRequest};
use crate::value::Row;

/// A reconstructed entity: a type handle plus its attribute map.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub type_handle: String,
    pub attributes: serde_json::Map<String, Value>,
}

/// A relation attached to a hydrated root entity.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// Single-object relation; `None` when the relation was absent.
    One(Option<EntityInstance>),
    /// Collection relation; empty for zero matches, never absent.
    Many(Vec<EntityInstance>),
    /// Count aggregate.
    Count(u64),
}

/// Root entity plus its requested relations, keyed by output key.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedEntity {
    pub root: EntityInstance,
    pub relations: BTreeMap<String, RelationValue>,
}

pub struct EntityHydrator;

impl Hydrator for EntityHydrator {
    fn hydrate(
        &self,
        rows: Vec<Row>,
        root_handle: &str,
        requests: &[RelationRequest],
    ) -> Result<Vec<Hydrated>> {
        Ok(rows
            .into_iter()
            .map(|row| Hydrated::Entity(hydrate_row(row, root_handle, requests)))
            .collect())
    }
}

fn hydrate_row(row: Row, root_handle: &str, requests: &[RelationRequest]) -> HydratedEntity {
    let mut attributes = serde_json::Map::new();
    let mut relations = BTreeMap::new();

    for (name, value) in row.0 {
        match requests.iter().find(|r| r.output_key == name) {
            Some(request) => {
                relations.insert(name, hydrate_relation(request, value));
            }
            None => {
                attributes.insert(name, value.into_json());
            }
        }
    }

    // Relations the query requested but the row lacks still get an explicit
    // empty slot, so callers can tell "absent" from "never asked".
    for request in requests {
        if !relations.contains_key(&request.output_key) {
            let empty = match request.mode {
                RelationMode::Single => RelationValue::One(None),
                RelationMode::Collection => RelationValue::Many(Vec::new()),
                RelationMode::Count => RelationValue::Count(0),
            };
            relations.insert(request.output_key.clone(), empty);
        }
    }

    HydratedEntity {
        root: EntityInstance {
            type_handle: root_handle.to_string(),
            attributes,
        },
        relations,
    }
}

fn hydrate_relation(request: &RelationRequest, value: crate::value::Scalar) -> RelationValue {
    let handle = &request.metadata.related_type_handle;
    let decoded = decode_relation_value(value, request.mode);
    match request.mode {
        RelationMode::Single => match decoded {
            Value::Object(attributes) => RelationValue::One(Some(EntityInstance {
                type_handle: handle.clone(),
                attributes,
            })),
            _ => RelationValue::One(None),
        },
        RelationMode::Collection => {
            let items = match decoded {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(attributes) => Some(EntityInstance {
                            type_handle: handle.clone(),
                            attributes,
                        }),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            RelationValue::Many(items)
        }
        RelationMode::Count => {
            let count = decoded.as_u64().unwrap_or(0);
            RelationValue::Count(count)
        }
    }
}
