//! Generic-structure hydrator: rows become JSON maps with relation columns
//! decoded in place.

use super::{Hydrated, Hydrator, decode_relation_value};
use crate::error::Result;
use crate::relation::RelationRequest;
use crate::value::Row;

pub struct RecordHydrator;

impl Hydrator for RecordHydrator {
    fn hydrate(
        &self,
        rows: Vec<Row>,
        _root_handle: &str,
        requests: &[RelationRequest],
    ) -> Result<Vec<Hydrated>> {
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut record = serde_json::Map::with_capacity(row.0.len());
                for (name, value) in row.0 {
                    match requests.iter().find(|r| r.output_key == name) {
                        Some(request) => {
                            record.insert(name, decode_relation_value(value, request.mode));
                        }
                        None => {
                            record.insert(name, value.into_json());
                        }
                    }
                }
                Hydrated::Record(record)
            })
            .collect())
    }
}
