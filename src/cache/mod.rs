//! Record Cache
//!
//! Local snapshot of server records of one kind, keyed by identifier. The
//! cache is filled by running the kind's read operation and searched
//! offline with the [`filter`] engine.

pub mod filter;

use crate::error::{Error, Result};
use crate::resource::{CallArgs, Resource};
use filter::FilterSpec;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Where records of one kind come from and how they are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKind {
    pub name: &'static str,
    /// Resource holding the read operation
    pub resource: &'static str,
    pub read_operation: &'static str,
    pub id_field: &'static str,
}

impl RecordKind {
    pub const MACHINES: RecordKind = RecordKind {
        name: "machines",
        resource: "machines",
        read_operation: "read",
        id_field: "system_id",
    };

    pub const DEVICES: RecordKind = RecordKind {
        name: "devices",
        resource: "devices",
        read_operation: "read",
        id_field: "system_id",
    };

    pub const SUBNETS: RecordKind = RecordKind {
        name: "subnets",
        resource: "subnets",
        read_operation: "read",
        id_field: "id",
    };

    /// Identifier of a record; missing or empty identifiers yield `None`
    pub fn record_id(&self, record: &Value) -> Option<String> {
        match record.get(self.id_field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Identifier -> last fetched record, for one record kind
#[derive(Debug, Clone)]
pub struct RecordCache {
    kind: RecordKind,
    records: HashMap<String, Value>,
}

impl RecordCache {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            records: HashMap::new(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.records.get(id)
    }

    pub fn records(&self) -> &HashMap<String, Value> {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Store whole records, replacing any entry with the same identifier.
    ///
    /// Records without an identifier are dropped. Returns how many were stored.
    pub fn absorb(&mut self, records: impl IntoIterator<Item = Value>) -> usize {
        let mut stored = 0;
        for record in records {
            match self.kind.record_id(&record) {
                Some(id) => {
                    self.records.insert(id, record);
                    stored += 1;
                }
                None => {
                    tracing::debug!("Dropping {} record without {}", self.kind.name, self.kind.id_field)
                }
            }
        }
        stored
    }

    /// Re-read records from the server.
    ///
    /// `filter_args` is passed as the read operation's `args`, so an empty
    /// map loads the whole collection. With `reset`, the cache is cleared
    /// first; otherwise fetched records are layered over the existing ones.
    pub async fn refresh(
        &mut self,
        resource: &Resource,
        filter_args: Map<String, Value>,
        reset: bool,
    ) -> Result<usize> {
        if reset {
            self.clear();
        }

        let reply = resource
            .call(self.kind.read_operation, CallArgs::new().args(filter_args))
            .await?;

        let Value::Array(records) = reply.into_json() else {
            return Err(Error::UnexpectedResponse(format!(
                "{}.{} did not return a list",
                resource.name(),
                self.kind.read_operation
            )));
        };

        let fetched = records.len();
        let stored = self.absorb(records);
        tracing::info!(
            "Refreshed {} cache: {} fetched, {} stored, {} cached",
            self.kind.name,
            fetched,
            stored,
            self.records.len()
        );

        Ok(stored)
    }

    /// Identifiers of cached records matching `spec`
    pub fn match_ids(&self, spec: &FilterSpec) -> HashSet<String> {
        spec.match_ids(&self.records)
    }

    /// Cached records for `ids`; ids no longer cached are skipped
    pub fn select<'a, I>(&'a self, ids: I) -> impl Iterator<Item = &'a Value> + 'a
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        ids.into_iter().filter_map(move |id| self.records.get(&id))
    }

    /// Lazily yield the cached records matching `spec`
    pub fn find_iter<'a>(&'a self, spec: &FilterSpec) -> impl Iterator<Item = &'a Value> + 'a {
        self.select(self.match_ids(spec))
    }

    /// Cached records matching `spec`, in no particular order
    pub fn find(&self, spec: &FilterSpec) -> Vec<Value> {
        self.find_iter(spec).cloned().collect()
    }
}
