//! JSON-file backed record store.
//!
//! One file holds every entity table. `find` is the single query primitive:
//! it powers both the importer's idempotence check and `refer(...)` lookups.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::Value;

pub type FieldValues = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub values: FieldValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EntityTable {
    next_id: u64,
    records: Vec<Record>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    tables: BTreeMap<String, EntityTable>,
}

impl Store {
    /// Loads the store file, or starts empty when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Store::default());
        }
        let file = File::open(path).with_context(|| format!("Opening store file {path:?}"))?;
        let reader = BufReader::new(file);
        let store = serde_json::from_reader(reader).context("Parsing store JSON")?;
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating store file {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing store JSON")
    }

    /// Records of `entity` matching every filter pair exactly. Fields the
    /// filter does not mention are irrelevant; a record missing a filtered
    /// field does not match.
    pub fn find(&self, entity: &str, filters: &FieldValues) -> Vec<&Record> {
        let Some(table) = self.tables.get(entity) else {
            return Vec::new();
        };
        table
            .records
            .iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(field, value)| record.values.get(field) == Some(value))
            })
            .collect()
    }

    pub fn create(&mut self, entity: &str, values: FieldValues) -> u64 {
        let table = self.tables.entry(entity.to_string()).or_default();
        table.next_id += 1;
        let id = table.next_id;
        table.records.push(Record { id, values });
        id
    }

    pub fn record_count(&self, entity: &str) -> usize {
        self.tables.get(entity).map_or(0, |t| t.records.len())
    }
}
