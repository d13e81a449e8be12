//! In-memory, id-indexed view of the persisted collection.

use std::collections::HashMap;

use crate::models::LabResult;

/// Records in storage order plus an id → position index.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    records: Vec<LabResult>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn from_records(records: Vec<LabResult>) -> Self {
        let mut ledger = Self {
            records,
            index: HashMap::new(),
        };
        ledger.reindex();
        ledger
    }

    pub fn decode(json: &str) -> serde_json::Result<Self> {
        Ok(Self::from_records(serde_json::from_str(json)?))
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }

    // Duplicate ids in legacy data resolve to the first occurrence.
    fn reindex(&mut self) {
        self.index.clear();
        for (i, record) in self.records.iter().enumerate() {
            self.index.entry(record.id.clone()).or_insert(i);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&LabResult> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut LabResult> {
        let i = *self.index.get(id)?;
        self.records.get_mut(i)
    }

    pub fn push(&mut self, record: LabResult) {
        self.index
            .entry(record.id.clone())
            .or_insert(self.records.len());
        self.records.push(record);
    }

    /// Remove every record with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        if removed {
            self.reindex();
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<LabResult> {
        self.records
    }
}
