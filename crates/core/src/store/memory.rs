//! In-process record store.
//!
//! Behaves like the hosted store closely enough to run the repositories against it:
//! projection, `where`/`whereGroups` evaluation, per-record outcomes, and server-assigned
//! `Id`s. Guarded updates are atomic because the guard check and the write happen under
//! the same table lock.

use super::{
    Condition, FetchQuery, FetchResponse, GetResponse, MutationResponse, Record, RecordOutcome,
    RecordStore,
};
use crate::constants::ID_FIELD;
use crate::error::RecordResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use ward_types::RecordId;

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, BTreeMap<i64, Record>>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .rows
            .get(table)
            .map_or(0, BTreeMap::len)
    }
}

fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    record
        .iter()
        .filter(|(k, _)| k.as_str() == ID_FIELD || fields.iter().any(|f| f == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn id_of(record: &Record) -> Option<i64> {
    match record.get(ID_FIELD)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn merge(target: &mut Record, changes: Record) {
    for (key, value) in changes {
        if key != ID_FIELD {
            target.insert(key, value);
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_records(&self, table: &str, query: &FetchQuery) -> RecordResult<FetchResponse> {
        let tables = self.tables.read().await;
        let data = tables
            .rows
            .get(table)
            .map(|rows| {
                rows.values()
                    .filter(|r| query.matches(r))
                    .map(|r| project(r, &query.fields))
                    .collect()
            })
            .unwrap_or_default();

        Ok(FetchResponse {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        id: RecordId,
        fields: &[String],
    ) -> RecordResult<GetResponse> {
        let tables = self.tables.read().await;
        let data = tables
            .rows
            .get(table)
            .and_then(|rows| rows.get(&id.get()))
            .map(|r| project(r, fields));

        Ok(GetResponse {
            success: true,
            data,
            message: None,
        })
    }

    async fn create_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse> {
        let mut tables = self.tables.write().await;
        let mut results = Vec::with_capacity(records.len());

        for changes in records {
            tables.next_id += 1;
            let id = tables.next_id;
            let mut stored = Record::new();
            stored.insert(ID_FIELD.to_owned(), Value::from(id));
            merge(&mut stored, changes);

            tables
                .rows
                .entry(table.to_owned())
                .or_default()
                .insert(id, stored.clone());
            results.push(RecordOutcome::ok(Some(stored)));
        }

        Ok(MutationResponse::with_results(results))
    }

    async fn update_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse> {
        let mut tables = self.tables.write().await;
        let rows = tables.rows.entry(table.to_owned()).or_default();

        let results = records
            .into_iter()
            .map(|changes| {
                let Some(id) = id_of(&changes) else {
                    return RecordOutcome::failed("record is missing its Id");
                };
                match rows.get_mut(&id) {
                    Some(stored) => {
                        merge(stored, changes);
                        RecordOutcome::ok(Some(stored.clone()))
                    }
                    None => RecordOutcome::failed(format!("record {id} does not exist")),
                }
            })
            .collect();

        Ok(MutationResponse::with_results(results))
    }

    async fn delete_records(
        &self,
        table: &str,
        ids: &[RecordId],
    ) -> RecordResult<MutationResponse> {
        let mut tables = self.tables.write().await;
        let rows = tables.rows.entry(table.to_owned()).or_default();

        let results = ids
            .iter()
            .map(|id| match rows.remove(&id.get()) {
                Some(_) => RecordOutcome::ok(None),
                None => RecordOutcome::failed(format!("record {id} does not exist")),
            })
            .collect();

        Ok(MutationResponse::with_results(results))
    }

    async fn update_record_if(
        &self,
        table: &str,
        record: Record,
        guard: &[Condition],
    ) -> RecordResult<MutationResponse> {
        let mut tables = self.tables.write().await;
        let rows = tables.rows.entry(table.to_owned()).or_default();

        let outcome = match id_of(&record).and_then(|id| rows.get_mut(&id)) {
            None => RecordOutcome::failed("record does not exist"),
            Some(stored) if !guard.iter().all(|c| c.matches(stored)) => {
                RecordOutcome::failed("precondition failed")
            }
            Some(stored) => {
                merge(stored, record);
                RecordOutcome::ok(Some(stored.clone()))
            }
        };

        Ok(MutationResponse::with_results(vec![outcome]))
    }
}
