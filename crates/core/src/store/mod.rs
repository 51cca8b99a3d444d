//! The remote record store seam.
//!
//! [`RecordStore`] mirrors the five operations of the hosted backend. Implementations only
//! report transport-level problems as `Err`; a store that answered, even with
//! `success: false`, returns `Ok(envelope)` and the repositories decide what it means.

pub mod envelope;
pub mod http;
pub mod memory;
pub mod query;

pub use envelope::{FetchResponse, GetResponse, MutationResponse, RecordOutcome};
pub use http::HttpRecordStore;
pub use memory::InMemoryRecordStore;
pub use query::{Condition, FetchQuery, Logic, Operator, SubGroup, WhereGroup};

use crate::constants::ID_FIELD;
use crate::error::RecordResult;
use async_trait::async_trait;
use ward_types::RecordId;

/// A single row as exchanged with the store: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_records(&self, table: &str, query: &FetchQuery) -> RecordResult<FetchResponse>;

    async fn get_record_by_id(
        &self,
        table: &str,
        id: RecordId,
        fields: &[String],
    ) -> RecordResult<GetResponse>;

    async fn create_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse>;

    /// Each record must carry its `Id`.
    async fn update_records(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> RecordResult<MutationResponse>;

    async fn delete_records(&self, table: &str, ids: &[RecordId])
        -> RecordResult<MutationResponse>;

    /// Update one record only if it currently satisfies every `guard` condition.
    ///
    /// A failed guard is reported as a failed [`RecordOutcome`]. The default implementation
    /// reads then writes and is therefore not atomic across processes; stores that can do
    /// better override it.
    async fn update_record_if(
        &self,
        table: &str,
        record: Record,
        guard: &[Condition],
    ) -> RecordResult<MutationResponse> {
        let Some(id) = record.get(ID_FIELD).cloned() else {
            return Ok(MutationResponse::with_results(vec![RecordOutcome::failed(
                "record is missing its Id",
            )]));
        };

        let mut query = FetchQuery::new(&[ID_FIELD]).filter(Condition::equal_to(ID_FIELD, id));
        query.conditions.extend(guard.iter().cloned());

        let current = self.fetch_records(table, &query).await?;
        if !current.success {
            return Ok(MutationResponse {
                success: false,
                results: None,
                message: current.message,
            });
        }
        if current.data.unwrap_or_default().is_empty() {
            return Ok(MutationResponse::with_results(vec![RecordOutcome::failed(
                "precondition failed",
            )]));
        }

        self.update_records(table, vec![record]).await
    }
}
