//! Bed repository.

use super::shared;
use crate::client::RecordClient;
use crate::error::{RecordError, RecordResult};
use crate::models::bed::occupancy_record;
use crate::models::{Bed, BedDraft, BedStatus, Entity};
use crate::store::{Condition, FetchQuery, Operator};
use chrono::{DateTime, Utc};
use ward_types::RecordId;

#[derive(Clone, Debug)]
pub struct BedRepository {
    client: RecordClient,
}

impl BedRepository {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    fn query() -> FetchQuery {
        FetchQuery::new(Bed::FIELDS)
    }

    pub async fn get_all(&self) -> RecordResult<Vec<Bed>> {
        shared::fetch_all(&self.client, "get_all", Self::query()).await
    }

    pub async fn get_by_id(&self, id: RecordId) -> RecordResult<Bed> {
        shared::fetch_one(&self.client, id).await
    }

    /// Create a bed. Status defaults to `Available` and last-cleaned to now.
    pub async fn create(&self, draft: &BedDraft) -> RecordResult<Bed> {
        let mut draft = draft.clone();
        draft.status.get_or_insert(BedStatus::Available);
        draft.last_cleaned.get_or_insert_with(Utc::now);

        let bed: Bed = shared::create_one(&self.client, draft.to_record()?).await?;
        tracing::info!(id = %bed.id, ward = %bed.ward, number = %bed.number, "created bed");
        Ok(bed)
    }

    /// Update a bed's details.
    ///
    /// An occupied bed keeps its status, ward and number until it is released, so the
    /// occupant's placement never points at a bed that has moved. Other details stay editable.
    pub async fn update(&self, id: RecordId, draft: &BedDraft) -> RecordResult<Bed> {
        let changes = draft.to_record()?;
        let current = self.get_by_id(id).await?;

        let guard = if current.status == BedStatus::Occupied {
            if draft.status.is_some()
                || draft.ward.as_str() != current.ward
                || draft.number.as_str() != current.number
            {
                return Err(self.conflict(format!(
                    "bed {} in {} is occupied; release it before changing its status, ward or number",
                    current.number, current.ward
                )));
            }
            vec![
                Condition::equal_to("status_c", BedStatus::Occupied.as_str()),
                Condition::equal_to("ward_c", current.ward.as_str()),
                Condition::equal_to("number_c", current.number.as_str()),
            ]
        } else {
            vec![Condition {
                field: "status_c".into(),
                operator: Operator::EqualTo,
                values: vec![
                    BedStatus::Available.as_str().into(),
                    BedStatus::Maintenance.as_str().into(),
                ],
            }]
        };
        shared::update_one_if(&self.client, "update", id, changes, &guard).await
    }

    /// Delete a bed. An occupied bed must be released first.
    pub async fn delete(&self, id: RecordId) -> RecordResult<()> {
        let bed = self.get_by_id(id).await?;
        if bed.status == BedStatus::Occupied {
            return Err(self.conflict(format!(
                "bed {} in {} is occupied; release it before deleting",
                bed.number, bed.ward
            )));
        }
        shared::delete_one::<Bed>(&self.client, id).await?;
        tracing::info!(%id, "deleted bed");
        Ok(())
    }

    fn conflict(&self, message: String) -> RecordError {
        let err = RecordError::Conflict(message);
        tracing::warn!(table = Bed::TABLE, "{err}");
        self.client.notifier().notify_error(&err.to_string());
        err
    }

    pub async fn get_by_ward(&self, ward: &str) -> RecordResult<Vec<Bed>> {
        let query = Self::query().filter(Condition::equal_to("ward_c", ward));
        shared::fetch_all(&self.client, "get_by_ward", query).await
    }

    pub async fn get_available_beds(&self) -> RecordResult<Vec<Bed>> {
        self.get_by_status("get_available_beds", BedStatus::Available)
            .await
    }

    pub async fn get_occupied_beds(&self) -> RecordResult<Vec<Bed>> {
        self.get_by_status("get_occupied_beds", BedStatus::Occupied)
            .await
    }

    /// Occupied beds whose occupant is `patient_id`. Normally zero or one.
    pub async fn get_by_patient(&self, patient_id: RecordId) -> RecordResult<Vec<Bed>> {
        let query = Self::query()
            .filter(Condition::equal_to("status_c", BedStatus::Occupied.as_str()))
            .filter(Condition::equal_to("patient_id_c", patient_id.get()));
        shared::fetch_all(&self.client, "get_by_patient", query).await
    }

    async fn get_by_status(&self, op: &'static str, status: BedStatus) -> RecordResult<Vec<Bed>> {
        let query = Self::query().filter(Condition::equal_to("status_c", status.as_str()));
        shared::fetch_all(&self.client, op, query).await
    }

    /// Write status, occupant and optionally the cleaning time, only while `guard` holds.
    pub(crate) async fn set_occupancy(
        &self,
        id: RecordId,
        status: BedStatus,
        patient_id: Option<RecordId>,
        last_cleaned: Option<DateTime<Utc>>,
        guard: &[Condition],
    ) -> RecordResult<Bed> {
        let changes = occupancy_record(id, status, patient_id, last_cleaned)?;
        shared::update_one_if(&self.client, "set_occupancy", id, changes, guard).await
    }
}
