//! Patient repository.
//!
//! Reads always request the full patient projection. Placement (`current_ward_c`,
//! `bed_number_c`) is only written through [`BedAssignmentService`](super::BedAssignmentService).

use super::shared;
use crate::client::RecordClient;
use crate::error::RecordResult;
use crate::models::{Entity, Patient, PatientDraft, PatientStatus};
use crate::store::{Condition, FetchQuery, Record, WhereGroup};
use chrono::Utc;
use serde_json::Value;
use ward_types::RecordId;

#[derive(Clone, Debug)]
pub struct PatientRepository {
    client: RecordClient,
}

impl PatientRepository {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    fn query() -> FetchQuery {
        FetchQuery::new(Patient::FIELDS)
    }

    pub async fn get_all(&self) -> RecordResult<Vec<Patient>> {
        shared::fetch_all(&self.client, "get_all", Self::query()).await
    }

    pub async fn get_by_id(&self, id: RecordId) -> RecordResult<Patient> {
        shared::fetch_one(&self.client, id).await
    }

    /// Create a patient. Status defaults to `Stable` and the admission date to today.
    pub async fn create(&self, draft: &PatientDraft) -> RecordResult<Patient> {
        let mut draft = draft.clone();
        draft.status.get_or_insert(PatientStatus::Stable);
        draft
            .admission_date
            .get_or_insert_with(|| Utc::now().date_naive());

        let record = draft.to_record()?;
        let patient: Patient = shared::create_one(&self.client, record).await?;
        tracing::info!(id = %patient.id, "created patient");
        Ok(patient)
    }

    pub async fn update(&self, id: RecordId, draft: &PatientDraft) -> RecordResult<Patient> {
        shared::update_one(&self.client, id, draft.to_record()?).await
    }

    pub async fn delete(&self, id: RecordId) -> RecordResult<()> {
        shared::delete_one::<Patient>(&self.client, id).await?;
        tracing::info!(%id, "deleted patient");
        Ok(())
    }

    /// Patients whose name, business id or contact contains `text`.
    pub async fn search(&self, text: &str) -> RecordResult<Vec<Patient>> {
        let text = text.trim();
        let query = Self::query().group(WhereGroup::any_of(
            ["name_c", "id_c", "contact_c"].map(|field| Condition::contains(field, text)),
        ));
        shared::fetch_all(&self.client, "search", query).await
    }

    pub async fn get_by_status(&self, status: PatientStatus) -> RecordResult<Vec<Patient>> {
        let query = Self::query().filter(Condition::equal_to("status_c", status.as_str()));
        shared::fetch_all(&self.client, "get_by_status", query).await
    }

    /// Write the patient's ward and bed number; `None` clears both.
    pub(crate) async fn set_placement(
        &self,
        id: RecordId,
        placement: Option<(&str, &str)>,
        guard: &[Condition],
    ) -> RecordResult<Patient> {
        let (ward, bed) = match placement {
            Some((ward, bed)) => (Value::from(ward), Value::from(bed)),
            None => (Value::Null, Value::Null),
        };
        let mut changes = Record::new();
        changes.insert("current_ward_c".into(), ward);
        changes.insert("bed_number_c".into(), bed);

        shared::update_one_if(&self.client, "set_placement", id, changes, guard).await
    }
}
