//! Appointment repository.
//!
//! Appointment times are stored as RFC 3339 UTC strings, so date filters compare text:
//! a range is two inclusive bounds and "on a day" is a `YYYY-MM-DD` prefix.

use super::shared;
use crate::client::RecordClient;
use crate::constants::{DEFAULT_APPOINTMENT_MINUTES, DEFAULT_APPOINTMENT_STATUS};
use crate::error::RecordResult;
use crate::models::wire::{date_to_wire, datetime_to_wire};
use crate::models::{Appointment, AppointmentDraft, Entity};
use crate::store::{Condition, FetchQuery};
use chrono::{DateTime, NaiveDate, Utc};
use ward_types::RecordId;

#[derive(Clone, Debug)]
pub struct AppointmentRepository {
    client: RecordClient,
}

impl AppointmentRepository {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    fn query() -> FetchQuery {
        FetchQuery::new(Appointment::FIELDS)
    }

    pub async fn get_all(&self) -> RecordResult<Vec<Appointment>> {
        shared::fetch_all(&self.client, "get_all", Self::query()).await
    }

    pub async fn get_by_id(&self, id: RecordId) -> RecordResult<Appointment> {
        shared::fetch_one(&self.client, id).await
    }

    /// Create an appointment, 30 minutes long and `Scheduled` unless the draft says otherwise.
    pub async fn create(&self, draft: &AppointmentDraft) -> RecordResult<Appointment> {
        let mut draft = draft.clone();
        draft
            .duration_minutes
            .get_or_insert(DEFAULT_APPOINTMENT_MINUTES);
        draft
            .status
            .get_or_insert_with(|| DEFAULT_APPOINTMENT_STATUS.to_owned());

        let appointment: Appointment =
            shared::create_one(&self.client, draft.to_record()?).await?;
        tracing::info!(id = %appointment.id, "created appointment");
        Ok(appointment)
    }

    /// Update an appointment. Absent fields are left unchanged.
    ///
    /// The display name is built from type and patient, so when only one of them changes the
    /// other is read back from the stored appointment.
    pub async fn update(
        &self,
        id: RecordId,
        draft: &AppointmentDraft,
    ) -> RecordResult<Appointment> {
        let mut draft = draft.clone();
        if draft.appointment_type.is_some() != draft.patient_id.is_some() {
            let current = self.get_by_id(id).await?;
            draft.appointment_type = draft.appointment_type.or(current.appointment_type);
            draft.patient_id = draft.patient_id.or(current.patient_id);
        }
        shared::update_one(&self.client, id, draft.to_record()?).await
    }

    pub async fn delete(&self, id: RecordId) -> RecordResult<()> {
        shared::delete_one::<Appointment>(&self.client, id).await
    }

    /// Appointments with `start <= date_time <= end`.
    pub async fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RecordResult<Vec<Appointment>> {
        let query = Self::query()
            .filter(Condition::at_least("date_time_c", datetime_to_wire(start)))
            .filter(Condition::at_most("date_time_c", datetime_to_wire(end)));
        shared::fetch_all(&self.client, "get_by_date_range", query).await
    }

    pub async fn get_by_department(&self, department: &str) -> RecordResult<Vec<Appointment>> {
        let query = Self::query().filter(Condition::equal_to("department_c", department));
        shared::fetch_all(&self.client, "get_by_department", query).await
    }

    /// Appointments on `date` (UTC).
    pub async fn get_on_date(&self, date: NaiveDate) -> RecordResult<Vec<Appointment>> {
        let query = Self::query().filter(Condition::starts_with("date_time_c", date_to_wire(date)));
        shared::fetch_all(&self.client, "get_on_date", query).await
    }

    pub async fn get_todays_appointments(&self) -> RecordResult<Vec<Appointment>> {
        self.get_on_date(Utc::now().date_naive()).await
    }
}
