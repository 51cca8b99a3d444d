//! Appointment records and their `appointment_c` wire form.

use super::{wire, Entity};
use crate::aliases::{self, APPOINTMENT_ALIASES};
use crate::constants::{APPOINTMENT_FIELDS, APPOINTMENT_TABLE};
use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use ward_types::RecordId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Appointment {
    #[schema(value_type = i64)]
    pub id: RecordId,
    pub business_id: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub patient_id: Option<RecordId>,
    /// `Id` of the staff member seeing the patient.
    #[schema(value_type = Option<i64>)]
    pub doctor_id: Option<RecordId>,
    pub department: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub appointment_type: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub business_id: Option<String>,
    pub patient_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub department: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub appointment_type: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn from_json(input: Value) -> RecordResult<Self> {
        let record = aliases::normalise(input, APPOINTMENT_ALIASES)?;
        let row: AppointmentRow = wire::decode_input("appointment", record)?;

        Ok(Self {
            business_id: row.business_id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            department: row.department,
            date_time: row.date_time,
            duration_minutes: row.duration_minutes,
            appointment_type: row.appointment_type,
            status: row.status,
            notes: row.notes,
        })
    }

    /// `"{type} - {patient}"`, leaving out whichever part is unknown. `None` when neither is
    /// set, so an update that touches neither keeps the stored name.
    fn display_name(&self) -> Option<String> {
        let patient = self.patient_id.map(|id| id.to_string());
        match (self.appointment_type.as_deref(), patient) {
            (Some(kind), Some(patient)) => Some(format!("{kind} - {patient}")),
            (Some(kind), None) => Some(kind.to_owned()),
            (None, Some(patient)) => Some(patient),
            (None, None) => None,
        }
    }

    pub(crate) fn to_record(&self) -> RecordResult<Record> {
        wire::encode(&AppointmentWrite {
            display_name: self.display_name(),
            business_id: self.business_id.as_deref(),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            department: self.department.as_deref(),
            date_time: self.date_time.map(wire::datetime_to_wire),
            duration_minutes: self.duration_minutes,
            appointment_type: self.appointment_type.as_deref(),
            status: self.status.as_deref(),
            notes: self.notes.as_deref(),
        })
    }
}

/// Parse one end of an appointment date range.
///
/// Accepts a timestamp, or a bare `YYYY-MM-DD` that stands for the whole day: its first
/// second when `end_of_range` is false, its last second otherwise.
pub fn parse_range_bound(text: &str, end_of_range: bool) -> RecordResult<DateTime<Utc>> {
    if let Ok(day) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
        let (h, m, s) = if end_of_range { (23, 59, 59) } else { (0, 0, 0) };
        if let Some(at) = day.and_hms_opt(h, m, s) {
            return Ok(at.and_utc());
        }
    }
    wire::parse_datetime(text)
        .ok_or_else(|| RecordError::InvalidInput(format!("'{text}' is not a date or timestamp")))
}

impl Entity for Appointment {
    const TABLE: &'static str = APPOINTMENT_TABLE;
    const FIELDS: &'static [&'static str] = APPOINTMENT_FIELDS;
    const PLURAL: &'static str = "appointments";

    fn from_record(record: Record) -> RecordResult<Self> {
        let row: AppointmentRow = wire::decode(APPOINTMENT_TABLE, record)?;
        Ok(Appointment {
            id: row.id.ok_or_else(|| {
                RecordError::Malformed(format!("{APPOINTMENT_TABLE} row has no Id"))
            })?,
            business_id: row.business_id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            department: row.department,
            date_time: row.date_time,
            duration_minutes: row.duration_minutes,
            appointment_type: row.appointment_type,
            status: row.status,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct AppointmentRow {
    #[serde(rename = "Id", default, deserialize_with = "wire::opt_lookup")]
    id: Option<RecordId>,
    #[serde(rename = "id_c", default, deserialize_with = "wire::opt_text")]
    business_id: Option<String>,
    #[serde(rename = "patient_id_c", default, deserialize_with = "wire::opt_lookup")]
    patient_id: Option<RecordId>,
    #[serde(rename = "doctor_id_c", default, deserialize_with = "wire::opt_lookup")]
    doctor_id: Option<RecordId>,
    #[serde(rename = "department_c", default, deserialize_with = "wire::opt_text")]
    department: Option<String>,
    #[serde(rename = "date_time_c", default, deserialize_with = "wire::opt_datetime")]
    date_time: Option<DateTime<Utc>>,
    #[serde(rename = "duration_c", default, deserialize_with = "wire::opt_u32")]
    duration_minutes: Option<u32>,
    #[serde(rename = "type_c", default, deserialize_with = "wire::opt_text")]
    appointment_type: Option<String>,
    #[serde(rename = "status_c", default, deserialize_with = "wire::opt_text")]
    status: Option<String>,
    #[serde(rename = "notes_c", default, deserialize_with = "wire::opt_text")]
    notes: Option<String>,
}

#[derive(Serialize)]
struct AppointmentWrite<'a> {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(rename = "id_c", skip_serializing_if = "Option::is_none")]
    business_id: Option<&'a str>,
    #[serde(rename = "patient_id_c", skip_serializing_if = "Option::is_none")]
    patient_id: Option<RecordId>,
    #[serde(rename = "doctor_id_c", skip_serializing_if = "Option::is_none")]
    doctor_id: Option<RecordId>,
    #[serde(rename = "department_c", skip_serializing_if = "Option::is_none")]
    department: Option<&'a str>,
    #[serde(rename = "date_time_c", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(rename = "duration_c", skip_serializing_if = "Option::is_none")]
    duration_minutes: Option<u32>,
    #[serde(rename = "type_c", skip_serializing_if = "Option::is_none")]
    appointment_type: Option<&'a str>,
    #[serde(rename = "status_c", skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(rename = "notes_c", skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}
