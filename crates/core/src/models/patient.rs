//! Patient records and their `patient_c` wire form.
//!
//! Responsibilities:
//! - Define the domain-level [`Patient`] returned by reads
//! - Define [`PatientDraft`], the only shape accepted by create and update
//! - Translate between both and the store's flat `_c` columns
//!
//! Notes:
//! - Allergies are a set; the store keeps them as newline-joined text
//! - Ward and bed placement are owned by bed assignment and never written from a draft

use super::{wire, Entity};
use crate::aliases::{self, PATIENT_ALIASES};
use crate::constants::{LIST_SEPARATOR, PATIENT_FIELDS, PATIENT_TABLE};
use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use ward_types::{NonEmptyText, RecordId};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Clinical status of a patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PatientStatus {
    Stable,
    Critical,
    Discharged,
}

impl PatientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Stable => "Stable",
            PatientStatus::Critical => "Critical",
            PatientStatus::Discharged => "Discharged",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = RecordError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(PatientStatus::Stable),
            "critical" => Ok(PatientStatus::Critical),
            "discharged" => Ok(PatientStatus::Discharged),
            _ => Err(RecordError::InvalidInput(format!(
                "unknown patient status '{s}'"
            ))),
        }
    }
}

/// Most recent observations. Every reading is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSigns {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub temperature: Option<f64>,
    pub respiratory_rate: Option<u32>,
    pub oxygen_saturation: Option<u32>,
}

/// A patient as stored.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Patient {
    #[schema(value_type = i64)]
    pub id: RecordId,
    /// Human-facing identifier (`id_c`), distinct from the store's `Id`.
    pub business_id: Option<String>,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub allergies: BTreeSet<String>,
    pub current_ward: Option<String>,
    pub bed_number: Option<String>,
    pub status: Option<PatientStatus>,
    pub admission_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub triage_priority: Option<String>,
    pub vital_signs: VitalSigns,
}

impl Patient {
    /// `(ward, bed number)` when the patient has been placed in a bed.
    pub fn placement(&self) -> Option<(&str, &str)> {
        match (&self.current_ward, &self.bed_number) {
            (Some(ward), Some(bed)) => Some((ward.as_str(), bed.as_str())),
            _ => None,
        }
    }
}

/// Fields submitted on create or update. `None` leaves a column untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientDraft {
    pub business_id: Option<String>,
    pub name: NonEmptyText,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<BTreeSet<String>>,
    pub status: Option<PatientStatus>,
    pub admission_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub triage_priority: Option<String>,
    pub vital_signs: VitalSigns,
}

impl PatientDraft {
    pub fn new(name: NonEmptyText) -> Self {
        Self {
            business_id: None,
            name,
            date_of_birth: None,
            gender: None,
            contact: None,
            emergency_contact: None,
            blood_type: None,
            allergies: None,
            status: None,
            admission_date: None,
            chief_complaint: None,
            triage_priority: None,
            vital_signs: VitalSigns::default(),
        }
    }

    /// Build a draft from caller JSON using native or legacy field names.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if the name is missing or any field has the wrong
    /// shape (a non-numeric heart rate, an unknown status, an unparseable date).
    pub fn from_json(input: Value) -> RecordResult<Self> {
        let record = aliases::normalise(input, PATIENT_ALIASES)?;
        let row: PatientRow = wire::decode_input("patient", record)?;
        if row.current_ward.is_some() || row.bed_number.is_some() {
            tracing::debug!("ignoring patient placement in input; it is set by bed assignment");
        }

        let vital_signs = row.vital_signs();
        let name = row
            .name
            .ok_or_else(|| RecordError::InvalidInput("patient name is required".into()))
            .and_then(|n| {
                NonEmptyText::new(n)
                    .map_err(|_| RecordError::InvalidInput("patient name is required".into()))
            })?;

        Ok(Self {
            business_id: row.business_id,
            name,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            contact: row.contact,
            emergency_contact: row.emergency_contact,
            blood_type: row.blood_type,
            allergies: row.allergies,
            status: row.status,
            admission_date: row.admission_date,
            chief_complaint: row.chief_complaint,
            triage_priority: row.triage_priority,
            vital_signs,
        })
    }

    pub(crate) fn to_record(&self) -> RecordResult<Record> {
        if let Some(bad) = self
            .allergies
            .iter()
            .flatten()
            .find(|a| a.contains(LIST_SEPARATOR))
        {
            return Err(RecordError::InvalidInput(format!(
                "allergy {bad:?} must not contain a line break"
            )));
        }

        wire::encode(&PatientWrite {
            display_name: self.name.as_str(),
            business_id: self.business_id.as_deref(),
            name: self.name.as_str(),
            date_of_birth: self.date_of_birth.map(wire::date_to_wire),
            gender: self.gender.as_deref(),
            contact: self.contact.as_deref(),
            emergency_contact: self.emergency_contact.as_deref(),
            blood_type: self.blood_type.as_deref(),
            allergies: self.allergies.as_ref().map(wire::list_to_wire),
            status: self.status.map(PatientStatus::as_str),
            admission_date: self.admission_date.map(wire::date_to_wire),
            chief_complaint: self.chief_complaint.as_deref(),
            triage_priority: self.triage_priority.as_deref(),
            blood_pressure: self.vital_signs.blood_pressure.as_deref(),
            heart_rate: self.vital_signs.heart_rate,
            temperature: self.vital_signs.temperature,
            respiratory_rate: self.vital_signs.respiratory_rate,
            oxygen_saturation: self.vital_signs.oxygen_saturation,
        })
    }
}

impl Entity for Patient {
    const TABLE: &'static str = PATIENT_TABLE;
    const FIELDS: &'static [&'static str] = PATIENT_FIELDS;
    const PLURAL: &'static str = "patients";

    fn from_record(record: Record) -> RecordResult<Self> {
        wire::decode::<PatientRow>(PATIENT_TABLE, record)?.into_patient()
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// One `patient_c` row, or caller input after alias normalisation.
#[derive(Debug, Default, Deserialize)]
struct PatientRow {
    #[serde(rename = "Id", default, deserialize_with = "wire::opt_lookup")]
    id: Option<RecordId>,
    #[serde(rename = "Name", default, deserialize_with = "wire::opt_text")]
    display_name: Option<String>,
    #[serde(rename = "id_c", default, deserialize_with = "wire::opt_text")]
    business_id: Option<String>,
    #[serde(rename = "name_c", default, deserialize_with = "wire::opt_text")]
    name: Option<String>,
    #[serde(rename = "date_of_birth_c", default, deserialize_with = "wire::opt_date")]
    date_of_birth: Option<NaiveDate>,
    #[serde(rename = "gender_c", default, deserialize_with = "wire::opt_text")]
    gender: Option<String>,
    #[serde(rename = "contact_c", default, deserialize_with = "wire::opt_text")]
    contact: Option<String>,
    #[serde(rename = "emergency_contact_c", default, deserialize_with = "wire::opt_text")]
    emergency_contact: Option<String>,
    #[serde(rename = "blood_type_c", default, deserialize_with = "wire::opt_text")]
    blood_type: Option<String>,
    #[serde(rename = "allergies_c", default, deserialize_with = "wire::opt_list")]
    allergies: Option<BTreeSet<String>>,
    #[serde(rename = "current_ward_c", default, deserialize_with = "wire::opt_text")]
    current_ward: Option<String>,
    #[serde(rename = "bed_number_c", default, deserialize_with = "wire::opt_text")]
    bed_number: Option<String>,
    #[serde(rename = "status_c", default, deserialize_with = "wire::opt_parsed")]
    status: Option<PatientStatus>,
    #[serde(rename = "admission_date_c", default, deserialize_with = "wire::opt_date")]
    admission_date: Option<NaiveDate>,
    #[serde(rename = "chief_complaint_c", default, deserialize_with = "wire::opt_text")]
    chief_complaint: Option<String>,
    #[serde(rename = "triage_priority_c", default, deserialize_with = "wire::opt_text")]
    triage_priority: Option<String>,
    #[serde(
        rename = "vital_signs_blood_pressure_c",
        default,
        deserialize_with = "wire::opt_text"
    )]
    blood_pressure: Option<String>,
    #[serde(
        rename = "vital_signs_heart_rate_c",
        default,
        deserialize_with = "wire::opt_u32"
    )]
    heart_rate: Option<u32>,
    #[serde(
        rename = "vital_signs_temperature_c",
        default,
        deserialize_with = "wire::opt_f64"
    )]
    temperature: Option<f64>,
    #[serde(
        rename = "vital_signs_respiratory_rate_c",
        default,
        deserialize_with = "wire::opt_u32"
    )]
    respiratory_rate: Option<u32>,
    #[serde(
        rename = "vital_signs_oxygen_saturation_c",
        default,
        deserialize_with = "wire::opt_u32"
    )]
    oxygen_saturation: Option<u32>,
}

impl PatientRow {
    fn vital_signs(&self) -> VitalSigns {
        VitalSigns {
            blood_pressure: self.blood_pressure.clone(),
            heart_rate: self.heart_rate,
            temperature: self.temperature,
            respiratory_rate: self.respiratory_rate,
            oxygen_saturation: self.oxygen_saturation,
        }
    }

    fn into_patient(self) -> RecordResult<Patient> {
        let vital_signs = self.vital_signs();
        let id = self
            .id
            .ok_or_else(|| RecordError::Malformed(format!("{PATIENT_TABLE} row has no Id")))?;

        Ok(Patient {
            id,
            business_id: self.business_id,
            name: self.name.or(self.display_name).unwrap_or_default(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            contact: self.contact,
            emergency_contact: self.emergency_contact,
            blood_type: self.blood_type,
            allergies: self.allergies.unwrap_or_default(),
            current_ward: self.current_ward,
            bed_number: self.bed_number,
            status: self.status,
            admission_date: self.admission_date,
            chief_complaint: self.chief_complaint,
            triage_priority: self.triage_priority,
            vital_signs,
        })
    }
}

#[derive(Serialize)]
struct PatientWrite<'a> {
    #[serde(rename = "Name")]
    display_name: &'a str,
    #[serde(rename = "id_c", skip_serializing_if = "Option::is_none")]
    business_id: Option<&'a str>,
    #[serde(rename = "name_c")]
    name: &'a str,
    #[serde(rename = "date_of_birth_c", skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<String>,
    #[serde(rename = "gender_c", skip_serializing_if = "Option::is_none")]
    gender: Option<&'a str>,
    #[serde(rename = "contact_c", skip_serializing_if = "Option::is_none")]
    contact: Option<&'a str>,
    #[serde(rename = "emergency_contact_c", skip_serializing_if = "Option::is_none")]
    emergency_contact: Option<&'a str>,
    #[serde(rename = "blood_type_c", skip_serializing_if = "Option::is_none")]
    blood_type: Option<&'a str>,
    #[serde(rename = "allergies_c", skip_serializing_if = "Option::is_none")]
    allergies: Option<String>,
    #[serde(rename = "status_c", skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(rename = "admission_date_c", skip_serializing_if = "Option::is_none")]
    admission_date: Option<String>,
    #[serde(rename = "chief_complaint_c", skip_serializing_if = "Option::is_none")]
    chief_complaint: Option<&'a str>,
    #[serde(rename = "triage_priority_c", skip_serializing_if = "Option::is_none")]
    triage_priority: Option<&'a str>,
    #[serde(
        rename = "vital_signs_blood_pressure_c",
        skip_serializing_if = "Option::is_none"
    )]
    blood_pressure: Option<&'a str>,
    #[serde(rename = "vital_signs_heart_rate_c", skip_serializing_if = "Option::is_none")]
    heart_rate: Option<u32>,
    #[serde(
        rename = "vital_signs_temperature_c",
        skip_serializing_if = "Option::is_none"
    )]
    temperature: Option<f64>,
    #[serde(
        rename = "vital_signs_respiratory_rate_c",
        skip_serializing_if = "Option::is_none"
    )]
    respiratory_rate: Option<u32>,
    #[serde(
        rename = "vital_signs_oxygen_saturation_c",
        skip_serializing_if = "Option::is_none"
    )]
    oxygen_saturation: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn decodes_a_store_row() {
        let patient = Patient::from_record(record(json!({
            "Id": 7,
            "Name": "Jane Smith",
            "name_c": "Jane Smith",
            "date_of_birth_c": "1980-05-02",
            "allergies_c": "Penicillin\nLatex",
            "status_c": "Critical",
            "vital_signs_heart_rate_c": "88",
            "vital_signs_temperature_c": 38.2,
            "current_ward_c": "ICU",
            "bed_number_c": "101"
        })))
        .unwrap();

        assert_eq!(patient.id.get(), 7);
        assert_eq!(patient.status, Some(PatientStatus::Critical));
        assert_eq!(patient.date_of_birth, NaiveDate::from_ymd_opt(1980, 5, 2));
        assert!(patient.allergies.contains("Latex"));
        assert_eq!(patient.vital_signs.heart_rate, Some(88));
        assert_eq!(patient.placement(), Some(("ICU", "101")));
    }

    #[test]
    fn name_falls_back_to_display_column() {
        let patient =
            Patient::from_record(record(json!({"Id": 3, "Name": "John Doe", "name_c": ""})))
                .unwrap();
        assert_eq!(patient.name, "John Doe");
    }

    #[test]
    fn row_without_id_is_malformed() {
        let err = Patient::from_record(record(json!({"name_c": "x"}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn legacy_json_builds_a_draft() {
        let draft = PatientDraft::from_json(json!({
            "name": "Jane Smith",
            "dateOfBirth": "1980-05-02",
            "allergies": ["Penicillin", "Latex"],
            "status": "stable",
            "vitalSigns": {"heartRate": "72", "oxygenSaturation": 98, "bloodPressure": "118/76"}
        }))
        .unwrap();

        assert_eq!(draft.name.as_str(), "Jane Smith");
        assert_eq!(draft.status, Some(PatientStatus::Stable));
        assert_eq!(draft.vital_signs.heart_rate, Some(72));
        assert_eq!(draft.vital_signs.oxygen_saturation, Some(98));
        assert_eq!(draft.vital_signs.blood_pressure.as_deref(), Some("118/76"));
        assert_eq!(draft.allergies.as_ref().map(BTreeSet::len), Some(2));
    }

    #[test]
    fn non_numeric_vitals_are_rejected() {
        let err = PatientDraft::from_json(json!({
            "name_c": "Jane",
            "vital_signs_heart_rate_c": "fast"
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("vital_signs_heart_rate_c"));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = PatientDraft::from_json(json!({"contact_c": "555"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn draft_record_only_carries_set_fields() {
        let mut draft = PatientDraft::new(NonEmptyText::new("Jane").unwrap());
        draft.allergies = Some(BTreeSet::from(["Latex".to_owned(), "Penicillin".to_owned()]));
        draft.vital_signs.temperature = Some(36.6);

        let record = draft.to_record().unwrap();
        assert_eq!(record["Name"], "Jane");
        assert_eq!(record["name_c"], "Jane");
        assert_eq!(record["allergies_c"], "Latex\nPenicillin");
        assert_eq!(record["vital_signs_temperature_c"], 36.6);
        assert!(!record.contains_key("status_c"));
        assert!(!record.contains_key("current_ward_c"));
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn allergy_with_line_break_is_rejected_on_write() {
        let mut draft = PatientDraft::new(NonEmptyText::new("Jane").unwrap());
        draft.allergies = Some(BTreeSet::from(["Penicillin\nLatex".to_owned()]));
        let err = draft.to_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
