//! Bed records and their `bed_c` wire form.
//!
//! A bed's occupant (`patient_id_c`) and the `Occupied` status are only ever written by
//! bed assignment, so neither appears in [`BedDraft`].

use super::{wire, Entity};
use crate::aliases::{self, BED_ALIASES};
use crate::constants::{BED_FIELDS, BED_TABLE, ID_FIELD};
use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use ward_types::{NonEmptyText, RecordId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BedStatus {
    Available,
    Occupied,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BedStatus::Available => "Available",
            BedStatus::Occupied => "Occupied",
            BedStatus::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(BedStatus::Available),
            "occupied" => Ok(BedStatus::Occupied),
            "maintenance" => Ok(BedStatus::Maintenance),
            _ => Err(RecordError::InvalidInput(format!("unknown bed status '{s}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Bed {
    #[schema(value_type = i64)]
    pub id: RecordId,
    pub business_id: Option<String>,
    pub ward: String,
    pub number: String,
    pub bed_type: Option<String>,
    pub status: BedStatus,
    /// `Id` of the occupying patient.
    #[schema(value_type = Option<i64>)]
    pub patient_id: Option<RecordId>,
    pub last_cleaned: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedDraft {
    pub business_id: Option<String>,
    pub ward: NonEmptyText,
    pub number: NonEmptyText,
    pub bed_type: Option<String>,
    /// `Available` or `Maintenance`.
    pub status: Option<BedStatus>,
    pub last_cleaned: Option<DateTime<Utc>>,
}

impl BedDraft {
    pub fn new(ward: NonEmptyText, number: NonEmptyText) -> Self {
        Self {
            business_id: None,
            ward,
            number,
            bed_type: None,
            status: None,
            last_cleaned: None,
        }
    }

    /// Build a draft from caller JSON using native or legacy field names.
    pub fn from_json(input: Value) -> RecordResult<Self> {
        let record = aliases::normalise(input, BED_ALIASES)?;
        let row: BedRow = wire::decode_input("bed", record)?;
        if row.patient_id.is_some() {
            tracing::debug!("ignoring bed occupant in input; it is set by bed assignment");
        }

        let required = |value: Option<String>, what: &str| {
            value
                .and_then(|v| NonEmptyText::new(v).ok())
                .ok_or_else(|| RecordError::InvalidInput(format!("bed {what} is required")))
        };

        Ok(Self {
            business_id: row.business_id,
            ward: required(row.ward, "ward")?,
            number: required(row.number, "number")?,
            bed_type: row.bed_type,
            status: row.status,
            last_cleaned: row.last_cleaned,
        })
    }

    pub(crate) fn to_record(&self) -> RecordResult<Record> {
        if self.status == Some(BedStatus::Occupied) {
            return Err(RecordError::InvalidInput(
                "a bed becomes Occupied only by assigning a patient".into(),
            ));
        }
        wire::encode(&BedWrite {
            display_name: self.number.as_str(),
            business_id: self.business_id.as_deref(),
            ward: self.ward.as_str(),
            number: self.number.as_str(),
            bed_type: self.bed_type.as_deref(),
            status: self.status.map(BedStatus::as_str),
            last_cleaned: self.last_cleaned.map(wire::datetime_to_wire),
        })
    }
}

/// Changes written by assignment and release: status and occupant always, cleaning time
/// when given. A `None` occupant is written as null.
pub(crate) fn occupancy_record(
    id: RecordId,
    status: BedStatus,
    patient_id: Option<RecordId>,
    last_cleaned: Option<DateTime<Utc>>,
) -> RecordResult<Record> {
    let mut record = wire::encode(&OccupancyWrite {
        status: status.as_str(),
        patient_id,
        last_cleaned: last_cleaned.map(wire::datetime_to_wire),
    })?;
    record.insert(ID_FIELD.to_owned(), Value::from(id.get()));
    Ok(record)
}

impl Entity for Bed {
    const TABLE: &'static str = BED_TABLE;
    const FIELDS: &'static [&'static str] = BED_FIELDS;
    const PLURAL: &'static str = "beds";

    fn from_record(record: Record) -> RecordResult<Self> {
        let row: BedRow = wire::decode(BED_TABLE, record)?;
        let missing = |what: &str| RecordError::Malformed(format!("{BED_TABLE} row has no {what}"));

        Ok(Bed {
            id: row.id.ok_or_else(|| missing("Id"))?,
            business_id: row.business_id,
            ward: row.ward.unwrap_or_default(),
            number: row.number.or(row.display_name).unwrap_or_default(),
            bed_type: row.bed_type,
            status: row.status.ok_or_else(|| missing("status_c"))?,
            patient_id: row.patient_id,
            last_cleaned: row.last_cleaned,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct BedRow {
    #[serde(rename = "Id", default, deserialize_with = "wire::opt_lookup")]
    id: Option<RecordId>,
    #[serde(rename = "Name", default, deserialize_with = "wire::opt_text")]
    display_name: Option<String>,
    #[serde(rename = "id_c", default, deserialize_with = "wire::opt_text")]
    business_id: Option<String>,
    #[serde(rename = "ward_c", default, deserialize_with = "wire::opt_text")]
    ward: Option<String>,
    #[serde(rename = "number_c", default, deserialize_with = "wire::opt_text")]
    number: Option<String>,
    #[serde(rename = "type_c", default, deserialize_with = "wire::opt_text")]
    bed_type: Option<String>,
    #[serde(rename = "status_c", default, deserialize_with = "wire::opt_parsed")]
    status: Option<BedStatus>,
    #[serde(rename = "patient_id_c", default, deserialize_with = "wire::opt_lookup")]
    patient_id: Option<RecordId>,
    #[serde(rename = "last_cleaned_c", default, deserialize_with = "wire::opt_datetime")]
    last_cleaned: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct BedWrite<'a> {
    #[serde(rename = "Name")]
    display_name: &'a str,
    #[serde(rename = "id_c", skip_serializing_if = "Option::is_none")]
    business_id: Option<&'a str>,
    #[serde(rename = "ward_c")]
    ward: &'a str,
    #[serde(rename = "number_c")]
    number: &'a str,
    #[serde(rename = "type_c", skip_serializing_if = "Option::is_none")]
    bed_type: Option<&'a str>,
    #[serde(rename = "status_c", skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(rename = "last_cleaned_c", skip_serializing_if = "Option::is_none")]
    last_cleaned: Option<String>,
}

#[derive(Serialize)]
struct OccupancyWrite {
    #[serde(rename = "status_c")]
    status: &'static str,
    #[serde(rename = "patient_id_c")]
    patient_id: Option<RecordId>,
    #[serde(rename = "last_cleaned_c", skip_serializing_if = "Option::is_none")]
    last_cleaned: Option<String>,
}
