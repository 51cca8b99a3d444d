//! Staff records and their `staff_c` wire form.

use super::{wire, Entity};
use crate::aliases::{self, STAFF_ALIASES};
use crate::constants::{STAFF_FIELDS, STAFF_TABLE};
use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use ward_types::{NonEmptyText, RecordId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Staff {
    #[schema(value_type = i64)]
    pub id: RecordId,
    pub business_id: Option<String>,
    pub name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub contact: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaffDraft {
    pub business_id: Option<String>,
    pub name: NonEmptyText,
    pub role: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub contact: Option<String>,
    pub specialization: Option<String>,
}

impl StaffDraft {
    pub fn new(name: NonEmptyText) -> Self {
        Self {
            business_id: None,
            name,
            role: None,
            department: None,
            shift: None,
            contact: None,
            specialization: None,
        }
    }

    pub fn from_json(input: Value) -> RecordResult<Self> {
        let record = aliases::normalise(input, STAFF_ALIASES)?;
        let row: StaffRow = wire::decode_input("staff", record)?;
        let name = row
            .name
            .and_then(|n| NonEmptyText::new(n).ok())
            .ok_or_else(|| RecordError::InvalidInput("staff name is required".into()))?;

        Ok(Self {
            business_id: row.business_id,
            name,
            role: row.role,
            department: row.department,
            shift: row.shift,
            contact: row.contact,
            specialization: row.specialization,
        })
    }

    pub(crate) fn to_record(&self) -> RecordResult<Record> {
        wire::encode(&StaffWrite {
            display_name: self.name.as_str(),
            business_id: self.business_id.as_deref(),
            name: self.name.as_str(),
            role: self.role.as_deref(),
            department: self.department.as_deref(),
            shift: self.shift.as_deref(),
            contact: self.contact.as_deref(),
            specialization: self.specialization.as_deref(),
        })
    }
}

impl Entity for Staff {
    const TABLE: &'static str = STAFF_TABLE;
    const FIELDS: &'static [&'static str] = STAFF_FIELDS;
    const PLURAL: &'static str = "staff";

    fn from_record(record: Record) -> RecordResult<Self> {
        let row: StaffRow = wire::decode(STAFF_TABLE, record)?;
        Ok(Staff {
            id: row
                .id
                .ok_or_else(|| RecordError::Malformed(format!("{STAFF_TABLE} row has no Id")))?,
            business_id: row.business_id,
            name: row.name.or(row.display_name).unwrap_or_default(),
            role: row.role,
            department: row.department,
            shift: row.shift,
            contact: row.contact,
            specialization: row.specialization,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct StaffRow {
    #[serde(rename = "Id", default, deserialize_with = "wire::opt_lookup")]
    id: Option<RecordId>,
    #[serde(rename = "Name", default, deserialize_with = "wire::opt_text")]
    display_name: Option<String>,
    #[serde(rename = "id_c", default, deserialize_with = "wire::opt_text")]
    business_id: Option<String>,
    #[serde(rename = "name_c", default, deserialize_with = "wire::opt_text")]
    name: Option<String>,
    #[serde(rename = "role_c", default, deserialize_with = "wire::opt_text")]
    role: Option<String>,
    #[serde(rename = "department_c", default, deserialize_with = "wire::opt_text")]
    department: Option<String>,
    #[serde(rename = "shift_c", default, deserialize_with = "wire::opt_text")]
    shift: Option<String>,
    #[serde(rename = "contact_c", default, deserialize_with = "wire::opt_text")]
    contact: Option<String>,
    #[serde(rename = "specialization_c", default, deserialize_with = "wire::opt_text")]
    specialization: Option<String>,
}

#[derive(Serialize)]
struct StaffWrite<'a> {
    #[serde(rename = "Name")]
    display_name: &'a str,
    #[serde(rename = "id_c", skip_serializing_if = "Option::is_none")]
    business_id: Option<&'a str>,
    #[serde(rename = "name_c")]
    name: &'a str,
    #[serde(rename = "role_c", skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(rename = "department_c", skip_serializing_if = "Option::is_none")]
    department: Option<&'a str>,
    #[serde(rename = "shift_c", skip_serializing_if = "Option::is_none")]
    shift: Option<&'a str>,
    #[serde(rename = "contact_c", skip_serializing_if = "Option::is_none")]
    contact: Option<&'a str>,
    #[serde(rename = "specialization_c", skip_serializing_if = "Option::is_none")]
    specialization: Option<&'a str>,
}
