//! Field-name normalisation for JSON input from the outer surfaces.
//!
//! Records may arrive spelled with the store's native `_c` column names or with the older
//! camelCase names (`dateOfBirth`, `vitalSigns.heartRate`, `patientId`). [`normalise`]
//! rewrites either form into native names. When both are present the native value wins;
//! a native value that is null or blank counts as absent.

use crate::error::{RecordError, RecordResult};
use crate::store::Record;
use serde_json::Value;

/// `(native column, legacy path)`. A dotted legacy path reads a nested object.
pub type Alias = (&'static str, &'static str);

pub const PATIENT_ALIASES: &[Alias] = &[
    ("name_c", "name"),
    ("date_of_birth_c", "dateOfBirth"),
    ("gender_c", "gender"),
    ("contact_c", "contact"),
    ("emergency_contact_c", "emergencyContact"),
    ("blood_type_c", "bloodType"),
    ("allergies_c", "allergies"),
    ("current_ward_c", "currentWard"),
    ("bed_number_c", "bedNumber"),
    ("status_c", "status"),
    ("admission_date_c", "admissionDate"),
    ("chief_complaint_c", "chiefComplaint"),
    ("triage_priority_c", "triagePriority"),
    ("vital_signs_blood_pressure_c", "vitalSigns.bloodPressure"),
    ("vital_signs_heart_rate_c", "vitalSigns.heartRate"),
    ("vital_signs_temperature_c", "vitalSigns.temperature"),
    ("vital_signs_respiratory_rate_c", "vitalSigns.respiratoryRate"),
    ("vital_signs_oxygen_saturation_c", "vitalSigns.oxygenSaturation"),
];

pub const BED_ALIASES: &[Alias] = &[
    ("ward_c", "ward"),
    ("number_c", "number"),
    ("type_c", "type"),
    ("status_c", "status"),
    ("patient_id_c", "patientId"),
    ("last_cleaned_c", "lastCleaned"),
];

pub const APPOINTMENT_ALIASES: &[Alias] = &[
    ("patient_id_c", "patientId"),
    ("doctor_id_c", "doctorId"),
    ("department_c", "department"),
    ("date_time_c", "dateTime"),
    ("duration_c", "duration"),
    ("type_c", "type"),
    ("status_c", "status"),
    ("notes_c", "notes"),
];

pub const STAFF_ALIASES: &[Alias] = &[
    ("name_c", "name"),
    ("role_c", "role"),
    ("department_c", "department"),
    ("shift_c", "shift"),
    ("contact_c", "contact"),
    ("specialization_c", "specialization"),
];

/// Rewrite `input` so every aliased field uses its native column name.
///
/// Legacy keys are removed from the result; unrelated keys pass through untouched.
///
/// # Errors
///
/// Returns `RecordError::InvalidInput` if `input` is not a JSON object.
pub fn normalise(input: Value, aliases: &[Alias]) -> RecordResult<Record> {
    let Value::Object(mut record) = input else {
        return Err(RecordError::InvalidInput(
            "record input must be a JSON object".into(),
        ));
    };

    for (native, legacy) in aliases {
        if is_present(record.get(*native)) {
            continue;
        }
        let found = lookup(&record, legacy)
            .filter(|v| is_present(Some(*v)))
            .cloned();
        if let Some(value) = found {
            record.insert((*native).to_owned(), value);
        }
    }

    for (_, legacy) in aliases {
        let root = legacy.split('.').next().unwrap_or(legacy);
        record.remove(root);
    }

    Ok(record)
}

fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_names_are_rewritten_to_native() {
        let record = normalise(
            json!({
                "name": "Jane Smith",
                "dateOfBirth": "1980-05-02",
                "vitalSigns": {"heartRate": "72", "temperature": 37.1},
                "Id": 4
            }),
            PATIENT_ALIASES,
        )
        .unwrap();

        assert_eq!(record["name_c"], "Jane Smith");
        assert_eq!(record["date_of_birth_c"], "1980-05-02");
        assert_eq!(record["vital_signs_heart_rate_c"], "72");
        assert_eq!(record["vital_signs_temperature_c"], 37.1);
        assert_eq!(record["Id"], 4);
        assert!(!record.contains_key("name"));
        assert!(!record.contains_key("vitalSigns"));
    }

    #[test]
    fn native_value_wins_unless_blank() {
        let record = normalise(
            json!({"ward_c": "ICU", "ward": "ER", "number_c": "", "number": "101"}),
            BED_ALIASES,
        )
        .unwrap();
        assert_eq!(record["ward_c"], "ICU");
        assert_eq!(record["number_c"], "101");
    }

    #[test]
    fn rejects_non_objects() {
        let err = normalise(json!(["name"]), STAFF_ALIASES).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
