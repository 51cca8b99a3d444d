//! Constants used throughout the ward core crate.
//!
//! Table names, store field names and configuration defaults live here so the
//! repositories, the alias boundary and the in-memory store agree on spelling.

/// Table holding patient records.
pub const PATIENT_TABLE: &str = "patient_c";

/// Table holding bed records.
pub const BED_TABLE: &str = "bed_c";

/// Table holding appointment records.
pub const APPOINTMENT_TABLE: &str = "appointment_c";

/// Table holding staff records.
pub const STAFF_TABLE: &str = "staff_c";

/// Store-assigned identifier column, present on every table.
pub const ID_FIELD: &str = "Id";

/// Display column, present on every table.
pub const NAME_FIELD: &str = "Name";

/// Default request timeout for the hosted record store.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default appointment length in minutes when none is supplied on create.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

/// Status given to appointments created without one.
pub const DEFAULT_APPOINTMENT_STATUS: &str = "Scheduled";

/// Separator used when a set of strings is stored in a single text column.
pub const LIST_SEPARATOR: char = '\n';

/// Patient projection, in the order the store returns it.
pub const PATIENT_FIELDS: &[&str] = &[
    "Name",
    "id_c",
    "name_c",
    "date_of_birth_c",
    "gender_c",
    "contact_c",
    "emergency_contact_c",
    "blood_type_c",
    "allergies_c",
    "current_ward_c",
    "bed_number_c",
    "status_c",
    "admission_date_c",
    "chief_complaint_c",
    "triage_priority_c",
    "vital_signs_blood_pressure_c",
    "vital_signs_heart_rate_c",
    "vital_signs_temperature_c",
    "vital_signs_respiratory_rate_c",
    "vital_signs_oxygen_saturation_c",
];

/// Bed projection.
pub const BED_FIELDS: &[&str] = &[
    "Name",
    "id_c",
    "ward_c",
    "number_c",
    "type_c",
    "status_c",
    "patient_id_c",
    "last_cleaned_c",
];

/// Appointment projection.
pub const APPOINTMENT_FIELDS: &[&str] = &[
    "Name",
    "id_c",
    "patient_id_c",
    "doctor_id_c",
    "department_c",
    "date_time_c",
    "duration_c",
    "type_c",
    "status_c",
    "notes_c",
];

/// Staff projection.
pub const STAFF_FIELDS: &[&str] = &[
    "Name",
    "id_c",
    "name_c",
    "role_c",
    "department_c",
    "shift_c",
    "contact_c",
    "specialization_c",
];
