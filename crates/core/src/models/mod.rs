//! Domain types for the four record kinds and their translation to and from store rows.
//!
//! Each entity module follows the same layout:
//! - public domain types (`Patient`, `PatientDraft`, ...)
//! - private wire types mirroring the store's `_c` column names
//! - translation helpers between the two
//!
//! Reads are lenient about representation (numbers as strings, lookup objects in place of
//! ids) because the store is not consistent about it. Writes always use one canonical form.

pub mod appointment;
pub mod bed;
pub mod patient;
pub mod staff;
pub(crate) mod wire;

pub use appointment::{parse_range_bound, Appointment, AppointmentDraft};
pub use bed::{Bed, BedDraft, BedStatus};
pub use patient::{Patient, PatientDraft, PatientStatus, VitalSigns};
pub use staff::{Staff, StaffDraft};

use crate::error::RecordResult;
use crate::store::Record;

/// A record kind stored in its own table.
pub trait Entity: Sized {
    /// Store table name.
    const TABLE: &'static str;
    /// Fixed projection requested on every read.
    const FIELDS: &'static [&'static str];
    /// Lower-case plural used in log lines ("patients", "beds").
    const PLURAL: &'static str;

    /// Decode one store row.
    fn from_record(record: Record) -> RecordResult<Self>;
}
