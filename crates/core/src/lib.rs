//! # Ward Core
//!
//! Record access for the ward management system.
//!
//! This crate contains the data operations only:
//! - Typed patient, bed, appointment and staff records over a hosted record store
//! - Repositories with filtered reads and structured failures
//! - The bed-assignment workflow that keeps beds and patient placement in step
//!
//! **No API concerns**: HTTP routing and command-line handling belong in `api-rest` and
//! `ward-cli`.

pub mod aliases;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod store;

pub use client::RecordClient;
pub use config::{RemoteStoreConfig, StoreConfig, StoreEnv};
pub use error::{ErrorKind, RecordError, RecordResult};
pub use models::{
    parse_range_bound, Appointment, AppointmentDraft, Bed, BedDraft, BedStatus, Patient, PatientDraft,
    PatientStatus, Staff, StaffDraft, VitalSigns,
};
pub use notify::{CollectingNotifier, Notifier, TracingNotifier};
pub use repositories::{
    AppointmentRepository, BedAssignmentService, BedRepository, PatientRepository,
    Repositories, StaffRepository,
};
pub use store::{InMemoryRecordStore, RecordStore};

pub use ward_types::{NonEmptyText, RecordId};
