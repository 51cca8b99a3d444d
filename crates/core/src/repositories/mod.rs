//! Repositories over the four record tables, plus the bed-assignment workflow.
//!
//! Every repository is built from a [`RecordClient`]; [`Repositories`] builds the full set
//! from one client so surfaces can hold a single value.

pub mod appointment;
pub mod assignment;
pub mod bed;
pub mod patient;
mod shared;
pub mod staff;

pub use appointment::AppointmentRepository;
pub use assignment::BedAssignmentService;
pub use bed::BedRepository;
pub use patient::PatientRepository;
pub use staff::StaffRepository;

use crate::client::RecordClient;

#[derive(Clone, Debug)]
pub struct Repositories {
    pub patients: PatientRepository,
    pub beds: BedRepository,
    pub appointments: AppointmentRepository,
    pub staff: StaffRepository,
    pub assignments: BedAssignmentService,
}

impl Repositories {
    pub fn new(client: RecordClient) -> Self {
        Self {
            patients: PatientRepository::new(client.clone()),
            beds: BedRepository::new(client.clone()),
            appointments: AppointmentRepository::new(client.clone()),
            staff: StaffRepository::new(client.clone()),
            assignments: BedAssignmentService::new(client),
        }
    }
}
