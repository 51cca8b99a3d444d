use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_core::{
    parse_range_bound, Appointment, Bed, NonEmptyText, Patient, PatientDraft, PatientStatus,
    RecordClient, RecordId, Repositories, Staff, StoreConfig, StoreEnv,
};

#[derive(Parser)]
#[command(name = "ward")]
#[command(about = "Ward records CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Patient records
    #[command(subcommand)]
    Patients(PatientCommand),
    /// Beds and bed assignment
    #[command(subcommand)]
    Beds(BedCommand),
    /// Appointments
    #[command(subcommand)]
    Appointments(AppointmentCommand),
    /// Staff directory
    #[command(subcommand)]
    Staff(StaffCommand),
}

#[derive(Subcommand)]
enum PatientCommand {
    /// List all patients
    List,
    /// Show one patient
    Get { id: RecordId },
    /// Match name, patient ID or contact
    Search { query: String },
    /// List patients with a status (Stable, Critical, Discharged)
    Status { status: PatientStatus },
    /// Register a patient
    Create(CreatePatient),
    /// Delete a patient
    Delete { id: RecordId },
}

#[derive(Args)]
struct CreatePatient {
    /// Full name
    name: String,
    /// Hospital patient ID
    #[arg(long)]
    patient_id: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    dob: Option<NaiveDate>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    emergency_contact: Option<String>,
    #[arg(long)]
    blood_type: Option<String>,
    /// Repeat for each allergy
    #[arg(long = "allergy")]
    allergies: Vec<String>,
    #[arg(long)]
    status: Option<PatientStatus>,
    #[arg(long)]
    complaint: Option<String>,
    #[arg(long)]
    triage: Option<String>,
}

#[derive(Subcommand)]
enum BedCommand {
    /// List all beds
    List,
    /// List beds on a ward
    Ward { ward: String },
    /// List available beds
    Available,
    /// List occupied beds
    Occupied,
    /// Put a patient in a bed
    Assign { bed_id: RecordId, patient_id: RecordId },
    /// Discharge the occupant of a bed
    Release { bed_id: RecordId },
}

#[derive(Subcommand)]
enum AppointmentCommand {
    /// Appointments scheduled today (UTC)
    Today,
    /// Appointments between two dates or timestamps, inclusive
    Range { from: String, to: String },
    /// Appointments for a department
    Department { department: String },
}

#[derive(Subcommand)]
enum StaffCommand {
    /// List all staff
    List,
    /// Staff with a role
    Role { role: String },
    /// Staff working a shift
    Shift { shift: String },
    /// Staff in a department
    Department { department: String },
}

fn or_na(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "N/A".into(), |v| v.to_string())
}

/// One-line patient card.
fn patient_card(patient: &Patient) -> String {
    let mut line = format!(
        "ID: {}, Name: {}, Status: {}, DOB: {}, Contact: {}",
        patient.id,
        patient.name,
        or_na(patient.status),
        or_na(patient.date_of_birth),
        or_na(patient.contact.as_deref()),
    );
    if let Some((ward, bed)) = patient.placement() {
        line.push_str(&format!(", Ward: {ward}, Bed: {bed}"));
    }
    line
}

fn bed_line(bed: &Bed) -> String {
    let mut line = format!(
        "ID: {}, Ward: {}, Bed: {}, Status: {}",
        bed.id, bed.ward, bed.number, bed.status
    );
    if let Some(patient_id) = bed.patient_id {
        line.push_str(&format!(", Patient: {patient_id}"));
    }
    line
}

fn appointment_line(appointment: &Appointment) -> String {
    format!(
        "ID: {}, When: {}, Department: {}, Type: {}, Patient: {}, Status: {}",
        appointment.id,
        or_na(appointment.date_time.map(|at| at.format("%Y-%m-%d %H:%M"))),
        or_na(appointment.department.as_deref()),
        or_na(appointment.appointment_type.as_deref()),
        or_na(appointment.patient_id),
        or_na(appointment.status.as_deref()),
    )
}

fn staff_line(member: &Staff) -> String {
    format!(
        "ID: {}, Name: {}, Role: {}, Department: {}, Shift: {}",
        member.id,
        member.name,
        or_na(member.role.as_deref()),
        or_na(member.department.as_deref()),
        or_na(member.shift.as_deref()),
    )
}

fn print_all<T>(items: &[T], what: &str, line: fn(&T) -> String) {
    if items.is_empty() {
        println!("No {what} found.");
    } else {
        for item in items {
            println!("{}", line(item));
        }
    }
}

impl CreatePatient {
    fn into_draft(self) -> anyhow::Result<PatientDraft> {
        let mut draft = PatientDraft::new(NonEmptyText::new(&self.name)?);
        draft.business_id = self.patient_id;
        draft.date_of_birth = self.dob;
        draft.gender = self.gender;
        draft.contact = self.contact;
        draft.emergency_contact = self.emergency_contact;
        draft.blood_type = self.blood_type;
        if !self.allergies.is_empty() {
            draft.allergies = Some(self.allergies.into_iter().collect::<BTreeSet<_>>());
        }
        draft.status = self.status;
        draft.chief_complaint = self.complaint;
        draft.triage_priority = self.triage;
        Ok(draft)
    }
}

async fn run(repos: &Repositories, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Patients(cmd) => match cmd {
            PatientCommand::List => {
                print_all(&repos.patients.get_all().await?, "patients", patient_card)
            }
            PatientCommand::Get { id } => {
                println!("{}", patient_card(&repos.patients.get_by_id(id).await?))
            }
            PatientCommand::Search { query } => {
                print_all(&repos.patients.search(&query).await?, "patients", patient_card)
            }
            PatientCommand::Status { status } => print_all(
                &repos.patients.get_by_status(status).await?,
                "patients",
                patient_card,
            ),
            PatientCommand::Create(args) => {
                let patient = repos.patients.create(&args.into_draft()?).await?;
                println!("Created {}", patient_card(&patient));
            }
            PatientCommand::Delete { id } => {
                repos.patients.delete(id).await?;
                println!("Deleted patient {id}");
            }
        },
        Commands::Beds(cmd) => match cmd {
            BedCommand::List => print_all(&repos.beds.get_all().await?, "beds", bed_line),
            BedCommand::Ward { ward } => {
                print_all(&repos.beds.get_by_ward(&ward).await?, "beds", bed_line)
            }
            BedCommand::Available => {
                print_all(&repos.beds.get_available_beds().await?, "beds", bed_line)
            }
            BedCommand::Occupied => {
                print_all(&repos.beds.get_occupied_beds().await?, "beds", bed_line)
            }
            BedCommand::Assign { bed_id, patient_id } => {
                let bed = repos.assignments.assign_patient(bed_id, patient_id).await?;
                println!("Assigned {}", bed_line(&bed));
            }
            BedCommand::Release { bed_id } => {
                let bed = repos.assignments.release_patient(bed_id).await?;
                println!("Released {}", bed_line(&bed));
            }
        },
        Commands::Appointments(cmd) => {
            let appointments = match cmd {
                AppointmentCommand::Today => repos.appointments.get_todays_appointments().await?,
                AppointmentCommand::Range { from, to } => {
                    let start = parse_range_bound(&from, false)?;
                    let end = parse_range_bound(&to, true)?;
                    repos.appointments.get_by_date_range(start, end).await?
                }
                AppointmentCommand::Department { department } => {
                    repos.appointments.get_by_department(&department).await?
                }
            };
            print_all(&appointments, "appointments", appointment_line);
        }
        Commands::Staff(cmd) => {
            let staff = match cmd {
                StaffCommand::List => repos.staff.get_all().await?,
                StaffCommand::Role { role } => repos.staff.get_by_role(&role).await?,
                StaffCommand::Shift { shift } => repos.staff.get_by_shift(&shift).await?,
                StaffCommand::Department { department } => {
                    repos.staff.get_by_department(&department).await?
                }
            };
            print_all(&staff, "staff", staff_line);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ward=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'ward --help' for commands");
        return Ok(());
    };

    let store = StoreConfig::from_env(StoreEnv::from_process_env())?.open()?;
    let repos = Repositories::new(RecordClient::with_tracing(store));

    run(&repos, command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::Arc;
    use ward_core::InMemoryRecordStore;

    fn sample_patient() -> Patient {
        Patient {
            id: RecordId::new(42).unwrap(),
            business_id: Some("P-042".into()),
            name: "John Smith".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 5, 1),
            gender: None,
            contact: None,
            emergency_contact: None,
            blood_type: None,
            allergies: BTreeSet::new(),
            current_ward: None,
            bed_number: None,
            status: Some(PatientStatus::Critical),
            admission_date: None,
            chief_complaint: None,
            triage_priority: None,
            vital_signs: Default::default(),
        }
    }

    #[test]
    fn patient_card_fills_gaps_with_na() {
        let mut patient = sample_patient();
        assert_eq!(
            patient_card(&patient),
            "ID: 42, Name: John Smith, Status: Critical, DOB: 1970-05-01, Contact: N/A"
        );

        patient.current_ward = Some("ICU".into());
        patient.bed_number = Some("101".into());
        patient.date_of_birth = None;
        assert_eq!(
            patient_card(&patient),
            "ID: 42, Name: John Smith, Status: Critical, DOB: N/A, Contact: N/A, Ward: ICU, Bed: 101"
        );
    }

    #[test]
    fn every_subcommand_has_help_text() {
        let cli = Cli::command();
        for group in cli.get_subcommands() {
            assert!(group.get_about().is_some(), "{} has no help", group.get_name());
            for command in group.get_subcommands() {
                assert!(
                    command.get_about().is_some(),
                    "{} {} has no help",
                    group.get_name(),
                    command.get_name()
                );
            }
        }
    }

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from(["ward", "beds", "assign", "7", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Beds(BedCommand::Assign { bed_id, patient_id }))
                if bed_id.get() == 7 && patient_id.get() == 42
        ));

        assert!(Cli::try_parse_from(["ward", "beds", "assign", "0", "42"]).is_err());
        assert!(Cli::try_parse_from(["ward", "patients", "status", "Unwell"]).is_err());
    }

    #[tokio::test]
    async fn create_with_allergies_then_assign() {
        let repos = Repositories::new(RecordClient::with_tracing(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let cli = Cli::try_parse_from([
            "ward", "patients", "create", "Ann Lee", "--allergy", "Latex", "--allergy",
            "Penicillin",
        ])
        .unwrap();
        run(&repos, cli.command.unwrap()).await.unwrap();

        let patients = repos.patients.get_all().await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].allergies.len(), 2);
        assert_eq!(patients[0].status, Some(PatientStatus::Stable));
    }
}
