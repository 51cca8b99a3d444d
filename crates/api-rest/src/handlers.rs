//! Request handlers, one group per record table.
//!
//! Notes:
//! - Path ids are parsed here so a malformed id is a 400 rather than a routing miss.
//! - Bodies are taken as raw JSON and normalised by the core drafts, so both native `_c`
//!   names and the older camelCase names are accepted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use ward_core::{
    parse_range_bound, Appointment, AppointmentDraft, Bed, BedDraft, Patient, PatientDraft,
    PatientStatus, RecordId, Staff, StaffDraft,
};
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;
type Created<T> = (StatusCode, Json<T>);

fn parse_id(raw: &str) -> ApiResult<RecordId> {
    raw.parse::<RecordId>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// HEALTH
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive")
    )
)]
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "ok": true,
        "message": "Ward REST API is alive",
    }))
}

// ============================================================================
// PATIENTS
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientQuery {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/patients",
    tag = "patients",
    params(PatientQuery),
    responses(
        (status = 200, description = "Patients, optionally by status", body = [Patient]),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
/// `GET /patients`, optionally narrowed with `?status=Critical`.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let patients = match non_blank(query.status) {
        Some(status) => {
            let status: PatientStatus = status.parse()?;
            state.repos.patients.get_by_status(status).await?
        }
        None => state.repos.patients.get_all().await?,
    };
    Ok(Json(patients))
}

#[utoipa::path(
    get,
    path = "/patients/search",
    tag = "patients",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching patients", body = [Patient]),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
/// `GET /patients/search?q=Smith` matches name, business id and contact.
#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let text = non_blank(query.q).ok_or_else(|| ApiError::bad_request("q is required"))?;
    Ok(Json(state.repos.patients.search(text.trim()).await?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repos.patients.get_by_id(id).await?))
}

#[utoipa::path(
    post,
    path = "/patients",
    tag = "patients",
    request_body(content = Value, description = "Patient fields by `_c` column or legacy camelCase name"),
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Created<Patient>> {
    let draft = PatientDraft::from_json(body)?;
    let patient = state.repos.patients.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = i64, Path, description = "Record id")),
    request_body(content = Value, description = "Fields to change"),
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Patient>> {
    let id = parse_id(&id)?;
    let draft = PatientDraft::from_json(body)?;
    Ok(Json(state.repos.patients.update(id, &draft).await?))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repos.patients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// BEDS
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BedQuery {
    ward: Option<String>,
}

#[utoipa::path(
    get,
    path = "/beds",
    tag = "beds",
    params(BedQuery),
    responses(
        (status = 200, description = "Beds, optionally by ward", body = [Bed]),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn list_beds(
    State(state): State<AppState>,
    Query(query): Query<BedQuery>,
) -> ApiResult<Json<Vec<Bed>>> {
    let beds = match non_blank(query.ward) {
        Some(ward) => state.repos.beds.get_by_ward(ward.trim()).await?,
        None => state.repos.beds.get_all().await?,
    };
    Ok(Json(beds))
}

#[utoipa::path(
    get,
    path = "/beds/available",
    tag = "beds",
    responses(
        (status = 200, description = "Available beds", body = [Bed]),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn available_beds(State(state): State<AppState>) -> ApiResult<Json<Vec<Bed>>> {
    Ok(Json(state.repos.beds.get_available_beds().await?))
}

#[utoipa::path(
    get,
    path = "/beds/occupied",
    tag = "beds",
    responses(
        (status = 200, description = "Occupied beds", body = [Bed]),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn occupied_beds(State(state): State<AppState>) -> ApiResult<Json<Vec<Bed>>> {
    Ok(Json(state.repos.beds.get_occupied_beds().await?))
}

#[utoipa::path(
    get,
    path = "/beds/{id}",
    tag = "beds",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Bed", body = Bed),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn get_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bed>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repos.beds.get_by_id(id).await?))
}

#[utoipa::path(
    post,
    path = "/beds",
    tag = "beds",
    request_body(content = Value, description = "Bed fields by `_c` column or legacy camelCase name"),
    responses(
        (status = 201, description = "Bed created", body = Bed),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn create_bed(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Created<Bed>> {
    let draft = BedDraft::from_json(body)?;
    let bed = state.repos.beds.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(bed)))
}

#[utoipa::path(
    put,
    path = "/beds/{id}",
    tag = "beds",
    params(("id" = i64, Path, description = "Record id")),
    request_body(content = Value, description = "Fields to change"),
    responses(
        (status = 200, description = "Bed updated", body = Bed),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id"),
        (status = 409, description = "Refused by the record's current state")
    )
)]
#[axum::debug_handler]
pub async fn update_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Bed>> {
    let id = parse_id(&id)?;
    let draft = BedDraft::from_json(body)?;
    Ok(Json(state.repos.beds.update(id, &draft).await?))
}

#[utoipa::path(
    delete,
    path = "/beds/{id}",
    tag = "beds",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 204, description = "Bed deleted"),
        (status = 404, description = "No record with that id"),
        (status = 409, description = "Refused by the record's current state")
    )
)]
#[axum::debug_handler]
pub async fn delete_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repos.beds.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reads `patient_id` (or `patientId`) as a number or a numeric string.
fn patient_id_from(body: &Value) -> ApiResult<RecordId> {
    let raw = body
        .get("patient_id")
        .or_else(|| body.get("patientId"))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::bad_request("patient_id is required"))?;

    match raw {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ApiError::bad_request(format!("patient_id must be an integer, got {n}")))
            .and_then(|v| RecordId::new(v).map_err(|e| ApiError::bad_request(e.to_string()))),
        Value::String(s) => parse_id(s),
        other => Err(ApiError::bad_request(format!(
            "patient_id must be a number, got {other}"
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/beds/{id}/assign",
    tag = "beds",
    params(("id" = i64, Path, description = "Record id")),
    request_body(content = Value, description = r#"`{"patient_id": 42}`"#),
    responses(
        (status = 200, description = "Bed occupied by the patient", body = Bed),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id"),
        (status = 409, description = "Refused by the record's current state")
    )
)]
/// `POST /beds/:id/assign` with `{"patient_id": 42}`.
#[axum::debug_handler]
pub async fn assign_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Bed>> {
    let bed_id = parse_id(&id)?;
    let patient_id = patient_id_from(&body)?;
    let bed = state
        .repos
        .assignments
        .assign_patient(bed_id, patient_id)
        .await?;
    Ok(Json(bed))
}

#[utoipa::path(
    post,
    path = "/beds/{id}/release",
    tag = "beds",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Bed available again", body = Bed),
        (status = 404, description = "No record with that id"),
        (status = 409, description = "Refused by the record's current state")
    )
)]
#[axum::debug_handler]
pub async fn release_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bed>> {
    let bed_id = parse_id(&id)?;
    Ok(Json(state.repos.assignments.release_patient(bed_id).await?))
}

// ============================================================================
// APPOINTMENTS
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    department: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[utoipa::path(
    get,
    path = "/appointments",
    tag = "appointments",
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments, by department or date range", body = [Appointment]),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
/// `GET /appointments`, narrowed with either `?department=` or `?from=&to=`.
///
/// A bare date in `from`/`to` covers the whole day.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<AppointmentQuery>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let repo = &state.repos.appointments;
    let department = non_blank(query.department);
    let range = (non_blank(query.from), non_blank(query.to));

    let appointments = match (department, range) {
        (Some(_), (Some(_), _) | (_, Some(_))) => {
            return Err(ApiError::bad_request(
                "filter by department or by date range, not both",
            ))
        }
        (Some(department), (None, None)) => repo.get_by_department(department.trim()).await?,
        (None, (Some(from), Some(to))) => {
            let start = parse_range_bound(&from, false)?;
            let end = parse_range_bound(&to, true)?;
            if start > end {
                return Err(ApiError::bad_request("from must not be after to"));
            }
            repo.get_by_date_range(start, end).await?
        }
        (None, (Some(_), None) | (None, Some(_))) => {
            return Err(ApiError::bad_request("from and to must be given together"))
        }
        (None, (None, None)) => repo.get_all().await?,
    };
    Ok(Json(appointments))
}

#[utoipa::path(
    get,
    path = "/appointments/today",
    tag = "appointments",
    responses(
        (status = 200, description = "Appointments scheduled today", body = [Appointment]),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn todays_appointments(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(state.repos.appointments.get_todays_appointments().await?))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Appointment>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repos.appointments.get_by_id(id).await?))
}

#[utoipa::path(
    post,
    path = "/appointments",
    tag = "appointments",
    request_body(content = Value, description = "Appointment fields by `_c` column or legacy camelCase name"),
    responses(
        (status = 201, description = "Appointment created", body = Appointment),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Created<Appointment>> {
    let draft = AppointmentDraft::from_json(body)?;
    let appointment = state.repos.appointments.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = i64, Path, description = "Record id")),
    request_body(content = Value, description = "Fields to change"),
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Appointment>> {
    let id = parse_id(&id)?;
    let draft = AppointmentDraft::from_json(body)?;
    Ok(Json(state.repos.appointments.update(id, &draft).await?))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repos.appointments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// STAFF
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StaffQuery {
    department: Option<String>,
    role: Option<String>,
    shift: Option<String>,
}

#[utoipa::path(
    get,
    path = "/staff",
    tag = "staff",
    params(StaffQuery),
    responses(
        (status = 200, description = "Staff, by at most one filter", body = [Staff]),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
/// `GET /staff`, narrowed by at most one of `department`, `role` or `shift`.
#[axum::debug_handler]
pub async fn list_staff(
    State(state): State<AppState>,
    Query(query): Query<StaffQuery>,
) -> ApiResult<Json<Vec<Staff>>> {
    let repo = &state.repos.staff;
    let filters = (
        non_blank(query.department),
        non_blank(query.role),
        non_blank(query.shift),
    );

    let staff = match filters {
        (None, None, None) => repo.get_all().await?,
        (Some(department), None, None) => repo.get_by_department(department.trim()).await?,
        (None, Some(role), None) => repo.get_by_role(role.trim()).await?,
        (None, None, Some(shift)) => repo.get_by_shift(shift.trim()).await?,
        _ => {
            return Err(ApiError::bad_request(
                "filter by one of department, role or shift",
            ))
        }
    };
    Ok(Json(staff))
}

#[utoipa::path(
    get,
    path = "/staff/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Staff member", body = Staff),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn get_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Staff>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repos.staff.get_by_id(id).await?))
}

#[utoipa::path(
    post,
    path = "/staff",
    tag = "staff",
    request_body(content = Value, description = "Staff fields by `_c` column or legacy camelCase name"),
    responses(
        (status = 201, description = "Staff member created", body = Staff),
        (status = 400, description = "Bad request"),
        (status = 503, description = "Record store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn create_staff(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Created<Staff>> {
    let draft = StaffDraft::from_json(body)?;
    let member = state.repos.staff.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    put,
    path = "/staff/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Record id")),
    request_body(content = Value, description = "Fields to change"),
    responses(
        (status = 200, description = "Staff member updated", body = Staff),
        (status = 400, description = "Bad request"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Staff>> {
    let id = parse_id(&id)?;
    let draft = StaffDraft::from_json(body)?;
    Ok(Json(state.repos.staff.update(id, &draft).await?))
}

#[utoipa::path(
    delete,
    path = "/staff/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 204, description = "Staff member deleted"),
        (status = 404, description = "No record with that id")
    )
)]
#[axum::debug_handler]
pub async fn delete_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repos.staff.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
