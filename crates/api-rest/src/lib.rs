//! # API REST
//!
//! REST API for the ward record store.
//!
//! Handles:
//! - HTTP endpoints with axum, one route group per record table
//! - Bed assignment and release
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//! - OpenAPI documentation served at `/api-docs/openapi.json` with Swagger UI at `/swagger-ui`
//!
//! All record access goes through `ward-core` repositories; this crate only maps HTTP onto
//! them.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use ward_core::{Appointment, Bed, BedStatus, Patient, PatientStatus, Repositories, Staff, VitalSigns};

use handlers::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        search_patients,
        get_patient,
        create_patient,
        update_patient,
        delete_patient,
        list_beds,
        available_beds,
        occupied_beds,
        get_bed,
        create_bed,
        update_bed,
        delete_bed,
        assign_bed,
        release_bed,
        list_appointments,
        todays_appointments,
        get_appointment,
        create_appointment,
        update_appointment,
        delete_appointment,
        list_staff,
        get_staff,
        create_staff,
        update_staff,
        delete_staff,
    ),
    components(schemas(
        Patient,
        PatientStatus,
        VitalSigns,
        Bed,
        BedStatus,
        Appointment,
        Staff,
    )),
    tags(
        (name = "patients", description = "Patient records"),
        (name = "beds", description = "Beds and bed assignment"),
        (name = "appointments", description = "Appointments"),
        (name = "staff", description = "Staff records"),
    )
)]
pub struct ApiDoc;

/// Shared state for every request handler.
#[derive(Clone)]
pub struct AppState {
    repos: Repositories,
}

/// Build the full REST router over `repos`.
pub fn router(repos: Repositories) -> Router {
    let state = AppState { repos };

    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/beds", get(list_beds).post(create_bed))
        .route("/beds/available", get(available_beds))
        .route("/beds/occupied", get(occupied_beds))
        .route("/beds/:id", get(get_bed).put(update_bed).delete(delete_bed))
        .route("/beds/:id/assign", post(assign_bed))
        .route("/beds/:id/release", post(release_bed))
        .route(
            "/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route("/appointments/today", get(todays_appointments))
        .route(
            "/appointments/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/staff", get(list_staff).post(create_staff))
        .route(
            "/staff/:id",
            get(get_staff).put(update_staff).delete(delete_staff),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use ward_core::{
        InMemoryRecordStore, RecordClient, RemoteStoreConfig, StoreConfig,
    };

    fn app() -> Router {
        let client = RecordClient::with_tracing(Arc::new(InMemoryRecordStore::new()));
        router(Repositories::new(client))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_alive() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn openapi_document_lists_every_route() {
        let (status, doc) = send(&app(), "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);

        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/patients/{id}",
            "/beds/{id}/assign",
            "/beds/{id}/release",
            "/appointments/today",
            "/staff",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["paths"]["/beds/{id}"]["put"]["responses"]["409"].is_object());

        let schemas = &doc["components"]["schemas"];
        assert_eq!(schemas["Bed"]["properties"]["id"]["type"], "integer");
        assert!(schemas["BedStatus"]["enum"]
            .as_array()
            .unwrap()
            .contains(&json!("Occupied")));
    }

    #[tokio::test]
    async fn legacy_patient_json_is_created_and_read_back() {
        let app = app();
        let (status, created) = send(
            &app,
            "POST",
            "/patients",
            Some(json!({
                "name": "Jane Smith",
                "dateOfBirth": "1980-02-01",
                "allergies": ["penicillin", "latex"],
                "vitalSigns": {"heartRate": "88", "bloodPressure": "120/80"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "Stable");
        assert_eq!(created["vital_signs"]["heart_rate"], 88);

        let id = created["id"].as_i64().unwrap();
        let (status, fetched) = send(&app, "GET", &format!("/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Jane Smith");
        assert_eq!(fetched["date_of_birth"], "1980-02-01");

        let (status, found) = send(&app, "GET", "/patients/search?q=smith", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_ids_and_bad_input_are_client_errors() {
        let app = app();

        let (status, body) = send(&app, "GET", "/patients/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");

        let (status, body) = send(&app, "GET", "/patients/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(
            &app,
            "POST",
            "/patients",
            Some(json!({"name": "Ann", "vitalSigns": {"heartRate": "fast"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/patients?status=Unwell", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bed_assignment_round_trip() {
        let app = app();
        let (_, bed) = send(&app, "POST", "/beds", Some(json!({"ward": "ICU", "number": "101"}))).await;
        let (_, patient) = send(&app, "POST", "/patients", Some(json!({"name": "Sam Jones"}))).await;
        let bed_id = bed["id"].as_i64().unwrap();
        let patient_id = patient["id"].as_i64().unwrap();

        let (status, assigned) = send(
            &app,
            "POST",
            &format!("/beds/{bed_id}/assign"),
            Some(json!({"patientId": patient_id.to_string()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(assigned["status"], "Occupied");
        assert_eq!(assigned["patient_id"], patient_id);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/beds/{bed_id}/assign"),
            Some(json!({"patient_id": patient_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (_, placed) = send(&app, "GET", &format!("/patients/{patient_id}"), None).await;
        assert_eq!(placed["current_ward"], "ICU");
        assert_eq!(placed["bed_number"], "101");

        let (status, _) = send(&app, "DELETE", &format!("/beds/{bed_id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, released) =
            send(&app, "POST", &format!("/beds/{bed_id}/release"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(released["status"], "Available");
        assert_eq!(released["patient_id"], Value::Null);

        let (status, _) = send(&app, "DELETE", &format!("/beds/{bed_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn assign_requires_a_patient_id() {
        let app = app();
        let (_, bed) = send(&app, "POST", "/beds", Some(json!({"ward": "A", "number": "1"}))).await;
        let bed_id = bed["id"].as_i64().unwrap();

        let (status, _) = send(&app, "POST", &format!("/beds/{bed_id}/assign"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bed_filters() {
        let app = app();
        send(&app, "POST", "/beds", Some(json!({"ward": "ICU", "number": "1"}))).await;
        send(&app, "POST", "/beds", Some(json!({"ward": "ICU", "number": "2", "status": "Maintenance"}))).await;
        send(&app, "POST", "/beds", Some(json!({"ward": "Maternity", "number": "1"}))).await;

        let (_, icu) = send(&app, "GET", "/beds?ward=ICU", None).await;
        assert_eq!(icu.as_array().unwrap().len(), 2);

        let (_, available) = send(&app, "GET", "/beds/available", None).await;
        assert_eq!(available.as_array().unwrap().len(), 2);

        let (_, occupied) = send(&app, "GET", "/beds/occupied", None).await;
        assert!(occupied.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn appointment_date_range_covers_whole_days() {
        let app = app();
        for at in ["2026-10-15T23:00:00Z", "2026-10-16T09:00:00Z", "2026-10-16T17:30:00Z"] {
            let (status, _) = send(
                &app,
                "POST",
                "/appointments",
                Some(json!({"dateTime": at, "department": "Cardiology"})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, found) =
            send(&app, "GET", "/appointments?from=2026-10-16&to=2026-10-16", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 2);

        let (status, _) = send(&app, "GET", "/appointments?from=2026-10-16", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, cardiology) = send(&app, "GET", "/appointments?department=Cardiology", None).await;
        assert_eq!(cardiology.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn staff_accepts_one_filter_at_a_time() {
        let app = app();
        send(&app, "POST", "/staff", Some(json!({"name": "Dr Grey", "role": "Doctor", "shift": "Night"}))).await;

        let (status, doctors) = send(&app, "GET", "/staff?role=Doctor", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doctors.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", "/staff?role=Doctor&shift=Night", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_store_is_service_unavailable() {
        let cfg = RemoteStoreConfig::new(
            "http://127.0.0.1:9",
            "project",
            "key",
            Duration::from_secs(2),
        )
        .unwrap();
        let store = StoreConfig::Remote(cfg).open().unwrap();
        let app = router(Repositories::new(RecordClient::with_tracing(store)));

        let (status, body) = send(&app, "GET", "/patients", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "transport");
    }
}
