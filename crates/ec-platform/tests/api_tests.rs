//! HTTP API Integration Tests
//!
//! Requests go through the full router: session layer, page guard,
//! handlers and the JSON envelope.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{RecordingMailer, TestPlatform, PASSWORD};
use ec_platform::appointment::AppointmentStatus;
use ec_platform::build_app;
use ec_platform::user::{Role, User};

fn app(env: &TestPlatform) -> Router {
    build_app(&env.platform()).0
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("auth_token={}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const BOUNDARY: &str = "ec-test-boundary";

/// A form part: field name, optional (file name, content type), content
type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

fn multipart(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((file_name, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    name, file_name, content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, format!("auth_token={}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

struct Actors {
    patient: User,
    doctor: User,
    admin: User,
}

async fn actors(env: &TestPlatform) -> Actors {
    Actors {
        patient: env.add_user("pat@example.com", Role::User, "Pat Doe").await,
        doctor: env.add_user("doc@example.com", Role::Doctor, "Dr Grey").await,
        admin: env.add_user("admin@example.com", Role::Admin, "Admin").await,
    }
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let env = TestPlatform::new();
    actors(&env).await;
    let app = app(&env);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "PAT@example.com", "password": PASSWORD})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let token = cookie
        .trim_start_matches("auth_token=")
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let (status, body) = send(&app, request(Method::GET, "/api/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["email"], "pat@example.com");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let env = TestPlatform::new();
    actors(&env).await;
    let app = app(&env);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "pat@example.com", "password": "wrong-password"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"ok": false, "error": "Invalid credentials"}));

    let (status, body) = send(&app, request(Method::POST, "/api/login", None, Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_role_gating() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let doctor = env.token_for(&a.doctor);
    let patient = env.token_for(&a.patient);

    let (status, body) = send(&app, request(Method::GET, "/api/appointments", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);

    let (status, _) = send(&app, request(Method::GET, "/api/appointments", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/appointments",
            Some(&doctor),
            Some(json!({"doctorId": a.doctor.id, "date": "2030-05-01", "time": "09:00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = send(&app, request(Method::GET, "/api/admin/users", Some(&patient), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::GET, "/api/doctor/appointments", Some(&patient), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_signup_then_duplicate() {
    let env = TestPlatform::new();
    let app = app(&env);
    let form = json!({
        "firstName": "Jane",
        "lastName": "Roe",
        "email": "Jane@Example.com",
        "password": "secret1",
        "confirmPassword": "secret1",
        "terms": "on",
        "gender": "female",
        "dobYear": "1990",
        "dobMonth": "2",
        "dobDay": "14"
    });

    let (status, body) = send(&app, request(Method::POST, "/api/signup", None, Some(form.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["emailSent"], true);
    assert_eq!(env.mailer.sent()[0].to, "jane@example.com");

    let (status, body) = send(&app, request(Method::POST, "/api/signup", None, Some(form))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already exists");
    assert_eq!(env.users.all().len(), 1);
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let patient = env.token_for(&a.patient);
    let doctor = env.token_for(&a.doctor);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/appointments",
            Some(&patient),
            Some(json!({"doctorId": a.doctor.id, "date": "2030-05-01", "time": "09:30", "notes": "Cough"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            "/api/doctor/appointments",
            Some(&doctor),
            Some(json!({"id": id, "action": "approve", "mode": "online"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = send(&app, request(Method::GET, "/api/appointments", Some(&patient), None)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["appointments"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["mode"], "online");
    assert_eq!(list[0]["doctor"]["name"], "Dr Grey");

    let (_, body) = send(&app, request(Method::GET, "/api/notifications", Some(&patient), None)).await;
    assert_eq!(body["unreadCount"], 1);
    assert_eq!(body["notifications"][0]["type"], "appointment");

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            request(Method::PATCH, "/api/notifications", Some(&patient), Some(json!({"markAll": true}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = send(&app, request(Method::GET, "/api/notifications", Some(&patient), None)).await;
    assert_eq!(body["unreadCount"], 0);

    let uri = format!("/api/doctor/patients/{}", a.patient.id);
    let (status, body) = send(&app, request(Method::GET, &uri, Some(&doctor), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["email"], "pat@example.com");
}

#[tokio::test]
async fn test_consultation_form_then_feedback() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let patient = env.token_for(&a.patient);
    let doctor = env.token_for(&a.doctor);

    let (_, body) = send(
        &app,
        request(
            Method::POST,
            "/api/appointments",
            Some(&patient),
            Some(json!({"doctorId": a.doctor.id, "date": "2030-05-01", "time": "09:30"})),
        ),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        multipart(
            "/api/consultations",
            &doctor,
            &[
                ("appointmentId", None, id.as_bytes()),
                ("diagnosis", None, b"  Migraine  "),
                ("followUpDate", None, b"whenever"),
                ("completed", None, b"true"),
                ("files", Some(("scan.png", "image/png")), b"png-bytes"),
                ("files", Some(("lab report.pdf", "application/pdf")), b"pdf-bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    let urls: Vec<String> = body["attachments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u.as_str().unwrap().to_string())
        .collect();
    assert_eq!(urls.len(), 2);
    let prefix = format!("https://blobs.test/consultations/{}-", id);
    assert!(urls.iter().all(|u| u.starts_with(&prefix)));
    assert!(urls[1].ends_with("-1-lab_report.pdf"));

    let stored = env.appointments.get(&id).unwrap();
    assert_eq!(stored.status, AppointmentStatus::Completed);
    let consultation = stored.consultation.unwrap();
    assert_eq!(consultation.diagnosis, "Migraine");
    assert!(consultation.follow_up_date.is_none());
    assert_eq!(consultation.attachments, urls);

    let (_, body) = send(&app, request(Method::GET, "/api/notifications", Some(&patient), None)).await;
    let titles: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Consultation Completed"]);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/feedback", Some(&patient), Some(json!({"appointmentId": id, "rating": 7}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Rating must be between 1 and 5");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/feedback",
            Some(&patient),
            Some(json!({"appointmentId": id, "rating": "4", "comments": "Clear advice"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = env.appointments.get(&id).unwrap();
    assert_eq!(stored.feedback.unwrap().rating, 4);
    assert_eq!(stored.status, AppointmentStatus::Completed);
    assert_eq!(stored.consultation.unwrap().attachments.len(), 2);

    let (_, body) = send(&app, request(Method::GET, "/api/notifications", Some(&doctor), None)).await;
    assert_eq!(body["unreadCount"], 2);
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "New Consultation Feedback"));
}

#[tokio::test]
async fn test_hospital_card_form() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let patient = env.token_for(&a.patient);

    let (status, body) = send(
        &app,
        multipart("/api/card", &patient, &[("image", Some(("me.jpg", "image/jpeg")), b"jpeg")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Address is required");
    assert!(env.blobs.keys().is_empty());

    let (status, body) = send(
        &app,
        multipart(
            "/api/card",
            &patient,
            &[
                ("address", None, b"12 Marina Road"),
                ("image", Some(("me.jpg", "image/jpeg")), b"jpeg"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["card"]["address"], "12 Marina Road");
    let image_url = body["card"]["imageUrl"].as_str().unwrap().to_string();
    assert!(image_url.starts_with(&format!("https://blobs.test/cards/{}-", a.patient.id)));

    let (status, body) = send(&app, request(Method::GET, "/api/card", Some(&patient), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["card"]["imageUrl"], image_url.as_str());

    let card = env.users.get(&a.patient.id).unwrap().hospital_card.unwrap();
    assert_eq!(card.address, "12 Marina Road");

    let (status, _) = send(
        &app,
        multipart("/api/card", &env.token_for(&a.doctor), &[("address", None, b"Clinic")]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_medical_records_over_http() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let patient = env.token_for(&a.patient);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/medical-records", Some(&patient), Some(json!({"notes": "n/a"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Record type is required");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/medical-records",
            Some(&patient),
            Some(json!({"recordType": "Allergy", "notes": " Penicillin "})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["records"][0]["recordType"], "Allergy");
    assert_eq!(body["records"][0]["notes"], "Penicillin");

    let (status, body) = send(
        &app,
        request(Method::PATCH, "/api/medical-records", Some(&patient), Some(json!({"genotype": "as"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["genotype"], "AS");
    assert!(body["bloodGroup"].is_null());

    let (status, _) = send(
        &app,
        request(Method::PATCH, "/api/medical-records", Some(&patient), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        request(Method::PATCH, "/api/medical-records", Some(&patient), Some(json!({"bloodGroup": "O+"}))),
    )
    .await;
    let (status, body) = send(&app, request(Method::GET, "/api/medical-records", Some(&patient), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bloodGroup"], "O+");
    assert_eq!(body["genotype"], "AS");
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_doctor_without_link_cannot_view_patient() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);

    let uri = format!("/api/doctor/patients/{}", a.patient.id);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&env.token_for(&a.doctor)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);
    let admin = env.token_for(&a.admin);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/admin/inventory", Some(&admin), Some(json!({"stock": "10"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/inventory",
            Some(&admin),
            Some(json!({"name": "Paracetamol", "stock": "4", "threshold": 10})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/admin/inventory", Some(&admin), Some(json!({"name": "Amoxicillin"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, request(Method::GET, "/api/inventory", Some(&env.token_for(&a.patient)), None)).await;
    assert_eq!(status, StatusCode::OK);
    let medicines = body["medicines"].as_array().unwrap();
    assert_eq!(medicines[0]["name"], "Amoxicillin");
    assert_eq!(medicines[0]["unitPrice"], 0.0);
    assert_eq!(medicines[0]["stock"], 0.0);
    assert_eq!(medicines[1]["lowStock"], true);
}

#[tokio::test]
async fn test_admin_sees_temp_password_when_email_fails() {
    let env = TestPlatform::with_mailer(RecordingMailer::failing());
    let a = actors(&env).await;
    let app = app(&env);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/doctors",
            Some(&env.token_for(&a.admin)),
            Some(json!({"email": "new.doc@example.com", "name": "Dr New"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emailSent"], false);
    assert!(body["temporaryPassword"].as_str().is_some_and(|p| !p.is_empty()));

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/doctors",
            Some(&env.token_for(&a.admin)),
            Some(json!({"email": "new.doc@example.com"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_page_guard() {
    let env = TestPlatform::new();
    let a = actors(&env).await;
    let app = app(&env);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/dashboard/appointments", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/login?next=%2Fdashboard%2Fappointments"
    );

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/admin", Some(&env.token_for(&a.doctor)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let (status, _) = send(&app, request(Method::GET, "/admin", Some(&env.token_for(&a.admin)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let env = TestPlatform::new();
    let (app, openapi) = build_app(&env.platform());

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");

    assert!(openapi.paths.paths.contains_key("/api/appointments"));
    assert!(openapi.paths.paths.contains_key("/api/admin/users/{id}"));
    let schemes = &openapi.components.as_ref().unwrap().security_schemes;
    assert!(schemes.contains_key("cookie_auth"));
}
