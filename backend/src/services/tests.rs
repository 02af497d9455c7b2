use super::configure;
use crate::accounts::token::TokenSigner;
use crate::accounts::Accounts;
use crate::catalog::TemplateCatalog;
use crate::db::Database;
use crate::lifecycle::SubmissionLifecycle;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::storage::LocalDocumentStore;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use taxdesk_common::model::user::Role;
use taxdesk_common::requests::{CreateUserRequest, EnrollRequest};

const BOUNDARY: &str = "taxdesk-test-boundary";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MAX_UPLOAD: usize = 4096;

fn app_state(dir: &tempfile::TempDir) -> web::Data<AppState> {
    let db = Database::open_in_memory().unwrap();
    let accounts = Accounts::new(db.clone());
    let store = Arc::new(LocalDocumentStore::new(dir.path(), "http://localhost:8080"));
    let (notifier, _mail) = Notifier::channel(8);
    let lifecycle = SubmissionLifecycle::new(
        db.clone(),
        Arc::new(accounts.clone()),
        store.clone(),
        notifier,
        MAX_UPLOAD,
    );
    web::Data::new(AppState {
        accounts,
        tokens: TokenSigner::new(b"test-secret-0123456789", chrono::Duration::days(7)),
        lifecycle,
        catalog: TemplateCatalog::new(db, store, MAX_UPLOAD),
        max_upload_bytes: MAX_UPLOAD,
    })
}

fn admin_token(state: &AppState) -> String {
    let admin = state
        .accounts
        .create(CreateUserRequest {
            nstin: "9999999999".into(),
            name: "Reviewer".into(),
            email: "reviewer@example.com".into(),
            phone: "08000000000".into(),
            password: "secret1".into(),
            role: Some(Role::Admin),
        })
        .unwrap();
    state.tokens.issue(&admin).unwrap()
}

fn citizen_token(state: &AppState) -> String {
    let user = state
        .accounts
        .enroll(EnrollRequest {
            nstin: "1234567890".into(),
            name: "Ada Obi".into(),
            email: "ada@example.com".into(),
            phone: "08012345678".into(),
            password: "secret1".into(),
        })
        .unwrap();
    state.tokens.issue(&user).unwrap()
}

fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", token))
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, Vec<u8>),
}

fn multipart(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn submission_form(main_len: usize) -> Vec<u8> {
    multipart(vec![
        Part::Text("templateType", "annual_returns"),
        Part::Text("taxPeriod", "2024"),
        Part::File("mainFile", "return.xlsx", XLSX, vec![1u8; main_len]),
        Part::File("supportingDoc", "receipt.png", "image/png", vec![2u8; 16]),
    ])
}

fn multipart_header() -> (actix_web::http::header::HeaderName, String) {
    (
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    )
}

#[actix_web::test]
async fn enroll_login_and_read_own_profile() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

    let enroll = test::TestRequest::post()
        .uri("/api/auth/enroll")
        .set_json(json!({
            "nstin": "1234567890",
            "name": "Ada Obi",
            "email": "Ada@Example.com",
            "phone": "08012345678",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, enroll).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let login = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "nstin": "1234567890", "password": "secret1" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, login).await;
    let token = body["token"].as_str().unwrap().to_string();

    let profile = test::TestRequest::get()
        .uri("/api/users/profile")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, profile).await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("passwordHash").is_none());

    let wrong = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "nstin": "1234567890", "password": "nope123" }))
        .to_request();
    let resp = test::call_service(&app, wrong).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid credentials");
}

#[actix_web::test]
async fn protected_routes_check_token_and_role() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(&dir);
    let token = citizen_token(&state);
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let anonymous = test::TestRequest::get().uri("/api/templates").to_request();
    assert_eq!(
        test::call_service(&app, anonymous).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let forged = test::TestRequest::get()
        .uri("/api/templates")
        .insert_header(bearer("abc.def"))
        .to_request();
    assert_eq!(
        test::call_service(&app, forged).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let not_admin = test::TestRequest::get()
        .uri("/api/admin/dashboard")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, not_admin).await.status(),
        StatusCode::FORBIDDEN
    );

    let types = test::TestRequest::get()
        .uri("/api/templates/types")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, types).await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn submission_is_filed_and_reviewed_once() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(&dir);
    let admin = admin_token(&state);
    let token = citizen_token(&state);
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let create = test::TestRequest::post()
        .uri("/api/submissions")
        .insert_header(bearer(&token))
        .insert_header(multipart_header())
        .set_payload(submission_form(512))
        .to_request();
    let resp = test::call_service(&app, create).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "pending");
    assert!(created["mainFile"]["url"].as_str().unwrap().ends_with(".xlsx"));
    assert!(created["supportingDoc"]["referenceId"]
        .as_str()
        .unwrap()
        .starts_with("tax-submissions/"));
    let id = created["id"].as_str().unwrap().to_string();

    let recent = test::TestRequest::get()
        .uri("/api/submissions/recent")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, recent).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let reject_blank = test::TestRequest::put()
        .uri(&format!("/api/admin/submissions/{}/reject", id))
        .insert_header(bearer(&admin))
        .set_json(json!({ "reviewComments": "" }))
        .to_request();
    let resp = test::call_service(&app, reject_blank).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let approve = test::TestRequest::put()
        .uri(&format!("/api/admin/submissions/{}/approve", id))
        .insert_header(bearer(&admin))
        .set_json(json!({ "reviewComments": "looks good" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, approve).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["reviewComments"], "looks good");
    assert!(body["reviewedAt"].is_string());

    let again = test::TestRequest::put()
        .uri(&format!("/api/admin/submissions/{}/approve", id))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(
        test::call_service(&app, again).await.status(),
        StatusCode::CONFLICT
    );

    let listing = test::TestRequest::get()
        .uri("/api/admin/submissions?status=approved&search=ada")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, listing).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["owner"]["nstin"], "1234567890");

    let dashboard = test::TestRequest::get()
        .uri("/api/admin/dashboard")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, dashboard).await;
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["pendingSubmissions"], 0);
    assert_eq!(body["recentSubmissions"][0]["userName"], "Ada Obi");
}

#[actix_web::test]
async fn malformed_approval_body_is_rejected_without_deciding() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(&dir);
    let admin = admin_token(&state);
    let token = citizen_token(&state);
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let create = test::TestRequest::post()
        .uri("/api/submissions")
        .insert_header(bearer(&token))
        .insert_header(multipart_header())
        .set_payload(submission_form(512))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, create).await;
    let id = created["id"].as_str().unwrap().to_string();

    let truncated = test::TestRequest::put()
        .uri(&format!("/api/admin/submissions/{}/approve", id))
        .insert_header(bearer(&admin))
        .insert_header((CONTENT_TYPE, "application/json"))
        .set_payload(r#"{"reviewComments": "looks good""#)
        .to_request();
    let resp = test::call_service(&app, truncated).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let fetch = test::TestRequest::get()
        .uri(&format!("/api/admin/submissions/{}", id))
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, fetch).await;
    assert_eq!(body["status"], "pending");
    assert!(body.get("reviewComments").is_none());

    let bare = test::TestRequest::put()
        .uri(&format!("/api/admin/submissions/{}/approve", id))
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, bare).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["reviewComments"], "");
}

#[actix_web::test]
async fn oversized_upload_is_413() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(&dir);
    let token = citizen_token(&state);
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let create = test::TestRequest::post()
        .uri("/api/submissions")
        .insert_header(bearer(&token))
        .insert_header(multipart_header())
        .set_payload(submission_form(MAX_UPLOAD + 1))
        .to_request();
    let resp = test::call_service(&app, create).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let recent = test::TestRequest::get()
        .uri("/api/submissions/recent")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, recent).await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn admin_publishes_and_retires_a_template() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(&dir);
    let admin = admin_token(&state);
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let upload = test::TestRequest::post()
        .uri("/api/admin/templates")
        .insert_header(bearer(&admin))
        .insert_header(multipart_header())
        .set_payload(multipart(vec![
            Part::Text("name", "CIT"),
            Part::Text("description", "Company income tax"),
            Part::Text("type", "annual_returns"),
            Part::Text("version", "2024.1"),
            Part::File("file", "cit.pdf", "application/pdf", vec![3u8; 64]),
        ]))
        .to_request();
    let resp = test::call_service(&app, upload).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let template: Value = test::read_body_json(resp).await;
    assert_eq!(template["type"], "annual_returns");
    assert_eq!(template["fileExtension"], "pdf");
    let id = template["id"].as_str().unwrap().to_string();

    let download = test::TestRequest::post()
        .uri("/api/templates/download-log")
        .insert_header(bearer(&admin))
        .set_json(json!({ "templateId": id }))
        .to_request();
    assert_eq!(test::call_service(&app, download).await.status(), StatusCode::OK);

    let retire = test::TestRequest::delete()
        .uri(&format!("/api/admin/templates/{}", id))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, retire).await.status(), StatusCode::OK);

    let count = test::TestRequest::get()
        .uri("/api/templates/count")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, count).await;
    assert_eq!(body["count"], 0);

    let direct = test::TestRequest::get()
        .uri(&format!("/api/templates/{}", id))
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, direct).await;
    assert_eq!(body["isActive"], false);
    assert_eq!(body["downloadCount"], 1);
}
