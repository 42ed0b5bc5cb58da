//! End-to-end flow against a running server + database.
//!
//! Run with: cargo test --features e2e -- --test-threads=1
//! The server must be listening on E2E_BASE_URL (default
//! http://127.0.0.1:3000) with SMTP unset so verification codes can be
//! read straight from the pending_users table by a helper admin, or with
//! a known master token exported as E2E_MASTER_TOKEN.

use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

static BASE_URL: Lazy<String> =
    Lazy::new(|| std::env::var("E2E_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into()));

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.clone(),
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    /// A unique 7-digit student ID derived from the clock.
    fn student_id(timestamp: u64) -> String {
        format!("{}", 1_000_000 + (timestamp % 8_999_999))
    }

    /// A unique 10-digit RFID with the mandatory leading zero.
    fn rfid(timestamp: u64) -> String {
        format!("0{:09}", timestamp % 1_000_000_000)
    }
}

#[tokio::test]
async fn registration_rejects_malformed_identifiers() {
    let context = TestContext::new();
    let timestamp = TestContext::get_timestamp();

    let response = context
        .client
        .post(format!("{}/api/auth/register", context.base_url))
        .json(&json!({
            "name": "Bad Ids",
            "email": format!("bad_{}@campus.edu", timestamp),
            "password": "SecurePass123",
            "student_id": "0123456",
            "phone": "01712345678",
            "rfid_card_number": "0123456789"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400, "leading-zero student ID must be rejected");
}

#[tokio::test]
async fn register_then_login_redirects_to_verification() {
    let context = TestContext::new();
    let timestamp = TestContext::get_timestamp();
    let email = format!("student_{}@campus.edu", timestamp);

    let reg_response = context
        .client
        .post(format!("{}/api/auth/register", context.base_url))
        .json(&json!({
            "name": "Test Student",
            "email": email,
            "password": "SecurePass123",
            "student_id": TestContext::student_id(timestamp),
            "phone": "01712345678",
            "rfid_card_number": TestContext::rfid(timestamp)
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(reg_response.status().as_u16(), 201, "Registration failed");
    let reg_body: Value = reg_response.json().await.unwrap();
    assert_eq!(reg_body["success"], true);

    // Login before verification must signal the redirect, not a
    // credential error.
    let login_response = context
        .client
        .post(format!("{}/api/auth/login", context.base_url))
        .json(&json!({
            "email": email,
            "password": "SecurePass123"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(login_response.status().as_u16(), 403);
    let login_body: Value = login_response.json().await.unwrap();
    assert_eq!(login_body["code"], "needs_verification");
}

#[tokio::test]
async fn kiosk_lookup_miss_is_structured_not_a_crash() {
    let context = TestContext::new();

    let response = context
        .client
        .get(format!(
            "{}/api/print/public/jobs/student/0999999999",
            context.base_url
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string(), "kiosk errors must be structured JSON");
}

#[tokio::test]
async fn kiosk_lookup_rejects_malformed_identifier() {
    let context = TestContext::new();

    let response = context
        .client
        .get(format!(
            "{}/api/print/public/jobs/student/12345678901",
            context.base_url
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn upload_requires_authentication() {
    let context = TestContext::new();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"%PDF-1.4 minimal".to_vec())
            .file_name("test.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );

    let response = context
        .client
        .post(format!("{}/api/print/upload", context.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn completing_an_unknown_job_is_not_found() {
    let context = TestContext::new();

    let response = context
        .client
        .post(format!(
            "{}/api/print/public/jobs/00000000-0000-0000-0000-000000000000/complete",
            context.base_url
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}
