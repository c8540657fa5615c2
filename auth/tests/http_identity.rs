//! HTTP identity service against a mock server.

#![allow(clippy::unwrap_used)]

use faith_connect_auth::{
    ContactMethod, HttpIdentityService, IdentityService, IdentityServiceConfig, OtpError, UserId,
    UserType,
    providers::{ResendCodeRequest, SendCodeRequest, VerifyCodeRequest, VerifyVerdict},
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn service(server: &MockServer) -> HttpIdentityService {
    let config = IdentityServiceConfig::new(format!("{}/api", server.uri()))
        .with_request_timeout(Duration::from_secs(2));
    HttpIdentityService::new(&config).unwrap()
}

#[tokio::test]
async fn test_send_code_posts_contact_and_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/send-otp/"))
        .and(body_json(json!({
            "contact": "amina@example.com",
            "method": "email"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "userId": 42,
            "requiresProfileCompletion": false,
            "message": "OTP sent successfully",
            "otp": "482913"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .await
        .send_code(SendCodeRequest {
            contact: "amina@example.com".to_string(),
            method: ContactMethod::Email,
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.user_id, Some(UserId::new("42")));
    assert_eq!(response.requires_profile_completion, Some(false));
    assert_eq!(response.otp.as_deref(), Some("482913"));
}

#[tokio::test]
async fn test_verify_code_decodes_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp/"))
        .and(body_json(json!({
            "contact": "+254712345678",
            "otp": "482913",
            "method": "phone",
            "user_id": "42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "requires_profile_completion": false,
            "user": {
                "id": 42,
                "phone": "+254712345678",
                "first_name": "Amina",
                "user_type": "business_owner",
                "is_profile_complete": true
            },
            "tokens": { "access": "a.b.c", "refresh": "d.e.f" }
        })))
        .mount(&server)
        .await;

    let response = service(&server)
        .await
        .verify_code(VerifyCodeRequest {
            contact: "+254712345678".to_string(),
            otp: "482913".to_string(),
            method: ContactMethod::Phone,
            user_id: Some(UserId::new("42")),
        })
        .await
        .unwrap();

    let VerifyVerdict::Login { user, tokens } = response.verdict() else {
        unreachable!("expected a login verdict");
    };
    assert_eq!(user.id, UserId::new("42"));
    assert_eq!(user.user_type, Some(UserType::BusinessOwner));
    assert_eq!(user.landing_route(), "/manage-business");
    assert_eq!(tokens.access, "a.b.c");
}

#[tokio::test]
async fn test_refusal_with_body_is_a_service_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Invalid or expired OTP"
        })))
        .mount(&server)
        .await;

    let response = service(&server)
        .await
        .verify_code(VerifyCodeRequest {
            contact: "amina@example.com".to_string(),
            otp: "000000".to_string(),
            method: ContactMethod::Email,
            user_id: None,
        })
        .await
        .unwrap();

    assert_eq!(
        response.verdict(),
        VerifyVerdict::Rejected {
            message: Some("Invalid or expired OTP".to_string())
        }
    );
}

#[tokio::test]
async fn test_server_error_without_body_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/send-otp/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .send_code(SendCodeRequest {
            contact: "amina@example.com".to_string(),
            method: ContactMethod::Email,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, OtpError::Transport { .. }));
}

#[tokio::test]
async fn test_server_error_with_message_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "Internal error"
        })))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .verify_code(VerifyCodeRequest {
            contact: "amina@example.com".to_string(),
            otp: "482913".to_string(),
            method: ContactMethod::Email,
            user_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, OtpError::Transport { .. }));
}

#[tokio::test]
async fn test_html_error_page_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/resend-otp/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let error = service(&server)
        .await
        .resend_code(ResendCodeRequest {
            identifier: "amina@example.com".to_string(),
            auth_method: ContactMethod::Email,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, OtpError::Transport { .. }));
}

#[tokio::test]
async fn test_resend_uses_identifier_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/resend-otp/"))
        .and(body_json(json!({
            "identifier": "+254712345678",
            "auth_method": "phone"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user_id": "u-9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .await
        .resend_code(ResendCodeRequest {
            identifier: "+254712345678".to_string(),
            auth_method: ContactMethod::Phone,
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.user_id, Some(UserId::new("u-9")));
}

#[tokio::test]
async fn test_unreachable_service_is_transport() {
    let config = IdentityServiceConfig::new("http://127.0.0.1:9/api")
        .with_request_timeout(Duration::from_millis(500));
    let service = HttpIdentityService::new(&config).unwrap();

    let error = service
        .send_code(SendCodeRequest {
            contact: "amina@example.com".to_string(),
            method: ContactMethod::Email,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, OtpError::Transport { .. }));
    assert_eq!(error.user_message(), "Something went wrong. Please try again.");
}
