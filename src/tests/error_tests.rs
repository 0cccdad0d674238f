use crate::browser::SandboxError;
use crate::error::{validation, AppError};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::io;

async fn body_json(err: AppError) -> (StatusCode, Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_app_error_display() {
    let error = AppError::BadRequest("Invalid input".to_string());
    assert_eq!(format!("{}", error), "Bad request: Invalid input");

    let error = AppError::NotFound("Directory does not exist".to_string());
    assert_eq!(format!("{}", error), "Not found: Directory does not exist");

    assert_eq!(format!("{}", AppError::Forbidden), "Access denied");
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::BadRequestWithDetails { message: String::new(), details: json!({}) }.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::PermissionDenied(String::new()).status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::PayloadTooLarge { message: String::new(), details: None }.status(),
        StatusCode::PAYLOAD_TOO_LARGE
    );
    assert_eq!(AppError::IoError(String::new()).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_error_envelope() {
    let (status, body) = body_json(AppError::NotFound("File does not exist".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "File does not exist");
    assert!(body["error"].get("details").is_none());
    assert_eq!(body["status"], 404);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_forbidden_does_not_echo_path() {
    let err: AppError = SandboxError::OutsideRoot("/etc/passwd".to_string()).into();
    let (status, body) = body_json(err).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ACCESS_DENIED");
    assert!(!body.to_string().contains("passwd"));
}

#[tokio::test]
async fn test_internal_errors_are_opaque() {
    let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Internal server error");
    assert!(body["error"]["details"]["error_id"].is_string());
    assert!(!body.to_string().contains("secret detail"));

    let io_err: AppError = io::Error::new(io::ErrorKind::Other, "disk on fire").into();
    let (status, body) = body_json(io_err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "IO_ERROR");
    assert!(!body.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn test_details_are_attached() {
    let err = AppError::PayloadTooLarge {
        message: "File too large to display".to_string(),
        details: Some(json!({ "max_bytes": 10 })),
    };
    let (_, body) = body_json(err).await;
    assert_eq!(body["error"]["details"]["max_bytes"], 10);

    let err: AppError = SandboxError::InvalidPath("contains NUL".to_string()).into();
    let (status, body) = body_json(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "path");
}

#[test]
fn test_io_error_conversion() {
    let err: AppError = io::Error::from(io::ErrorKind::NotFound).into();
    assert!(matches!(err, AppError::NotFound(_)));

    let err: AppError = io::Error::from(io::ErrorKind::PermissionDenied).into();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[test]
fn test_require_param() {
    assert_eq!(validation::require_param(Some("a/b "), "path").unwrap(), "a/b ");

    match validation::require_param(None, "path") {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Path parameter required"),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(validation::require_param(Some("   "), "path").is_err());
}
