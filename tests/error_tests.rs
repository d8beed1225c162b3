// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use slide_rally::db::StorageError;
use slide_rally::error::AppError;

#[test]
fn test_storage_errors_map_to_storage() {
    let err: AppError = StorageError::Backend("connection refused".to_string()).into();
    assert!(err.is_storage_error());

    let err: AppError = StorageError::UserMissing("Alice".to_string()).into();
    assert!(err.is_storage_error());

    let err = AppError::Validation("userName must not be empty".to_string());
    assert!(!err.is_storage_error());
}

#[test]
fn test_error_status_codes() {
    let cases = [
        (
            AppError::Validation("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            AppError::BadRequest("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            AppError::Storage("down".to_string()),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}
