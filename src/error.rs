//! Unified application error model and mapping helpers.
//! This module provides the error enum returned by the resource mapper and the
//! administrative calls, the conversion from driver errors, and the terminal
//! HTTP mapping used for every failure that is not a kind-mismatch redirect.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::FsError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Forbidden { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// JSON body reported to clients: `{"status":"error","type":..,"code":..,"message":..}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}));
        if let Some(obj) = v.as_object_mut() {
            obj.insert("status".into(), serde_json::Value::String("error".into()));
        }
        v
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<FsError> for AppError {
    fn from(err: FsError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            FsError::NotFound(_) => AppError::not_found(code.to_string(), message),
            FsError::AlreadyExists(_)
            | FsError::NotEmpty(_)
            | FsError::NotADirectory(_)
            | FsError::IsADirectory(_) => AppError::conflict(code.to_string(), message),
            FsError::PermissionDenied(_) => AppError::forbidden(code.to_string(), message),
            FsError::InvalidPath { .. } | FsError::InvalidContent { .. } => AppError::user(code.to_string(), message),
            FsError::Io { .. } => AppError::io(code.to_string(), message),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

/// Terminal handler: every failure that reaches the HTTP layer is a 500 carrying
/// the error detail. Kind mismatches never get here; they become redirects.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(target: "fileserver::server", "request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
