use std::collections::HashMap;

use axum::{Json, http::StatusCode, response::IntoResponse};
use diesel::result::DatabaseErrorKind;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::subject::SubjectKind;

/// Failures of the domain operations. Every variant except `Storage` is a
/// terminal, user-facing outcome and is never retried.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{kind} not found with ID {id}")]
    NotFound { kind: SubjectKind, id: Uuid },

    #[error("User {username} is not the author of {kind} with ID {id}")]
    NotAuthor {
        username: String,
        kind: SubjectKind,
        id: Uuid,
    },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    Invalid(String),

    #[error("storage failure: {0}")]
    Storage(eyre::Report),
}

impl Error {
    pub fn not_found(kind: SubjectKind, id: Uuid) -> Self {
        Error::NotFound { kind, id }
    }

    pub fn not_author(username: &str, kind: SubjectKind, id: Uuid) -> Self {
        Error::NotAuthor {
            username: username.to_owned(),
            kind,
            id,
        }
    }
}

impl From<&'static str> for Error {
    fn from(e: &'static str) -> Self {
        Error::Invalid(e.into())
    }
}

impl From<eyre::Report> for Error {
    fn from(e: eyre::Report) -> Self {
        Error::Storage(e)
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::AlreadyExists(info.message().to_owned())
            }
            e => Error::Storage(eyre::Report::new(e)),
        }
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for Error {
    fn from(e: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        Error::Storage(eyre::Report::new(e))
    }
}

pub enum AppError {
    ServerError {
        error: eyre::Report,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    Client {
        status: StatusCode,
        code: &'static str,
        msg: String,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_response) = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(?error, "Request failed with a server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    #[cfg(debug_assertions)]
                    {
                        let frames_info = backtrace
                            .as_ref()
                            .map(filter_backtrace)
                            .unwrap_or_default();
                        ErrorResponse {
                            code: "SERVER_ERR".into(),
                            msg: Some("Internal server error".into()),
                            debug_info: Some(HashMap::from([
                                (
                                    "backtrace",
                                    serde_json::to_value(&frames_info).unwrap_or_default(),
                                ),
                                ("error", Value::String(format!("{error:?}"))),
                            ])),
                        }
                    },
                    #[cfg(not(debug_assertions))]
                    ErrorResponse {
                        code: "SERVER_ERR".into(),
                        msg: Some("Internal server error".into()),
                    },
                )
            }
            AppError::Client { status, code, msg } => (
                status,
                ErrorResponse {
                    code: code.into(),
                    msg: Some(msg),
                    #[cfg(debug_assertions)]
                    debug_info: None,
                },
            ),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Client { status, .. } => *status,
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        let (status, code) = match &e {
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::NotAuthor { .. } => (StatusCode::FORBIDDEN, "NOT_AUTHOR"),
            Error::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            Error::Invalid(_) => (StatusCode::BAD_REQUEST, "INVALID"),
            Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERR"),
        };

        match e {
            Error::Storage(error) => AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace: Some(backtrace::Backtrace::new()),
            },
            e => AppError::Client {
                status,
                code,
                msg: e.to_string(),
            },
        }
    }
}

impl From<(&'static str, StatusCode)> for AppError {
    fn from((msg, status): (&'static str, StatusCode)) -> Self {
        (msg.to_owned(), status).into()
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::Client {
            status,
            code: "ERR",
            msg,
        }
    }
}

#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}
