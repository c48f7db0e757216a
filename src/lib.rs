//! Fintrack is a web service for tracking personal income, expenses, and
//! monthly category budgets.
//!
//! This library provides a JSON REST API over a single SQLite database:
//! CRUD endpoints for transactions and budgets, plus report endpoints that
//! aggregate transactions into dashboard, monthly, and category summaries.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod analytics;
mod app_state;
mod budget;
mod dashboard;
mod database_id;
mod db;
pub mod endpoints;
mod logging;
mod routing;
mod transaction;

pub use app_state::AppState;
pub use logging::logging_middleware;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body was missing, malformed, or contained a field that
    /// could not be parsed (e.g., an unknown category name).
    #[error("{0}")]
    InvalidRequestBody(String),

    /// An empty string was used as a transaction description.
    #[error("transaction description must not be empty")]
    EmptyDescription,

    /// A zero or negative amount was used to create or update a transaction.
    ///
    /// Transaction amounts carry no sign, the direction of the money movement
    /// is stored separately as the transaction type.
    #[error("transaction amount must be greater than zero")]
    NonPositiveAmount,

    /// A month string could not be parsed as YYYY-MM.
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// The budget comparison endpoint was called without its month query
    /// parameter.
    #[error("Month parameter is required")]
    MissingMonthParameter,

    /// A budget was submitted for the Income category.
    ///
    /// Budgets are spending ceilings, so only expense categories are allowed.
    #[error("budgets cannot be created for the Income category")]
    IncomeBudgetCategory,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

/// The JSON body used for all error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::InvalidRequestBody(_)
            | Error::EmptyDescription
            | Error::NonPositiveAmount
            | Error::InvalidMonth(_)
            | Error::MissingMonthParameter
            | Error::IncomeBudgetCategory => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::DeleteMissingBudget => (StatusCode::NOT_FOUND, self.to_string()),
            // Errors that are not handled above are not intended to be shown
            // to the client.
            Error::SqlError(error) => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an unexpected error occurred, check the server logs for more details"
                        .to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn not_found_maps_to_404() {
        let response = Error::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_errors_map_to_400() {
        for error in [
            Error::EmptyDescription,
            Error::NonPositiveAmount,
            Error::InvalidMonth("nope".to_string()),
            Error::MissingMonthParameter,
            Error::IncomeBudgetCategory,
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn sql_errors_map_to_500() {
        let response = Error::SqlError(rusqlite::Error::InvalidQuery).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn error_body_is_json_with_error_field() {
        let response = Error::NotFound.into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert!(json.get("error").is_some());
    }
}
