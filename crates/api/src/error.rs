//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::BookingError;
use gateway::GatewayError;
use registry::RegistryError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Caller lacks admin rights for an admin route.
    Forbidden,
    /// Booking layer error.
    Booking(BookingError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
            ApiError::Booking(err) => booking_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::EmptyCart | BookingError::InvalidCartState(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        BookingError::ItemNotFound(_) | BookingError::PurchaseNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BookingError::NotCancelable(_) => (StatusCode::CONFLICT, err.to_string()),
        BookingError::TotalFailure { .. } | BookingError::CancellationFailed { .. } => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        BookingError::Gateway(gateway_err) => gateway_error_to_response(gateway_err, &err),
        BookingError::Registry(RegistryError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BookingError::Registry(RegistryError::InvalidConfig(_)) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        BookingError::Registry(_) | BookingError::Ledger(_) => {
            tracing::error!(error = %err, "booking internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Provider-side failures surface as gateway-class responses. A provider
/// rejection keeps the provider's own status code when it is a valid one.
fn gateway_error_to_response(err: &GatewayError, source: &BookingError) -> (StatusCode, String) {
    let status = match err {
        GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Rejected { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        GatewayError::Unreachable { .. }
        | GatewayError::Credential { .. }
        | GatewayError::InvalidResponse { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, source.to_string())
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Booking(BookingError::Registry(err))
    }
}

impl From<ledger::LedgerError> for ApiError {
    fn from(err: ledger::LedgerError) -> Self {
        ApiError::Booking(BookingError::Ledger(err))
    }
}
