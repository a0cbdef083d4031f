use crate::model::leave_request::RequestStatus;
use crate::model::role::Role;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use derive_more::Display;
use serde_json::json;

/// Every failure the roster core can surface. Engine operations return these
/// without having mutated anything; the HTTP layer maps them to responses.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(
        fmt = "Insufficient balance: {} day(s) requested, {} available",
        requested,
        available
    )]
    InsufficientBalance { requested: i64, available: i64 },

    #[display(fmt = "Invalid date range: {}", _0)]
    InvalidDateRange(String),

    #[display(fmt = "Not authorized: {} role required", required)]
    NotAuthorized { required: Role },

    #[display(fmt = "Request {} already resolved ({})", request_id, status)]
    AlreadyResolved {
        request_id: i64,
        status: RequestStatus,
    },

    #[display(fmt = "Not found: {}", _0)]
    NotFound(String),

    #[display(fmt = "Request overlaps dates already on file: {:?}", dates)]
    DuplicateDates { dates: Vec<NaiveDate> },

    #[display(fmt = "Invalid input: {}", _0)]
    InvalidInput(String),

    #[display(fmt = "Conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "Storage error: {}", _0)]
    Storage(sqlx::Error),
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e)
    }
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::InvalidDateRange(_) => "invalid_date_range",
            AppError::NotAuthorized { .. } => "not_authorized",
            AppError::AlreadyResolved { .. } => "already_resolved",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicateDates { .. } => "duplicate_dates",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Conflict(_) => "conflict",
            AppError::Storage(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InsufficientBalance { .. }
            | AppError::InvalidDateRange(_)
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyResolved { .. }
            | AppError::DuplicateDates { .. }
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                json!({ "code": self.code(), "message": "Internal Server Error" })
            }
            AppError::DuplicateDates { dates } => json!({
                "code": self.code(),
                "message": self.to_string(),
                "dates": dates,
            }),
            _ => json!({ "code": self.code(), "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn insufficient_balance_is_bad_request() {
        let (status, json) = render(AppError::InsufficientBalance {
            requested: 3,
            available: 2,
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "insufficient_balance");
        assert_eq!(
            json["message"],
            "Insufficient balance: 3 day(s) requested, 2 available"
        );
    }

    #[actix_web::test]
    async fn already_resolved_is_conflict() {
        let (status, json) = render(AppError::AlreadyResolved {
            request_id: 7,
            status: RequestStatus::Approved,
        })
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "Request 7 already resolved (approved)");
    }

    #[actix_web::test]
    async fn duplicate_dates_lists_the_days() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (status, json) = render(AppError::DuplicateDates { dates: vec![day] }).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["dates"][0], "2026-03-02");
    }

    #[actix_web::test]
    async fn storage_errors_hide_details() {
        let (status, json) = render(AppError::Storage(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn not_authorized_is_forbidden() {
        let (status, json) = render(AppError::NotAuthorized {
            required: Role::Admin,
        })
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["message"], "Not authorized: admin role required");
    }
}
