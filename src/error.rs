use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{model::leave::LeaveType, store::StoreError};

/// One failed input check, reported back as `{ "errors": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "month")]
    pub field: String,
    #[schema(example = "Month must be in YYYY-MM format")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Display)]
pub enum HrError {
    #[display(fmt = "Validation failed")]
    Validation(Vec<FieldError>),

    #[display(fmt = "Attendance already marked for this date")]
    DuplicateAttendance,
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "Please check in first")]
    NotCheckedIn,
    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,

    #[display(fmt = "To date must be after from date")]
    InvalidRange,
    #[display(fmt = "Insufficient {} balance", _0)]
    InsufficientBalance(LeaveType),
    #[display(fmt = "Leave request has already been processed")]
    AlreadyProcessed,

    #[display(fmt = "Total salary components exceed base wage")]
    ComponentsExceedBaseWage,

    #[display(fmt = "Payroll for this month is already locked")]
    PayrollLocked,
    #[display(fmt = "Payroll for this month already exists")]
    PayrollExists,
    #[display(fmt = "Payroll is already locked")]
    AlreadyLocked,

    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),
    #[display(fmt = "{}", _0)]
    Unauthorized(&'static str),

    #[display(fmt = "Internal Server Error")]
    Store(StoreError),
    #[display(fmt = "Internal Server Error")]
    Internal(&'static str),
}

pub type HrResult<T> = Result<T, HrError>;

impl HrError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        HrError::Validation(vec![FieldError::new(field, message)])
    }

    /// `Ok` when nothing was collected.
    pub fn check(errors: Vec<FieldError>) -> HrResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HrError::Validation(errors))
        }
    }
}

impl std::error::Error for HrError {}

impl From<StoreError> for HrError {
    fn from(e: StoreError) -> Self {
        HrError::Store(e)
    }
}

impl ResponseError for HrError {
    fn status_code(&self) -> StatusCode {
        match self {
            HrError::NotFound(_) => StatusCode::NOT_FOUND,
            HrError::Forbidden(_) => StatusCode::FORBIDDEN,
            HrError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HrError::Store(_) | HrError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            HrError::Validation(errors) => {
                HttpResponse::build(self.status_code()).json(json!({ "errors": errors }))
            }
            HrError::Store(e) => {
                tracing::error!(error = %e, "Storage failure");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error"
                }))
            }
            HrError::Internal(what) => {
                tracing::error!(what, "Internal failure");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error"
                }))
            }
            other => HttpResponse::build(other.status_code()).json(json!({
                "message": other.to_string()
            })),
        }
    }
}
