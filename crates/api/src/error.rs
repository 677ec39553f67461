//! HTTP error mapping.
//!
//! Every failure becomes `{"error": "<code>", "message": "<text>"}` with the
//! status carried by the domain error. Server errors keep their details in
//! the log only.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contta_ai::AiError;
use contta_core::billing::BillingError;
use contta_core::classification::AdvisorError;
use contta_core::client::ClientError;
use contta_core::closing::ClosingError;
use contta_core::ledger::LedgerError;
use contta_core::reconciliation::ReconciliationError;
use contta_core::reports::ReportError;
use contta_core::statements::StatementError;
use contta_core::webhook::WebhookError;
use contta_db::repositories::{
    AccountError, BankTxRepoError, ClientRepoError, ClosingRepoError, EntryError,
    ExpenseRepoError, InvoiceRepoError, ReconciliationRepoError, ReportRepoError,
};
use contta_shared::AppError;
use contta_shared::error::ErrorBody;
use sea_orm::DbErr;

/// An error ready to be sent.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn from_status(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message,
        )
    }

    /// 400 with a specific code.
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 404.
    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// 500; the message is logged, never sent.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Status that will be answered.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Text safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> &str {
        if self.status.is_server_error() && self.status != StatusCode::BAD_GATEWAY {
            "An error occurred"
        } else {
            &self.message
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, error = %self.message, "Request failed");
        } else {
            tracing::warn!(status = %self.status, code = self.code, error = %self.message, "Request rejected");
        }
        let body = ErrorBody {
            error: self.code.to_string(),
            message: self.public_message().to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let message = match &err {
            AppError::Database(m) | AppError::Internal(m) => m.clone(),
            _ => err.body().message,
        };
        Self::from_status(err.status_code(), err.error_code(), message)
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<ClosingError> for ApiError {
    fn from(err: ClosingError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<ReconciliationError> for ApiError {
    fn from(err: ReconciliationError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<StatementError> for ApiError {
    fn from(err: StatementError) -> Self {
        Self::bad_request(err.error_code(), err.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::bad_request(err.error_code(), err.to_string())
    }
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "external_service_error", err.to_string())
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "external_service_error", err.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::DuplicateCode(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_account", err.to_string())
            }
            AccountError::InvalidCode(_) => Self::bad_request("invalid_account_code", err.to_string()),
            AccountError::Database(e) => e.into(),
        }
    }
}

impl From<EntryError> for ApiError {
    fn from(err: EntryError) -> Self {
        match err {
            EntryError::Ledger(e) => e.into(),
            EntryError::UnknownAccount(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unknown_account",
                err.to_string(),
            ),
            EntryError::Database(e) => e.into(),
        }
    }
}

impl From<ClosingRepoError> for ApiError {
    fn from(err: ClosingRepoError) -> Self {
        match err {
            ClosingRepoError::NotFound(_) => Self::not_found("closing_not_found", err.to_string()),
            ClosingRepoError::Closing(e) => e.into(),
            ClosingRepoError::Corrupt(m) => Self::internal(m),
            ClosingRepoError::Database(e) => e.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self::from_status(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<ReportRepoError> for ApiError {
    fn from(err: ReportRepoError) -> Self {
        match err {
            ReportRepoError::Report(e) => e.into(),
            ReportRepoError::Database(e) => e.into(),
        }
    }
}

impl From<ClientRepoError> for ApiError {
    fn from(err: ClientRepoError) -> Self {
        match err {
            ClientRepoError::NotFound(_) => Self::not_found("client_not_found", err.to_string()),
            ClientRepoError::DuplicateDocument(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_document", err.to_string())
            }
            ClientRepoError::Account(e) => e.into(),
            ClientRepoError::Ledger(e) => e.into(),
            ClientRepoError::Database(e) => e.into(),
        }
    }
}

impl From<InvoiceRepoError> for ApiError {
    fn from(err: InvoiceRepoError) -> Self {
        match err {
            InvoiceRepoError::NotFound(_) => Self::not_found("invoice_not_found", err.to_string()),
            InvoiceRepoError::ClientNotFound(_) => {
                Self::not_found("client_not_found", err.to_string())
            }
            InvoiceRepoError::Billing(e) => e.into(),
            InvoiceRepoError::Entry(e) => e.into(),
            InvoiceRepoError::Corrupt(m) => Self::internal(m),
            InvoiceRepoError::Database(e) => e.into(),
        }
    }
}

impl From<ExpenseRepoError> for ApiError {
    fn from(err: ExpenseRepoError) -> Self {
        match err {
            ExpenseRepoError::NotFound(_) => Self::not_found("expense_not_found", err.to_string()),
            ExpenseRepoError::Billing(e) => e.into(),
            ExpenseRepoError::Entry(e) => e.into(),
            ExpenseRepoError::Corrupt(m) => Self::internal(m),
            ExpenseRepoError::Database(e) => e.into(),
        }
    }
}

impl From<BankTxRepoError> for ApiError {
    fn from(err: BankTxRepoError) -> Self {
        match err {
            BankTxRepoError::NotFound(_) => {
                Self::not_found("bank_transaction_not_found", err.to_string())
            }
            BankTxRepoError::NotHeld(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "not_held", err.to_string())
            }
            BankTxRepoError::AlreadyCleared(_) => {
                Self::new(StatusCode::CONFLICT, "already_cleared", err.to_string())
            }
            BankTxRepoError::ClientNotFound(_) => {
                Self::not_found("client_not_found", err.to_string())
            }
            BankTxRepoError::InvoiceMismatch { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invoice_mismatch",
                err.to_string(),
            ),
            BankTxRepoError::Ledger(e) => e.into(),
            BankTxRepoError::Entry(e) => e.into(),
            BankTxRepoError::Invoice(e) => e.into(),
            BankTxRepoError::Expense(e) => e.into(),
            BankTxRepoError::Corrupt(m) => Self::internal(m),
            BankTxRepoError::Serialization(e) => Self::internal(e.to_string()),
            BankTxRepoError::Database(e) => e.into(),
        }
    }
}

impl From<ReconciliationRepoError> for ApiError {
    fn from(err: ReconciliationRepoError) -> Self {
        match err {
            ReconciliationRepoError::NotFound(_) => {
                Self::not_found("reconciliation_not_found", err.to_string())
            }
            ReconciliationRepoError::Reconciliation(e) => e.into(),
            ReconciliationRepoError::Invoice(e) => e.into(),
            ReconciliationRepoError::Corrupt(m) => Self::internal(m),
            ReconciliationRepoError::Database(e) => e.into(),
        }
    }
}

/// Result type of handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use contta_shared::types::FiscalMonth;

    fn month() -> FiscalMonth {
        "2025-03".parse().unwrap()
    }

    #[test]
    fn test_domain_errors_keep_their_codes() {
        let err = ApiError::from(EntryError::Ledger(LedgerError::PeriodClosed(month())));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "period_closed");

        let err = ApiError::from(ClosingRepoError::Closing(ClosingError::StaleEvaluation(month())));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "stale_evaluation");

        let err = ApiError::from(ClosingRepoError::Closing(ClosingError::Blocked(month())));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "closing_blocked");
    }

    #[test]
    fn test_repository_errors() {
        let err = ApiError::from(ClientRepoError::DuplicateDocument("11222333000181".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "duplicate_document");

        let err = ApiError::from(ClosingRepoError::NotFound(month()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(ReportRepoError::Report(ReportError::AccountNotFound(
            "4.9.9.01".into(),
        )));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "account_not_found");

        let err = ApiError::from(AppError::Forbidden("tenant".into()));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "forbidden");
    }

    #[test]
    fn test_database_errors_are_internal() {
        let err = ApiError::from(DbErr::Custom("boom".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }
}
