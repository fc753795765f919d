use anyhow::Error;
use thiserror::Error;

use super::BulkReport;

/// Error kinds raised by the bulk-operation engine.
///
/// Validation failures are raised synchronously before any remote call;
/// remote failures carry the service error code reported by the transport;
/// partial bulk failures carry the full per-key outcome list instead of a
/// single collapsed error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BulkError {
    /// Malformed or empty input, caught before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage transport reported a failure.
    #[error("Remote service error: {code} ({message})")]
    RemoteService { code: String, message: String },

    /// One or more tasks in a bulk operation failed while others succeeded.
    #[error("Partial bulk failure: {} succeeded, {} failed", report.succeeded.len(), report.failed.len())]
    PartialBulkFailure { report: BulkReport },
}

/// Check if an anyhow::Error wraps an `InvalidArgument` error.
pub fn is_invalid_argument(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<BulkError>(),
        Some(BulkError::InvalidArgument(_))
    )
}

/// Check if an anyhow::Error wraps a `RemoteService` error.
pub fn is_remote_service_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<BulkError>(),
        Some(BulkError::RemoteService { .. })
    )
}

/// Extract the per-key outcome report from a `PartialBulkFailure` error.
///
/// Returns `None` for any other error kind.
pub fn partial_failure_report(e: &Error) -> Option<&BulkReport> {
    if let Some(BulkError::PartialBulkFailure { report }) = e.downcast_ref::<BulkError>() {
        return Some(report);
    }
    None
}
