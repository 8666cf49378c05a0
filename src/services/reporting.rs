//! Error-reporting collaborator
//!
//! The core pushes every infrastructure failure through this sink along
//! with the operation it interrupted; presentation (alerts, localized
//! text, retry buttons) is entirely the subscriber's business.

use crate::error::AppError;

pub trait ErrorReporter: Send + Sync {
    /// Deliver a failure and the operation context it occurred in.
    /// `error.recovery_actions()` carries the suggested follow-ups.
    fn report(&self, error: &AppError, context: &str);
}

/// Default reporter: full-detail structured log, nothing else
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &AppError, context: &str) {
        tracing::error!(
            "Operation failed ({}): {} [recovery: {:?}]",
            context,
            error,
            error.recovery_actions()
        );
    }
}
