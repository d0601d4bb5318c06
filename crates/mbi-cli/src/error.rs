use mbi_core::ConfigError;
use mbi_db::DbError;
use mbi_insights::InsightError;
use mbi_report::ReportError;
use thiserror::Error;

/// Exit code for a run stopped by Ctrl-C or SIGTERM.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Every way an `mbi` run can end early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Connection(#[source] DbError),

    #[error("{0}")]
    Query(#[source] DbError),

    /// Bad user input; `available` holds the client names that were offered.
    #[error("{message}")]
    Validation {
        message: String,
        available: Vec<String>,
    },

    #[error("no campaign data found for {label} in the last {days} days")]
    NoData { label: String, days: u32 },

    #[error("AI insight generation failed: {0}")]
    ExternalService(#[from] InsightError),

    #[error("{0}")]
    Persistence(#[from] ReportError),

    #[error("interrupted")]
    Interrupted,
}

impl From<DbError> for RunError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Connection { .. } => RunError::Connection(err),
            DbError::Query(_) => RunError::Query(err),
        }
    }
}

impl RunError {
    /// Remediation advice printed under the error.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RunError::Config(_) | RunError::Connection(_) => {
                Some("check your .env file and database/API credentials")
            }
            RunError::NoData { .. } => {
                Some("try another client, ALL, or a wider --days window")
            }
            RunError::Validation { .. } => Some("run with --list-clients to see valid names"),
            RunError::Query(_) | RunError::ExternalService(_) => {
                Some("the dependency may be temporarily unavailable; retry later")
            }
            RunError::Persistence(_) => Some("check that MBI_OUTPUT_DIR is writable"),
            RunError::Interrupted => None,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}
