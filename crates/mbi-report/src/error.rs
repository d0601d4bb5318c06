use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Creating the output directory or writing a report file failed.
    #[error("failed to write report {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize detailed report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to stdout: {0}")]
    Console(#[source] std::io::Error),
}
