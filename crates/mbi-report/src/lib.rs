//! Report assembly, rendering and persistence.

pub mod error;
pub mod render;
pub mod report;
pub mod writer;

pub use error::ReportError;
pub use render::{render_console, render_text, write_report};
pub use report::{build, build_at, DatasetSummary, Report};
pub use writer::{ReportWriter, MAX_NAME_ATTEMPTS};
