//! Atomic persistence of the executive summary and detailed JSON report.

use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ReportError;
use crate::render::render_text;
use crate::report::Report;

/// Names tried per report before giving up when earlier runs in the same
/// second already hold them.
pub const MAX_NAME_ATTEMPTS: u32 = 10;

/// Writes report files under one output directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<stem>_<YYYYmmdd_HHMMSS>_executive.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Persistence`] if the directory or file cannot be
    /// written. No partial file is left behind.
    pub fn save_summary(&self, report: &Report) -> Result<PathBuf, ReportError> {
        let path = self.write_new(report, "executive", "txt", render_text(report).as_bytes())?;
        tracing::info!(path = %path.display(), "executive summary saved");
        Ok(path)
    }

    /// Write `<stem>_<YYYYmmdd_HHMMSS>_detailed.json`, the full report as
    /// pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if the report cannot be encoded, or
    /// [`ReportError::Persistence`] if it cannot be written.
    pub fn save_detailed(&self, report: &Report) -> Result<PathBuf, ReportError> {
        let mut json = serde_json::to_vec_pretty(report)?;
        json.push(b'\n');
        let path = self.write_new(report, "detailed", "json", &json)?;
        tracing::info!(path = %path.display(), "detailed report saved");
        Ok(path)
    }

    /// The file name for `attempt` (1-based): `<prefix>_<kind>.<ext>`, then
    /// `<prefix>_<kind>_2.<ext>` and so on.
    fn candidate(&self, prefix: &str, kind: &str, ext: &str, attempt: u32) -> PathBuf {
        let name = if attempt <= 1 {
            format!("{prefix}_{kind}.{ext}")
        } else {
            format!("{prefix}_{kind}_{attempt}.{ext}")
        };
        self.output_dir.join(name)
    }

    /// Write to a temp file in the output directory, then move it to the
    /// first free candidate name. Existing reports are never replaced.
    fn write_new(
        &self,
        report: &Report,
        kind: &str,
        ext: &str,
        contents: &[u8],
    ) -> Result<PathBuf, ReportError> {
        let persistence = |path: &Path, source: std::io::Error| ReportError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|source| persistence(&self.output_dir, source))?;

        let prefix = report.file_prefix();
        let first = self.candidate(&prefix, kind, ext, 1);
        let mut file =
            NamedTempFile::new_in(&self.output_dir).map_err(|e| persistence(&first, e))?;
        file.write_all(contents).map_err(|e| persistence(&first, e))?;
        file.as_file().sync_all().map_err(|e| persistence(&first, e))?;

        let mut attempt = 1;
        loop {
            let path = self.candidate(&prefix, kind, ext, attempt);
            match file.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(e)
                    if e.error.kind() == ErrorKind::AlreadyExists
                        && attempt < MAX_NAME_ATTEMPTS =>
                {
                    tracing::debug!(path = %path.display(), "report name taken, trying next");
                    file = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(persistence(&path, e.error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mbi_core::{CampaignDataset, ClientScope, KpiTargets};
    use mbi_insights::InsightReport;

    use super::*;
    use crate::report::build_at;

    fn report(client: &str) -> Report {
        let dataset = CampaignDataset::empty(ClientScope::parse(client), 7);
        let kpis = mbi_kpi::compute(&dataset, &KpiTargets::default());
        build_at(
            &dataset,
            &kpis,
            &InsightReport::unavailable("offline"),
            Utc.with_ymd_and_hms(2025, 6, 4, 9, 30, 5).unwrap(),
        )
    }

    #[test]
    fn summary_is_named_after_stem_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let path = writer.save_summary(&report("Bark Box")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "bark_box_20250604_093005_executive.txt"
        );
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("EXECUTIVE SUMMARY - BARK BOX"));
    }

    #[test]
    fn detailed_report_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let path = writer.save_detailed(&report("all")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "all_clients_20250604_093005_detailed.json"
        );
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"generated_at\""));
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["client_label"], "ALL_CLIENTS");
        assert_eq!(json["lookback_days"], 7);
        assert_eq!(json["insights"]["origin"]["status"], "unavailable");
        assert!(json["kpis"]["efficiency"]["roas"].is_null());
    }

    #[test]
    fn output_directory_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("output").join("reports");
        let writer = ReportWriter::new(&nested);

        let path = writer.save_summary(&report("bark")).unwrap();

        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn unwritable_directory_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let writer = ReportWriter::new(blocker.join("reports"));

        let err = writer.save_summary(&report("bark")).unwrap_err();

        assert!(matches!(err, ReportError::Persistence { .. }), "{err:?}");
    }

    #[test]
    fn no_temporary_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let report = report("bark");

        writer.save_summary(&report).unwrap();
        writer.save_detailed(&report).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "bark_20250604_093005_detailed.json",
                "bark_20250604_093005_executive.txt"
            ]
        );
    }

    #[test]
    fn same_second_reports_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let first = writer.save_summary(&report("bark")).unwrap();
        std::fs::write(&first, b"earlier run").unwrap();

        let second = writer.save_summary(&report("bark")).unwrap();

        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "bark_20250604_093005_executive_2.txt"
        );
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "earlier run");
        assert!(std::fs::read_to_string(&second)
            .unwrap()
            .contains("EXECUTIVE SUMMARY - BARK"));
    }

    #[test]
    fn exhausted_names_are_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let report = report("bark");
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let taken = writer.candidate("bark_20250604_093005", "detailed", "json", attempt);
            std::fs::create_dir(taken).unwrap();
        }

        let err = writer.save_detailed(&report).unwrap_err();

        match err {
            ReportError::Persistence { path, source } => {
                assert_eq!(source.kind(), ErrorKind::AlreadyExists);
                assert!(path.ends_with("bark_20250604_093005_detailed_10.json"));
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
        let files = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_type().unwrap().is_file())
            .count();
        assert_eq!(files, 0, "temp file must be cleaned up");
    }
}
