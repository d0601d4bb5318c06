//! The analysis pipeline: fetch, compute, generate insights, report.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use mbi_core::{ClientScope, KpiTargets};
use mbi_db::CampaignSource;
use mbi_insights::{InsightGenerator, InsightReport};
use mbi_report::{write_report, Report, ReportError, ReportWriter};

use crate::cli::OutputMode;
use crate::error::RunError;

/// How many alternatives an unknown-client error lists.
pub const SUGGESTED_CLIENTS: usize = 10;

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub scope: ClientScope,
    pub days: u32,
    pub output: OutputMode,
    pub save_detailed: bool,
}

/// The AI stage and what to do when it fails.
#[derive(Debug)]
pub struct InsightStage {
    pub generator: InsightGenerator,
    /// Abort the run instead of substituting an "unavailable" report.
    pub fail_fast: bool,
}

/// What one `mbi` invocation does once the store is open.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    ListClients {
        days: u32,
    },
    Analyze {
        targets: &'a KpiTargets,
        insights: &'a InsightStage,
        writer: &'a ReportWriter,
        request: &'a AnalyzeRequest,
    },
}

#[derive(Debug)]
pub struct Outcome {
    pub report: Report,
    pub summary_path: Option<PathBuf>,
    pub detailed_path: Option<PathBuf>,
}

fn console(err: std::io::Error) -> RunError {
    RunError::Persistence(ReportError::Console(err))
}

/// Print the clients with attribution data in the window.
///
/// # Errors
///
/// Returns [`RunError::Query`] if the listing fails.
pub async fn list_clients<S, W>(source: &S, days: u32, out: &mut W) -> Result<(), RunError>
where
    S: CampaignSource,
    W: Write,
{
    let clients = source.list_clients(days).await?;
    if clients.is_empty() {
        writeln!(
            out,
            "No clients found with attribution data in the last {days} days"
        )
        .map_err(console)?;
        return Ok(());
    }

    writeln!(out, "Clients with attribution data (last {days} days):").map_err(console)?;
    for (i, client) in clients.iter().enumerate() {
        writeln!(out, "{:>3}. {client}", i + 1).map_err(console)?;
    }
    Ok(())
}

/// The error for a client name with no data, offering up to
/// [`SUGGESTED_CLIENTS`] alternatives.
fn unknown_client(name: &str, days: u32, available: &[String]) -> RunError {
    let shown: Vec<String> = available.iter().take(SUGGESTED_CLIENTS).cloned().collect();
    let mut message =
        format!("client '{name}' has no attributed spots in the last {days} days");
    if shown.is_empty() {
        message.push_str("; no clients have attribution data in this window");
    } else {
        message.push_str(&format!("\navailable clients: {}", shown.join(", ")));
        let more = available.len() - shown.len();
        if more > 0 {
            message.push_str(&format!(" ... and {more} more"));
        }
    }
    RunError::Validation {
        message,
        available: shown,
    }
}

/// Run one analysis for `request`.
///
/// The executive summary is saved before the detailed report. If the detailed
/// save fails, the summary path has already been printed and the file stays.
///
/// # Errors
///
/// - [`RunError::Validation`] for an unknown client.
/// - [`RunError::NoData`] when the window holds no attributed spots.
/// - [`RunError::Query`] when the store rejects a query.
/// - [`RunError::ExternalService`] when insights fail and `fail_fast` is set.
/// - [`RunError::Persistence`] when a report cannot be written.
pub async fn analyze<S, W>(
    source: &S,
    targets: &KpiTargets,
    insights: &InsightStage,
    writer: &ReportWriter,
    request: &AnalyzeRequest,
    out: &mut W,
) -> Result<Outcome, RunError>
where
    S: CampaignSource,
    W: Write,
{
    let AnalyzeRequest {
        scope,
        days,
        output,
        save_detailed,
    } = request;
    let days = *days;

    let dataset = source.fetch_campaign_data(scope, days).await?;
    if dataset.is_empty() {
        if let Some(name) = scope.client() {
            let available = source.list_clients(days).await?;
            if !available.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                return Err(unknown_client(name, days, &available));
            }
        }
        return Err(RunError::NoData {
            label: scope.label().to_string(),
            days,
        });
    }
    tracing::info!(
        client = scope.label(),
        spots = dataset.len(),
        days,
        "campaign data loaded"
    );

    let kpis = mbi_kpi::compute(&dataset, targets);

    let insight_report = match insights.generator.generate(&kpis, scope.label()).await {
        Ok(report) => report,
        Err(err) if insights.fail_fast => return Err(err.into()),
        Err(err) => {
            tracing::warn!(error = %err, "AI insights unavailable, continuing without them");
            InsightReport::unavailable(err.to_string())
        }
    };

    let report = mbi_report::build(&dataset, &kpis, &insight_report);
    save_outputs(report, writer, *output, *save_detailed, out)
}

/// Print and persist a finished report.
///
/// The summary is written and its path printed before the detailed report is
/// attempted, so a failed detailed save leaves the summary in place.
///
/// # Errors
///
/// Returns [`RunError::Persistence`] when a report cannot be written.
pub fn save_outputs<W: Write>(
    report: Report,
    writer: &ReportWriter,
    output: OutputMode,
    save_detailed: bool,
    out: &mut W,
) -> Result<Outcome, RunError> {
    if output.to_console() {
        write_report(&report, out)?;
    }

    let mut summary_path = None;
    if output.to_file() {
        let path = writer.save_summary(&report)?;
        writeln!(out, "Executive summary saved: {}", path.display()).map_err(console)?;
        summary_path = Some(path);
    }

    let mut detailed_path = None;
    if save_detailed {
        let path = writer.save_detailed(&report).inspect_err(|err| {
            if let Some(summary) = &summary_path {
                tracing::warn!(
                    error = %err,
                    summary = %summary.display(),
                    "detailed report failed; executive summary was kept"
                );
            }
        })?;
        writeln!(out, "Detailed report saved: {}", path.display()).map_err(console)?;
        detailed_path = Some(path);
    }

    Ok(Outcome {
        report,
        summary_path,
        detailed_path,
    })
}

async fn execute<S, W>(source: &S, command: Command<'_>, out: &mut W) -> Result<(), RunError>
where
    S: CampaignSource,
    W: Write,
{
    match command {
        Command::ListClients { days } => list_clients(source, days, out).await,
        Command::Analyze {
            targets,
            insights,
            writer,
            request,
        } => {
            let outcome = analyze(source, targets, insights, writer, request, out).await?;
            tracing::info!(
                client = outcome.report.client_label(),
                summary = ?outcome.summary_path,
                detailed = ?outcome.detailed_path,
                "analysis complete"
            );
            Ok(())
        }
    }
}

/// Run `command` against `source` until it finishes or `shutdown` resolves,
/// then close the source on either path.
///
/// # Errors
///
/// Returns [`RunError::Interrupted`] if `shutdown` wins, otherwise whatever
/// the command returns.
pub async fn run_session<S, W, F>(
    source: S,
    command: Command<'_>,
    out: &mut W,
    shutdown: F,
) -> Result<(), RunError>
where
    S: CampaignSource,
    W: Write,
    F: Future<Output = ()>,
{
    let result = tokio::select! {
        result = execute(&source, command, out) => result,
        () = shutdown => Err(RunError::Interrupted),
    };

    source.close().await;
    result
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
