mod cli;
mod error;
mod run;

use std::process::ExitCode;

use clap::Parser;
use mbi_core::{AppConfig, ClientScope};
use mbi_db::CampaignStore;
use mbi_insights::InsightGenerator;
use mbi_report::ReportWriter;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::RunError;
use crate::run::{AnalyzeRequest, Command, InsightStage};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = mbi_core::load_app_config();
    init_tracing(config.as_ref().map_or("info", |c| c.log_level.as_str()));
    let config = match config {
        Ok(config) => config,
        Err(err) => return fail(&RunError::from(err)),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

fn fail(err: &RunError) -> ExitCode {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
    ExitCode::from(err.exit_code())
}

/// Logs go to stderr so stdout carries only report output.
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<(), RunError> {
    // Analysis needs the API key; fail before touching the network.
    let stage = if cli.list_clients {
        None
    } else {
        let api_key = config.require_gemini_api_key()?;
        Some(InsightStage {
            generator: InsightGenerator::new(
                api_key,
                &config.ai,
                config.prompt_template.clone(),
            )?,
            fail_fast: config.ai.fail_fast,
        })
    };

    let request = AnalyzeRequest {
        scope: ClientScope::parse(cli.client.as_deref().unwrap_or_default()),
        days: cli.days,
        output: cli.output,
        save_detailed: cli.save_detailed,
    };
    let writer = ReportWriter::new(&config.output_dir);
    let command = match &stage {
        None => Command::ListClients { days: cli.days },
        Some(stage) => Command::Analyze {
            targets: &config.kpi_targets,
            insights: stage,
            writer: &writer,
            request: &request,
        },
    };

    let store = CampaignStore::connect(&config.database).await?;
    run::run_session(store, command, &mut std::io::stdout(), shutdown_signal()).await
}

/// Resolves on Ctrl-C or SIGTERM. A handler that cannot be installed never
/// resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received interrupt, stopping analysis");
}
