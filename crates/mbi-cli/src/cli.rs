use clap::{Parser, ValueEnum};

/// Where the finished report goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Console,
    File,
    Both,
}

impl OutputMode {
    #[must_use]
    pub fn to_console(self) -> bool {
        matches!(self, OutputMode::Console | OutputMode::Both)
    }

    #[must_use]
    pub fn to_file(self) -> bool {
        matches!(self, OutputMode::File | OutputMode::Both)
    }
}

#[derive(Debug, Parser)]
#[command(name = "mbi")]
#[command(about = "KPI and AI insight reports for attributed TV spot campaigns")]
pub struct Cli {
    /// Client to analyze, or ALL for every client
    #[arg(long, required_unless_present = "list_clients")]
    pub client: Option<String>,

    /// Lookback window in days
    #[arg(
        long,
        env = "MBI_LOOKBACK_DAYS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub days: u32,

    /// Report destination
    #[arg(long, env = "MBI_OUTPUT_MODE", value_enum, default_value_t = OutputMode::Both)]
    pub output: OutputMode,

    /// List clients with attribution data in the window and exit
    #[arg(long)]
    pub list_clients: bool,

    /// Also write the full report as JSON
    #[arg(long)]
    pub save_detailed: bool,
}
