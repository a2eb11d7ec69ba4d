//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forex")]
#[command(author, version, about = "Currency-pair indicator and alert pipeline")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "FOREX_CONFIG")]
    pub config: PathBuf,

    /// Log level; overrides logging.level from the configuration
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Warm up, then poll on the configured interval until Ctrl-C
    Run(RunArgs),
    /// Warm up, run a single tick and print its report
    Once(OnceArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Keep signals in memory instead of writing to the configured sinks
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args)]
pub struct OnceArgs {
    /// Keep signals in memory instead of writing to the configured sinks
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the warm-up fetch
    #[arg(long)]
    pub no_warmup: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_once() {
        let cli = Cli::parse_from([
            "forex",
            "--config",
            "local.toml",
            "-l",
            "debug",
            "once",
            "--dry-run",
            "--output",
            "json",
        ]);
        assert_eq!(cli.config, PathBuf::from("local.toml"));
        assert_eq!(cli.log_level.map(LogLevel::as_str), Some("debug"));
        match cli.command {
            Commands::Once(args) => {
                assert!(args.dry_run);
                assert!(!args.no_warmup);
                assert_eq!(args.output, "json");
            }
            _ => panic!("expected once"),
        }
    }
}
