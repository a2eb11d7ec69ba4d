//! Single tick command.

use anyhow::{bail, Context, Result};
use forex_config::AppConfig;
use forex_pipeline::build_pipeline;

use crate::cli::OnceArgs;

pub async fn run(args: &OnceArgs, config: &AppConfig) -> Result<()> {
    if !matches!(args.output.as_str(), "text" | "json") {
        bail!("Unknown output format: {} (expected text or json)", args.output);
    }

    let mut pipeline =
        build_pipeline(config, args.dry_run).context("Failed to build pipeline")?;
    if !args.no_warmup {
        pipeline.warm_up().await;
    }
    let report = pipeline.tick().await;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}
