use anyhow::{Context, Result};
use benchio::{cli::Cli, config::HarnessConfig, harness::Harness};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises everything to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file if one was given, then apply command-line overrides
fn load_config(args: &Cli) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    tracing::debug!(?config, "Resolved configuration");

    let mut harness = Harness::from_config(config);
    let report = harness.run()?;

    if let Some(path) = &args.summary_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write summary for {} queries", report.queries.len()))?;
    }

    Ok(())
}
