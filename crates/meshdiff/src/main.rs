mod cli;
mod commands;

use clap::Parser;
use meshdiff::config::ResolvedConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meshdiff=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Compare {
            image1,
            image2,
            output,
            tuning,
        } => {
            let config = ResolvedConfig::new(tuning.into_overrides())?;
            let code = commands::compare(&image1, &image2, &output, config)?;
            std::process::exit(code);
        }
        cli::Command::Batch {
            reference,
            current,
            output,
            pattern,
            parallel,
            json,
            tuning,
        } => {
            let mut overrides = tuning.into_overrides();
            overrides.pattern = pattern;
            overrides.parallel = parallel;
            let config = ResolvedConfig::new(overrides)?;
            let code =
                commands::batch(&reference, &current, &output, json.as_deref(), config).await?;
            std::process::exit(code);
        }
        cli::Command::Init { path, force } => {
            commands::init(&path, force)?;
        }
    }

    Ok(())
}
