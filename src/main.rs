//! Energy Bench - Main Entry Point

use clap::Parser;
use energy_bench::cli::{cmd_evaluate, cmd_preprocess, cmd_roster, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { data, output_dir, test_days, no_scale } => {
            cmd_preprocess(&data, &output_dir, test_days, !no_scale)?;
        }
        Commands::Evaluate { data, config, seed, output } => {
            let all_failed = cmd_evaluate(&data, config.as_deref(), seed, output.as_deref())?;
            if all_failed {
                anyhow::bail!("every dataset failed to evaluate");
            }
        }
        Commands::Roster { output } => {
            cmd_roster(output.as_deref())?;
        }
    }

    Ok(())
}
