use clap::Parser;
use tracing_subscriber::EnvFilter;

use variant_store::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.engine_config();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("variant_store=debug,info")
    } else {
        EnvFilter::new("variant_store=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Summary(args) => {
            cli::summary::run(args, cli.format, cli.verbose, &config)?;
        }
        cli::Commands::Query(args) => {
            cli::query::run(args, cli.format, cli.verbose, &config)?;
        }
        cli::Commands::Filter(args) => {
            cli::filter::run(args, cli.format, cli.verbose, &config)?;
        }
        cli::Commands::Compare(args) => {
            cli::compare::run(args, cli.format, cli.verbose, &config)?;
        }
        cli::Commands::Validate(args) => {
            cli::validate::run(args, cli.format, cli.verbose, &config)?;
        }
    }

    Ok(())
}
