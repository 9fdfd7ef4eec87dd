use clap::Parser;
use finagent::cli::output::print_error;
use finagent::cli::{Cli, Commands};
use tracing::info;

mod main_runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            main_runtime::init_logging_simple();
            print_error(&format!("{e:#}"));
            return Err(e);
        }
    };

    match &cli.command {
        Commands::Serve { .. } => {
            main_runtime::init_logging(&config.logging);
            info!(
                dry_run = config.lending.dry_run,
                endpoint = %config.lending.endpoint,
                "finagent {} starting",
                env!("CARGO_PKG_VERSION")
            );
        }
        _ => main_runtime::init_logging_simple(),
    }

    cli.run(config).await
}
