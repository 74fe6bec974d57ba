use clap::Parser;
use sops_transit::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Encrypt(ref args) => sops_transit::cli::commands::encrypt::execute(&cli, args),
        Commands::Config {
            ref key,
            ref path_regexes,
            ref output,
        } => sops_transit::cli::commands::config::execute(
            &cli,
            key,
            path_regexes,
            output.as_deref(),
        ),
        Commands::Completions { ref shell } => {
            sops_transit::cli::commands::completions::execute(shell)
        }
    };

    if let Err(e) = result {
        tracing::debug!(category = ?e.category(), "command failed");
        sops_transit::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sops_transit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
