mod cli;
mod client;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = cli.retry_policy();
    let name = command_name(&cli.command);

    if let Err(e) = client::run(cli.command, policy) {
        tracing::error!(error = %e, command = name, "command failed");
        eprintln!("clipbridge {name}: {e}");
        std::process::exit(1);
    }
}

fn command_name(command: &cli::Command) -> &'static str {
    match command {
        cli::Command::Read { .. } => "read",
        cli::Command::Write { .. } => "write",
        cli::Command::Types => "types",
    }
}
