//! `signalform`: manage SignalFx objects from JSON state documents.

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::cli::parse;
use crate::commands::Command;
use crate::tracing::{TracingConfig, TracingFormat};

#[allow(clippy::print_stderr)]
#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run_main().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Pretty
        },
        level: cli.level.into(),
        ..Default::default()
    };
    crate::tracing::init_tracing(tracing_config)?;

    let overrides = cli.overrides();
    let command: Command = cli.command.into();
    execute_command(command, overrides).await
}

async fn execute_command(
    command: Command,
    overrides: signalform_provider::ConfigOverrides,
) -> miette::Result<()> {
    let output = commands::execute(command, overrides).await?;
    print_json(&output)?;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_json(value: &serde_json::Value) -> miette::Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(errors::CliError::from)?;
    println!("{rendered}");
    Ok(())
}
