//! DW-8000 tape decoder CLI
//!
//! Command-line interface for recovering DW-8000 program banks from tape.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use dw8000_tape::cli::commands;
use dw8000_tape::cli::{Cli, Commands};

/// Exit status when output was written but did not verify
const EXIT_UNVERIFIED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("DW-8000 tape decoder v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_UNVERIFIED),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(tape_error) = e.downcast_ref::<dw8000_tape::TapeError>() {
                debug!("Error code: {}", tape_error.error_code());
                for suggestion in tape_error.recovery_suggestions() {
                    eprintln!("  - {}", suggestion);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = cli.base_config().context("Failed to load configuration")?;

    let verified = match &cli.command {
        Commands::WavToBin { wav, bin, signal } => {
            signal.apply(&mut config);
            commands::wav_to_bin(wav, bin, &config)
                .with_context(|| format!("Failed to decode {}", wav.display()))?
        }
        Commands::BinToSyx { bin, syx, store } => {
            config.store |= *store;
            commands::bin_to_syx(bin, syx, &config)
                .with_context(|| format!("Failed to convert {}", bin.display()))?
        }
        Commands::WavToSyx {
            wav,
            syx,
            store,
            signal,
        } => {
            config.store |= *store;
            signal.apply(&mut config);
            commands::wav_to_syx(wav, syx, &config)
                .with_context(|| format!("Failed to convert {}", wav.display()))?
        }
        Commands::Check { bin, known } => commands::check(bin, known, &config)
            .with_context(|| format!("Failed to check {}", bin.display()))?,
        Commands::Batch { dir, signal } => {
            signal.apply(&mut config);
            commands::batch(dir, &config)
                .with_context(|| format!("Failed to process {}", dir.display()))?
        }
    };

    Ok(verified)
}
