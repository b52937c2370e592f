//! entrenar-fit CLI
//!
//! Single-command training entry point for the entrenar-fit library.
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! entrenar-fit train config.yaml
//!
//! # Train with overrides
//! entrenar-fit train config.yaml --epochs 10 --log-every 0.25
//!
//! # Validate config
//! entrenar-fit validate config.yaml
//!
//! # Show config info
//! entrenar-fit info config.yaml --format yaml
//! ```
//!
//! Diagnostics go through `tracing`; set `RUST_LOG` to override the level
//! chosen by `--verbose` / `--quiet`.

use clap::Parser;
use entrenar_fit::config::{
    apply_overrides, load_config, parse_config, render_info, train_from_spec, Cli, Command,
    InfoArgs, TrainArgs, ValidateArgs,
};
use entrenar_fit::train::{ConsoleReporter, ProgressReporter, SilentReporter};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Train(args) => run_train(args, cli.quiet),
        Command::Validate(args) => run_validate(args),
        Command::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "entrenar_fit=warn"
    } else if verbose {
        "entrenar_fit=debug"
    } else {
        "entrenar_fit=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run_train(args: TrainArgs, quiet: bool) -> Result<(), String> {
    tracing::info!(config = %args.config.display(), "training from config");

    let mut spec = parse_config(&args.config).map_err(|e| e.to_string())?;
    apply_overrides(&mut spec, &args);

    let reporter: Box<dyn ProgressReporter> = if quiet {
        Box::new(SilentReporter)
    } else {
        Box::new(ConsoleReporter::new())
    };
    let report = train_from_spec(&spec, reporter).map_err(|e| e.to_string())?;

    if !quiet {
        println!(
            "Training {} in {:.2}s",
            report.outcome, report.elapsed_secs
        );
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| e.to_string())?;
    tracing::debug!(arch = %spec.model.arch, optimizer = %spec.optimizer.name, "parsed config");
    println!("Configuration is valid: {}", args.config.display());
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| e.to_string())?;
    let rendered = render_info(&spec, args.format).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
