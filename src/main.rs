//! goview CLI - live model of a Go module
//!
//! Usage: goview <command> [arguments]

mod cli;
mod scan_cmd;
mod watch_cmd;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use cli::{parse_args, print_usage, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goview=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::from(1);
        }
    };

    init_tracing();

    let result = match command {
        Command::Version => {
            println!("{}", goview::version::version());
            Ok(())
        }
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Scan {
            root,
            ignore_patterns,
            gitignore_aware,
            output_format,
        } => scan_cmd::run_scan(root, ignore_patterns, gitignore_aware, output_format),
        Command::Watch {
            config,
            output_format,
        } => watch_cmd::run_watch(config, output_format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
