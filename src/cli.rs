//! Command-line parsing for the goview binary

use std::path::PathBuf;

use anyhow::Result;
use goview::{OutputFormat, ReloadStrategy, WatchPipelineConfig, WatcherConfig};

pub fn print_usage() {
    eprintln!("goview - live model of a Go module's packages and tests");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  goview <command> [arguments]");
    eprintln!("  goview --help");
    eprintln!("  goview --version");
    eprintln!();
    eprintln!("  goview scan [--root <DIR>] [--ignore <PATTERN>]... [--no-gitignore]");
    eprintln!("              [--output human|json|pretty]");
    eprintln!("  goview watch [--root <DIR>] [--debounce-ms <N>] [--ignore <PATTERN>]...");
    eprintln!("               [--strategy whole|fine|fallback] [--no-gitignore] [--output human|json|pretty]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  scan      Scan the module once and print it");
    eprintln!("  watch     Scan, then keep the model in sync with the filesystem");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  --root <DIR>         Module root (default: current directory)");
    eprintln!("  --ignore <PATTERN>   Extra gitignore-style pattern; may repeat");
    eprintln!("  --no-gitignore       Do not read the root's .gitignore");
    eprintln!("  --output <FORMAT>    human (default), json or pretty");
    eprintln!("  --debounce-ms <N>    Debounce window in milliseconds (default: 50)");
    eprintln!("  --strategy <S>       whole, fine or fallback (default: fallback)");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG (default: goview=info).");
}

/// Parsed command
#[derive(Debug, Clone)]
pub enum Command {
    Scan {
        root: PathBuf,
        ignore_patterns: Vec<String>,
        gitignore_aware: bool,
        output_format: OutputFormat,
    },
    Watch {
        config: WatchPipelineConfig,
        output_format: OutputFormat,
    },
    Version,
    Help,
}

/// Parse `args`, where `args[0]` is the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = args[1].as_str();
    match command {
        "--version" | "-V" => return Ok(Command::Version),
        "--help" | "-h" => return Ok(Command::Help),
        "scan" | "watch" => {}
        other => return Err(anyhow::anyhow!("Unknown command: {}", other)),
    }

    let mut root = PathBuf::from(".");
    let mut ignore_patterns = Vec::new();
    let mut gitignore_aware = true;
    let mut output_format = OutputFormat::Human;
    let mut debounce_ms: Option<u64> = None;
    let mut strategy: Option<ReloadStrategy> = None;

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let takes_value = matches!(
            flag,
            "--root" | "--ignore" | "--output" | "--debounce-ms" | "--strategy"
        );
        if takes_value && i + 1 >= args.len() {
            return Err(anyhow::anyhow!("{} requires an argument", flag));
        }

        match flag {
            "--root" => root = PathBuf::from(&args[i + 1]),
            "--ignore" => ignore_patterns.push(args[i + 1].clone()),
            "--output" => {
                output_format = OutputFormat::from_str(&args[i + 1])
                    .ok_or_else(|| anyhow::anyhow!("Invalid output format: {}", args[i + 1]))?;
            }
            "--no-gitignore" => gitignore_aware = false,
            "--debounce-ms" if command == "watch" => {
                debounce_ms = Some(
                    args[i + 1]
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --debounce-ms: {}", args[i + 1]))?,
                );
            }
            "--strategy" if command == "watch" => {
                strategy = Some(
                    ReloadStrategy::from_str(&args[i + 1])
                        .ok_or_else(|| anyhow::anyhow!("Invalid strategy: {}", args[i + 1]))?,
                );
            }
            _ => return Err(anyhow::anyhow!("Unknown argument for {}: {}", command, flag)),
        }

        i += if takes_value { 2 } else { 1 };
    }

    if command == "scan" {
        return Ok(Command::Scan {
            root,
            ignore_patterns,
            gitignore_aware,
            output_format,
        });
    }

    let defaults = WatcherConfig::default();
    Ok(Command::Watch {
        config: WatchPipelineConfig {
            watcher: WatcherConfig {
                root_path: root,
                debounce_ms: debounce_ms.unwrap_or(defaults.debounce_ms),
                gitignore_aware,
            },
            strategy: strategy.unwrap_or_default(),
            ignore_patterns,
        },
        output_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("goview")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_scan_defaults() {
        match parse_args(&args(&["scan"])).unwrap() {
            Command::Scan {
                root,
                ignore_patterns,
                gitignore_aware,
                output_format,
            } => {
                assert_eq!(root, PathBuf::from("."));
                assert!(ignore_patterns.is_empty());
                assert!(gitignore_aware);
                assert_eq!(output_format, OutputFormat::Human);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scan_flags() {
        let parsed = parse_args(&args(&[
            "scan",
            "--root",
            "/src/m",
            "--ignore",
            "vendor",
            "--no-gitignore",
            "--output",
            "pretty",
        ]))
        .unwrap();

        match parsed {
            Command::Scan {
                root,
                ignore_patterns,
                gitignore_aware,
                output_format,
            } => {
                assert_eq!(root, PathBuf::from("/src/m"));
                assert_eq!(ignore_patterns, vec!["vendor"]);
                assert!(!gitignore_aware);
                assert_eq!(output_format, OutputFormat::Pretty);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_watch_flags() {
        let parsed = parse_args(&args(&[
            "watch",
            "--root",
            "/src/m",
            "--debounce-ms",
            "200",
            "--ignore",
            "vendor",
            "--ignore",
            "*.pb.go",
            "--strategy",
            "whole",
            "--no-gitignore",
            "--output",
            "json",
        ]))
        .unwrap();

        match parsed {
            Command::Watch {
                config,
                output_format,
            } => {
                assert_eq!(config.watcher.root_path, PathBuf::from("/src/m"));
                assert_eq!(config.watcher.debounce_ms, 200);
                assert!(!config.watcher.gitignore_aware);
                assert_eq!(config.strategy, ReloadStrategy::Whole);
                assert_eq!(config.ignore_patterns, vec!["vendor", "*.pb.go"]);
                assert_eq!(output_format, OutputFormat::Json);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_watch_defaults() {
        match parse_args(&args(&["watch"])).unwrap() {
            Command::Watch { config, .. } => {
                assert_eq!(config.watcher.debounce_ms, 50);
                assert_eq!(config.strategy, ReloadStrategy::FineGrainedWithFallback);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["index"])).is_err());
        assert!(parse_args(&args(&["scan", "--root"])).is_err());
        assert!(parse_args(&args(&["scan", "--debounce-ms", "10"])).is_err());
        assert!(parse_args(&args(&["watch", "--debounce-ms", "soon"])).is_err());
        assert!(parse_args(&args(&["watch", "--strategy", "lazy"])).is_err());
        assert!(parse_args(&args(&["scan", "--output", "xml"])).is_err());
    }

    #[test]
    fn test_version_and_help() {
        assert!(matches!(parse_args(&args(&["--version"])).unwrap(), Command::Version));
        assert!(matches!(parse_args(&args(&["-h"])).unwrap(), Command::Help));
    }
}
