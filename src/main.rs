mod cache;
mod commands;
mod config;
mod error;
mod output;
mod plane;

use clap::{CommandFactory, Parser};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;
use crate::plane::cached_client::CachedPlaneClient;

#[derive(Parser, Debug)]
#[command(name = "runway")]
#[command(about = "A command-line client for Plane issues, cycles and modules")]
#[command(version)]
struct Args {
  /// Prompt for credentials and save them
  #[arg(long)]
  configure: bool,

  /// Path to config file (default: $XDG_CONFIG_HOME/runway/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  /// More log output on stderr (-v, -vv, -vvv)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Option<commands::Command>,
}

/// Log to stderr. `RUNWAY_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) -> WorkerGuard {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_env("RUNWAY_LOG")
    .unwrap_or_else(|_| EnvFilter::new(format!("runway={}", level)));

  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_target(false)
    .init();

  guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging(args.verbose);

  if args.configure {
    let path = config::configure(args.config.as_deref())?;
    println!("\n✓ Saved to {}", path.display());
    return Ok(());
  }

  let Some(command) = args.command else {
    Args::command().print_help()?;
    return Ok(());
  };

  // Load configuration; missing credentials stop here, before any request
  let config = config::Config::load(args.config.as_deref())?;
  let credentials = config.credentials()?;

  let format = if args.json {
    OutputFormat::Json
  } else {
    OutputFormat::Text
  };

  let mut client = CachedPlaneClient::new(&credentials)?;
  commands::run(command, &mut client, format).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_definition_is_valid() {
    Args::command().debug_assert();
  }

  #[test]
  fn test_parses_negative_limit_and_global_flags() {
    let args = Args::try_parse_from(["runway", "list", "-l", "-1", "--json", "-vv"]).unwrap();
    assert!(args.json);
    assert_eq!(args.verbose, 2);
    match args.command {
      Some(commands::Command::List { limit, all, .. }) => {
        assert_eq!(limit, -1);
        assert!(!all);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parses_hyphenated_subcommands() {
    let args =
      Args::try_parse_from(["runway", "cycle-create", "-n", "Sprint", "-s", "2024-05-01"]).unwrap();
    match args.command {
      Some(commands::Command::CycleCreate { name, start, .. }) => {
        assert_eq!(name, "Sprint");
        assert_eq!(start, chrono::NaiveDate::from_ymd_opt(2024, 5, 1));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parent_conflicts_with_no_parent() {
    let result = Args::try_parse_from(["runway", "update", "abc", "--parent", "def", "--no-parent"]);
    assert!(result.is_err());
  }

  #[test]
  fn test_prioritize_requires_assignments() {
    assert!(Args::try_parse_from(["runway", "prioritize"]).is_err());
    let args = Args::try_parse_from(["runway", "prioritize", "abc=high", "def=low"]).unwrap();
    match args.command {
      Some(commands::Command::Prioritize { assignments }) => assert_eq!(assignments.len(), 2),
      other => panic!("unexpected command {:?}", other),
    }
  }
}
