use std::io::{stdin, stdout, BufReader};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use tampio::diagnostics;
use tampio::driver::{Options, Session};
use tampio::repl;

/// Tampio, an interpreter for an equational language written in inflected
/// Finnish noun phrases (spec.md §1).
#[derive(ClapParser, Debug)]
#[command(name = "tampio")]
struct Cli {
  /// Source file to run. Omit to start the REPL.
  file: Option<PathBuf>,

  /// Print version information and exit.
  #[arg(short = 'v', long = "version")]
  version: bool,

  /// Allow redefining built-in impure functions (read/print).
  #[arg(short = 'i', long = "free-impure")]
  free_impure: bool,

  /// Allow redefining built-in pure functions (arithmetic, successor).
  #[arg(short = 'p', long = "free-pure")]
  free_pure: bool,

  /// Evaluate the program's effect on the world counter and print it.
  #[arg(long)]
  io: bool,

  /// Disable the arithmetic peephole optimizations.
  #[arg(long = "no-magic")]
  no_magic: bool,

  /// Print a dump of stored equations when evaluation fails.
  #[arg(long)]
  debug: bool,

  /// Increase log verbosity; repeat for more (-V, -VV, -VVV).
  #[arg(short = 'V', long = "verbosity", action = clap::ArgAction::Count)]
  verbosity: u8,

  /// Print intermediate reduction steps as they happen.
  #[arg(long)]
  visualize: bool,
}

fn install_tracing(verbosity: u8, visualize: bool) {
  let level = match verbosity {
    0 if visualize => "debug",
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> std::process::ExitCode {
  let cli = Cli::parse();
  if cli.version {
    println!("tampio {}", env!("CARGO_PKG_VERSION"));
    return std::process::ExitCode::SUCCESS;
  }
  install_tracing(cli.verbosity, cli.visualize);

  let options = Options {
    magic: !cli.no_magic,
    free_impure: cli.free_impure,
    free_pure: cli.free_pure,
    debug: cli.debug,
    io_mode: cli.io,
    visualize: cli.visualize,
  };
  let mut session = Session::new(options);
  if let Err(err) = session.load_prelude() {
    eprintln!("failed to load prelude: {}", err);
    return std::process::ExitCode::FAILURE;
  }

  match cli.file {
    Some(path) => match std::fs::read_to_string(&path) {
      Ok(source) => {
        let mut input = BufReader::new(stdin());
        let mut output = stdout();
        if let Err(err) = session.run_program(&source, &mut input, &mut output) {
          eprintln!("{}", diagnostics::report_fatal(&err, &session.rules, session.options.debug));
          return std::process::ExitCode::FAILURE;
        }
        std::process::ExitCode::SUCCESS
      }
      Err(err) => {
        eprintln!("failed to read {}: {}", path.display(), err);
        std::process::ExitCode::FAILURE
      }
    },
    None => match repl::run(session) {
      Ok(()) => std::process::ExitCode::SUCCESS,
      Err(err) => {
        eprintln!("{}", err);
        std::process::ExitCode::FAILURE
      }
    },
  }
}
