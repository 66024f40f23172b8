mod commands;
mod config;
mod diagnostics;
mod error;
mod replace;
mod rewrite;
mod rule;
mod sink;
mod token;
mod walk;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::sink::{Event, Sink};

#[derive(Parser)]
#[command(
    name = "inject-hashes",
    about = "Hash-rename static assets and rewrite <script>/<link> references in HTML"
)]
struct Cli {
    /// Config file to read
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Trace every rule, rename, comparison and mask match to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let event_sink: &dyn Sink = if cli.verbose {
        init_tracing();
        &sink::Tracing
    } else {
        &sink::Silent
    };

    match cmd_run(&cli, event_sink) {
        Ok(summary) => {
            println!(
                "Hashed {} assets, rewrote {} documents ({} references)",
                summary.assets, summary.documents, summary.references
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}

/// Load the config and run the pipeline.
///
/// # Errors
///
/// Returns config errors, or the first error from the run.
fn cmd_run(cli: &Cli, sink: &dyn Sink) -> Result<commands::Summary, error::Error> {
    let config = config::Config::load(&cli.config)?;
    sink.log(&Event::ConfigLoaded { config: &config });
    commands::run(&config, sink)
}

/// Verbose mode: plain messages on stderr, `debug` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_level(false)
        .init();
}
