//! driftguard CLI - preview drift against a cluster and check cross-namespace references

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;

use commands::diff::OutputFormat;
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "driftguard")]
#[command(author = "driftguard Contributors")]
#[command(version)]
#[command(about = "Preview what applying manifests would change, and check cross-namespace references", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/driftguard/config.yaml)
    #[arg(long, global = true, env = "DRIFTGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry-run manifests against the cluster and show what would change
    Diff {
        /// Manifest file(s), multi-document YAML
        #[arg(short = 'f', long = "filename", required = true)]
        files: Vec<PathBuf>,

        /// Namespace for namespaced objects that do not set one
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Check whether objects in a namespace may reference another namespace's object
    Access {
        /// Namespace of the object holding the reference
        #[arg(short, long)]
        namespace: String,

        /// Referenced object as <namespace>/<name>
        #[arg(short, long)]
        reference: String,

        /// Access policy attached to the referenced object (YAML)
        #[arg(short, long)]
        policy: Option<PathBuf>,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

/// Log to stderr; `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let options = config::load(cli.config.as_deref())?;
    tracing::debug!(?options, "loaded options");

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::internal(e.to_string()))?;

    match cli.command {
        Commands::Diff {
            files,
            namespace,
            output,
        } => runtime.block_on(commands::diff::run(&files, &namespace, output, &options)),

        Commands::Access {
            namespace,
            reference,
            policy,
        } => runtime.block_on(commands::access::run(
            &namespace,
            &reference,
            policy.as_deref(),
            &options,
        )),
    }
}
