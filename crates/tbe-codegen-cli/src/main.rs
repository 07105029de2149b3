use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tbe_codegen::Backend;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::OutputFormat;

/// Top-level CLI argument parser for the `tbe-gen` command
#[derive(Parser)]
#[command(
    name = "tbe-gen",
    about = "Split-embedding optimizer kernel generator",
    version
)]
struct Cli {
    /// Disable log output (RUST_LOG is ignored)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `tbe-gen` CLI
#[derive(Subcommand)]
enum Commands {
    /// Emit kernels, bindings and dispatch glue for the registered optimizers
    Generate {
        /// Output directory for generated files
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,
        /// Generator configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,
        /// Restrict emission to these optimizers (repeatable)
        #[arg(long = "optimizer")]
        optimizers: Vec<String>,
        /// Also write codegen_manifest.json
        #[arg(long)]
        manifest: bool,
        /// Skip the shared forward / indice-weight kernels and __init__.py
        #[arg(long)]
        no_standalone: bool,
    },
    /// List the registered optimizers
    List {
        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the derived signature lists of one optimizer
    Show {
        /// Optimizer name
        optimizer: String,
        /// Memory backend: cuda (default) or cpu
        #[arg(long, default_value = "cuda")]
        backend: String,
        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate the built-in optimizer registry
    Validate,
}

/// Dispatch a parsed CLI subcommand to its handler
fn run_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Generate {
            output,
            config,
            optimizers,
            manifest,
            no_standalone,
        } => commands::generate::run(&commands::generate::GenerateArgs {
            output_dir: &output,
            config: config.as_deref(),
            optimizers: &optimizers,
            manifest,
            standalone: !no_standalone,
        }),
        Commands::List { format } => commands::list::run(OutputFormat::from_str(&format)?),
        Commands::Show {
            optimizer,
            backend,
            format,
        } => {
            let backend: Backend = backend.parse()?;
            commands::show::run(&optimizer, backend, OutputFormat::from_str(&format)?)
        }
        Commands::Validate => commands::validate::run(),
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// `warn` level.
fn init_logging(quiet: bool) {
    if quiet {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point: parse CLI arguments and run the selected subcommand
fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    if let Err(e) = run_command(cli.command) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
