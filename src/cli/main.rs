use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use object_model_converter::cli::CliError;
use object_model_converter::cli::commands::convert::{ConvertCommand, handle_convert};
use object_model_converter::cli::commands::inspect::handle_inspect;
use object_model_converter::export::OutputEncoding;

/// Convert object graphs into document, property-graph and columnar outputs
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Encoding {
    Json,
    Yaml,
}

impl From<Encoding> for OutputEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Json => OutputEncoding::Json,
            Encoding::Yaml => OutputEncoding::Yaml,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a model file into one or more target formats
    Convert {
        /// Model file (JSON or YAML), or `-` for JSON on stdin
        input: String,

        /// Target formats: document, graph, columnar (default: all)
        #[arg(short, long, value_delimiter = ',')]
        format: Vec<String>,

        /// Write outputs under this directory instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML file with conversion options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Root identities (default: the model's declared roots)
        #[arg(short, long, value_delimiter = ',')]
        roots: Vec<String>,

        /// Output file encoding
        #[arg(long, value_enum, default_value = "json")]
        encoding: Encoding,

        /// Emit stub records for missing reference targets
        #[arg(long)]
        stub_unresolved: bool,

        /// Exit with an error when any entity fails
        #[arg(long)]
        strict: bool,
    },

    /// Show relation kinds and edge classifications for a model
    Inspect {
        /// Model file (JSON or YAML), or `-` for JSON on stdin
        input: String,

        /// TOML file with conversion options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Root identities (default: the model's declared roots)
        #[arg(short, long, value_delimiter = ',')]
        roots: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so converted output on stdout stays pipeable
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("object_model_converter=warn")),
        1 => EnvFilter::new("object_model_converter=info"),
        _ => EnvFilter::new("object_model_converter=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(code as u8)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Convert {
            input,
            format,
            output,
            config,
            roots,
            encoding,
            stub_unresolved,
            strict,
        } => {
            handle_convert(&ConvertCommand {
                input: input.clone(),
                formats: format,
                output_dir: output,
                config,
                roots,
                encoding: encoding.into(),
                stub_unresolved,
                strict,
            })
            .with_context(|| format!("converting {}", input))?;
        }
        Commands::Inspect {
            input,
            config,
            roots,
        } => handle_inspect(&input, config, &roots)
            .with_context(|| format!("inspecting {}", input))?,
    }
    Ok(())
}
