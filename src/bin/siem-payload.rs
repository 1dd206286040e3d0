//! SIEM payload CLI
//!
//! Command-line interface for shaping and sending detection rule payloads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use siem_payload::{
    encode_document, encode_document_pretty, fingerprint, load_document, prepare, Document,
    Operation, PrepareOptions, ResourceKind,
};

#[derive(Parser)]
#[command(name = "siem-payload")]
#[command(about = "Shape detection rule and exception list payloads")]
#[command(version)]
struct Cli {
    /// Log rule decisions to stderr (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ShapeArgs {
    /// Resource document (JSON, or a JSON string wrapping it)
    file: PathBuf,

    /// Resource kind: rule, exception-list or exception-item
    #[arg(long, short, value_parser = parse_kind)]
    kind: ResourceKind,

    /// Operation to shape for: create or update
    #[arg(long, short, value_parser = parse_operation)]
    op: Operation,

    /// Locally tracked id (used on update)
    #[arg(long)]
    id: Option<String>,

    /// Exception container id to link
    #[arg(long)]
    exception_container_id: Option<String>,

    /// Exception container list_id to link
    #[arg(long)]
    exception_list_id: Option<String>,

    /// Exception container type (e.g. detection)
    #[arg(long)]
    exception_type: Option<String>,
}

impl ShapeArgs {
    fn options(&self) -> PrepareOptions {
        PrepareOptions {
            kind: self.kind,
            operation: self.op,
            tracked_id: self.id.clone(),
            exception_container_id: self.exception_container_id.clone(),
            exception_list_id: self.exception_list_id.clone(),
            exception_type: self.exception_type.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the payload that would be sent for a document
    Prepare {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the content fingerprint of a document
    Fingerprint {
        /// Document file
        file: PathBuf,
    },

    /// Shape a document and send it to the API
    #[cfg(feature = "remote")]
    Apply {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Client config file (default: SIEM_* environment variables)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Prepare {
            shape,
            output,
            pretty,
        } => run_prepare(&shape, output, pretty),

        Commands::Fingerprint { file } => run_fingerprint(&file),

        #[cfg(feature = "remote")]
        Commands::Apply {
            shape,
            config,
            pretty,
        } => run_apply(&shape, config.as_deref(), pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_kind(s: &str) -> Result<ResourceKind, String> {
    ResourceKind::parse(s).ok_or_else(|| {
        format!("unknown kind \"{}\": expected rule, exception-list or exception-item", s)
    })
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    Operation::parse(s).ok_or_else(|| format!("unknown operation \"{}\": expected create or update", s))
}

fn load_and_shape(shape: &ShapeArgs) -> Result<Document, u8> {
    let doc = load_document(&shape.file).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    prepare(doc, &shape.options()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn render(doc: &Document, pretty: bool) -> String {
    if pretty {
        encode_document_pretty(doc)
    } else {
        String::from_utf8_lossy(&encode_document(doc)).into_owned()
    }
}

fn run_prepare(shape: &ShapeArgs, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let payload = load_and_shape(shape)?;
    let json_output = render(&payload, pretty);

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_fingerprint(file: &Path) -> Result<(), u8> {
    let doc = load_document(file).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    println!("{}", fingerprint(&doc));
    Ok(())
}

#[cfg(feature = "remote")]
fn run_apply(shape: &ShapeArgs, config: Option<&Path>, pretty: bool) -> Result<(), u8> {
    use siem_payload::{prepare_document, ClientConfig, HttpTransport, Transport};

    let doc = load_document(&shape.file).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    // One request per resource: the endpoints take a single document.
    let payload = prepare_document(doc, &shape.options()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let config = match config {
        Some(path) => ClientConfig::load(path),
        None => ClientConfig::from_env(),
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let transport = HttpTransport::new(config).map_err(|e| {
        eprintln!("Error: {}", e);
        3u8
    })?;

    let path = shape.kind.api_path();
    let response = match shape.op {
        Operation::Create => transport.post(path, &payload),
        Operation::Update => transport.put(path, &payload),
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        3u8
    })?;

    println!("{}", render(&response, pretty));
    Ok(())
}
