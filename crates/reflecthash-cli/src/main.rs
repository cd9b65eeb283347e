//! Reflecthash CLI - hash schema-typed messages and JSON documents from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{hash, json_hash, normalize_float};

#[derive(Parser)]
#[command(name = "reflecthash", version)]
#[command(about = "Deterministic content digests for schema-typed messages")]
struct Cli {
    /// Log more detail to stderr. Repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a JSON-encoded message against a schema
    Hash {
        /// Path to the JSON schema document
        #[arg(long)]
        schema: String,
        /// Fully qualified message type, e.g. `pkg.Message`
        #[arg(long = "type")]
        type_name: String,
        /// Key fields by name instead of by number
        #[arg(long)]
        field_names: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Input message file (or stdin if not provided)
        input: Option<String>,
    },
    /// Hash arbitrary JSON with the reference scheme
    JsonHash {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Print the canonical string of a floating point value
    NormalizeFloat {
        /// Value to normalize (accepts `NaN`, `inf`, `-inf`)
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Round to single precision first
        #[arg(long)]
        single: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Hash {
            schema,
            type_name,
            field_names,
            json,
            input,
        } => hash::run(schema, type_name, field_names, json, input),
        Commands::JsonHash { json, input } => json_hash::run(json, input),
        Commands::NormalizeFloat { value, single } => normalize_float::run(value, single),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
