//! CLI for the marquise time-series spool client.
//!
//! Provides commands for hashing identifiers, queueing datapoints and
//! source dictionaries, and inspecting a namespace's spool.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use marquise::{AddressSpec, Marquise, SourceDict};

/// marquise — time-series spool client CLI.
#[derive(Parser)]
#[command(name = "marquise", version, about)]
struct Cli {
    /// Spool base directory (defaults to $MARQUISE_SPOOL_DIR, then
    /// /var/spool/marquise).
    #[arg(long, global = true)]
    spool_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the 64-bit address for a textual identifier.
    Hash {
        /// The identifier to hash.
        identifier: String,
    },

    /// Queue a simple (64-bit numeric) datapoint.
    SendSimple {
        /// Target namespace.
        namespace: String,

        /// Explicit 64-bit address.
        #[arg(long)]
        address: Option<u64>,

        /// Textual identifier hashed to an address.
        #[arg(long)]
        source: Option<String>,

        /// Timestamp in nanoseconds since epoch (defaults to now).
        #[arg(long)]
        timestamp: Option<u64>,

        /// The value to record.
        #[arg(long)]
        value: u64,
    },

    /// Queue an extended (string) datapoint.
    SendExtended {
        /// Target namespace.
        namespace: String,

        /// Explicit 64-bit address.
        #[arg(long)]
        address: Option<u64>,

        /// Textual identifier hashed to an address.
        #[arg(long)]
        source: Option<String>,

        /// Timestamp in nanoseconds since epoch (defaults to now).
        #[arg(long)]
        timestamp: Option<u64>,

        /// The string value to record.
        #[arg(long)]
        value: String,
    },

    /// Submit a source dictionary for an address.
    UpdateSource {
        /// Target namespace.
        namespace: String,

        /// Explicit 64-bit address.
        #[arg(long)]
        address: Option<u64>,

        /// Textual identifier hashed to an address.
        #[arg(long)]
        source: Option<String>,

        /// Metadata pairs as key=value.
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Display spool metadata for a namespace.
    Info {
        /// Target namespace.
        namespace: String,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for the info command.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let spool_dir = cli
        .spool_dir
        .unwrap_or_else(marquise::spool::default_spool_dir);

    let result = match cli.command {
        Commands::Hash { identifier } => cmd_hash(&identifier),
        Commands::SendSimple {
            namespace,
            address,
            source,
            timestamp,
            value,
        } => cmd_send_simple(&spool_dir, &namespace, address, source.as_deref(), timestamp, value),
        Commands::SendExtended {
            namespace,
            address,
            source,
            timestamp,
            value,
        } => cmd_send_extended(
            &spool_dir,
            &namespace,
            address,
            source.as_deref(),
            timestamp,
            &value,
        ),
        Commands::UpdateSource {
            namespace,
            address,
            source,
            pairs,
        } => cmd_update_source(&spool_dir, &namespace, address, source.as_deref(), &pairs),
        Commands::Info { namespace, format } => cmd_info(&spool_dir, &namespace, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `marquise hash <identifier>`.
fn cmd_hash(identifier: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", marquise::hash_identifier(identifier));
    Ok(())
}

/// Implements `marquise send-simple <namespace> --value <n>`.
fn cmd_send_simple(
    spool_dir: &Path,
    namespace: &str,
    address: Option<u64>,
    source: Option<&str>,
    timestamp: Option<u64>,
    value: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = AddressSpec::from_parts(address, source)?;
    let mut handle = Marquise::with_spool_dir(namespace, spool_dir)?;

    let accepted = handle.send_simple(&spec, timestamp, value)?;
    report_send(spec.resolve(), accepted);

    handle.close();
    Ok(())
}

/// Implements `marquise send-extended <namespace> --value <string>`.
fn cmd_send_extended(
    spool_dir: &Path,
    namespace: &str,
    address: Option<u64>,
    source: Option<&str>,
    timestamp: Option<u64>,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = AddressSpec::from_parts(address, source)?;
    let mut handle = Marquise::with_spool_dir(namespace, spool_dir)?;

    let accepted = handle.send_extended(&spec, timestamp, value)?;
    report_send(spec.resolve(), accepted);

    handle.close();
    Ok(())
}

/// Implements `marquise update-source <namespace> key=value...`.
fn cmd_update_source(
    spool_dir: &Path,
    namespace: &str,
    address: Option<u64>,
    source: Option<&str>,
    pairs: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = AddressSpec::from_parts(address, source)?;

    let mut parsed = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("Metadata pair '{pair}' is not key=value").into());
        };
        parsed.push((key, value));
    }
    let metadata = SourceDict::from_pairs(parsed)?;

    let mut handle = Marquise::with_spool_dir(namespace, spool_dir)?;
    handle.update_source(&spec, &metadata)?;
    println!(
        "Submitted {} metadata pair(s) for address {}",
        metadata.len(),
        spec.resolve()
    );

    handle.close();
    Ok(())
}

/// Implements `marquise info <namespace>`.
fn cmd_info(
    spool_dir: &Path,
    namespace: &str,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let meta_path = spool_dir.join(namespace).join("meta.json");
    if !meta_path.exists() {
        return Err(format!(
            "No spool found for namespace '{namespace}' under '{}'",
            spool_dir.display()
        )
        .into());
    }

    let meta_data = std::fs::read_to_string(&meta_path)?;
    let meta: serde_json::Value = serde_json::from_str(&meta_data)?;

    match format {
        OutputFormat::Text => {
            println!("Namespace: {}", meta["namespace"].as_str().unwrap_or("?"));
            println!(
                "Points spool:   {}",
                meta["spool_path_points"].as_str().unwrap_or("?")
            );
            println!(
                "Contents spool: {}",
                meta["spool_path_contents"].as_str().unwrap_or("?")
            );

            for key in ["spool_path_points", "spool_path_contents"] {
                if let Some(path) = meta[key].as_str()
                    && let Ok(metadata) = std::fs::metadata(path)
                {
                    println!("  {} ({} bytes)", path, metadata.len());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
    }

    Ok(())
}

/// Prints the outcome of a send.
fn report_send(address: u64, accepted: bool) {
    if accepted {
        println!("Queued datapoint for address {address}");
    } else {
        println!("Spool refused datapoint for address {address}");
    }
}
