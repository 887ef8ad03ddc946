//! envelope - assemble e-signature envelopes from request bodies
//!
//! Reads a claim or purchase request body and an optional extension listing
//! from disk and prints the envelope that would be sent to the signing
//! platform. Nothing is sent.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use envelope_core::{
    has_all_required_extensions, parse_extensions, ClaimInput, EnvelopeAssembler,
    EnvelopeDescriptor, ExtensionDescriptor, PurchaseRequest, TemplateRenderer,
};
use envelope_runtime::RuntimeConfig;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// envelope - assemble e-signature envelopes
#[derive(Parser, Debug)]
#[command(name = "envelope")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log assembly steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an envelope from a request body
    #[command(subcommand)]
    Assemble(AssembleCommands),

    /// Report whether an extension listing supports the verified flows
    Extensions {
        /// Tab-group listing as returned by the connected-fields API
        #[arg(long)]
        extensions: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum AssembleCommands {
    /// Insurance claim envelope
    Claim(AssembleArgs),

    /// Insurance purchase envelope with payment
    Purchase(AssembleArgs),
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// Request body (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Tab-group listing; required unless the body sets useWithoutExtension
    #[arg(short, long)]
    extensions: Option<PathBuf>,

    /// Template and logo directory
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Runtime configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Client user id for the embedded signer
    #[arg(long)]
    signer_client_id: Option<String>,

    /// Return URL for the signing session
    #[arg(long)]
    return_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionsReport {
    are_extensions_present: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let output = match &cli.command {
        Commands::Assemble(AssembleCommands::Claim(args)) => {
            to_json(&assemble_claim(args)?, cli.pretty)?
        }
        Commands::Assemble(AssembleCommands::Purchase(args)) => {
            to_json(&assemble_purchase(args)?, cli.pretty)?
        }
        Commands::Extensions { extensions } => {
            let extensions = load_extensions(extensions)?;
            let report = ExtensionsReport {
                are_extensions_present: has_all_required_extensions(&extensions),
            };
            to_json(&report, cli.pretty)?
        }
    };

    println!("{}", output);
    Ok(())
}

fn assemble_claim(args: &AssembleArgs) -> Result<EnvelopeDescriptor> {
    let config = runtime_config(args)?;
    let claim = ClaimInput::from_json(&read_json(&args.input)?)?;
    let extensions = extensions_for(args, claim.use_without_extension)?;

    let envelope = assembler(&config).assemble_claim(
        &claim,
        &config.envelope_args(args.return_url.as_deref()),
        extensions.as_deref(),
    )?;
    info!(subject = %envelope.email_subject, "Assembled claim envelope");
    Ok(envelope)
}

fn assemble_purchase(args: &AssembleArgs) -> Result<EnvelopeDescriptor> {
    let config = runtime_config(args)?;
    let gateway = config.gateway()?;
    let request = PurchaseRequest::from_json(&read_json(&args.input)?)?;
    let extensions = extensions_for(args, request.use_without_extension)?;

    let envelope = assembler(&config).assemble_purchase(
        &request,
        &config.envelope_args(args.return_url.as_deref()),
        gateway,
        extensions.as_deref(),
    )?;
    info!(subject = %envelope.email_subject, "Assembled purchase envelope");
    Ok(envelope)
}

/// Configuration file and environment, then command-line overrides.
fn runtime_config(args: &AssembleArgs) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::load(args.config.as_deref())?;

    if let Some(assets) = &args.assets {
        config.assets_dir = Some(assets.clone());
    }
    if let Some(id) = &args.signer_client_id {
        config.signer_client_id = id.clone();
    }

    debug!(assets = %config.assets_dir().display(), "Loaded configuration");
    Ok(config)
}

fn assembler(config: &RuntimeConfig) -> EnvelopeAssembler {
    EnvelopeAssembler::new(TemplateRenderer::from_dir(config.assets_dir()), config.payment)
}

fn extensions_for(
    args: &AssembleArgs,
    use_without_extension: bool,
) -> Result<Option<Vec<ExtensionDescriptor>>> {
    if use_without_extension {
        return Ok(None);
    }
    let path = args
        .extensions
        .as_deref()
        .context("--extensions is required unless useWithoutExtension is set")?;
    load_extensions(path).map(Some)
}

fn load_extensions(path: &Path) -> Result<Vec<ExtensionDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_extensions(&content)
        .with_context(|| format!("Invalid extension listing in {}", path.display()))
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assemble_claim() {
        let cli = Cli::try_parse_from([
            "envelope",
            "assemble",
            "claim",
            "--input",
            "claim.json",
            "--extensions",
            "ext.json",
            "--return-url",
            "https://cb",
            "--pretty",
        ])
        .unwrap();

        assert!(cli.pretty);
        match cli.command {
            Commands::Assemble(AssembleCommands::Claim(args)) => {
                assert_eq!(args.input, PathBuf::from("claim.json"));
                assert_eq!(args.extensions, Some(PathBuf::from("ext.json")));
                assert_eq!(args.return_url.as_deref(), Some("https://cb"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_extensions_report_shape() {
        let report = ExtensionsReport {
            are_extensions_present: true,
        };
        assert_eq!(to_json(&report, false).unwrap(), r#"{"areExtensionsPresent":true}"#);
    }
}
