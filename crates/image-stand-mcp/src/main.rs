//! image-stand MCP server entry point.

use std::sync::Arc;
use tokio::sync::Mutex;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use image_stand::ScoreMethod;
use image_stand_mcp::config::{ExtractorKind, ServerConfig};
use image_stand_mcp::protocol::ProtocolHandler;
use image_stand_mcp::resources::ResourceRegistry;
use image_stand_mcp::session::StandSessionManager;
use image_stand_mcp::tools::ToolRegistry;
use image_stand_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "image-stand-mcp",
    about = "MCP server for image-stand: score how closely generated images recreate a reference",
    version
)]
struct Cli {
    /// Directory for generated artifacts (env: IMAGES_DIR).
    #[arg(long, global = true)]
    images_dir: Option<String>,

    /// Path to the CLIP ONNX model (env: IMAGE_STAND_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,

    /// Feature extractor behind the embedding and hybrid methods.
    #[arg(long, value_enum, default_value_t = ExtractorKind::Clip, global = true)]
    extractor: ExtractorKind,

    /// Log level (trace, debug, info, warn, error). RUST_LOG wins when set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server over stdio (default).
    Serve,

    /// Score two image files and print the comparison as JSON.
    Compare {
        /// Reference image.
        a: String,

        /// Candidate image.
        b: String,

        /// structural, embedding or hybrid. Defaults to SIMILARITY_MODEL.
        #[arg(long)]
        method: Option<String>,

        /// Strictness exponent in (0, 10]. Defaults to SIMILARITY_SENSITIVITY.
        #[arg(long)]
        sensitivity: Option<f32>,
    },

    /// Print server capabilities and effective configuration as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   image-stand-mcp completions bash > ~/.local/share/bash-completion/completions/image-stand-mcp
    ///   image-stand-mcp completions zsh > ~/.zfunc/_image-stand-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let resolve = || {
        ServerConfig::resolve(cli.images_dir.as_deref(), cli.model.as_deref(), cli.extractor)
            .context("invalid configuration")
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = resolve()?;
            tracing::info!("image-stand MCP server");
            tracing::info!("Images: {}", config.images_dir.display());
            let session = StandSessionManager::open(&config)?;
            let handler = ProtocolHandler::new(Arc::new(Mutex::new(session)));
            StdioTransport::new(handler).run().await?;
        }

        Commands::Compare {
            a,
            b,
            method,
            sensitivity,
        } => {
            let config = resolve()?;
            let method = match method {
                Some(m) => m.parse::<ScoreMethod>()?,
                None => config.scoring.method,
            };
            let sensitivity = match sensitivity {
                Some(s) => image_stand::Sensitivity::new(s)?,
                None => config.scoring.sensitivity,
            };
            let extractor = if method.needs_embedding() {
                Some(config.load_extractor()?)
            } else {
                None
            };
            let engine = config.scoring.engine(extractor);

            let reference = std::fs::read(&a).with_context(|| format!("reading {a}"))?;
            let candidate = std::fs::read(&b).with_context(|| format!("reading {b}"))?;
            let comparison = engine.compare(&reference, &candidate, method, sensitivity)?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }

        Commands::Info => {
            let config = resolve()?;
            let capabilities = image_stand_mcp::types::InitializeResult::for_server();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "resources": ResourceRegistry::list_resources()
                    .iter()
                    .map(|r| r.uri.clone())
                    .collect::<Vec<_>>(),
                "images_dir": config.images_dir.display().to_string(),
                "model": config.model_path.display().to_string(),
                "extractor": config.extractor,
                "scoring": config.scoring,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "image-stand-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
