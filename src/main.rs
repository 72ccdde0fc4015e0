//! CLI entry point for craftpress

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "craftpress")]
#[command(version = "0.1.0")]
#[command(about = "Content API backend for a Minecraft community site", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to the configured server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to the configured server.host)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// List site content
    List {
        /// What to list (all, patch-notes, or a category name)
        #[arg(default_value = "all")]
        r#type: String,
    },

    /// Validate content front matter
    Check,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "craftpress=debug,info"
    } else {
        "craftpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Serve { port, ip } => {
            let site = craftpress::Site::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| site.config.server.host.clone());
            let port = port.unwrap_or(site.config.server.port);

            tracing::info!("Starting API server at http://{}:{}", ip, port);
            craftpress::server::start(&site, &ip, port).await?;
        }

        Commands::List { r#type } => {
            let site = craftpress::Site::new(&base_dir)?;
            craftpress::commands::list::run(&site, &r#type)?;
        }

        Commands::Check => {
            let site = craftpress::Site::new(&base_dir)?;
            craftpress::commands::check::run(&site)?;
        }

        Commands::Version => {
            println!("craftpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
