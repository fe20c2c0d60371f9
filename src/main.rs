use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use gritbin::api::create_router;
use gritbin::config::CONFIG;
use gritbin::data_models::PostcodeInput;
use gritbin::finder::{ChromeFinder, GritBinTool};

#[derive(Parser)]
#[command(name = "gritbin", about = "Find the nearest grit bin on the grit bin finder map")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a single postcode and print the tool response as JSON
    Find {
        postcode: String,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Serve the tool over HTTP
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = CONFIG.clone();

    match cli.command {
        Command::Find { postcode, headful } => {
            if headful {
                config.headless = false;
            }
            let finder = ChromeFinder::new(config);
            let response = finder
                .view_gritbins_on_map(PostcodeInput { postcode })
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.addr.clone());
            let finder: Arc<dyn GritBinTool> = Arc::new(ChromeFinder::new(config));
            let app = create_router(finder);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!("listening on {addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
