//! HTTP server for star type prediction.

use anyhow::Result;
use clap::Parser;
use starclass_server::{ArtifactArgs, ServerArgs};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP service predicting star types from physical measurements")]
struct Args {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("Loading artifacts...");
    let pipeline = args.artifacts.load_pipeline()?;

    info!("Starting prediction server...");
    starclass_server::run_server(pipeline, args.server).await
}
