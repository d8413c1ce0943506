//! Question Search Server Entry Point
//!
//! Loads the dataset into a vector index, then serves the search page and the
//! `/api/search` endpoint over HTTP.

use std::sync::Arc;

use clap::Parser;
use question_search_server::startup::build_search;
use question_search_server::{Args, HttpServer, SearchApp, ServerResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // .env is optional
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "question_search_server=info,question_index=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Question search server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> ServerResult<()> {
    tracing::info!(
        "Starting question search ({:?} backend, index '{}')",
        args.backend,
        args.index_name
    );

    let search = build_search(&args).await?;
    let server = HttpServer::bind(args.bind)?;
    if let Some(addr) = server.local_addr() {
        tracing::info!("Listening on http://{}", addr);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };

    server.serve(Arc::new(SearchApp::new(search)), shutdown).await
}
