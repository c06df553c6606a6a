use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, stored_config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use termrank_core::persist::IndexPaths;
use termrank_core::IndexError;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory written by the indexer; index settings come from its meta.json
    #[arg(long, default_value = "./data")]
    data: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let paths = IndexPaths::new(&args.data);
    let config = stored_config(&paths);
    config.validate()?;
    let store = Arc::new(paths.open_store()?);
    let state = AppState::new(store.clone(), store, config, std::env::var("ADMIN_TOKEN").ok());

    // An empty corpus is not fatal: search answers 503 until documents are posted.
    match state.rebuild() {
        Ok(snapshot) => tracing::info!(num_docs = snapshot.index.num_docs(), "index ready"),
        Err(e @ (IndexError::EmptyCorpus | IndexError::EmptyVocabulary)) => tracing::warn!(error = %e, "starting without an index"),
        Err(e) => return Err(e.into()),
    }

    let app: Router = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
