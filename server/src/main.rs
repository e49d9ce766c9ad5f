use anyhow::Result;
use axum::Router;
use clap::{Parser, Subcommand};
use querium_core::{FieldBoosts, SearchOptions};
use server::{build_app, load_engine, repl};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /search over HTTP
    Serve {
        /// Index snapshot path
        #[arg(long, default_value = "./index.json")]
        index: PathBuf,
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Interactive query loop on stdin
    Repl {
        /// Index snapshot path
        #[arg(long, default_value = "./index.json")]
        index: PathBuf,
        /// Number of results per query
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Rank by BM25 only, without PageRank fusion
        #[arg(long, default_value_t = false)]
        no_pagerank: bool,
        /// Field boosts, e.g. title=4,body=3,url=1
        #[arg(long)]
        boosts: Option<FieldBoosts>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Args::parse();

    match args.command {
        Command::Serve { index, host, port } => {
            let app: Router = build_app(&index)?;
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(%addr, "server listening");
            axum::serve(listener, app).await?;
        }
        Command::Repl { index, top_k, no_pagerank, boosts } => {
            let engine = load_engine(&index)?;
            let options = SearchOptions {
                top_k,
                use_page_rank: !no_pagerank,
                field_boosts: boosts.unwrap_or_default(),
            };
            let stdin = std::io::stdin();
            repl::run(&engine, &options, stdin.lock(), std::io::stdout())?;
        }
    }
    Ok(())
}
