//! sift - semantic retrieval over embedded document chunks
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cli::Cli;

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    // Results go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sift=info,sift_retrieval=info".into()),
        )
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();
    handlers::run(cli).await
}
