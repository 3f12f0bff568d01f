mod cli;
mod config;
mod genai;
mod model;
mod pipeline;
mod stores;
mod tracker;
mod util;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storepulse=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;
    cli::run(command, &config).await
}
