mod app;
mod config;
mod document;
mod embedding;
mod error;
mod llm;
mod pipeline;
mod prompt;
mod retriever;
mod splitter;
mod vector_db;

use config::RagConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let config = match RagConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            for line in err.report(&RagConfig::default()) {
                eprintln!("{line}");
            }
            std::process::exit(err.exit_code());
        }
    };

    match app::run(&config).await {
        Ok(end) => tracing::debug!(?end, "session finished"),
        Err(err) => {
            tracing::debug!(error = ?err, kind = ?err.kind(), "fatal error");
            for line in err.report(&config) {
                eprintln!("{line}");
            }
            std::process::exit(err.exit_code());
        }
    }
}
