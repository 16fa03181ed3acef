use std::sync::Arc;

use clap::Parser;
use common::utils::{config::get_config, embedding::EmbeddingProvider};
use query_engine::{bible_profile, quran_profile, RagEngine};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Builds the persisted vector indexes for both corpora ahead of
/// interactive use. No generator credential is needed for this step.
#[derive(Parser, Debug)]
#[command(about = "Provision the Bible and Quran vector indexes")]
struct Args {
    /// Rebuild the indexes even when persisted copies already exist.
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();
    let config = get_config()?;

    let provider = Arc::new(EmbeddingProvider::from_config(&config).await?);
    info!(
        embedding_backend = provider.backend_label(),
        embedding_dimension = provider.dimension(),
        "embedding provider initialized"
    );

    for profile in [bible_profile(&config), quran_profile(&config)] {
        let name = profile.name;
        let mut engine = RagEngine::new(profile, config.clone(), Arc::clone(&provider), None);

        if args.force {
            info!(corpus = name, "forcing index rebuild");
            engine.force_reinitialize().await?;
        } else {
            engine.initialize().await?;
        }

        info!(corpus = name, "index ready");
    }

    Ok(())
}
