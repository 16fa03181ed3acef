use std::io::Write;
use std::sync::Arc;

use common::utils::{config::get_config, embedding::EmbeddingProvider};
use query_engine::{bible_profile, quran_profile, AnswerGenerator, OpenAiGenerator, RagEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let provider = Arc::new(EmbeddingProvider::from_config(&config).await?);
    info!(
        embedding_backend = provider.backend_label(),
        embedding_dimension = provider.dimension(),
        "embedding provider initialized"
    );

    let generator = OpenAiGenerator::from_config(&config)
        .map(|generator| Arc::new(generator) as Arc<dyn AnswerGenerator>);
    if generator.is_none() {
        warn!("OPENAI_API_KEY is not set; retrieval works but answers are disabled");
    }

    let mut bible = RagEngine::new(
        bible_profile(&config),
        config.clone(),
        Arc::clone(&provider),
        generator.clone(),
    );
    let mut quran = RagEngine::new(quran_profile(&config), config.clone(), provider, generator);

    info!("initializing Bible engine");
    bible.initialize().await?;
    info!("initializing Quran engine");
    quran.initialize().await?;

    println!("Holy Query - ask about either corpus.");
    println!("  bible: what does it say about forgiveness?");
    println!("  quran: what does it teach about charity?");
    println!("Type `exit` to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = if let Some(question) = line.strip_prefix("bible:") {
            bible.query(question.trim()).await
        } else if let Some(question) = line.strip_prefix("quran:") {
            quran.query(question.trim()).await
        } else {
            println!("Prefix your question with `bible:` or `quran:`.");
            continue;
        };

        match answer {
            Ok(text) => println!("\n{text}\n"),
            Err(err) => println!("\n{err}\n"),
        }
    }

    Ok(())
}
