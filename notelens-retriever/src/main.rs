use clap::{Parser, Subcommand};
use notelens_provider::{ChatModel, EmbeddingProvider, HttpChatClient, HttpEmbeddingClient};
use notelens_retriever::config::NotelensConfig;
use notelens_retriever::retrieval::conversation::{ConversationLog, TurnRole};
use notelens_retriever::retrieval::indexer::{Indexer, ReconcileOutcome};
use notelens_retriever::retrieval::reformulator::reformulate;
use notelens_retriever::retrieval::retriever::{ContextRetriever, build_answer_prompt};
use notelens_retriever::retrieval::source::FsNotesSource;
use notelens_retriever::store::VectorStore;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Semantic search and question answering over a directory of notes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Notes directory; also holds the .notelens.db database and the
    /// optional notelens.toml config.
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Explicit config file (defaults to <dir>/notelens.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the index with the notes on disk
    Index,
    /// Search the index and print the best-matching chunks
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Minimum similarity score to show
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Answer one question from the indexed notes
    Ask { question: String },
    /// Interactive question answering with conversation history
    Chat,
    /// Show index statistics
    Stats {
        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Delete every indexed chunk and the freshness ledger
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => NotelensConfig::load(path)?,
        None => NotelensConfig::load_or_default(&args.dir)?,
    };

    match args.command {
        Commands::Index => {
            let store = VectorStore::open(&args.dir).await?;
            let embedder = HttpEmbeddingClient::create(config.provider_config())?;
            let indexer = Indexer::new(store.clone(), Arc::new(embedder), config.indexer_config());

            let source = FsNotesSource::new(&args.dir);
            let ledger = store.load_ledger().await?;
            let outcome = indexer.reconcile(&source, ledger).await?;
            store.save_ledger(&outcome.ledger).await?;

            print_reconcile_summary(&outcome);
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            let store = VectorStore::open(&args.dir).await?;
            let embedder = HttpEmbeddingClient::create(config.provider_config())?;

            let query_embedding = embedder.embed(&query).await?;
            let top_k = limit.unwrap_or(config.retrieval.top_k);
            let mut hits = store.search(&query_embedding, top_k).await?;
            if let Some(threshold) = threshold {
                hits.retain(|hit| hit.score >= threshold);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No matching chunks.");
            } else {
                for hit in &hits {
                    println!("{:.3}  {}", hit.score, hit.source_path);
                    println!("       {}", preview(&hit.text, 120));
                }
            }
            Ok(())
        }
        Commands::Ask { question } => {
            let answer = answer_question(&args.dir, &config, &question, &ConversationLog::new()).await?;
            println!("{answer}");
            Ok(())
        }
        Commands::Chat => {
            let mut log = ConversationLog::new();
            let stdin = std::io::stdin();
            println!("Ask about your notes (blank line or \"exit\" to quit).");
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() || question == "exit" || question == "quit" {
                    break;
                }

                match answer_question(&args.dir, &config, question, &log).await {
                    Ok(answer) => {
                        println!("{answer}\n");
                        log.push(TurnRole::Asker, question);
                        log.push(TurnRole::Assistant, answer);
                    }
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Ok(())
        }
        Commands::Stats { json } => {
            let store = VectorStore::open(&args.dir).await?;
            let stats = store.stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Chunks:            {}", stats.chunks);
                println!("Tracked documents: {}", stats.tracked_documents);
            }
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("refusing to wipe the index without --yes");
            }
            let store = VectorStore::open(&args.dir).await?;
            store.clear().await?;
            println!("Index cleared.");
            Ok(())
        }
    }
}

/// Shared ask/chat flow: reformulate when history exists, retrieve, answer.
async fn answer_question(
    dir: &std::path::Path,
    config: &NotelensConfig,
    question: &str,
    log: &ConversationLog,
) -> anyhow::Result<String> {
    let store = VectorStore::open(dir).await?;
    let provider_config = config.provider_config();
    let embedder = HttpEmbeddingClient::create(provider_config.clone())?;
    let chat = HttpChatClient::create(provider_config)?;

    let query = if log.is_empty() {
        question.to_string()
    } else {
        reformulate(question, log, Some(&chat as &dyn ChatModel)).await
    };

    let retriever = ContextRetriever::new(store, Arc::new(embedder));
    let context = retriever.retrieve(&query, &config.retrieval_options()).await?;
    if context.is_empty() {
        return Ok("No sufficiently relevant notes found.".to_string());
    }

    let answer = chat.generate(&build_answer_prompt(&context, question)).await?;
    Ok(answer)
}

fn print_reconcile_summary(outcome: &ReconcileOutcome) {
    println!(
        "Indexed {} documents ({} chunks ok, {} failed); removed {} deleted documents.",
        outcome.reports.len(),
        outcome.chunks_ok(),
        outcome.chunks_failed(),
        outcome.removed.len()
    );
    for report in outcome.reports.iter().filter(|r| r.chunks_failed > 0) {
        println!(
            "  warning: {}: {}/{} chunks failed to embed",
            report.path,
            report.chunks_failed,
            report.chunks_failed + report.chunks_ok
        );
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}
