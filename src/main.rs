mod agent;
mod config;
mod ingest;
mod llm;
mod search;
mod speech;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use agent::Assistant;
use config::Config;
use ingest::doi::CrossrefClient;
use search::SortMode;
use speech::SpeechClient;

#[derive(Parser)]
#[command(
    name = "paper-scout",
    about = "Research paper summarizer, classifier, and cross-topic synthesizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a local PDF, optionally classifying it against a topic list
    Summarize {
        /// Path to the PDF file
        path: PathBuf,
        /// Comma-separated candidate topics to classify against
        #[arg(long)]
        topics: Option<String>,
        /// Write a spoken rendition of the summary to this MP3 file
        #[arg(long, value_name = "FILE")]
        speak: Option<PathBuf>,
    },
    /// Download a PDF from a direct URL and summarize it
    Url {
        url: String,
        #[arg(long, value_name = "FILE")]
        speak: Option<PathBuf>,
    },
    /// Look up a DOI on CrossRef; summarize the full text when a PDF link exists
    Doi { doi: String },
    /// Search arXiv for papers
    Search {
        query: String,
        /// Number of results
        #[arg(short = 'n', long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=10))]
        max_results: u32,
        #[arg(long, value_enum, default_value_t = SortMode::Relevance)]
        sort: SortMode,
    },
    /// Synthesize one narrative from several papers on a topic
    Synthesize {
        topic: String,
        /// Number of papers to draw on
        #[arg(short = 'n', long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(2..=10))]
        papers: u32,
        #[arg(long, value_enum, default_value_t = SortMode::Relevance)]
        sort: SortMode,
        /// Write a spoken rendition of the synthesis to this MP3 file
        #[arg(long, value_name = "FILE")]
        speak: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let assistant = Assistant::new(&config);
    let http = reqwest::Client::new();

    match cli.command {
        Commands::Summarize { path, topics, speak } => {
            let bytes = std::fs::read(&path)
                .context(format!("Failed to read {}", path.display()))?;
            let text = ingest::extract_text(&bytes)?;
            let summary = assistant.summarizer.summarize(&text).await?;
            println!("{summary}");

            if let Some(topics) = topics {
                let labels: Vec<String> = topics
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                let matched = assistant.classifier.classify(&text, &labels).await?;
                if matched.is_empty() {
                    println!("\nPredicted topics: none of the candidates matched");
                } else {
                    println!("\nPredicted topics: {}", matched.join(", "));
                }
            }

            if let Some(out) = speak {
                save_speech(&summary, &out).await?;
            }
        }
        Commands::Url { url, speak } => {
            let text = ingest::extract_text_from_url(&http, &url).await?;
            let summary = assistant.summarizer.summarize(&text).await?;
            println!("{summary}");

            if let Some(out) = speak {
                save_speech(&summary, &out).await?;
            }
        }
        Commands::Doi { doi } => {
            let meta = CrossrefClient::new().lookup(&doi).await?;
            println!("{}", meta.title);
            println!("Authors: {}", meta.authors.join(", "));
            println!("\n{}", meta.abstract_text);

            match meta.pdf_link {
                Some(link) => {
                    let text = ingest::extract_text_from_url(&http, &link).await?;
                    let summary = assistant.summarizer.summarize(&text).await?;
                    println!("\nSummary:\n{summary}");
                }
                None => println!("\nNo full-text PDF link on CrossRef; metadata only."),
            }
        }
        Commands::Search { query, max_results, sort } => {
            let papers = assistant.search_papers(&query, max_results, sort).await?;
            if papers.is_empty() {
                println!("No results found.");
            }
            for paper in papers {
                println!("{}", paper.title);
                println!("  Published: {}", paper.published);
                println!("  Authors: {}", paper.authors.join(", "));
                println!("  {}...", agent::truncate_chars(&paper.summary, 500));
                println!("  PDF: {}\n", paper.pdf_url);
            }
        }
        Commands::Synthesize { topic, papers, sort, speak } => {
            // Ctrl-C aborts outstanding completion calls instead of hanging.
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_cancel.cancel();
                }
            });

            let result = assistant
                .synthesize_topic(&topic, papers, sort, &cancel)
                .await?;

            println!("{}\n", result.narrative);
            if result.skipped > 0 {
                eprintln!(
                    "Note: {} paper(s) dropped after summarization failures.\n",
                    result.skipped
                );
            }
            println!("Papers used:");
            for paper in &result.papers_used {
                println!("- {} ({})", paper.title, paper.published);
                println!("  Authors: {}", paper.authors.join(", "));
                println!("  PDF: {}", paper.url);
            }

            if let Some(out) = speak {
                save_speech(&result.narrative, &out).await?;
            }
        }
    }

    Ok(())
}

async fn save_speech(text: &str, out: &Path) -> Result<()> {
    let audio = SpeechClient::new().render(text).await?;
    std::fs::write(out, &audio).context(format!("Failed to write {}", out.display()))?;
    println!("Audio written to {}", out.display());
    Ok(())
}
