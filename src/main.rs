//! # docqa CLI
//!
//! The `docqa` binary serves the upload/question-answering HTTP API and
//! offers a one-shot pipeline for answering a single question from the
//! command line.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! docqa serve --config ./config/docqa.toml
//!
//! # One-shot: index a PDF and answer a question, no server involved
//! docqa ask ./statement.pdf "What is the account number?"
//! ```
//!
//! Both commands read the same TOML configuration; a missing config file
//! falls back to built-in defaults. The `openai` providers require the
//! `OPENAI_API_KEY` environment variable.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::answer::create_chat_model;
use docqa::config;
use docqa::embedding::create_embedder;
use docqa::server::{run_server, AppState};
use docqa::session::Session;

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Upload a PDF and ask questions about its contents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (upload form, QA page, JSON API).
    Serve,

    /// Index a PDF and answer one question, printing answer and sources.
    Ask {
        /// Path to the PDF file.
        pdf: PathBuf,

        /// The question to answer from the document.
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let embedder = create_embedder(&cfg.embedding)?;
    let chat = create_chat_model(&cfg.chat)?;

    match cli.command {
        Commands::Serve => {
            run_server(AppState::new(cfg, embedder, chat)).await?;
        }
        Commands::Ask { pdf, question } => {
            let bytes = std::fs::read(&pdf)?;
            let name = pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| pdf.display().to_string());

            let session = Session::new();
            let segments = session
                .ingest(&cfg, embedder.as_ref(), &name, &bytes)
                .await?;
            eprintln!("Indexed {} segments from {}", segments, name);

            let answer = session
                .ask(embedder.as_ref(), chat.as_ref(), &question)
                .await?;

            println!("{}", answer.answer);
            for source in &answer.sources {
                eprintln!(
                    "source: {} page {} segment {}",
                    source.source, source.page, source.segment
                );
            }
        }
    }

    Ok(())
}
