//! # Storybot CLI
//!
//! The `storybot` binary bundles the story backend, the index builder, and
//! a terminal chat client.
//!
//! ## Usage
//!
//! ```bash
//! storybot --config ./config/storybot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `storybot index` | Build the embedding index from the corpus directory |
//! | `storybot search "<query>"` | Nearest-neighbor lookup over the index |
//! | `storybot ask "<question>"` | One-shot question against the backend |
//! | `storybot chat` | Interactive chat session against the backend |
//! | `storybot demo` | Play the scripted demo conversation |
//! | `storybot history` | Show past story transcripts |
//! | `storybot serve` | Start the story backend HTTP server |

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use storybot::backend::BackendClient;
use storybot::config;
use storybot::context::{load_index, RetrievalContext};
use storybot::retriever::search_similar_text;
use storybot::session::{follow_up_suggestion, ChatSession};
use storybot::{demo, history, ingest, server};

/// Storybot — backend, retrieval engine, and terminal client for a
/// children's storytelling assistant.
#[derive(Parser)]
#[command(
    name = "storybot",
    about = "Storybot — backend, retrieval engine, and terminal client for a children's storytelling assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/storybot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the embedding index from the corpus directory.
    ///
    /// Walks `[index].corpus_root` for md/txt/pdf files, chunks and embeds
    /// their text, and writes the index JSON to `[index].path`. Requires an
    /// embedding provider to be configured.
    Index,

    /// Nearest-neighbor lookup over the index.
    ///
    /// Embeds the query with the configured provider and prints the top-k
    /// matches with their distances (0 = identical).
    Search {
        /// The search query string.
        query: String,

        /// Number of results to return (defaults to `[retrieval].top_k`).
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// One-shot question against the story backend.
    Ask {
        /// The question to ask.
        question: String,

        /// Write the illustration (if one was generated) to this PNG file.
        #[arg(long)]
        save_image: Option<PathBuf>,
    },

    /// Interactive chat session against the story backend.
    ///
    /// Reads questions line by line; `exit` or an empty line ends the
    /// session.
    Chat,

    /// Play the scripted demo conversation.
    Demo {
        /// Skip the typing pauses.
        #[arg(long)]
        fast: bool,
    },

    /// Show past story transcripts, grouped by day.
    History,

    /// Start the story backend HTTP server.
    ///
    /// Serves `/chat`, `/generate-image`, `/api/pdf-index`, and `/health`
    /// on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Demo and history work without a config file on disk
    match &cli.command {
        Commands::Demo { fast } => {
            demo::run_demo(*fast).await;
            return Ok(());
        }
        Commands::History => {
            let cfg =
                config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            let days = match &cfg.history.path {
                Some(path) => history::load_history(path)?,
                None => history::sample_history(),
            };
            history::render_history(&days);
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index => {
            ingest::run_index_build(&cfg).await?;
        }
        Commands::Search { query, k } => {
            let ctx = RetrievalContext::initialize(&cfg).await?;
            let k = k.unwrap_or(cfg.retrieval.top_k);
            let hits = search_similar_text(
                ctx.provider.as_ref(),
                &cfg.embedding,
                &ctx.index,
                &query,
                k,
            )
            .await?;

            if hits.indices.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (rank, ((idx, dist), text)) in hits
                .indices
                .iter()
                .zip(hits.distances.iter())
                .zip(hits.texts.iter())
                .enumerate()
            {
                println!("{}. [distance {:.4}] entry {}", rank + 1, dist, idx);
                println!("    \"{}\"", text.replace('\n', " ").trim());
                println!();
            }
        }
        Commands::Ask {
            question,
            save_image,
        } => {
            let backend = BackendClient::new(&cfg.backend)?;
            let mut session = ChatSession::new(backend, "Ask");
            let exchange = session.send(&question).await?;

            println!("{}", exchange.answer);

            if exchange.illustrated {
                if let Some(path) = save_image {
                    let image = session
                        .conversation
                        .last()
                        .and_then(|m| m.image.clone())
                        .unwrap_or_default();
                    let bytes = BASE64.decode(image.as_bytes())?;
                    std::fs::write(&path, bytes)?;
                    println!("(illustration saved to {})", path.display());
                } else {
                    println!("(an illustration was generated; pass --save-image to keep it)");
                }
            }
        }
        Commands::Chat => {
            let backend = BackendClient::new(&cfg.backend)?;
            let mut session = ChatSession::new(backend, "New Chat");

            println!("Connected to {}. Ask away (empty line to quit).", cfg.backend.url);

            let stdin = std::io::stdin();
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

                let exchange = session.send(question).await?;
                println!("{}", exchange.answer);
                if exchange.illustrated {
                    println!("(an illustration was generated)");
                }
                println!("follow-up idea: {}", follow_up_suggestion(question));
                println!();
            }

            println!(
                "Bye! {} messages in this session.",
                session.conversation.messages.len()
            );
        }
        Commands::Serve => {
            let index = if cfg.index.path.exists() {
                Some(load_index(&cfg.index.path)?)
            } else {
                eprintln!(
                    "note: no index at {}; /api/pdf-index will 404",
                    cfg.index.path.display()
                );
                None
            };
            server::run_server(&cfg, index).await?;
        }
        Commands::Demo { .. } | Commands::History => unreachable!(),
    }

    Ok(())
}
