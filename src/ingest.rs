//! Index construction from a document corpus.
//!
//! Walks the configured corpus root for Markdown, plain-text, and PDF
//! files, chunks their text, embeds every chunk, and writes the resulting
//! [`StoryIndex`](crate::retriever::StoryIndex) JSON to disk. Files that
//! cannot be read or extracted are skipped with a note on stderr rather
//! than failing the whole build.

use anyhow::{bail, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::context::save_index;
use crate::embedding::create_provider;
use crate::retriever::build_index;

/// File extensions picked up by the corpus walk.
const CORPUS_EXTENSIONS: &[&str] = &["md", "txt", "pdf"];

/// Build the embedding index for the configured corpus and write it to
/// `[index].path`.
pub async fn run_index_build(config: &Config) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Building an index requires embeddings. Set [embedding] provider in config.");
    }

    let root = &config.index.corpus_root;
    if !root.is_dir() {
        bail!("Corpus root is not a directory: {}", root.display());
    }

    let mut texts: Vec<String> = Vec::new();
    let mut files = 0usize;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                eprintln!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some(e) if CORPUS_EXTENSIONS.contains(&e)) {
            continue;
        }

        match read_corpus_file(path) {
            Ok(text) => {
                let chunks = chunk_text(&text, config.index.max_tokens);
                if chunks.is_empty() {
                    eprintln!("skipping empty file: {}", path.display());
                    continue;
                }
                files += 1;
                texts.extend(chunks);
            }
            Err(e) => {
                eprintln!("skipping {}: {:#}", path.display(), e);
            }
        }
    }

    if texts.is_empty() {
        bail!("No corpus text found under {}", root.display());
    }

    let provider = create_provider(&config.embedding)?;

    println!(
        "Embedding {} chunks from {} files with {}...",
        texts.len(),
        files,
        provider.model_name()
    );

    let index = build_index(provider.as_ref(), &config.embedding, texts).await?;

    save_index(&config.index.path, &index)?;
    println!(
        "Index written: {} entries -> {}",
        index.len(),
        config.index.path.display()
    );

    Ok(())
}

/// Extract plain text from one corpus file.
fn read_corpus_file(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let bytes = std::fs::read(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
