//! Retrieval context: the embedding provider plus the loaded index.
//!
//! Everything that needs both gets this as an explicit argument. The index
//! is resolved first (local file, then backend fetch), then the provider is
//! created, so initialization order is visible at the construction site
//! rather than hidden behind lazily-mutated globals.

use anyhow::{Context as _, Result};
use std::path::Path;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::retriever::StoryIndex;

/// Bundles the embedding provider with the loaded [`StoryIndex`].
pub struct RetrievalContext {
    pub provider: Box<dyn EmbeddingProvider>,
    pub index: StoryIndex,
}

impl std::fmt::Debug for RetrievalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalContext")
            .field("provider", &self.provider.model_name())
            .field("index", &self.index)
            .finish()
    }
}

impl RetrievalContext {
    /// Load the index from the configured file, falling back to a backend
    /// fetch when the file does not exist, then create the provider.
    ///
    /// An index whose vectors are not `provider.dims()` wide was built with
    /// a different model and is rejected here, before any query embeds.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let index = if config.index.path.exists() {
            load_index(&config.index.path)?
        } else {
            let client = BackendClient::new(&config.backend)?;
            client.fetch_index().await.with_context(|| {
                format!(
                    "No local index at {} and the backend fetch failed",
                    config.index.path.display()
                )
            })?
        };

        let provider = create_provider(&config.embedding)?;

        if provider.dims() > 0 {
            if let Some(width) = index.embeddings.iter().map(Vec::len).find(|w| *w != provider.dims()) {
                anyhow::bail!(
                    "index vectors are {} wide but {} produces {} dims; rebuild with `storybot index`",
                    width,
                    provider.model_name(),
                    provider.dims()
                );
            }
        }

        Ok(Self { provider, index })
    }
}

/// Read a [`StoryIndex`] from its JSON file.
pub fn load_index(path: &Path) -> Result<StoryIndex> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index file: {}", path.display()))?;
    let index: StoryIndex = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index file: {}", path.display()))?;
    Ok(index)
}

/// Write a [`StoryIndex`] to its JSON file, creating parent directories.
pub fn save_index(path: &Path, index: &StoryIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create index directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string(index)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write index file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/index.json");
        let index = StoryIndex {
            embeddings: vec![vec![0.25, -1.5]],
            texts: vec!["a tale".to_string()],
        };
        save_index(&path, &index).unwrap();
        let back = load_index(&path).unwrap();
        assert_eq!(back.texts, vec!["a tale"]);
        assert_eq!(back.embeddings[0], vec![0.25, -1.5]);
    }

    #[test]
    fn load_missing_file_errors() {
        let err = load_index(Path::new("/nonexistent/index.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read index file"));
    }

    #[test]
    fn initialize_rejects_index_built_with_other_dims() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.json");
        let index = StoryIndex {
            embeddings: vec![vec![1.0, 0.0]],
            texts: vec!["east".to_string()],
        };
        save_index(&path, &index).unwrap();

        let mut cfg = crate::config::Config::minimal();
        cfg.index.path = path;
        cfg.embedding.provider = "ollama".to_string();
        cfg.embedding.model = Some("all-minilm".to_string());
        cfg.embedding.dims = Some(4);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt.block_on(RetrievalContext::initialize(&cfg)).unwrap_err();
        assert!(err.to_string().contains("rebuild with"));
    }

    #[test]
    fn initialize_accepts_index_matching_dims() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.json");
        let index = StoryIndex {
            embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            texts: vec!["east".to_string(), "north".to_string()],
        };
        save_index(&path, &index).unwrap();

        let mut cfg = crate::config::Config::minimal();
        cfg.index.path = path;
        cfg.embedding.provider = "ollama".to_string();
        cfg.embedding.model = Some("all-minilm".to_string());
        cfg.embedding.dims = Some(2);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let ctx = rt.block_on(RetrievalContext::initialize(&cfg)).unwrap();
        assert_eq!(ctx.index.len(), 2);
        assert_eq!(ctx.provider.model_name(), "all-minilm");
    }

    #[test]
    fn load_rejects_wrong_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{\"embeddings\": \"nope\"}").unwrap();
        assert!(load_index(&path).is_err());
    }
}
