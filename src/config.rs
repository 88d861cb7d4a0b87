use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub story: StoryConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the story backend the client talks to.
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5050".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors returned by `storybot search`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Where the built index JSON is written and read from.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Root directory scanned for story corpus files.
    #[serde(default = "default_corpus_root")]
    pub corpus_root: PathBuf,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            corpus_root: default_corpus_root(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/story-index.json")
}
fn default_corpus_root() -> PathBuf {
    PathBuf::from("./corpus")
}
fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoryConfig {
    /// Text generation model name.
    #[serde(default = "default_story_model")]
    pub model: String,
    /// Base URL of the generation API.
    #[serde(default = "default_story_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            model: default_story_model(),
            url: default_story_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_story_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_story_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Stability engine identifier.
    #[serde(default = "default_image_engine")]
    pub engine: String,
    #[serde(default = "default_image_url")]
    pub url: String,
    #[serde(default = "default_image_size")]
    pub width: u32,
    #[serde(default = "default_image_size")]
    pub height: u32,
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: u32,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_style_preset")]
    pub style_preset: String,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            engine: default_image_engine(),
            url: default_image_url(),
            width: default_image_size(),
            height: default_image_size(),
            cfg_scale: default_cfg_scale(),
            steps: default_steps(),
            style_preset: default_style_preset(),
            timeout_secs: default_image_timeout_secs(),
        }
    }
}

fn default_image_engine() -> String {
    "stable-diffusion-xl-1024-v1-0".to_string()
}
fn default_image_url() -> String {
    "https://api.stability.ai/v1/generation".to_string()
}
fn default_image_size() -> u32 {
    1024
}
fn default_cfg_scale() -> u32 {
    7
}
fn default_steps() -> u32 {
    30
}
fn default_style_preset() -> String {
    "fantasy-art".to_string()
}
fn default_image_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5050".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HistoryConfig {
    /// Optional JSON transcript log; the built-in sample is shown when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Minimal all-defaults configuration for commands that can run without
    /// a config file on disk (demo, history).
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            index: IndexConfig::default(),
            story: StoryConfig::default(),
            image: ImageConfig::default(),
            server: ServerConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.index.max_tokens == 0 {
        anyhow::bail!("index.max_tokens must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_defaults() {
        let cfg = Config::minimal();
        assert_eq!(cfg.backend.url, "http://localhost:5050");
        assert_eq!(cfg.retrieval.top_k, 1);
        assert!(!cfg.embedding.is_enabled());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:5050");
        assert_eq!(cfg.image.cfg_scale, 7);
        assert_eq!(cfg.image.style_preset, "fantasy-art");
    }

    #[test]
    fn enabled_provider_requires_model_and_dims() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[embedding]\nprovider = \"openai\"\n").unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[embedding]\nprovider = \"mystery\"\nmodel = \"m\"\ndims = 8\n",
        )
        .unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }
}
