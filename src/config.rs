use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_pdf_extractor")]
    pub pdf_extractor: String,
    #[serde(default)]
    pub skip_duplicates: bool,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pdf_extractor: default_pdf_extractor(),
            skip_duplicates: false,
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_pdf_extractor() -> String {
    "heuristic".to_string()
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.docx".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_enabled() -> bool {
    true
}
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_replay_turns")]
    pub replay_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            replay_turns: default_replay_turns(),
        }
    }
}

fn default_replay_turns() -> usize {
    5
}

impl Config {
    /// Storage-only configuration with every other section at its default.
    pub fn minimal() -> Self {
        Self {
            storage: StorageConfig {
                path: PathBuf::from("./data/dojo.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            ingest: IngestConfig::default(),
            gateway: GatewayConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    match config.ingest.pdf_extractor.as_str() {
        "heuristic" | "library" => {}
        other => anyhow::bail!(
            "Unknown pdf extractor: '{}'. Must be heuristic or library.",
            other
        ),
    }

    if config.gateway.enabled {
        let base = config.gateway.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("gateway.base_url must start with http:// or https://");
        }
        if config.gateway.timeout_secs == 0 {
            anyhow::bail!("gateway.timeout_secs must be > 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse("[storage]\npath = \"/tmp/dojo.sqlite\"\n").unwrap();
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.gateway.cache_ttl_secs, 300);
        assert_eq!(config.chat.replay_turns, 5);
        assert_eq!(config.ingest.pdf_extractor, "heuristic");
        assert!(!config.ingest.skip_duplicates);
        assert!(config.gateway.enabled);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = parse("[storage]\npath = \"x\"\n[chunking]\nmax_chars = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_chars"));
    }

    #[test]
    fn test_rejects_unknown_extractor() {
        let err =
            parse("[storage]\npath = \"x\"\n[ingest]\npdf_extractor = \"ocr\"\n").unwrap_err();
        assert!(err.to_string().contains("ocr"));
    }

    #[test]
    fn test_rejects_bad_base_url_only_when_enabled() {
        assert!(parse("[storage]\npath = \"x\"\n[gateway]\nbase_url = \"localhost\"\n").is_err());
        assert!(parse(
            "[storage]\npath = \"x\"\n[gateway]\nenabled = false\nbase_url = \"localhost\"\n"
        )
        .is_ok());
    }
}
