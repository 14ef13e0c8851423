//! TOML configuration.
//!
//! Every section and field has a default, so a missing `--config` flag or an
//! empty file gives a working client pointed at `http://localhost:8080`.
//!
//! ```toml
//! [client]
//! base_url = "http://localhost:8080"
//! timeout_secs = 30
//! max_retries = 0
//!
//! [ingest]
//! extensions = [".md", ".txt", ".rst"]
//! recursive = true
//! prune = true
//! exclude_globs = ["drafts/**"]
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! max_tokens = 700
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts the ingest command makes for retryable failures.
    /// The SDK itself never retries.
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default = "default_true")]
    pub prune: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            recursive: true,
            prune: true,
            exclude_globs: Vec::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".md".to_string(), ".txt".to_string(), ".rst".to_string()]
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_tokens() -> usize {
    700
}

/// Normalise an extension list to leading-dot form: `md` → `.md`.
/// Blank entries are dropped.
pub fn normalize_extensions<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.as_ref().trim();
        if ext.is_empty() {
            continue;
        }
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        };
        if !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

/// Parse and validate a config string.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&mut config)?;
    Ok(config)
}

/// Read, parse, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &mut Config) -> Result<()> {
    if config.client.timeout_secs == 0 {
        bail!("client.timeout_secs must be > 0");
    }
    if !config.client.base_url.starts_with("http://")
        && !config.client.base_url.starts_with("https://")
    {
        bail!(
            "client.base_url must start with http:// or https://, got '{}'",
            config.client.base_url
        );
    }

    config.ingest.extensions = normalize_extensions(&config.ingest.extensions);
    if config.ingest.extensions.is_empty() {
        bail!("ingest.extensions must list at least one extension");
    }

    if config.server.max_tokens == 0 {
        bail!("server.max_tokens must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.client.base_url, "http://localhost:8080");
        assert_eq!(cfg.client.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.ingest.extensions, vec![".md", ".txt", ".rst"]);
        assert!(cfg.ingest.recursive);
        assert!(cfg.ingest.prune);
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn extensions_are_normalized() {
        let cfg = parse_config(
            r#"
            [ingest]
            extensions = ["md", ".txt", " rst ", "md", ""]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ingest.extensions, vec![".md", ".txt", ".rst"]);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = parse_config("[client]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_non_http_url() {
        let err = parse_config("[client]\nbase_url = \"ftp://example.com\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_empty_extensions() {
        assert!(parse_config("[ingest]\nextensions = []\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
