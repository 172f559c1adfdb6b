use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::embed::hashing;
use crate::embed::ollama;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "minisearch.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub search: SearchConfig,
    pub embed: EmbedConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Text file with one passage per line
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results printed per query
    pub top_k: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub backend: EmbedBackend,
    /// Texts per embedding request during the corpus pass (0 = 1)
    pub batch_size: usize,
    /// Inputs longer than this are truncated before embedding
    pub max_input_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum EmbedBackend {
    #[serde(rename = "ollama")]
    Ollama {
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_url")]
        url: String,
    },
    #[serde(rename = "hash")]
    Hash {
        #[serde(default = "default_hash_dimensions")]
        dimensions: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Ollama,
    Hash,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub data: Option<PathBuf>,
    pub top_k: Option<usize>,
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
    pub ollama_url: Option<String>,
}

fn default_ollama_model() -> String {
    ollama::DEFAULT_MODEL.to_string()
}

fn default_ollama_url() -> String {
    ollama::DEFAULT_URL.to_string()
}

fn default_hash_dimensions() -> usize {
    hashing::DEFAULT_DIMENSIONS
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sample.txt"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            backend: EmbedBackend::default(),
            batch_size: 32,
            max_input_bytes: ollama::DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl Default for EmbedBackend {
    fn default() -> Self {
        EmbedBackend::Ollama {
            model: default_ollama_model(),
            url: default_ollama_url(),
        }
    }
}

impl Config {
    /// Load config from `explicit` if given (it must exist), otherwise from
    /// `minisearch.toml` in `dir` when present, falling back to defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let config_path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let implicit = dir.join(DEFAULT_CONFIG_FILE);
                if !implicit.exists() {
                    return Ok(Self::default());
                }
                implicit
            }
        };
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading config from {}", config_path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing config from {}", config_path.display()))
    }

    /// Layer command-line values over the loaded config. Switching backend
    /// kind starts from that backend's defaults.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(data) = overrides.data {
            self.corpus.path = data;
        }
        if let Some(k) = overrides.top_k {
            self.search.top_k = k;
        }
        if let Some(kind) = overrides.backend {
            if self.embed.backend.kind() != kind {
                self.embed.backend = EmbedBackend::defaults_for(kind);
            }
        }
        match &mut self.embed.backend {
            EmbedBackend::Ollama { model, url } => {
                if let Some(m) = overrides.model {
                    *model = m;
                }
                if let Some(u) = overrides.ollama_url {
                    *url = u;
                }
            }
            EmbedBackend::Hash { .. } => {
                if overrides.model.is_some() || overrides.ollama_url.is_some() {
                    warn!("--model and --ollama-url are ignored by the hash backend");
                }
            }
        }
    }

    /// Effective batch size, resolving 0 to 1.
    pub fn effective_batch_size(&self) -> usize {
        self.embed.batch_size.max(1)
    }
}

impl EmbedBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            EmbedBackend::Ollama { .. } => BackendKind::Ollama,
            EmbedBackend::Hash { .. } => BackendKind::Hash,
        }
    }

    fn defaults_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Ollama => EmbedBackend::default(),
            BackendKind::Hash => EmbedBackend::Hash {
                dimensions: default_hash_dimensions(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.corpus.path, PathBuf::from("data/sample.txt"));
        assert_eq!(config.search.top_k, 3);
        assert_eq!(
            config.embed.backend,
            EmbedBackend::Ollama {
                model: "all-minilm".into(),
                url: "http://localhost:11434".into(),
            }
        );
    }

    #[test]
    fn missing_implicit_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.search.top_k, 3);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("custom.toml");
        assert!(Config::load(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[search]\ntop_k = 5\n\n[embed.backend]\ntype = \"hash\"\ndimensions = 64\n",
        )
        .unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.embed.backend, EmbedBackend::Hash { dimensions: 64 });
        assert_eq!(config.embed.batch_size, 32);
        assert_eq!(config.corpus.path, PathBuf::from("data/sample.txt"));
    }

    #[test]
    fn full_file_reads_every_key() {
        let config: Config = toml::from_str(
            r#"
[corpus]
path = "notes.txt"

[search]
top_k = 4

[embed]
batch_size = 8
max_input_bytes = 1024

[embed.backend]
type = "ollama"
model = "nomic-embed-text"
url = "http://10.0.0.2:11434"
"#,
        )
        .unwrap();
        assert_eq!(config.corpus.path, PathBuf::from("notes.txt"));
        assert_eq!(config.search.top_k, 4);
        assert_eq!(config.embed.batch_size, 8);
        assert_eq!(config.embed.max_input_bytes, 1024);
        assert_eq!(
            config.embed.backend,
            EmbedBackend::Ollama {
                model: "nomic-embed-text".into(),
                url: "http://10.0.0.2:11434".into(),
            }
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[search\ntop_k = ").unwrap();
        let err = Config::load(Some(&path), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn backend_table_fields_default() {
        let config: Config = toml::from_str("[embed.backend]\ntype = \"ollama\"\nmodel = \"nomic-embed-text\"\n").unwrap();
        assert_eq!(
            config.embed.backend,
            EmbedBackend::Ollama {
                model: "nomic-embed-text".into(),
                url: "http://localhost:11434".into(),
            }
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        config.apply(Overrides {
            data: Some(PathBuf::from("corpus.txt")),
            top_k: Some(7),
            model: Some("mxbai-embed-large".into()),
            ollama_url: Some("http://gpu-box:11434".into()),
            ..Default::default()
        });
        assert_eq!(config.corpus.path, PathBuf::from("corpus.txt"));
        assert_eq!(config.search.top_k, 7);
        assert_eq!(
            config.embed.backend,
            EmbedBackend::Ollama {
                model: "mxbai-embed-large".into(),
                url: "http://gpu-box:11434".into(),
            }
        );
    }

    #[test]
    fn switching_backend_uses_its_defaults() {
        let mut config = Config::default();
        config.apply(Overrides {
            backend: Some(BackendKind::Hash),
            ..Default::default()
        });
        assert_eq!(config.embed.backend, EmbedBackend::Hash { dimensions: 384 });
    }

    #[test]
    fn same_backend_keeps_file_settings() {
        let mut config = Config::default();
        config.embed.backend = EmbedBackend::Hash { dimensions: 64 };
        config.apply(Overrides {
            backend: Some(BackendKind::Hash),
            ..Default::default()
        });
        assert_eq!(config.embed.backend, EmbedBackend::Hash { dimensions: 64 });
    }

    #[test]
    fn zero_batch_size_resolves_to_one() {
        let mut config = Config::default();
        config.embed.batch_size = 0;
        assert_eq!(config.effective_batch_size(), 1);
    }
}
