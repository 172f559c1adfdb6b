use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::{normalize, Embedder, Embedding};
use crate::error::SearchError;

pub const DEFAULT_URL: &str = "http://localhost:11434";
/// Ollama's packaging of sentence-transformers/all-MiniLM-L6-v2.
pub const DEFAULT_MODEL: &str = "all-minilm";
pub const DEFAULT_MAX_INPUT_BYTES: usize = 8192;

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_input_bytes: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Connect to an Ollama server. Sends one short request up front, which makes
    /// the server load the model and tells us its dimensionality.
    pub fn new(base_url: &str, model: &str, batch_size: usize, max_input_bytes: usize) -> Result<Self> {
        let mut embedder = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions: 0,
            batch_size: batch_size.max(1),
            max_input_bytes: max_input_bytes.max(1),
        };

        let warmup = embedder
            .request(&["test"])
            .with_context(|| format!("loading model {model} from {}", embedder.base_url))?;
        embedder.dimensions = warmup.first().map_or(0, Vec::len);
        if embedder.dimensions == 0 {
            bail!("ollama returned an empty embedding for model {model}");
        }
        debug!(model, dimensions = embedder.dimensions, "ollama model ready");
        Ok(embedder)
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let input: Vec<&str> = texts
            .iter()
            .map(|t| prepare_input(t, self.max_input_bytes))
            .collect();

        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let result = ureq::post(&url).send_json(&body);

        let mut response = match result {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                bail!("ollama returned HTTP {code}");
            }
            Err(e) => {
                return Err(anyhow::anyhow!(e).context("ollama embedding request failed"));
            }
        };

        let resp: EmbedResponse = response
            .body_mut()
            .read_json()
            .context("parsing ollama response")?;

        if resp.embeddings.len() != texts.len() {
            bail!(
                "ollama returned {} embeddings for {} inputs",
                resp.embeddings.len(),
                texts.len()
            );
        }

        let mut embeddings = resp.embeddings;
        for v in &mut embeddings {
            if self.dimensions != 0 && v.len() != self.dimensions {
                return Err(SearchError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: v.len(),
                }
                .into());
            }
            normalize(v);
        }
        Ok(embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut out = self.request(&[text])?;
        out.pop().context("ollama returned no embedding")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = i, size = batch.len(), "embedding batch");
            out.extend(self.request(batch)?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Substitute a space for empty input and cut overlong input at the last
/// char boundary within `max_bytes`.
fn prepare_input(text: &str, max_bytes: usize) -> &str {
    if text.is_empty() {
        return " ";
    }
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
