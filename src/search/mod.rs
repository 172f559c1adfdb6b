pub mod ranker;

use anyhow::{Context, Result};
use tracing::debug;

use crate::corpus::Document;
use crate::embed::{normalize, Embedder, Embedding};
use crate::error::SearchError;

/// A document paired with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedResult<'a> {
    pub score: f32,
    pub document: &'a Document,
}

/// Documents and their embeddings, index-aligned. Built once at startup and
/// read-only afterwards.
#[derive(Debug)]
pub struct EmbeddedCorpus {
    documents: Vec<Document>,
    embeddings: Vec<Embedding>,
    dimensions: usize,
}

impl EmbeddedCorpus {
    /// Pair documents with precomputed vectors. Rejects an empty corpus,
    /// count mismatches and ragged dimensionality; normalizes every vector.
    pub fn new(documents: Vec<Document>, mut embeddings: Vec<Embedding>) -> Result<Self, SearchError> {
        let Some(first) = embeddings.first() else {
            return Err(SearchError::EmptyCorpus);
        };
        let dimensions = first.len();

        if embeddings.len() != documents.len() {
            return Err(SearchError::CountMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            });
        }
        for v in &mut embeddings {
            if v.len() != dimensions {
                return Err(SearchError::DimensionMismatch {
                    expected: dimensions,
                    actual: v.len(),
                });
            }
            normalize(v);
        }

        Ok(Self {
            documents,
            embeddings,
            dimensions,
        })
    }

    /// Embed every document in one batch pass.
    pub fn build(documents: Vec<Document>, embedder: &dyn Embedder) -> Result<Self> {
        if documents.is_empty() {
            return Err(SearchError::EmptyCorpus.into());
        }
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .with_context(|| format!("embedding {} documents with {}", texts.len(), embedder.model_name()))?;
        let corpus = Self::new(documents, embeddings)?;
        debug!(
            documents = corpus.document_count(),
            dimensions = corpus.dimensions,
            "corpus embedded"
        );
        Ok(corpus)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Rank the corpus against an already-embedded query.
    pub fn rank(&self, query: &[f32], k: usize) -> Result<Vec<RankedResult<'_>>, SearchError> {
        let hits = ranker::top_k(query, &self.embeddings, self.dimensions, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| RankedResult {
                score: hit.score,
                document: &self.documents[hit.index],
            })
            .collect())
    }

    /// Embed `text` and rank the corpus against it.
    pub fn search(&self, embedder: &dyn Embedder, text: &str, k: usize) -> Result<Vec<RankedResult<'_>>> {
        let query = embedder.embed(text)?;
        Ok(self.rank(&query, k)?)
    }
}
