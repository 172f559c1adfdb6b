use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("corpus file not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("corpus is empty (no non-blank lines)")]
    EmptyCorpus,

    /// The provider produced a vector whose length disagrees with the corpus.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding count mismatch: {documents} documents, {embeddings} embeddings")]
    CountMismatch { documents: usize, embeddings: usize },

    #[error("reading corpus {}", .path.display())]
    ReadCorpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
