use std::cmp::Ordering;

use crate::embed::{dot, l2_norm, UNIT_NORM_TOLERANCE};
use crate::error::SearchError;

/// A scored corpus position, as produced by [`top_k`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub index: usize,
    pub score: f32,
}

/// Exhaustive cosine top-k over `corpus`.
///
/// Corpus vectors must already be unit length. The query is normalized here
/// when its norm is off, so cosine similarity reduces to a dot product per
/// vector. A zero query scores 0.0 everywhere.
///
/// Results are ordered by descending score; equal scores keep corpus order.
/// `k` is clamped to the corpus size and `k == 0` yields nothing.
pub fn top_k(query: &[f32], corpus: &[Vec<f32>], dimensions: usize, k: usize) -> Result<Vec<Hit>, SearchError> {
    if query.len() != dimensions {
        return Err(SearchError::DimensionMismatch {
            expected: dimensions,
            actual: query.len(),
        });
    }

    let norm = l2_norm(query);
    let scale = if norm == 0.0 || (norm - 1.0).abs() <= UNIT_NORM_TOLERANCE {
        1.0
    } else {
        1.0 / norm
    };

    let mut hits: Vec<Hit> = corpus
        .iter()
        .enumerate()
        .map(|(index, v)| Hit {
            index,
            score: dot(query, v) * scale,
        })
        .collect();

    hits.sort_by(by_score_then_index);
    hits.truncate(k.min(corpus.len()));
    Ok(hits)
}

/// Descending score, NaN last, ties broken by ascending index.
fn by_score_then_index(a: &Hit, b: &Hit) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => a.index.cmp(&b.index),
        (false, false) => b
            .score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index)),
    }
}
