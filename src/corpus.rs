use std::path::Path;

use crate::error::SearchError;

/// One passage of the corpus. `id` is its 0-based position among the
/// non-blank lines of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: usize,
    pub text: String,
}

/// Read a corpus file, one passage per line.
pub fn load(path: &Path) -> Result<Vec<Document>, SearchError> {
    if !path.exists() {
        return Err(SearchError::CorpusNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path).map_err(|source| SearchError::ReadCorpus {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents)
}

/// Characters that end a line: `\n`, a bare `\r` (old Mac files), and the
/// vertical-tab, form-feed, separator and Unicode line/paragraph breaks.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split text into documents: lines are trimmed and blank lines dropped.
/// Ids are assigned after skipping, so they stay dense.
pub fn parse(contents: &str) -> Result<Vec<Document>, SearchError> {
    let docs: Vec<Document> = contents
        .split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(id, text)| Document {
            id,
            text: text.to_string(),
        })
        .collect();

    if docs.is_empty() {
        return Err(SearchError::EmptyCorpus);
    }
    Ok(docs)
}
