use anyhow::Result;
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, warn};

use crate::embed::Embedder;
use crate::error::SearchError;
use crate::search::{EmbeddedCorpus, RankedResult};

pub const PROMPT: &str = "\nquery> ";
pub const FAREWELL: &str = "Goodbye!";

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Quit,
    Query(&'a str),
}

/// Classify one line of user input. `q` in either case quits.
pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Blank
    } else if line.eq_ignore_ascii_case("q") {
        Input::Quit
    } else {
        Input::Query(line)
    }
}

/// `rank` is 1-based.
pub fn format_result(rank: usize, result: &RankedResult<'_>) -> String {
    format!("{rank:>2}. [score {:.4}] {}", result.score, result.document.text)
}

/// The interactive read-query/print-results loop.
pub struct Shell<'a> {
    corpus: &'a EmbeddedCorpus,
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> Shell<'a> {
    pub fn new(corpus: &'a EmbeddedCorpus, embedder: &'a dyn Embedder, top_k: usize) -> Self {
        Self {
            corpus,
            embedder,
            top_k,
        }
    }

    /// Run until end of input or `q`. Only errors that cannot be recovered
    /// locally (I/O on the streams, dimension mismatches) are returned.
    pub fn run(&self, mut input: impl BufRead, out: &mut impl Write) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(out, "\n{FAREWELL}")?;
                return Ok(());
            }
            // Undecodable bytes become U+FFFD rather than ending the session.
            let line = String::from_utf8_lossy(&buf);

            match parse_input(&line) {
                Input::Blank => continue,
                Input::Quit => {
                    writeln!(out, "{FAREWELL}")?;
                    return Ok(());
                }
                Input::Query(query) => self.answer(query, out)?,
            }
        }
    }

    fn answer(&self, query: &str, out: &mut impl Write) -> Result<()> {
        let started = Instant::now();
        let results = match self.corpus.search(self.embedder, query, self.top_k) {
            Ok(results) => results,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                warn!(error = %e, "query failed");
                writeln!(out, "query failed: {e:#}")?;
                return Ok(());
            }
        };
        debug!(
            query,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query answered"
        );

        if results.is_empty() {
            writeln!(out, "\nNo matches.")?;
            return Ok(());
        }
        writeln!(out, "\nTop matches:")?;
        for (i, result) in results.iter().enumerate() {
            writeln!(out, "{}", format_result(i + 1, result))?;
        }
        Ok(())
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SearchError>(),
        Some(SearchError::DimensionMismatch { .. })
    )
}
