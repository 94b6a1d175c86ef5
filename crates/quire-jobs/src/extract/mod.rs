//! Chunk extraction: PDF layout → ordered, positioned text chunks.
//!
//! The extraction pipeline has two halves: a [`PdfTextSource`] collaborator
//! that turns PDF bytes into per-page layout (blocks with rectangles), and a
//! pure assembly pass that turns layout into the paper's chunk sequence.
//! The assembly is deterministic: identical layout always yields identical
//! chunk text, rectangles, and ordering, so a re-run never silently
//! renumbers chunks that an annotation might reference by page and bbox.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use quire_core::{defaults, new_v7, Chunk, PageLayout, PdfTextSource, Result};

mod pdftotext;

pub use pdftotext::PdftotextSource;

/// Extracts ordered, positioned chunks from a paper's PDF bytes.
pub struct ChunkExtractor {
    source: Arc<dyn PdfTextSource>,
    min_chunk_chars: usize,
}

impl ChunkExtractor {
    /// Create an extractor over the given layout source.
    pub fn new(source: Arc<dyn PdfTextSource>) -> Self {
        Self {
            source,
            min_chunk_chars: defaults::MIN_CHUNK_CHARS,
        }
    }

    /// Override the minimum chunk length.
    pub fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars;
        self
    }

    /// Extract the full chunk sequence for a paper.
    ///
    /// Fails with `Error::Extraction` when the source cannot read the PDF.
    /// An empty result from a readable PDF means the file has no text layer.
    pub async fn extract(&self, paper_id: Uuid, data: &[u8]) -> Result<Vec<Chunk>> {
        let pages = self.source.extract_pages(data).await?;
        let chunks = assemble_chunks(paper_id, &pages, self.min_chunk_chars);

        debug!(
            subsystem = "jobs",
            component = "chunk_extractor",
            op = "extract",
            paper_id = %paper_id,
            page_count = pages.len(),
            chunk_count = chunks.len(),
            "Assembled chunk sequence"
        );
        Ok(chunks)
    }

    /// The underlying layout source.
    pub fn source(&self) -> &Arc<dyn PdfTextSource> {
        &self.source
    }
}

/// Assemble positioned chunks from page layouts.
///
/// Pages are walked in order and blocks in layout order, so `chunk_index`
/// is monotonic in (page, position-on-page) and a chunk never spans two
/// pages. Whitespace-only blocks and blocks shorter than `min_chars` are
/// dropped rather than emitted empty.
pub fn assemble_chunks(paper_id: Uuid, pages: &[PageLayout], min_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut index = 0i32;

    for page in pages {
        for block in &page.blocks {
            let text = normalize_whitespace(&block.text);
            if text.chars().count() < min_chars {
                continue;
            }

            chunks.push(Chunk {
                id: new_v7(),
                paper_id,
                page: page.page,
                bbox: block.bbox,
                text,
                chunk_index: index,
            });
            index += 1;
        }
    }

    chunks
}

/// Collapse runs of whitespace (including newlines inside a block) to
/// single spaces and trim the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"10\.\d{4,9}/\S+").expect("static DOI pattern"))
}

/// Scan the leading pages of a paper for a DOI.
///
/// Checks at most [`defaults::DOI_SCAN_PAGES`] pages and trims the trailing
/// punctuation that PDFs routinely glue onto the identifier.
pub fn extract_doi(pages: &[PageLayout]) -> Option<String> {
    for page in pages.iter().take(defaults::DOI_SCAN_PAGES) {
        for block in &page.blocks {
            if let Some(m) = doi_regex().find(&block.text) {
                let doi = m
                    .as_str()
                    .trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ')' | ']'));
                if !doi.is_empty() {
                    return Some(doi.to_string());
                }
            }
        }
    }
    None
}
