//! Boundary-aware text splitting with overlap
//!
//! Text is first cut into pieces at the coarsest separator that occurs
//! (paragraph, line, sentence, word), recursing into finer separators only
//! for pieces that are still too long and falling back to grapheme-boundary
//! cuts. Pieces keep their trailing separator, so they tile the input exactly.
//! Pieces are then merged greedily into chunks of at most `chunk_size` chars,
//! carrying whole trailing pieces of up to `chunk_overlap` chars into the
//! next chunk.

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, Document};

/// Separators tried in order, coarsest first
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Byte range of a chunk within its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    /// Borrow the spanned text
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Text splitter with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Maximum overlap between consecutive chunks
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a new splitter
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Split("chunk size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Split(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split documents into chunks, inheriting each document's metadata
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            for span in self.split_text(&doc.text) {
                let chunk_text = span.as_str(&doc.text);
                let prefix = &doc.text[..span.start];

                let char_start = prefix.chars().count();
                let char_end = char_start + chunk_text.chars().count();
                let line_from = 1 + prefix.matches('\n').count() as u32;
                let line_to =
                    line_from + chunk_text.trim_end_matches('\n').matches('\n').count() as u32;

                let metadata = ChunkMetadata {
                    source: doc.metadata.source.clone(),
                    page_number: doc.metadata.page_number,
                    total_pages: doc.metadata.total_pages,
                    chunk_index: chunks.len() as u32,
                    char_start,
                    char_end,
                    line_from,
                    line_to,
                };

                chunks.push(Chunk::new(chunk_text.to_string(), metadata));
            }
        }

        chunks
    }

    /// Split text into chunk spans
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        let mut pieces = Vec::new();
        self.split_pieces(text, 0, 0, &mut pieces);
        self.merge_pieces(text, &pieces)
    }

    /// Cut `text` (starting at byte `base` of the source) into pieces that fit
    fn split_pieces(&self, text: &str, base: usize, level: usize, out: &mut Vec<TextSpan>) {
        if text.is_empty() {
            return;
        }

        if char_len(text) <= self.chunk_size {
            out.push(TextSpan {
                start: base,
                end: base + text.len(),
            });
            return;
        }

        for (idx, separator) in self.separators.iter().enumerate().skip(level) {
            if !text.contains(separator.as_str()) {
                continue;
            }

            let mut offset = 0;
            for segment in text.split_inclusive(separator.as_str()) {
                self.split_pieces(segment, base + offset, idx + 1, out);
                offset += segment.len();
            }
            return;
        }

        self.hard_cut(text, base, out);
    }

    /// Cut at grapheme boundaries; a grapheme longer than a chunk is cut at chars
    fn hard_cut(&self, text: &str, base: usize, out: &mut Vec<TextSpan>) {
        let mut start = 0usize;
        let mut len = 0usize;

        for (idx, grapheme) in text.grapheme_indices(true) {
            let grapheme_len = grapheme.chars().count();

            if grapheme_len > self.chunk_size {
                if len > 0 {
                    out.push(TextSpan {
                        start: base + start,
                        end: base + idx,
                    });
                }

                let mut piece_start = idx;
                let mut count = 0usize;
                for (char_idx, _) in grapheme.char_indices() {
                    if count == self.chunk_size {
                        out.push(TextSpan {
                            start: base + piece_start,
                            end: base + idx + char_idx,
                        });
                        piece_start = idx + char_idx;
                        count = 0;
                    }
                    count += 1;
                }
                out.push(TextSpan {
                    start: base + piece_start,
                    end: base + idx + grapheme.len(),
                });

                start = idx + grapheme.len();
                len = 0;
                continue;
            }

            if len + grapheme_len > self.chunk_size {
                out.push(TextSpan {
                    start: base + start,
                    end: base + idx,
                });
                start = idx;
                len = 0;
            }
            len += grapheme_len;
        }

        if len > 0 {
            out.push(TextSpan {
                start: base + start,
                end: base + text.len(),
            });
        }
    }

    /// Greedily merge contiguous pieces, keeping a trailing overlap window
    fn merge_pieces(&self, text: &str, pieces: &[TextSpan]) -> Vec<TextSpan> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(TextSpan, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece.as_str(text));

            if !window.is_empty() && total + len > self.chunk_size {
                chunks.push(window_span(&window));

                while let Some(&(_, front_len)) = window.front() {
                    if total > self.chunk_overlap || total + len > self.chunk_size {
                        window.pop_front();
                        total -= front_len;
                    } else {
                        break;
                    }
                }
            }

            window.push_back((*piece, len));
            total += len;
        }

        if !window.is_empty() {
            chunks.push(window_span(&window));
        }

        chunks
    }
}

fn window_span(window: &VecDeque<(TextSpan, usize)>) -> TextSpan {
    let start = window.front().map(|(span, _)| span.start).unwrap_or(0);
    let end = window.back().map(|(span, _)| span.end).unwrap_or(start);
    TextSpan { start, end }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
