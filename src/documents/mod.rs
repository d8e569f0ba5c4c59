
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::Table;

/// Separator between `column: value` pairs within one row's text.
const PAIR_SEPARATOR: &str = ", ";

/// A single table row rendered as retrievable text.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDocument {
    pub text: String,
    pub row_index: usize,
}

/// A bounded-length unit of retrievable text, derived from one or more
/// consecutive row documents. Produced once per indexing pass and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    /// First source row represented in this chunk.
    pub row_start: usize,
    /// Last source row represented in this chunk (inclusive).
    pub row_end: usize,
    pub chunk_index: usize,
}

/// Configuration for splitting row documents into chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters. Overlap seeded from the
    /// previous chunk may push a chunk slightly past this.
    pub max_chunk_chars: usize,
    /// Approximate overlap in characters between adjacent chunks, carried
    /// as whole trailing rows so a fact near a boundary appears complete
    /// in at least one chunk.
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_chars: 1500,
            overlap_chars: 100,
        }
    }
}

/// Render every row of a cleaned table as a compact text document:
/// `column: value` pairs in column order, missing cells omitted entirely.
#[inline]
pub fn build_documents(table: &Table) -> Vec<RowDocument> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let text = table
                .columns()
                .iter()
                .zip(row)
                .filter(|(_, value)| !value.is_missing())
                .map(|(column, value)| format!("{}: {}", column, value))
                .join(PAIR_SEPARATOR);
            RowDocument { text, row_index }
        })
        .collect()
}

/// Greedily pack row documents into chunks of at most `max_chunk_chars`
/// characters, one row per line. Adjacent chunks overlap by roughly
/// `overlap_chars` characters of whole trailing rows. A single row longer
/// than the limit is split on its pair separators instead.
///
/// Every row appears in at least one chunk, and boundaries are
/// reproducible for the same input.
#[inline]
pub fn chunk_documents(documents: &[RowDocument], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<&RowDocument> = Vec::new();
    let mut current_len = 0usize;

    for document in documents {
        if document.text.len() > config.max_chunk_chars {
            flush(&mut chunks, &mut current, &mut current_len);
            chunks.extend(split_long_document(document, config));
            continue;
        }

        let added_len = if current.is_empty() {
            document.text.len()
        } else {
            document.text.len() + 1
        };

        if !current.is_empty() && current_len + added_len > config.max_chunk_chars {
            let overlap = trailing_overlap(&current, config.overlap_chars);
            flush(&mut chunks, &mut current, &mut current_len);
            for carried in overlap {
                current_len += if current.is_empty() {
                    carried.text.len()
                } else {
                    carried.text.len() + 1
                };
                current.push(carried);
            }
        }

        current_len += if current.is_empty() {
            document.text.len()
        } else {
            document.text.len() + 1
        };
        current.push(document);
    }

    flush(&mut chunks, &mut current, &mut current_len);

    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }

    debug!(
        "Chunked {} row documents into {} chunks",
        documents.len(),
        chunks.len()
    );
    chunks
}

fn flush(chunks: &mut Vec<Chunk>, current: &mut Vec<&RowDocument>, current_len: &mut usize) {
    if current.is_empty() {
        return;
    }
    let content = current.iter().map(|d| d.text.as_str()).join("\n");
    let row_start = current[0].row_index;
    let row_end = current[current.len() - 1].row_index;
    chunks.push(Chunk {
        content,
        row_start,
        row_end,
        chunk_index: 0,
    });
    current.clear();
    *current_len = 0;
}

/// Pick whole trailing rows from a finished chunk, newest last, totalling
/// at most `overlap_chars` characters.
fn trailing_overlap<'a>(current: &[&'a RowDocument], overlap_chars: usize) -> Vec<&'a RowDocument> {
    let mut carried = Vec::new();
    let mut total = 0usize;

    for document in current.iter().rev() {
        if total + document.text.len() > overlap_chars {
            break;
        }
        total += document.text.len();
        carried.push(*document);
    }

    carried.reverse();
    carried
}

/// Split one over-long row document on its pair separators, with
/// character-level overlap between the resulting pieces. Each piece keeps
/// the source row index so the back-reference survives the split.
fn split_long_document(document: &RowDocument, config: &ChunkingConfig) -> Vec<Chunk> {
    let segments: Vec<&str> = document.text.split(PAIR_SEPARATOR).collect();

    let mut pieces: Vec<String> = Vec::new();
    let mut piece = String::new();

    for segment in segments {
        if segment.len() > config.max_chunk_chars {
            if !piece.is_empty() {
                pieces.push(std::mem::take(&mut piece));
            }
            pieces.extend(split_by_characters(
                segment,
                config.max_chunk_chars,
                config.overlap_chars,
            ));
            continue;
        }

        let added_len = if piece.is_empty() {
            segment.len()
        } else {
            segment.len() + PAIR_SEPARATOR.len()
        };

        if !piece.is_empty() && piece.len() + added_len > config.max_chunk_chars {
            let overlap = character_overlap(&piece, config.overlap_chars);
            pieces.push(std::mem::take(&mut piece));
            piece = overlap;
        }

        if !piece.is_empty() {
            piece.push_str(PAIR_SEPARATOR);
        }
        piece.push_str(segment);
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }

    pieces
        .into_iter()
        .map(|content| Chunk {
            content,
            row_start: document.row_index,
            row_end: document.row_index,
            chunk_index: 0,
        })
        .collect()
}

/// Last resort for a single unbreakable segment: fixed windows on char
/// boundaries with the configured overlap.
fn split_by_characters(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let characters: Vec<char> = text.chars().collect();
    let step = max_chars.saturating_sub(overlap_chars).max(1);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < characters.len() {
        let end = (start + max_chars).min(characters.len());
        pieces.push(characters[start..end].iter().collect());
        if end == characters.len() {
            break;
        }
        start += step;
    }
    pieces
}

/// Trailing characters of a piece, at most `overlap_chars`, respecting
/// char boundaries.
fn character_overlap(piece: &str, overlap_chars: usize) -> String {
    let characters: Vec<char> = piece.chars().collect();
    let start = characters.len().saturating_sub(overlap_chars);
    characters[start..].iter().collect()
}
