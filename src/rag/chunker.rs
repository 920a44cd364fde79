//! Word-window chunking for ingested text.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Window configuration, measured in whitespace-separated words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk within the source text.
    pub index: usize,
    /// Index of the first word of the window.
    pub start_word: usize,
    pub word_count: usize,
    pub text: String,
}

/// Splits `text` into overlapping word windows.
///
/// A window starts every `stride` words and the trailing partial window is kept,
/// so `L` words always yield `ceil(L / stride)` chunks. Words are re-joined with a
/// single space.
pub fn split_words(text: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunk_size = config.chunk_size.max(1);

    (0..words.len())
        .step_by(config.stride())
        .enumerate()
        .map(|(index, start)| {
            let end = (start + chunk_size).min(words.len());
            Chunk {
                index,
                start_word: start,
                word_count: end - start,
                text: words[start..end].join(" "),
            }
        })
        .collect()
}
