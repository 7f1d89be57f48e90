use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Splits text into bounded, overlapping segments, preferring sentence and
/// paragraph boundaries near the size mark. Output is fully determined by
/// (text, size, overlap): the same input always yields the same chunks.
#[derive(Clone, Debug)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if chunk_size == 0 {
            return Err(ChunkerError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkerError::OverlapTooLarge { size: chunk_size, overlap });
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.chunk_size {
            return vec![Chunk { text: text.to_string(), index: 0, start: 0, end: text.len() }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        loop {
            let raw_end = (start + self.chunk_size).min(text.len());
            let end = floor_char_boundary(text, raw_end);
            let mut actual_end =
                if end < text.len() { self.find_break_point(text, start, end) } else { end };
            if actual_end <= start {
                // Boundary snapping collapsed the window (chunk size smaller
                // than one character); take the next full character instead.
                actual_end = ceil_char_boundary(text, start + 1);
            }

            chunks.push(Chunk {
                text: text[start..actual_end].to_string(),
                index,
                start,
                end: actual_end,
            });

            if actual_end >= text.len() {
                break;
            }

            let advance = actual_end - start;
            let step = if advance > self.overlap { advance - self.overlap } else { advance };
            let next = floor_char_boundary(text, start + step);
            // Boundary snapping can only move backwards; never lose progress.
            start = if next > start { next } else { actual_end };
            index += 1;
        }

        chunks
    }

    /// Looks for a natural boundary within a lookback window behind the size
    /// mark. Priority: paragraph break, sentence end, line break, word break.
    /// Falls back to the exact offset when nothing usable exists.
    fn find_break_point(&self, text: &str, start: usize, preferred_end: usize) -> usize {
        let lookback = (self.chunk_size / 4).max(1);
        let raw_search_start = preferred_end.saturating_sub(lookback).max(start);
        let search_start = floor_char_boundary(text, raw_search_start);
        let safe_end = floor_char_boundary(text, preferred_end);

        if search_start >= safe_end {
            return safe_end;
        }

        let region = &text[search_start..safe_end];
        let candidate = if let Some(pos) = region.rfind("\n\n") {
            search_start + pos + 2
        } else if let Some(pos) = region.rfind(". ") {
            search_start + pos + 2
        } else if let Some(pos) = region.rfind(".\n") {
            search_start + pos + 2
        } else if let Some(pos) = region.rfind('\n') {
            search_start + pos + 1
        } else if let Some(pos) = region.rfind(' ') {
            search_start + pos + 1
        } else {
            safe_end
        };

        if candidate <= start {
            safe_end
        } else {
            candidate
        }
    }
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut boundary = pos;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

fn ceil_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut boundary = pos;
    while boundary < text.len() && !text.is_char_boundary(boundary) {
        boundary += 1;
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::{Chunker, ChunkerError};

    fn sample_text() -> String {
        let mut text = String::new();
        for paragraph in 0..12 {
            for sentence in 0..6 {
                text.push_str(&format!(
                    "Paragraph {paragraph} sentence {sentence} explains one support topic. "
                ));
            }
            text.push_str("\n\n");
        }
        text
    }

    #[test]
    fn short_text_yields_exactly_one_chunk() {
        let chunker = Chunker::new(400, 50).expect("valid chunker");
        let chunks = chunker.split("one short note");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one short note");
        assert_eq!((chunks[0].start, chunks[0].end), (0, "one short note".len()));
    }

    #[test]
    fn chunks_cover_the_text_with_no_gaps() {
        let text = sample_text();
        let chunker = Chunker::new(300, 60).expect("valid chunker");
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().expect("last chunk").end, text.len());
        for pair in chunks.windows(2) {
            assert!(
                pair[1].start <= pair[0].end,
                "gap between chunk {} and {}",
                pair[0].index,
                pair[1].index
            );
            assert!(pair[1].start > pair[0].start, "chunking must make progress");
        }
    }

    #[test]
    fn every_chunk_respects_the_size_bound() {
        let text = sample_text();
        let chunker = Chunker::new(250, 40).expect("valid chunker");
        for chunk in chunker.split(&text) {
            assert!(chunk.text.len() <= 250, "chunk {} is too large", chunk.index);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn rechunking_identical_input_is_idempotent() {
        let text = sample_text();
        let chunker = Chunker::new(300, 60).expect("valid chunker");

        let first = chunker.split(&text);
        let second = chunker.split(&text);
        assert_eq!(first, second);
    }

    #[test]
    fn split_points_prefer_sentence_boundaries() {
        let text = sample_text();
        let chunker = Chunker::new(300, 60).expect("valid chunker");
        let chunks = chunker.split(&text);

        let boundary_aligned = chunks
            .iter()
            .take(chunks.len() - 1)
            .filter(|chunk| {
                chunk.text.ends_with(". ") || chunk.text.ends_with("\n\n") || chunk.text.ends_with('\n')
            })
            .count();
        assert!(boundary_aligned >= chunks.len() - 2);
    }

    #[test]
    fn unbroken_text_splits_at_exact_offsets() {
        let text = "x".repeat(1000);
        let chunker = Chunker::new(300, 50).expect("valid chunker");
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].end, 300);
        assert_eq!(chunks[1].start, 250);
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_character() {
        let text = "météo révisée à midi. ".repeat(60);
        let chunker = Chunker::new(128, 32).expect("valid chunker");
        for chunk in chunker.split(&text) {
            assert!(text.is_char_boundary(chunk.start));
            assert!(text.is_char_boundary(chunk.end));
        }
    }

    #[test]
    fn tiny_chunk_size_still_makes_progress_on_multibyte_text() {
        let text = "ééééé";
        let chunker = Chunker::new(1, 0).expect("valid chunker");
        let chunks = chunker.split(text);

        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.last().expect("last chunk").end, text.len());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(Chunker::new(0, 0).expect_err("zero size"), ChunkerError::ZeroChunkSize);
        assert_eq!(
            Chunker::new(100, 100).expect_err("overlap too large"),
            ChunkerError::OverlapTooLarge { size: 100, overlap: 100 }
        );
    }
}
