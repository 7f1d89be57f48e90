use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{ContentRecord, RetrievalError, RetrievalStrategy, RetrievedChunk, Retriever};

/// Lexical-overlap retrieval. No external dependency, always constructible;
/// the fallback when the embedding strategy is unavailable.
#[derive(Debug, Default)]
pub struct KeywordRetriever {
    records: Vec<ContentRecord>,
}

impl KeywordRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::Keyword
    }

    async fn index(&mut self, records: Vec<ContentRecord>) -> Result<(), RetrievalError> {
        self.records.extend(records);
        Ok(())
    }

    async fn remove_source(&mut self, source: &str) -> Result<(), RetrievalError> {
        self.records.retain(|record| record.source != source);
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let query_words = word_set(text);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<RetrievedChunk> = self
            .records
            .iter()
            .filter_map(|record| {
                let overlap = word_set(&record.content).intersection(&query_words).count();
                (overlap > 0).then(|| RetrievedChunk {
                    source: record.source.clone(),
                    content: record.content.clone(),
                    score: overlap as f64,
                    chunk_index: record.chunk_index,
                    total_chunks: record.total_chunks,
                })
            })
            .collect();

        // Vec::sort_by is stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(max_results);
        Ok(scored)
    }
}

fn word_set(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|character: char| !character.is_alphanumeric())
                .to_ascii_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}
