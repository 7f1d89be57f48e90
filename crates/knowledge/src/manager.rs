use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use concierge_core::{EmbeddingConfig, KnowledgeConfig};

use crate::change::{content_digest, HashRegistry};
use crate::chunker::{Chunker, ChunkerError};
use crate::loader::ContentLoader;
use crate::retriever::{
    ContentRecord, EmbeddingRetriever, KeywordRetriever, RetrievalStrategy, Retriever,
};

/// Marker returned when a query matches nothing; an empty result is not an
/// error.
pub const NO_KNOWLEDGE_FOUND: &str = "No relevant knowledge found.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
    pub skipped_unchanged: usize,
    pub errors: Vec<String>,
}

struct Inner {
    loader: ContentLoader,
    chunker: Chunker,
    registry: HashRegistry,
    retriever: Box<dyn Retriever>,
}

/// Facade over loading, change detection, chunking and retrieval. Load
/// passes take the write half of the lock so queries never observe a
/// partially updated index; queries share the read half.
pub struct KnowledgeManager {
    inner: RwLock<Inner>,
    strategy: RetrievalStrategy,
    default_max_results: usize,
}

impl KnowledgeManager {
    /// Builds the manager with the embedding strategy when it can be
    /// constructed, falling back to keyword search otherwise. The choice is
    /// made exactly once and holds for the manager's lifetime.
    pub fn from_config(
        knowledge: &KnowledgeConfig,
        embedding: &EmbeddingConfig,
    ) -> Result<Self, ChunkerError> {
        let retriever: Box<dyn Retriever> = match EmbeddingRetriever::from_config(embedding) {
            Ok(retriever) => Box::new(retriever),
            Err(error) => {
                warn!(%error, "embedding retrieval unavailable, falling back to keyword search");
                Box::new(KeywordRetriever::new())
            }
        };
        Self::with_retriever(knowledge, retriever)
    }

    pub fn with_retriever(
        knowledge: &KnowledgeConfig,
        retriever: Box<dyn Retriever>,
    ) -> Result<Self, ChunkerError> {
        let chunker = Chunker::new(knowledge.chunk_size, knowledge.chunk_overlap)?;
        let registry = match &knowledge.registry_path {
            Some(path) => HashRegistry::open(path),
            None => HashRegistry::in_memory(),
        };
        let strategy = retriever.strategy();
        info!(?strategy, "knowledge manager initialized");

        Ok(Self {
            inner: RwLock::new(Inner {
                loader: ContentLoader::new(knowledge),
                chunker,
                registry,
                retriever,
            }),
            strategy,
            default_max_results: knowledge.max_results,
        })
    }

    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    pub fn default_max_results(&self) -> usize {
        self.default_max_results
    }

    /// Runs one load pass over the given sources. A failing source is
    /// reported in the stats and never aborts the rest of the batch.
    pub async fn load_sources(&self, sources: &[String]) -> LoadStats {
        let mut inner = self.inner.write().await;
        let mut stats = LoadStats { total: sources.len(), ..LoadStats::default() };

        for source in sources {
            let loaded = match inner.loader.load(source).await {
                Ok(loaded) => loaded,
                Err(error) => {
                    warn!(source = %source, %error, "source failed to load");
                    stats.failed += 1;
                    stats.errors.push(format!("{source}: {error}"));
                    continue;
                }
            };

            let digest = content_digest(&loaded.content);
            if !inner.registry.should_reindex(source, &digest) {
                stats.skipped_unchanged += 1;
                continue;
            }

            if let Err(error) = inner.retriever.remove_source(source).await {
                warn!(source = %source, %error, "could not supersede stale chunks");
                stats.failed += 1;
                stats.errors.push(format!("{source}: {error}"));
                continue;
            }

            let chunks = inner.chunker.split(&loaded.content);
            let total_chunks = chunks.len();
            let loaded_at = Utc::now();
            let records: Vec<ContentRecord> = chunks
                .into_iter()
                .map(|chunk| ContentRecord {
                    source: source.clone(),
                    content: chunk.text,
                    content_hash: digest.clone(),
                    chunk_index: chunk.index,
                    total_chunks,
                    loaded_at,
                })
                .collect();

            match inner.retriever.index(records).await {
                Ok(()) => {
                    inner.registry.record(source.clone(), digest);
                    stats.loaded += 1;
                }
                Err(error) => {
                    warn!(source = %source, %error, "source failed to index");
                    inner.registry.remove(source);
                    stats.failed += 1;
                    stats.errors.push(format!("{source}: {error}"));
                }
            }
        }

        if let Err(error) = inner.registry.persist() {
            warn!(%error, "hash registry could not be persisted");
            stats.errors.push(format!("registry: {error}"));
        }

        info!(
            total = stats.total,
            loaded = stats.loaded,
            failed = stats.failed,
            skipped_unchanged = stats.skipped_unchanged,
            "knowledge load pass finished"
        );
        stats
    }

    /// Ranked retrieval formatted for prompt injection. Collaborator
    /// failures degrade to the no-knowledge marker instead of surfacing.
    pub async fn retrieve_for_query(&self, query: &str, max_results: usize) -> String {
        let inner = self.inner.read().await;
        let results = match inner.retriever.query(query, max_results).await {
            Ok(results) => results,
            Err(error) => {
                warn!(%error, "knowledge query failed");
                return NO_KNOWLEDGE_FOUND.to_string();
            }
        };

        if results.is_empty() {
            return NO_KNOWLEDGE_FOUND.to_string();
        }

        let formatted: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(position, result)| {
                format!(
                    "Knowledge source {} ({}, chunk {}/{}):\n{}",
                    position + 1,
                    result.source,
                    result.chunk_index + 1,
                    result.total_chunks,
                    result.content
                )
            })
            .collect();
        formatted.join("\n\n")
    }
}
