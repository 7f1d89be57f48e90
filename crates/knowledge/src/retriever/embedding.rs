use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use concierge_core::{CollaboratorError, EmbeddingConfig};

use super::{
    ContentRecord, RetrievalError, RetrievalStrategy, RetrievedChunk, Retriever,
    RetrieverInitError,
};

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

/// External embedding service spoken over an OpenAI-compatible `/embeddings`
/// endpoint.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    timeout_secs: u64,
}

impl HttpEmbeddingClient {
    /// Capability detection happens here, not at query time: an unset
    /// endpoint or an unbuildable client fails construction.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RetrieverInitError> {
        let base_url = config.base_url.clone().ok_or(RetrieverInitError::MissingEndpoint)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| RetrieverInitError::ClientBuild(error.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut request =
            self.client.post(&url).json(&json!({ "model": self.model, "input": text }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                CollaboratorError::Timeout { seconds: self.timeout_secs }
            } else {
                CollaboratorError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Http { status: status.as_u16() });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| CollaboratorError::Malformed { detail: error.to_string() })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| CollaboratorError::Malformed {
                detail: "embedding response carried no vector".to_string(),
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredRecord {
    pub score: f64,
    pub record: ContentRecord,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        record: ContentRecord,
    ) -> Result<(), RetrievalError>;

    async fn delete_by_source(&mut self, source: &str) -> Result<(), RetrievalError>;

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredRecord>, RetrievalError>;
}

/// Cosine-similarity store used when no external vector database is wired
/// in. Scores land in [0, 1], higher is closer.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: Vec<(String, Vec<f32>, ContentRecord)>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        record: ContentRecord,
    ) -> Result<(), RetrievalError> {
        match self.entries.iter_mut().find(|(existing, _, _)| *existing == id) {
            Some(entry) => {
                entry.1 = vector;
                entry.2 = record;
            }
            None => self.entries.push((id, vector, record)),
        }
        Ok(())
    }

    async fn delete_by_source(&mut self, source: &str) -> Result<(), RetrievalError> {
        self.entries.retain(|(_, _, record)| record.source != source);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredRecord>, RetrievalError> {
        let mut scored: Vec<ScoredRecord> = self
            .entries
            .iter()
            .map(|(_, stored, record)| ScoredRecord {
                score: similarity(vector, stored),
                record: record.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity rescaled from [-1, 1] to [0, 1].
fn similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

/// Vector-similarity retrieval over an embedding service and a vector store.
pub struct EmbeddingRetriever {
    embedder: Box<dyn EmbeddingClient>,
    store: Box<dyn VectorStore>,
}

impl EmbeddingRetriever {
    pub fn new(embedder: Box<dyn EmbeddingClient>, store: Box<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Fallible constructor chain used by the manager's strategy selection.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, RetrieverInitError> {
        let embedder = HttpEmbeddingClient::new(config)?;
        Ok(Self::new(Box::new(embedder), Box::new(InMemoryVectorStore::new())))
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    fn strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::Embedding
    }

    async fn index(&mut self, records: Vec<ContentRecord>) -> Result<(), RetrievalError> {
        for record in records {
            let vector = self.embedder.embed(&record.content).await?;
            self.store.upsert(record.record_id(), vector, record).await?;
        }
        Ok(())
    }

    async fn remove_source(&mut self, source: &str) -> Result<(), RetrievalError> {
        self.store.delete_by_source(source).await
    }

    async fn query(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let vector = self.embedder.embed(text).await?;
        let neighbors = self.store.query(&vector, max_results).await?;

        Ok(neighbors
            .into_iter()
            .map(|scored| RetrievedChunk {
                source: scored.record.source,
                content: scored.record.content,
                score: scored.score,
                chunk_index: scored.record.chunk_index,
                total_chunks: scored.record.total_chunks,
            })
            .collect())
    }
}
