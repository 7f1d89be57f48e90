use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub knowledge: KnowledgeConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Embedding service settings. `base_url` left unset means the embedding
/// retriever cannot be constructed and the manager falls back to keyword
/// search.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_results: usize,
    pub max_file_chars: usize,
    pub max_file_bytes: u64,
    pub max_directory_files: usize,
    pub url_timeout_secs: u64,
    pub registry_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub confidence_threshold: f64,
    pub response_length_ceiling: usize,
    pub thread_window: usize,
    pub context_window: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub embedding_base_url: Option<String>,
    pub confidence_threshold: Option<f64>,
    pub registry_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                base_url: None,
                api_key: None,
                model: "nomic-embed-text".to_string(),
                timeout_secs: 30,
            },
            knowledge: KnowledgeConfig {
                chunk_size: 800,
                chunk_overlap: 150,
                max_results: 3,
                max_file_chars: 10_000,
                max_file_bytes: 1_048_576,
                max_directory_files: 20,
                url_timeout_secs: 10,
                registry_path: None,
            },
            pipeline: PipelineConfig {
                confidence_threshold: 0.7,
                response_length_ceiling: 100,
                thread_window: 3,
                context_window: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = Some(base_url);
            }
            if let Some(embedding_api_key_value) = embedding.api_key {
                self.embedding.api_key = Some(secret_value(embedding_api_key_value));
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(chunk_size) = knowledge.chunk_size {
                self.knowledge.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = knowledge.chunk_overlap {
                self.knowledge.chunk_overlap = chunk_overlap;
            }
            if let Some(max_results) = knowledge.max_results {
                self.knowledge.max_results = max_results;
            }
            if let Some(max_file_chars) = knowledge.max_file_chars {
                self.knowledge.max_file_chars = max_file_chars;
            }
            if let Some(max_file_bytes) = knowledge.max_file_bytes {
                self.knowledge.max_file_bytes = max_file_bytes;
            }
            if let Some(max_directory_files) = knowledge.max_directory_files {
                self.knowledge.max_directory_files = max_directory_files;
            }
            if let Some(url_timeout_secs) = knowledge.url_timeout_secs {
                self.knowledge.url_timeout_secs = url_timeout_secs;
            }
            if let Some(registry_path) = knowledge.registry_path {
                self.knowledge.registry_path = Some(registry_path);
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(confidence_threshold) = pipeline.confidence_threshold {
                self.pipeline.confidence_threshold = confidence_threshold;
            }
            if let Some(response_length_ceiling) = pipeline.response_length_ceiling {
                self.pipeline.response_length_ceiling = response_length_ceiling;
            }
            if let Some(thread_window) = pipeline.thread_window {
                self.pipeline.thread_window = thread_window;
            }
            if let Some(context_window) = pipeline.context_window {
                self.pipeline.context_window = context_window;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONCIERGE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CONCIERGE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(value);
        }
        if let Some(value) = read_env("CONCIERGE_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONCIERGE_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }

        if let Some(value) = read_env("CONCIERGE_KNOWLEDGE_REGISTRY_PATH") {
            self.knowledge.registry_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("CONCIERGE_PIPELINE_CONFIDENCE_THRESHOLD") {
            self.pipeline.confidence_threshold =
                parse_f64("CONCIERGE_PIPELINE_CONFIDENCE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CONCIERGE_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(llm_api_key_value) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key_value));
        }
        if let Some(base_url) = overrides.embedding_base_url {
            self.embedding.base_url = Some(base_url);
        }
        if let Some(confidence_threshold) = overrides.confidence_threshold {
            self.pipeline.confidence_threshold = confidence_threshold;
        }
        if let Some(registry_path) = overrides.registry_path {
            self.knowledge.registry_path = Some(registry_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_embedding(&self.embedding)?;
        validate_knowledge(&self.knowledge)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.timeout_secs == 0 || embedding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embedding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if let Some(base_url) = &embedding.base_url {
        if base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "embedding.base_url must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "knowledge.chunk_size must be greater than zero".to_string(),
        ));
    }
    if knowledge.chunk_overlap >= knowledge.chunk_size {
        return Err(ConfigError::Validation(
            "knowledge.chunk_overlap must be smaller than knowledge.chunk_size".to_string(),
        ));
    }
    if knowledge.max_results == 0 {
        return Err(ConfigError::Validation(
            "knowledge.max_results must be greater than zero".to_string(),
        ));
    }
    if knowledge.url_timeout_secs == 0 || knowledge.url_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "knowledge.url_timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&pipeline.confidence_threshold) {
        return Err(ConfigError::Validation(
            "pipeline.confidence_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }
    if pipeline.response_length_ceiling == 0 {
        return Err(ConfigError::Validation(
            "pipeline.response_length_ceiling must be greater than zero".to_string(),
        ));
    }
    if !(2..=4).contains(&pipeline.thread_window) {
        return Err(ConfigError::Validation(
            "pipeline.thread_window must be in range 2..=4".to_string(),
        ));
    }
    if pipeline.context_window == 0 {
        return Err(ConfigError::Validation(
            "pipeline.context_window must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    embedding: Option<EmbeddingPatch>,
    knowledge: Option<KnowledgePatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    max_results: Option<usize>,
    max_file_chars: Option<usize>,
    max_file_bytes: Option<u64>,
    max_directory_files: Option<usize>,
    url_timeout_secs: Option<u64>,
    registry_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    confidence_threshold: Option<f64>,
    response_length_ceiling: Option<usize>,
    thread_window: Option<usize>,
    context_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
