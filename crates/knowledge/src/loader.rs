use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::warn;
use walkdir::WalkDir;

use concierge_core::KnowledgeConfig;

const TRUNCATION_MARKER: &str = "... (truncated)";

const TEXT_EXTENSIONS: &[&str] =
    &["md", "txt", "rst", "csv", "json", "yaml", "yml", "toml", "html"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLoadError {
    NotFound { source: String },
    Unreadable { source: String, detail: String },
    Timeout { source: String, seconds: u64 },
    TooLarge { source: String, size_bytes: u64, limit_bytes: u64 },
}

impl std::fmt::Display for SourceLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLoadError::NotFound { source } => {
                write!(f, "source `{source}` was not found")
            }
            SourceLoadError::Unreadable { source, detail } => {
                write!(f, "source `{source}` could not be read: {detail}")
            }
            SourceLoadError::Timeout { source, seconds } => {
                write!(f, "source `{source}` timed out after {seconds}s")
            }
            SourceLoadError::TooLarge { source, size_bytes, limit_bytes } => {
                write!(
                    f,
                    "source `{source}` is {size_bytes} bytes, over the {limit_bytes} byte ceiling"
                )
            }
        }
    }
}

impl std::error::Error for SourceLoadError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File { truncated: bool },
    Directory { file_count: usize },
    Url { status: u16 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedSource {
    pub source: String,
    pub content: String,
    pub kind: SourceKind,
}

/// Loads raw text from a file, a directory tree, or a URL. One loader call
/// covers exactly one source; batch aggregation is the caller's concern.
pub struct ContentLoader {
    max_file_chars: usize,
    max_file_bytes: u64,
    max_directory_files: usize,
    url_timeout_secs: u64,
    client: reqwest::Client,
}

impl ContentLoader {
    pub fn new(config: &KnowledgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.url_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            max_file_chars: config.max_file_chars,
            max_file_bytes: config.max_file_bytes,
            max_directory_files: config.max_directory_files,
            url_timeout_secs: config.url_timeout_secs,
            client,
        }
    }

    pub async fn load(&self, source: &str) -> Result<LoadedSource, SourceLoadError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.load_url(source).await;
        }

        let path = Path::new(source);
        if path.is_file() {
            self.load_file(source, path)
        } else if path.is_dir() {
            self.load_directory(source, path)
        } else {
            Err(SourceLoadError::NotFound { source: source.to_string() })
        }
    }

    fn load_file(&self, source: &str, path: &Path) -> Result<LoadedSource, SourceLoadError> {
        let metadata = fs::metadata(path).map_err(|error| SourceLoadError::Unreadable {
            source: source.to_string(),
            detail: error.to_string(),
        })?;
        if metadata.len() > self.max_file_bytes {
            return Err(SourceLoadError::TooLarge {
                source: source.to_string(),
                size_bytes: metadata.len(),
                limit_bytes: self.max_file_bytes,
            });
        }

        let raw = fs::read_to_string(path).map_err(|error| SourceLoadError::Unreadable {
            source: source.to_string(),
            detail: error.to_string(),
        })?;

        let (content, truncated) = truncate_chars(&raw, self.max_file_chars);
        Ok(LoadedSource { source: source.to_string(), content, kind: SourceKind::File { truncated } })
    }

    fn load_directory(&self, source: &str, path: &Path) -> Result<LoadedSource, SourceLoadError> {
        let mut files: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_text_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files.truncate(self.max_directory_files);

        let mut sections = Vec::new();
        for file in &files {
            let name = file
                .strip_prefix(path)
                .unwrap_or(file.as_path())
                .display()
                .to_string();
            match self.load_file(&file.display().to_string(), file) {
                Ok(loaded) => sections.push(format!("=== {name} ===\n{}", loaded.content)),
                Err(error) => {
                    warn!(source = %source, file = %name, %error, "skipping unreadable file in directory source");
                }
            }
        }

        Ok(LoadedSource {
            source: source.to_string(),
            content: sections.join("\n\n"),
            kind: SourceKind::Directory { file_count: sections.len() },
        })
    }

    async fn load_url(&self, source: &str) -> Result<LoadedSource, SourceLoadError> {
        let response = self.client.get(source).send().await.map_err(|error| {
            if error.is_timeout() {
                SourceLoadError::Timeout {
                    source: source.to_string(),
                    seconds: self.url_timeout_secs,
                }
            } else {
                SourceLoadError::Unreadable {
                    source: source.to_string(),
                    detail: error.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(SourceLoadError::NotFound { source: source.to_string() });
        }
        if !status.is_success() {
            return Err(SourceLoadError::Unreadable {
                source: source.to_string(),
                detail: format!("HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(|error| SourceLoadError::Unreadable {
            source: source.to_string(),
            detail: error.to_string(),
        })?;
        let (content, _) = truncate_chars(&body, self.max_file_chars);

        Ok(LoadedSource {
            source: source.to_string(),
            content,
            kind: SourceKind::Url { status: status.as_u16() },
        })
    }
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| TEXT_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    (truncated, true)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use concierge_core::{AppConfig, KnowledgeConfig};

    use super::{ContentLoader, SourceKind, SourceLoadError};

    fn test_config() -> KnowledgeConfig {
        AppConfig::default().knowledge
    }

    #[tokio::test]
    async fn loads_a_single_file() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("policies.md");
        fs::write(&file, "Refunds are processed within five business days.").expect("write file");

        let loader = ContentLoader::new(&test_config());
        let loaded = loader.load(&file.display().to_string()).await.expect("load file");

        assert_eq!(loaded.kind, SourceKind::File { truncated: false });
        assert!(loaded.content.contains("five business days"));
    }

    #[tokio::test]
    async fn oversized_file_is_truncated_with_marker() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("huge.txt");
        fs::write(&file, "a".repeat(500)).expect("write file");

        let mut config = test_config();
        config.max_file_chars = 100;
        let loader = ContentLoader::new(&config);
        let loaded = loader.load(&file.display().to_string()).await.expect("load file");

        assert_eq!(loaded.kind, SourceKind::File { truncated: true });
        assert!(loaded.content.ends_with("... (truncated)"));
    }

    #[tokio::test]
    async fn file_over_hard_ceiling_is_refused() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("blob.txt");
        fs::write(&file, "b".repeat(2048)).expect("write file");

        let mut config = test_config();
        config.max_file_bytes = 1024;
        let loader = ContentLoader::new(&config);
        let error = loader.load(&file.display().to_string()).await.expect_err("too large");

        assert!(matches!(error, SourceLoadError::TooLarge { limit_bytes: 1024, .. }));
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let loader = ContentLoader::new(&test_config());
        let error = loader.load("/definitely/not/here.md").await.expect_err("not found");
        assert!(matches!(error, SourceLoadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn directory_load_concatenates_text_files_with_provenance() {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("nested")).expect("nested dir");
        fs::write(dir.path().join("a.md"), "alpha content").expect("write a");
        fs::write(dir.path().join("nested/b.txt"), "beta content").expect("write b");
        fs::write(dir.path().join("binary.bin"), [0u8, 159, 146, 150]).expect("write binary");

        let loader = ContentLoader::new(&test_config());
        let loaded = loader.load(&dir.path().display().to_string()).await.expect("load dir");

        assert_eq!(loaded.kind, SourceKind::Directory { file_count: 2 });
        assert!(loaded.content.contains("=== a.md ==="));
        assert!(loaded.content.contains("alpha content"));
        assert!(loaded.content.contains("beta content"));
        assert!(!loaded.content.contains("binary.bin"));
    }

    #[tokio::test]
    async fn directory_file_count_is_capped() {
        let dir = TempDir::new().expect("temp dir");
        for i in 0..6 {
            fs::write(dir.path().join(format!("{i:02}.md")), format!("doc {i}")).expect("write");
        }

        let mut config = test_config();
        config.max_directory_files = 3;
        let loader = ContentLoader::new(&config);
        let loaded = loader.load(&dir.path().display().to_string()).await.expect("load dir");

        assert_eq!(loaded.kind, SourceKind::Directory { file_count: 3 });
    }

    #[tokio::test]
    async fn url_load_returns_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hosted documentation"))
            .mount(&server)
            .await;

        let loader = ContentLoader::new(&test_config());
        let loaded = loader.load(&format!("{}/docs", server.uri())).await.expect("load url");

        assert_eq!(loaded.kind, SourceKind::Url { status: 200 });
        assert_eq!(loaded.content, "hosted documentation");
    }

    #[tokio::test]
    async fn url_404_maps_to_not_found_and_500_to_unreadable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let loader = ContentLoader::new(&test_config());

        let gone = loader.load(&format!("{}/gone", server.uri())).await.expect_err("404");
        assert!(matches!(gone, SourceLoadError::NotFound { .. }));

        let broken = loader.load(&format!("{}/broken", server.uri())).await.expect_err("500");
        assert!(matches!(broken, SourceLoadError::Unreadable { ref detail, .. } if detail.contains("500")));
    }
}
