use thiserror::Error;

/// Failure of an external request/response collaborator (LLM completion or
/// embedding service). Every pipeline stage that calls a collaborator maps
/// this to its own safe default; the error never escapes an invocation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator call timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("collaborator returned HTTP {status}")]
    Http { status: u16 },
    #[error("collaborator returned malformed output: {detail}")]
    Malformed { detail: String },
    #[error("collaborator credentials are missing or incomplete")]
    MissingCredentials,
    #[error("collaborator transport failure: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::CollaboratorError;

    #[test]
    fn messages_name_the_failure_mode() {
        assert_eq!(
            CollaboratorError::Timeout { seconds: 30 }.to_string(),
            "collaborator call timed out after 30s"
        );
        assert_eq!(
            CollaboratorError::Http { status: 503 }.to_string(),
            "collaborator returned HTTP 503"
        );
        assert!(CollaboratorError::MissingCredentials.to_string().contains("credentials"));
    }
}
