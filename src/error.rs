use thiserror::Error;

/// The one error the question-answering workflow surfaces to the user.
///
/// Ingestion, indexing and generation failures are all reported the same
/// way: the collaborator's message, verbatim, with no classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct QaError(pub String);

impl QaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Text shown in the error banner.
    pub fn banner(&self) -> String {
        format!("An error occurred: {}", self.0)
    }
}

impl From<anyhow::Error> for QaError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{:#}", e))
    }
}

impl From<std::io::Error> for QaError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

pub type QaResult<T> = Result<T, QaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_banner_carries_message_verbatim() {
        let err = QaError::new("invalid api key");
        assert_eq!(err.banner(), "An error occurred: invalid api key");
    }

    #[test]
    fn test_anyhow_context_chain_is_kept() {
        let source: anyhow::Result<()> = Err(anyhow::anyhow!("status 401"));
        let err: QaError = source.context("Failed to embed pages").unwrap_err().into();
        assert_eq!(err.0, "Failed to embed pages: status 401");
    }
}
