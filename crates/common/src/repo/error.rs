use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("version token for {0} is stale")]
    Conflict(String),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no version token known for {0}")]
    MissingVersionToken(String),
    #[error("invalid repository url {url}: {reason}")]
    InvalidRepoUrl { url: String, reason: String },
    #[error("invalid API url: {0}")]
    InvalidApiUrl(String),
    #[error("access token is not a valid header value")]
    InvalidToken,
}

impl RepoError {
    /// Whether the remote store reported the object as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RepoError::Conflict(_))
    }
}
