use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::RepoError;
use super::types::{
    ContentsResponse, DeleteRequest, DirectoryListing, RemoteFileMetadata, UploadRequest,
};
use super::ContentStore;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_COMMIT_MESSAGE: &str = "gitfs update";

/// Media type asking the contents endpoint for the object's raw bytes
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Bearer credential sent with every request
    pub access_token: String,
    /// Branch all reads and writes target
    pub branch: String,
    /// Repository URL, e.g. `https://github.com/owner/repo`
    pub repo_url: String,
    /// Base URL of the REST API
    pub api_url: String,
    /// Commit message attached to every write and delete
    pub commit_message: String,
    /// Timeout applied uniformly to every request
    pub timeout: Duration,
}

impl GithubConfig {
    pub fn new(repo_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            branch: "main".to_string(),
            repo_url: repo_url.into(),
            api_url: DEFAULT_API_URL.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`ContentStore`] over the GitHub contents API.
///
/// Cheap to clone; every call is independent and carries no state other
/// than the configuration parsed at construction.
#[derive(Debug, Clone)]
pub struct GithubClient {
    api_url: Url,
    owner: String,
    repo: String,
    branch: String,
    commit_message: String,
    client: Client,
}

impl GithubClient {
    /// Build a client. An unparsable repository or API URL is a fatal
    /// configuration error.
    pub fn new(config: GithubConfig) -> Result<Self, RepoError> {
        let (owner, repo) = parse_repo_url(&config.repo_url)?;

        let api_url = Url::parse(&config.api_url)
            .map_err(|e| RepoError::InvalidApiUrl(format!("{}: {}", config.api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(RepoError::InvalidApiUrl(config.api_url));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|_| RepoError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));

        let client = Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!("gitfs/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            api_url,
            owner,
            repo,
            branch: config.branch,
            commit_message: config.commit_message,
            client,
        })
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// `<api>/repos/<owner>/<repo>/contents/<path>`, one percent-encoded
    /// segment per path component
    fn contents_url(&self, path: &str) -> Result<Url, RepoError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::InvalidApiUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend([
                "repos",
                self.owner.as_str(),
                self.repo.as_str(),
                "contents",
            ])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn branch_query(&self) -> [(&'static str, &str); 1] {
        [("branch", self.branch.as_str())]
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, RepoError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(RepoError::Conflict(path.to_string()));
        }

        Err(RepoError::Status { status, body })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RepoError> {
        let url = self.contents_url(path)?;
        let request = self.client.get(url).query(&self.branch_query());
        let response = self.send(path, request).await?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ContentStore for GithubClient {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, RepoError> {
        tracing::debug!(path, "listing remote directory");
        self.get_json(path).await
    }

    async fn open_content(&self, path: &str) -> Result<Bytes, RepoError> {
        tracing::debug!(path, "fetching remote object");
        let url = self.contents_url(path)?;
        let request = self
            .client
            .get(url)
            .query(&self.branch_query())
            .header(ACCEPT, RAW_MEDIA_TYPE);

        let response = self.send(path, request).await?;
        Ok(response.bytes().await?)
    }

    async fn stat(&self, path: &str) -> Result<RemoteFileMetadata, RepoError> {
        match self.get_json::<ContentsResponse>(path).await? {
            ContentsResponse::Directory(entries) => {
                tracing::trace!(path, entries = entries.len(), "stat resolved to a directory");
                Ok(RemoteFileMetadata::directory(path))
            }
            ContentsResponse::Object(meta) => Ok(meta),
        }
    }

    async fn create_or_update(&self, path: &str, content: &[u8]) -> Result<(), RepoError> {
        // No token means a new object, which the API wants without `sha`
        let sha = match self.stat(path).await {
            Ok(meta) => meta.version_token().map(str::to_string),
            Err(e) => {
                tracing::debug!(path, error = %e, "no existing remote object");
                None
            }
        };

        let body = UploadRequest {
            message: self.commit_message.clone(),
            content: base64::engine::general_purpose::STANDARD.encode(content),
            sha,
        };

        tracing::debug!(path, bytes = content.len(), update = body.sha.is_some(), "uploading");
        let url = self.contents_url(path)?;
        let request = self.client.put(url).query(&self.branch_query()).json(&body);
        self.send(path, request).await?;

        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), RepoError> {
        let meta = self.stat(path).await?;
        let sha = meta
            .version_token()
            .ok_or_else(|| RepoError::MissingVersionToken(path.to_string()))?
            .to_string();

        let body = DeleteRequest {
            message: self.commit_message.clone(),
            sha,
        };

        tracing::debug!(path, "deleting remote object");
        let url = self.contents_url(path)?;
        let request = self
            .client
            .delete(url)
            .query(&self.branch_query())
            .json(&body);
        self.send(path, request).await?;

        Ok(())
    }
}

/// Extract `(owner, repo)` from a repository URL such as
/// `https://github.com/owner/repo` or `https://github.com/owner/repo.git`
fn parse_repo_url(repo_url: &str) -> Result<(String, String), RepoError> {
    let invalid = |reason: &str| RepoError::InvalidRepoUrl {
        url: repo_url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(repo_url).map_err(|e| invalid(&e.to_string()))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, repo, ..] => {
            let repo = repo.trim_end_matches(".git");
            if repo.is_empty() {
                return Err(invalid("empty repository name"));
            }
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(invalid("expected a path of the form /<owner>/<repo>")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(repo_url: &str, api_url: &str) -> Result<GithubClient, RepoError> {
        let mut config = GithubConfig::new(repo_url, "secret");
        config.api_url = api_url.to_string();
        GithubClient::new(config)
    }

    #[test]
    fn test_parse_repo_url() {
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello").unwrap(),
            ("octo".to_string(), "hello".to_string())
        );
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello.git/").unwrap(),
            ("octo".to_string(), "hello".to_string())
        );
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello/tree/main").unwrap(),
            ("octo".to_string(), "hello".to_string())
        );
    }

    #[test]
    fn test_invalid_repo_url_is_fatal() {
        assert!(matches!(
            parse_repo_url("not a url"),
            Err(RepoError::InvalidRepoUrl { .. })
        ));
        assert!(matches!(
            parse_repo_url("https://github.com/octo"),
            Err(RepoError::InvalidRepoUrl { .. })
        ));
        assert!(client("github.com/octo/hello", DEFAULT_API_URL).is_err());
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(matches!(
            client("https://github.com/octo/hello", "mailto:someone"),
            Err(RepoError::InvalidApiUrl(_))
        ));
    }

    #[test]
    fn test_contents_url() {
        let c = client("https://github.com/octo/hello", DEFAULT_API_URL).unwrap();
        assert_eq!(c.repository(), "octo/hello");
        assert_eq!(
            c.contents_url("/").unwrap().as_str(),
            "https://api.github.com/repos/octo/hello/contents"
        );
        assert_eq!(
            c.contents_url("/src/main.rs").unwrap().as_str(),
            "https://api.github.com/repos/octo/hello/contents/src/main.rs"
        );
        assert_eq!(
            c.contents_url("/docs/a b.md").unwrap().as_str(),
            "https://api.github.com/repos/octo/hello/contents/docs/a%20b.md"
        );
    }

    #[test]
    fn test_contents_url_keeps_api_prefix() {
        let c = client(
            "https://git.example.com/team/tools",
            "https://git.example.com/api/v3/",
        )
        .unwrap();
        assert_eq!(
            c.contents_url("/x").unwrap().as_str(),
            "https://git.example.com/api/v3/repos/team/tools/contents/x"
        );
    }
}
