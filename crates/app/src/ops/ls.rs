use clap::Args;

use common::repo::{ContentStore, RepoError};

use crate::args::RemoteArgs;
use crate::op::ClientError;

/// List a remote directory without mounting
#[derive(Args, Debug, Clone)]
pub struct Ls {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Directory to list, relative to the repository root
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("listing failed: {0}")]
    Repo(#[from] RepoError),
}

/// Absolute form of a user supplied repository path
pub fn absolute(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

/// One line per entry, directories suffixed with `/`
pub async fn render_listing<S: ContentStore>(store: &S, path: &str) -> Result<String, RepoError> {
    let listing = store.list_directory(path).await?;

    let lines: Vec<String> = listing
        .iter()
        .map(|entry| {
            if entry.kind.is_dir() {
                format!("{:>10}  {}/", "-", entry.name)
            } else {
                format!("{:>10}  {}", entry.size, entry.name)
            }
        })
        .collect();

    Ok(lines.join("\n"))
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.config(&self.remote)?;
        let client = ctx.client(&config, &self.remote)?;
        Ok(render_listing(&client, &absolute(&self.path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::testkit::MemoryStore;

    #[test]
    fn test_absolute() {
        assert_eq!(absolute(""), "/");
        assert_eq!(absolute("/"), "/");
        assert_eq!(absolute("src"), "/src");
        assert_eq!(absolute("src/bin/"), "/src/bin");
    }

    #[tokio::test]
    async fn test_render_listing() {
        let store = MemoryStore::with_files([
            ("/README.md", &b"hello"[..]),
            ("/src/main.rs", &b"fn main() {}"[..]),
        ]);

        let out = render_listing(&store, "/").await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["         5  README.md", "         -  src/"]);

        let err = render_listing(&store, "/missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
