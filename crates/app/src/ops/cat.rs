use std::path::{Path, PathBuf};

use clap::Args;

use common::repo::{ContentStore, RepoError};

use crate::args::RemoteArgs;
use crate::op::ClientError;
use crate::ops::ls::absolute;

/// Print a remote file without mounting
#[derive(Args, Debug, Clone)]
pub struct Cat {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// File to print, relative to the repository root
    pub path: String,

    /// Write the raw bytes to this file instead of printing them
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("read failed: {0}")]
    Repo(#[from] RepoError),
    #[error("{0} is not valid UTF-8; use --output to save the raw bytes")]
    NotUtf8(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text to print for `content`, or the raw bytes written to `output`
pub fn render_content(
    path: &str,
    content: &[u8],
    output: Option<&Path>,
) -> Result<String, CatError> {
    match output {
        Some(output) => {
            std::fs::write(output, content)?;
            Ok(format!("Wrote {} bytes to {}", content.len(), output.display()))
        }
        None => String::from_utf8(content.to_vec()).map_err(|_| CatError::NotUtf8(path.to_string())),
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.config(&self.remote)?;
        let client = ctx.client(&config, &self.remote)?;
        let path = absolute(&self.path);
        let content = client.open_content(&path).await?;
        render_content(&path, &content, self.output.as_deref())
    }
}
