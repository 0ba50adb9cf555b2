use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Repository URL, e.g. https://github.com/owner/repo
    #[arg(long)]
    pub repo: String,

    /// Branch to read from and commit to
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Base URL of the REST API
    #[arg(long, default_value = common::repo::DEFAULT_API_URL)]
    pub api_url: String,

    /// Access token to store in the config file (prefer GITFS_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::new(self.repo.clone());
        config.branch = self.branch.clone();
        config.api_url = self.api_url.clone();
        config.token = self.token.clone();

        let state = AppState::init(ctx.config_path.clone(), config)?;

        let output = format!(
            "Initialized gitfs directory at: {}\n\
             - Config: {}\n\
             - Repository: {}\n\
             - Branch: {}\n\
             - API: {}\n\
             - Token: {}",
            state.gitfs_dir.display(),
            state.config_path.display(),
            state.config.repo,
            state.config.branch,
            state.config.api_url,
            if state.config.token.is_some() {
                "stored in config"
            } else {
                "not stored (use --token or GITFS_TOKEN)"
            }
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("gitfs");
        let ctx = OpContext::new(Some(dir.clone()));

        let init = Init {
            repo: "https://github.com/octo/hello".to_string(),
            branch: "dev".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            token: None,
        };
        let output = init.execute(&ctx).await.unwrap();
        assert!(output.contains("Branch: dev"));

        let state = AppState::load(Some(dir)).unwrap();
        assert_eq!(state.config.api_url, "http://127.0.0.1:9");
        assert!(state.config.token.is_none());

        assert!(init.execute(&ctx).await.is_err());
    }
}
