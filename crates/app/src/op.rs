use std::error::Error;
use std::path::PathBuf;

use common::repo::{GithubClient, RepoError};

use crate::args::RemoteArgs;
use crate::state::{AppConfig, AppState, StateError};

#[derive(Clone)]
pub struct OpContext {
    /// Optional custom config path (defaults to ~/.gitfs)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Load the configuration and apply command line overrides.
    ///
    /// An uninitialized config directory is accepted when `--repo` is given.
    pub fn config(&self, remote: &RemoteArgs) -> Result<AppConfig, StateError> {
        let mut config = match AppState::load(self.config_path.clone()) {
            Ok(state) => state.config,
            Err(StateError::NotInitialized) => match &remote.repo {
                Some(repo) => AppConfig::new(repo.clone()),
                None => return Err(StateError::NotInitialized),
            },
            Err(e) => return Err(e),
        };

        if let Some(repo) = &remote.repo {
            config.repo = repo.clone();
        }
        if let Some(branch) = &remote.branch {
            config.branch = branch.clone();
        }
        Ok(config)
    }

    /// Build the contents API client for `config`
    pub fn client(&self, config: &AppConfig, remote: &RemoteArgs) -> Result<GithubClient, ClientError> {
        let github = config.github_config(remote.token.as_deref())?;
        Ok(GithubClient::new(github)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
