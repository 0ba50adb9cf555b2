//! FUSE mount command
//!
//! Mounts a repository branch as a local filesystem in the foreground.

use std::path::PathBuf;

use clap::Args;
use common::fs::GitFs;
use fuser::MountOption;

use crate::args::RemoteArgs;
use crate::fuse::GitFuse;
use crate::op::{ClientError, Op};
use crate::process;
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Mount {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Local directory to mount the repository at
    #[arg(long)]
    pub mount_point: PathBuf,

    /// Allow other users to access the mount (requires user_allow_other in /etc/fuse.conf)
    #[arg(long, default_value = "false")]
    pub allow_other: bool,

    /// Run in read-only mode
    #[arg(long, default_value = "false")]
    pub read_only: bool,

    /// Unmount an existing FUSE mount instead of mounting
    #[arg(long, short = 'u')]
    pub unmount: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Mount point is not a directory: {0}")]
    MountPointNotDirectory(PathBuf),
    #[error("FUSE error: {0}")]
    Fuse(String),
    #[error("Unmount failed: {0}")]
    Unmount(String),
}

impl Mount {
    fn do_unmount(&self) -> Result<String, MountError> {
        #[cfg(target_os = "linux")]
        {
            let status = std::process::Command::new("fusermount")
                .args(["-u", &self.mount_point.to_string_lossy()])
                .status()
                .map_err(|e| MountError::Unmount(e.to_string()))?;

            if !status.success() {
                return Err(MountError::Unmount(format!(
                    "fusermount -u failed with status: {}",
                    status
                )));
            }
        }

        #[cfg(target_os = "macos")]
        {
            let status = std::process::Command::new("umount")
                .arg(&self.mount_point)
                .status()
                .map_err(|e| MountError::Unmount(e.to_string()))?;

            if !status.success() {
                return Err(MountError::Unmount(format!(
                    "umount failed with status: {}",
                    status
                )));
            }
        }

        Ok(format!("Unmounted {}", self.mount_point.display()))
    }

    fn options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName("gitfs".to_string()),
            MountOption::AutoUnmount,
            MountOption::DefaultPermissions,
        ];

        if self.allow_other {
            options.push(MountOption::AllowOther);
        }

        if self.read_only {
            options.push(MountOption::RO);
        }

        options
    }
}

#[async_trait::async_trait]
impl Op for Mount {
    type Error = MountError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.unmount {
            return self.do_unmount();
        }

        let config = ctx.config(&self.remote)?;
        let _guards = process::init_logging(config.log_level()?, config.log_dir.as_deref());

        let fs_config = config.fs_config()?;
        let client = ctx.client(&config, &self.remote)?;
        let repository = client.repository();

        if !self.mount_point.exists() {
            std::fs::create_dir_all(&self.mount_point)?;
        }

        if !self.mount_point.is_dir() {
            return Err(MountError::MountPointNotDirectory(self.mount_point.clone()));
        }

        let rt = tokio::runtime::Handle::current();
        let fs = GitFuse::new(
            rt,
            GitFs::with_config(client, fs_config),
            self.read_only,
        );

        let options = self.options();
        let mount_point = self.mount_point.clone();

        tracing::info!(
            repository = %repository,
            branch = %config.branch,
            mount_point = %mount_point.display(),
            read_only = self.read_only,
            "mounting"
        );
        println!(
            "Mounting {} ({}) at {}",
            repository,
            config.branch,
            self.mount_point.display()
        );
        println!("Press Ctrl+C to unmount");
        println!();

        // fuser's session loop blocks, and callbacks re-enter the runtime
        let result = tokio::task::spawn_blocking(move || fuser::mount2(fs, &mount_point, &options))
            .await
            .map_err(|e| MountError::Fuse(e.to_string()))?;

        result.map_err(MountError::Io)?;

        Ok(format!("Unmounted {}", self.mount_point.display()))
    }
}
