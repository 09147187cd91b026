// ABOUTME: Parsing adapter between transitions and the remote executor.
// ABOUTME: Turns raw per-host output into checked, structured values.

use super::{HostOutput, RemoteCommand, RemoteError, RemoteExecutor, shell};
use crate::release::{DirListing, reconcile_listings};

/// Typed operations over a [`RemoteExecutor`].
#[derive(Clone, Copy)]
pub struct RemoteOps<'a> {
    executor: &'a dyn RemoteExecutor,
}

impl<'a> RemoteOps<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor) -> Self {
        Self { executor }
    }

    pub fn hosts(&self) -> &'a [String] {
        self.executor.hosts()
    }

    /// Run on every host; any non-zero exit becomes an error.
    pub async fn run(&self, command: &RemoteCommand) -> Result<Vec<HostOutput>, RemoteError> {
        self.executor
            .execute(command)
            .await?
            .into_iter()
            .map(|output| checked(command, output))
            .collect()
    }

    /// Run on a single host; a non-zero exit becomes an error.
    pub async fn run_on(
        &self,
        host: usize,
        command: &RemoteCommand,
    ) -> Result<HostOutput, RemoteError> {
        let output = self.executor.execute_on(host, command).await?;
        checked(command, output)
    }

    /// Run on every host and return the raw outputs, whatever their status.
    pub async fn run_unchecked(
        &self,
        command: &RemoteCommand,
    ) -> Result<Vec<HostOutput>, RemoteError> {
        self.executor.execute(command).await
    }

    /// Trimmed stdout of each host, in host order.
    pub async fn texts(&self, command: &RemoteCommand) -> Result<Vec<String>, RemoteError> {
        Ok(self
            .run(command)
            .await?
            .iter()
            .map(|output| output.text().to_string())
            .collect())
    }

    /// Where `link` points on each host.
    pub async fn readlink(&self, link: &str) -> Result<Vec<String>, RemoteError> {
        self.texts(&shell::readlink(link)).await
    }

    pub async fn relink(&self, target: &str, link: &str) -> Result<(), RemoteError> {
        self.run(&shell::relink(target, link)).await.map(drop)
    }

    pub async fn relink_on(&self, host: usize, target: &str, link: &str) -> Result<(), RemoteError> {
        self.run_on(host, &shell::relink(target, link))
            .await
            .map(drop)
    }

    /// Whether `path` is a directory, per host.
    pub async fn dir_exists(&self, path: &str) -> Result<Vec<bool>, RemoteError> {
        Ok(self
            .run_unchecked(&shell::dir_exists(path))
            .await?
            .iter()
            .map(HostOutput::success)
            .collect())
    }

    /// Subdirectories of `path` on every host, reconciled into one listing.
    pub async fn list_dirs(&self, path: &str) -> Result<DirListing, RemoteError> {
        let per_host = self
            .run(&shell::list_dirs(path))
            .await?
            .into_iter()
            .map(|output| {
                let names = output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                (output.host, names)
            })
            .collect();
        Ok(reconcile_listings(per_host))
    }
}

fn checked(command: &RemoteCommand, output: HostOutput) -> Result<HostOutput, RemoteError> {
    if output.success() {
        Ok(output)
    } else {
        Err(RemoteError::CommandFailed {
            host: output.host,
            command: command.render(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }
}
