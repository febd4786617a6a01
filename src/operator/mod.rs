// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Execution transport: run commands and upload files on a target.
//!
//! Two interchangeable implementations exist: [`LocalOperator`] acts on
//! the machine running this process, [`SshOperator`] on a remote host over
//! one authenticated SSH connection. Which one is used is decided once by
//! [`connect`] from [`Target::local`].

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::error::ValidationError;
use crate::ssh::auth::{CredentialError, SecretReader, TerminalSecretReader};
use crate::ssh::tokio_client;
use crate::target::Target;
use crate::utils::expand_tilde;

mod local;
pub mod output;
mod remote;

pub use local::LocalOperator;
pub use remote::SshOperator;

/// Output captured from a single command.
///
/// The same bytes were also streamed to this process's stdout and stderr
/// while the command ran, unless streaming was disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Errors raised by an [`Operator`].
#[derive(thiserror::Error, Debug)]
pub enum OperatorError {
    /// Dialing or authenticating against the target failed.
    #[error("Failed to connect to target {address}")]
    TargetConnect {
        address: String,
        #[source]
        source: tokio_client::Error,
    },
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The command ran but exited with a non-zero status.
    #[error("Command exited with status {exit_status}")]
    CommandFailed { exit_status: i32 },
    #[error("Invalid file mode '{0}'")]
    InvalidMode(String),
    #[error("Failed to open local file {path:?}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("SSH transport error")]
    Transport(#[from] tokio_client::Error),
    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// Run commands and place files on a target.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Run `command` through `sh -c`, streaming and capturing its output.
    ///
    /// A non-zero exit status is reported as [`OperatorError::CommandFailed`].
    async fn execute(&self, command: &str) -> Result<CommandResult, OperatorError>;

    /// Write `content` to `remote_path` with the octal permission `mode`.
    async fn upload(
        &self,
        content: &mut (dyn AsyncRead + Unpin + Send),
        remote_path: &str,
        mode: &str,
    ) -> Result<(), OperatorError>;

    /// Upload an existing local file. A leading `~` in `local_path` is expanded.
    async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        mode: &str,
    ) -> Result<(), OperatorError> {
        let path = expand_tilde(local_path);
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| OperatorError::LocalFile {
                path: path.clone(),
                source,
            })?;
        self.upload(&mut file, remote_path, mode).await
    }

    /// Release the underlying session. Called once, after the last step.
    async fn close(&self) -> Result<(), OperatorError>;
}

/// Open the operator selected by `target.local`, prompting on the
/// terminal for key passphrases.
pub async fn connect(target: &Target) -> Result<Box<dyn Operator>, OperatorError> {
    connect_with_reader(target, Arc::new(TerminalSecretReader)).await
}

/// Same as [`connect`] with an explicit source for interactive secrets.
pub async fn connect_with_reader(
    target: &Target,
    reader: Arc<dyn SecretReader>,
) -> Result<Box<dyn Operator>, OperatorError> {
    target.validate()?;

    if target.local {
        tracing::debug!("Using local operator");
        return Ok(Box::new(LocalOperator::new()));
    }

    let operator = SshOperator::connect(target, reader).await?;
    Ok(Box::new(operator))
}
