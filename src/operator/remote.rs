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

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use super::output::{self, Passthrough};
use super::{CommandResult, Operator, OperatorError};
use crate::ssh::auth::{AuthContext, CredentialResolver, SecretReader};
use crate::ssh::known_hosts;
use crate::ssh::tokio_client::{self, Client};
use crate::target::Target;
use crate::utils::expand_tilde;

/// Time allowed for dialing and authenticating.
const SSH_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Chunks buffered between the SSH channel reader and a drain task.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Runs commands and uploads files over one authenticated SSH connection.
#[derive(Debug)]
pub struct SshOperator {
    client: Client,
    stream_output: bool,
}

impl SshOperator {
    /// Resolve credentials for `target`, dial it and authenticate.
    ///
    /// Credential problems are returned as [`OperatorError::Credential`];
    /// dial and handshake failures as [`OperatorError::TargetConnect`].
    pub async fn connect(
        target: &Target,
        reader: Arc<dyn SecretReader>,
    ) -> Result<Self, OperatorError> {
        let (host, port) = target.host_and_port()?;
        let address = format!("{host}:{port}");

        let ctx = AuthContext::new(target.user.clone(), host.clone())
            .with_key_path(target.key.clone())
            .with_password(target.resolved_password()?);
        let auth = CredentialResolver::new(reader).resolve(&ctx).await?;
        let server_check = known_hosts::get_check_method(target.strict_host_key_checking);

        tracing::info!("Connecting to {}@{}", target.user, address);
        let connect = Client::connect(&host, port, &target.user, auth, server_check);
        let client = match tokio::time::timeout(Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS), connect).await {
            Ok(Ok(client)) => client,
            Ok(Err(source)) => return Err(OperatorError::TargetConnect { address, source }),
            Err(_) => {
                return Err(OperatorError::TargetConnect {
                    address,
                    source: tokio_client::Error::IoError(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connection timed out after {SSH_CONNECT_TIMEOUT_SECS} seconds"),
                    )),
                })
            }
        };

        Ok(Self::from_client(client))
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            stream_output: true,
        }
    }

    /// Enable or disable mirroring of remote output to this process.
    pub fn with_stream_output(mut self, stream_output: bool) -> Self {
        self.stream_output = stream_output;
        self
    }
}

#[async_trait]
impl Operator for SshOperator {
    async fn execute(&self, command: &str) -> Result<CommandResult, OperatorError> {
        let (stdout_tx, stdout_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        let stdout_task = output::drain_channel(stdout_rx, Passthrough::for_stream(self.stream_output, false));
        let stderr_task = output::drain_channel(stderr_rx, Passthrough::for_stream(self.stream_output, true));

        // The senders move into `execute` and are dropped when it returns,
        // which ends both drain tasks.
        let status = self.client.execute(command, stdout_tx, stderr_tx).await;
        let stdout = output::join(stdout_task).await?;
        let stderr = output::join(stderr_task).await?;
        let status = status?;

        if status != 0 {
            return Err(OperatorError::CommandFailed {
                exit_status: i32::try_from(status).unwrap_or(i32::MAX),
            });
        }

        Ok(CommandResult { stdout, stderr })
    }

    async fn upload(
        &self,
        content: &mut (dyn AsyncRead + Unpin + Send),
        remote_path: &str,
        mode: &str,
    ) -> Result<(), OperatorError> {
        if crate::utils::parse_mode(mode).is_none() {
            return Err(OperatorError::InvalidMode(mode.to_string()));
        }

        // The SCP header carries the size; an unsized reader is buffered.
        // Files go through `upload_file`, which streams them.
        let mut buffer = Vec::new();
        content.read_to_end(&mut buffer).await?;

        let size = buffer.len() as u64;
        self.client
            .scp_upload(&mut buffer.as_slice(), size, remote_path, mode)
            .await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        mode: &str,
    ) -> Result<(), OperatorError> {
        if crate::utils::parse_mode(mode).is_none() {
            return Err(OperatorError::InvalidMode(mode.to_string()));
        }

        let path = expand_tilde(local_path);
        let local_file_error = |source| OperatorError::LocalFile {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::File::open(&path).await.map_err(local_file_error)?;
        let size = file.metadata().await.map_err(local_file_error)?.len();

        self.client
            .scp_upload(&mut file, size, remote_path, mode)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), OperatorError> {
        if self.client.is_closed() {
            return Ok(());
        }
        self.client.disconnect().await?;
        Ok(())
    }
}
