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
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;

use super::output::{self, Passthrough};
use super::{CommandResult, Operator, OperatorError};
use crate::utils::parse_mode;

/// Runs commands and writes files on the machine running this process.
#[derive(Debug, Clone)]
pub struct LocalOperator {
    stream_output: bool,
}

impl LocalOperator {
    pub fn new() -> Self {
        Self {
            stream_output: true,
        }
    }

    /// Capture command output without mirroring it to this process.
    pub fn quiet() -> Self {
        Self {
            stream_output: false,
        }
    }
}

impl Default for LocalOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for LocalOperator {
    async fn execute(&self, command: &str) -> Result<CommandResult, OperatorError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

        let stdout_task = output::drain_reader(stdout, Passthrough::for_stream(self.stream_output, false));
        let stderr_task = output::drain_reader(stderr, Passthrough::for_stream(self.stream_output, true));

        let status = child.wait().await;
        let stdout = output::join(stdout_task).await?;
        let stderr = output::join(stderr_task).await?;
        let status = status?;

        if !status.success() {
            return Err(OperatorError::CommandFailed {
                exit_status: status.code().unwrap_or(-1),
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
        let mode_bits = parse_mode(mode).ok_or_else(|| OperatorError::InvalidMode(mode.to_string()))?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(mode_bits);

        let mut file = options.open(remote_path).await?;
        let written = tokio::io::copy(content, &mut file).await?;
        file.flush().await?;
        drop(file);

        // The open mode is filtered by the umask; set the requested bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(remote_path, std::fs::Permissions::from_mode(mode_bits))
                .await?;
        }
        #[cfg(not(unix))]
        let _ = mode_bits;

        tracing::debug!("Wrote {} bytes to {} ({})", written, remote_path, mode);
        Ok(())
    }

    async fn close(&self) -> Result<(), OperatorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_execute_captures_both_streams() {
        let operator = LocalOperator::quiet();
        let result = operator
            .execute("echo out; echo err 1>&2")
            .await
            .unwrap();
        assert_eq!(result.stdout_lossy(), "out\n");
        assert_eq!(result.stderr_lossy(), "err\n");
    }

    #[tokio::test]
    async fn test_execute_non_zero_exit_is_error() {
        let operator = LocalOperator::quiet();
        let err = operator.execute("exit 3").await.unwrap_err();
        assert!(matches!(err, OperatorError::CommandFailed { exit_status: 3 }));
    }

    #[tokio::test]
    async fn test_execute_large_output_does_not_block() {
        let operator = LocalOperator::quiet();
        let result = operator
            .execute("i=0; while [ $i -lt 20000 ]; do echo 0123456789; echo abc 1>&2; i=$((i+1)); done")
            .await
            .unwrap();
        assert_eq!(result.stdout.len(), 20000 * 11);
        assert_eq!(result.stderr.len(), 20000 * 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_writes_bytes_and_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("consul.hcl");
        let path_str = path.to_str().unwrap();
        let operator = LocalOperator::quiet();

        let mut content: &[u8] = b"datacenter = \"dc1\"\n";
        operator.upload(&mut content, path_str, "0640").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"datacenter = \"dc1\"\n");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);

        // Uploading again truncates and applies the new mode.
        let mut content: &[u8] = b"#!/bin/sh\n";
        operator.upload(&mut content, path_str, "755").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"#!/bin/sh\n");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        let operator = LocalOperator::quiet();

        let mut content: &[u8] = b"x";
        let err = operator
            .upload(&mut content, path.to_str().unwrap(), "rw-r--r--")
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorError::InvalidMode(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upload_file_copies_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("ca.pem");
        let dest = temp_dir.path().join("copy.pem");
        std::fs::write(&source, "-----BEGIN CERTIFICATE-----\n").unwrap();

        let operator = LocalOperator::quiet();
        operator
            .upload_file(&source, dest.to_str().unwrap(), "0640")
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "-----BEGIN CERTIFICATE-----\n"
        );
    }

    #[tokio::test]
    async fn test_upload_file_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let operator = LocalOperator::quiet();
        let err = operator
            .upload_file(
                &temp_dir.path().join("missing.pem"),
                temp_dir.path().join("dest").to_str().unwrap(),
                "0640",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorError::LocalFile { .. }));
    }
}
