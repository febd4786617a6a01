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

//! Single file upload using the SCP sink protocol.
//!
//! The remote side runs `scp -qt <path>`. The exchange is:
//!
//! 1. wait for the sink's initial `\0` acknowledgement
//! 2. send `C<mode> <size> <name>\n`, wait for acknowledgement
//! 3. stream the content in chunks followed by a single `\0`, wait for
//!    acknowledgement
//! 4. send EOF
//!
//! A status byte of 1 (warning) or 2 (fatal) is followed by a message line.

use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::connection::Client;

/// SCP acknowledgement byte.
const SCP_OK: u8 = 0;

/// Bytes read from the source and sent per channel message.
const SCP_CHUNK_SIZE: usize = 32 * 1024;

/// Upper bound for a single upload, from opening the channel to the final
/// acknowledgement.
pub const SCP_TIMEOUT_SECS: u64 = 60;

impl Client {
    /// Copy `size` bytes read from `content` to `remote_path` with the given
    /// octal `mode` (e.g. `0644`).
    ///
    /// The content is streamed; at most one chunk is held in memory. The
    /// file name written on the remote host is the last component of
    /// `remote_path`; the parent directory must already exist.
    pub async fn scp_upload<R>(
        &self,
        content: &mut R,
        size: u64,
        remote_path: &str,
        mode: &str,
    ) -> Result<(), super::Error>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let transfer = self.scp_upload_inner(content, size, remote_path, mode);
        match tokio::time::timeout(Duration::from_secs(SCP_TIMEOUT_SECS), transfer).await {
            Ok(result) => result,
            Err(_) => Err(super::Error::ScpTimeout {
                path: remote_path.to_string(),
                seconds: SCP_TIMEOUT_SECS,
            }),
        }
    }

    async fn scp_upload_inner<R>(
        &self,
        content: &mut R,
        size: u64,
        remote_path: &str,
        mode: &str,
    ) -> Result<(), super::Error>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let file_name = remote_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| super::Error::Scp(format!("invalid remote path '{remote_path}'")))?;
        let mode = normalize_mode(mode)?;

        let mut channel = self.get_channel().await?;
        let command = format!("scp -qt {}", crate::utils::shell::quote(remote_path));
        tracing::debug!("Starting remote sink: {}", command);
        channel.exec(true, command).await?;

        wait_for_ok(&mut channel).await?;

        let header = format!("C{} {} {}\n", mode, size, file_name);
        channel.data(header.as_bytes()).await?;
        wait_for_ok(&mut channel).await?;

        let mut chunk = vec![0u8; SCP_CHUNK_SIZE];
        let mut remaining = size;
        while remaining > 0 {
            let n = read_chunk(content, &mut chunk, remaining).await?;
            channel.data(&chunk[..n]).await?;
            remaining -= n as u64;
        }
        channel.data(&[SCP_OK][..]).await?;
        wait_for_ok(&mut channel).await?;

        channel.eof().await?;
        tracing::debug!("Uploaded {} bytes to {}", size, remote_path);

        Ok(())
    }
}

/// Read the next chunk of at most `remaining` bytes.
///
/// The size was announced in the header, so a source that ends early is
/// an error.
async fn read_chunk<R>(
    content: &mut R,
    chunk: &mut [u8],
    remaining: u64,
) -> Result<usize, super::Error>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let want = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
    let n = content.read(&mut chunk[..want]).await?;
    if n == 0 {
        return Err(super::Error::Scp(format!(
            "source ended with {remaining} bytes left to send"
        )));
    }
    Ok(n)
}

/// Read messages until the sink answers with a status byte.
async fn wait_for_ok(channel: &mut Channel<Msg>) -> Result<(), super::Error> {
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => {
                if data.is_empty() {
                    continue;
                }
                if data[0] == SCP_OK {
                    return Ok(());
                }
                let message = String::from_utf8_lossy(&data[1..]).trim().to_string();
                return Err(super::Error::Scp(message));
            }
            ChannelMsg::ExtendedData { ref data, .. } => {
                tracing::debug!("scp: {}", String::from_utf8_lossy(data).trim_end());
            }
            ChannelMsg::ExitStatus { exit_status } if exit_status != 0 => {
                return Err(super::Error::Scp(format!(
                    "remote scp exited with status {exit_status}"
                )));
            }
            _ => {}
        }
    }
    Err(super::Error::Scp("connection closed".to_string()))
}

/// Returns the four digit form of `mode` used in the `C` header.
pub(crate) fn normalize_mode(mode: &str) -> Result<String, super::Error> {
    crate::utils::parse_mode(mode)
        .map(|value| format!("{value:04o}"))
        .ok_or_else(|| super::Error::Scp(format!("invalid file mode '{mode}'")))
}
