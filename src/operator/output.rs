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

//! Output draining for running commands.
//!
//! Each stream of a command is drained by its own task, which forwards
//! every chunk to this process's matching stream and keeps a copy. Both
//! tasks are joined before a command result is returned, so the captured
//! output is complete and a chatty command never blocks on a full pipe.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::OperatorError;

const DRAIN_BUFFER_SIZE: usize = 8192;

/// Where drained output is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    Stdout,
    Stderr,
    Discard,
}

impl Passthrough {
    /// Pick the mirror for stdout or stderr, or discard when streaming is off.
    pub fn for_stream(stream_output: bool, is_stderr: bool) -> Self {
        match (stream_output, is_stderr) {
            (false, _) => Self::Discard,
            (true, false) => Self::Stdout,
            (true, true) => Self::Stderr,
        }
    }

    async fn write(self, chunk: &[u8]) {
        let result = match self {
            Self::Stdout => {
                let mut out = tokio::io::stdout();
                match out.write_all(chunk).await {
                    Ok(()) => out.flush().await,
                    Err(e) => Err(e),
                }
            }
            Self::Stderr => {
                let mut err = tokio::io::stderr();
                match err.write_all(chunk).await {
                    Ok(()) => err.flush().await,
                    Err(e) => Err(e),
                }
            }
            Self::Discard => Ok(()),
        };
        // The copy is what matters; a closed terminal must not fail the command.
        if let Err(e) = result {
            tracing::debug!("Failed to mirror command output: {}", e);
        }
    }
}

/// Drain an async reader until EOF.
pub fn drain_reader<R>(mut reader: R, passthrough: Passthrough) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = Vec::new();
        let mut chunk = vec![0u8; DRAIN_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            passthrough.write(&chunk[..n]).await;
            captured.extend_from_slice(&chunk[..n]);
        }
        Ok(captured)
    })
}

/// Drain a channel of output chunks until every sender is dropped.
pub fn drain_channel(
    mut receiver: mpsc::Receiver<Vec<u8>>,
    passthrough: Passthrough,
) -> JoinHandle<std::io::Result<Vec<u8>>> {
    tokio::spawn(async move {
        let mut captured = Vec::new();
        while let Some(chunk) = receiver.recv().await {
            passthrough.write(&chunk).await;
            captured.extend_from_slice(&chunk);
        }
        Ok(captured)
    })
}

/// Wait for a drain task and return what it captured.
pub async fn join(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, OperatorError> {
    match handle.await {
        Ok(result) => Ok(result?),
        Err(e) => Err(OperatorError::Io(std::io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_reader_captures_everything() {
        let data: &[u8] = b"line one\nline two\n";
        let handle = drain_reader(data, Passthrough::Discard);
        assert_eq!(join(handle).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_drain_channel_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = drain_channel(rx, Passthrough::Discard);

        tx.send(b"abc".to_vec()).await.unwrap();
        tx.send(b"def".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(join(handle).await.unwrap(), b"abcdef");
    }

    #[test]
    fn test_passthrough_selection() {
        assert_eq!(Passthrough::for_stream(false, true), Passthrough::Discard);
        assert_eq!(Passthrough::for_stream(true, false), Passthrough::Stdout);
        assert_eq!(Passthrough::for_stream(true, true), Passthrough::Stderr);
    }
}
