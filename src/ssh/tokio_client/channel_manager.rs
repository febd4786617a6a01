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

//! SSH channel operations for command execution.
//!
//! Output is not buffered here. Each chunk read from the channel is
//! forwarded to the caller-supplied sinks as soon as it arrives, so a
//! long running installer shows progress while it runs.

use russh::client::Msg;
use russh::Channel;
use tokio::sync::mpsc;

use super::connection::Client;

impl Client {
    /// Get a new SSH channel for communication.
    pub async fn get_channel(&self) -> Result<Channel<Msg>, super::Error> {
        self.connection_handle
            .channel_open_session()
            .await
            .map_err(super::Error::SshError)
    }

    /// Execute a remote command via the ssh connection.
    ///
    /// Standard output chunks are sent to `stdout`, extended data of type 1
    /// to `stderr`. The senders are dropped when the channel closes, which
    /// lets the receiving side observe the end of both streams.
    ///
    /// Returns the unix exit status (`$?` in bash) of the command.
    ///
    /// Every invocation is a new shell context. Thus `cd`, setting
    /// variables and alike have no effect on future invocations.
    pub async fn execute(
        &self,
        command: &str,
        stdout: mpsc::Sender<Vec<u8>>,
        stderr: mpsc::Sender<Vec<u8>>,
    ) -> Result<u32, super::Error> {
        let mut channel = self.connection_handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut result: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                russh::ChannelMsg::Data { ref data } => {
                    // A closed receiver only means nobody is listening anymore.
                    let _ = stdout.send(data.to_vec()).await;
                }
                russh::ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        let _ = stderr.send(data.to_vec()).await;
                    }
                }

                // The exit status may arrive before the last data packet,
                // so keep reading until the channel is closed.
                russh::ChannelMsg::ExitStatus { exit_status } => result = Some(exit_status),
                _ => {}
            }
        }

        result.ok_or(super::Error::CommandDidntExit)
    }
}
