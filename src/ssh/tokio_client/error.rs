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

use std::io;

/// Errors raised by the SSH client layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Password authentication failed")]
    PasswordWrong,
    #[error("Public key authentication failed")]
    KeyAuthFailed,
    #[error("Unable to load key: {0}")]
    KeyInvalid(#[source] russh::keys::Error),
    #[error("Unable to connect to the authentication agent")]
    AgentConnectionFailed,
    #[error("Unable to list identities of the authentication agent")]
    AgentRequestIdentitiesFailed,
    #[error("The authentication agent has no identities loaded")]
    AgentNoIdentities,
    #[error("None of the agent identities was accepted by the server")]
    AgentAuthenticationFailed,
    #[error("Server host key verification failed")]
    ServerCheckFailed,
    #[error("Invalid address: {0}")]
    AddressInvalid(#[source] io::Error),
    #[error("Command did not report an exit status")]
    CommandDidntExit,
    #[error("Command exited with status {0}")]
    CommandFailed(u32),
    #[error("Remote copy failed: {0}")]
    Scp(String),
    #[error("Remote copy to {path} did not finish within {seconds} seconds")]
    ScpTimeout { path: String, seconds: u64 },
    #[error("SSH error: {0}")]
    SshError(#[from] russh::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
