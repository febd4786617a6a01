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

//! The machine an action is performed on.
//!
//! A [`Target`] is built once from the parsed flags and read-only
//! afterwards. Secrets may be given literally or as the path of a file
//! holding them; the file is read when the secret is needed.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::security::SecretValue;
use crate::utils::expand_tilde;

/// Port used when the target address does not carry one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Connection and privilege settings for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Target {
    /// `host` or `host:port` of the remote machine; unused when `local` is set.
    pub address: String,
    /// Remote login user.
    pub user: String,
    /// Private key used for public key authentication.
    pub key: Option<PathBuf>,
    /// Login password, or the path of a file containing it.
    pub password: Option<SecretValue>,
    /// Password passed to `sudo` by the payloads, or the path of a file containing it.
    pub sudo_password: Option<SecretValue>,
    /// Act on the machine running this process instead of a remote host.
    pub local: bool,
    /// Verify the remote host key against `~/.ssh/known_hosts`.
    pub strict_host_key_checking: bool,
}

impl Target {
    /// Check flag combinations. Runs before any transport is constructed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.local && self.address.trim().is_empty() {
            return Err(ValidationError::new(
                "ssh-target-addr",
                "a target address is required unless --local is set",
            ));
        }
        if !self.local && self.user.trim().is_empty() {
            return Err(ValidationError::empty("ssh-target-user"));
        }
        Ok(())
    }

    /// Split the address into host and port, defaulting the port to 22.
    ///
    /// Bracketed IPv6 literals (`[::1]:2222`) are supported; a bare IPv6
    /// literal is taken as a host without port.
    pub fn host_and_port(&self) -> Result<(String, u16), ValidationError> {
        parse_address(self.address.trim())
    }

    /// The login password, read from a file when the flag names one.
    pub fn resolved_password(&self) -> io::Result<Option<SecretValue>> {
        resolve(self.password.as_ref())
    }

    /// The sudo password, read from a file when the flag names one.
    pub fn resolved_sudo_password(&self) -> io::Result<Option<SecretValue>> {
        resolve(self.sudo_password.as_ref())
    }

    /// Human readable name of the target for progress and error messages.
    pub fn display_name(&self) -> String {
        if self.local {
            "localhost".to_string()
        } else {
            format!("{}@{}", self.user, self.address)
        }
    }
}

fn parse_address(address: &str) -> Result<(String, u16), ValidationError> {
    if address.is_empty() {
        return Err(ValidationError::empty("ssh-target-addr"));
    }

    if let Some(rest) = address.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| {
            ValidationError::new("ssh-target-addr", format!("unterminated '[' in '{address}'"))
        })?;
        let port = match after.strip_prefix(':') {
            Some(port) => parse_port(address, port)?,
            None if after.is_empty() => DEFAULT_SSH_PORT,
            None => {
                return Err(ValidationError::new(
                    "ssh-target-addr",
                    format!("unexpected characters after ']' in '{address}'"),
                ))
            }
        };
        return Ok((host.to_string(), port));
    }

    match address.rsplit_once(':') {
        // More than one colon without brackets: a bare IPv6 literal.
        Some((host, _)) if host.contains(':') => Ok((address.to_string(), DEFAULT_SSH_PORT)),
        Some((host, port)) => Ok((host.to_string(), parse_port(address, port)?)),
        None => Ok((address.to_string(), DEFAULT_SSH_PORT)),
    }
}

fn parse_port(address: &str, port: &str) -> Result<u16, ValidationError> {
    port.parse::<u16>().map_err(|_| {
        ValidationError::new(
            "ssh-target-addr",
            format!("invalid port '{port}' in '{address}'"),
        )
    })
}

/// Replace a value naming an existing file with the file's trimmed content.
fn resolve(value: Option<&SecretValue>) -> io::Result<Option<SecretValue>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let path = expand_tilde(Path::new(value.expose()));
    if path.is_file() {
        tracing::debug!("Reading secret from {:?}", path);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to read secret file {path:?}: {e}"))
        })?;
        return Ok(SecretValue::new(content.trim().to_string()));
    }

    Ok(Some(value.clone()))
}
