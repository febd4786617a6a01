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

//! SSH authentication methods and server verification.
//!
//! An [`AuthMethod`] is produced once by the credential resolver
//! (`crate::ssh::auth`) and consumed by [`authenticate`] during the
//! handshake. Key material is already decoded at that point, so a bad
//! passphrase surfaces before any connection is attempted.

use russh::client::{Handle, Handler};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// An authentication token used when connecting a [`Client`](super::Client).
#[derive(Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(Zeroizing<String>),
    /// A decoded private key read from disk.
    PrivateKey(Arc<PrivateKey>),
    /// A single identity held by the running authentication agent.
    #[cfg(not(target_os = "windows"))]
    AgentIdentity(PublicKey),
    /// Every identity offered by the running authentication agent.
    #[cfg(not(target_os = "windows"))]
    Agent,
}

impl AuthMethod {
    /// Convenience method to create a [`AuthMethod`] from a string literal.
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key(key: PrivateKey) -> Self {
        Self::PrivateKey(Arc::new(key))
    }

    #[cfg(not(target_os = "windows"))]
    pub fn with_agent_identity(identity: PublicKey) -> Self {
        Self::AgentIdentity(identity)
    }

    #[cfg(not(target_os = "windows"))]
    pub fn with_agent() -> Self {
        Self::Agent
    }

    /// Short name used in log lines; never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::PrivateKey(_) => "private-key",
            #[cfg(not(target_os = "windows"))]
            Self::AgentIdentity(_) => "agent-identity",
            #[cfg(not(target_os = "windows"))]
            Self::Agent => "agent",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthMethod").field(&self.kind()).finish()
    }
}

/// Server host key verification methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// No verification - accept any host key
    NoCheck,
    /// Use default known_hosts file (~/.ssh/known_hosts)
    DefaultKnownHostsFile,
}

/// This takes a handle and performs authentification with the given method.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), super::Error> {
    match auth {
        AuthMethod::Password(password) => {
            let is_authentificated = handle.authenticate_password(username, &**password).await?;
            if !is_authentificated.success() {
                return Err(super::Error::PasswordWrong);
            }
        }
        AuthMethod::PrivateKey(key) => {
            let is_authentificated = handle
                .authenticate_publickey(
                    username,
                    PrivateKeyWithHashAlg::new(key, handle.best_supported_rsa_hash().await?.flatten()),
                )
                .await?;
            if !is_authentificated.success() {
                return Err(super::Error::KeyAuthFailed);
            }
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::AgentIdentity(identity) => {
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|_| super::Error::AgentConnectionFailed)?;

            let is_authentificated = handle
                .authenticate_publickey_with(
                    username,
                    identity,
                    handle.best_supported_rsa_hash().await?.flatten(),
                    &mut agent,
                )
                .await
                .map_err(|_| super::Error::AgentAuthenticationFailed)?;
            if !is_authentificated.success() {
                return Err(super::Error::KeyAuthFailed);
            }
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::Agent => {
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|_| super::Error::AgentConnectionFailed)?;

            let identities = agent
                .request_identities()
                .await
                .map_err(|_| super::Error::AgentRequestIdentitiesFailed)?;

            if identities.is_empty() {
                return Err(super::Error::AgentNoIdentities);
            }

            let mut auth_success = false;
            for identity in identities {
                let result = handle
                    .authenticate_publickey_with(
                        username,
                        identity.clone(),
                        handle.best_supported_rsa_hash().await?.flatten(),
                        &mut agent,
                    )
                    .await;

                if let Ok(auth_result) = result {
                    if auth_result.success() {
                        auth_success = true;
                        break;
                    }
                }
            }

            if !auth_success {
                return Err(super::Error::AgentAuthenticationFailed);
            }
        }
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_does_not_leak_password() {
        let auth = AuthMethod::with_password("hunter2");
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AuthMethod::with_password("x").kind(), "password");
        #[cfg(not(target_os = "windows"))]
        assert_eq!(AuthMethod::with_agent().kind(), "agent");
    }
}
