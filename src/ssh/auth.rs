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

//! Credential resolution for SSH targets.
//!
//! Authentication is decided once per invocation by walking an ordered
//! chain of strategies. Each strategy either produces an [`AuthMethod`],
//! declines so the next one is asked, or fails the whole resolution:
//!
//! 1. password, when one was supplied
//! 2. private key file, when one was supplied; passphrase protected keys
//!    are first matched against the agent and only then unlocked with a
//!    passphrase read from the terminal
//! 3. the running authentication agent
//!
//! The interactive prompt sits behind [`SecretReader`] so it can be
//! replaced by a fixed value.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::tokio_client::AuthMethod;
use crate::security::SecretValue;
use crate::utils::expand_tilde;

/// Errors raised while resolving credentials.
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    /// No agent could be reached, or it holds no keys.
    #[error("SSH agent unavailable: {reason}")]
    AgentUnavailable { reason: String },
    #[error("Failed to read SSH key file {path:?}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse SSH key file {path:?}")]
    KeyParse {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },
    #[error("Failed to read passphrase")]
    Passphrase(#[source] io::Error),
}

/// Source of secrets that must be typed in by the user.
pub trait SecretReader: Send + Sync {
    /// Show `prompt` and read a secret without echoing it.
    fn read_secret(&self, prompt: &str) -> io::Result<Zeroizing<String>>;
}

/// Reads secrets from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSecretReader;

impl SecretReader for TerminalSecretReader {
    fn read_secret(&self, prompt: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(prompt).map(Zeroizing::new)
    }
}

/// Answers every prompt with the same value.
pub struct FixedSecretReader(Zeroizing<String>);

impl FixedSecretReader {
    pub fn new(secret: &str) -> Self {
        Self(Zeroizing::new(secret.to_string()))
    }
}

impl SecretReader for FixedSecretReader {
    fn read_secret(&self, _prompt: &str) -> io::Result<Zeroizing<String>> {
        Ok(self.0.clone())
    }
}

impl fmt::Debug for FixedSecretReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FixedSecretReader([REDACTED])")
    }
}

/// Inputs for credential resolution.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Optional path to SSH key file
    pub key_path: Option<PathBuf>,
    /// Password, already read from its file when given as a path
    pub password: Option<SecretValue>,
    /// Username for authentication prompts
    pub username: String,
    /// Host for authentication prompts
    pub host: String,
}

impl AuthContext {
    /// Create a new authentication context.
    pub fn new(username: String, host: String) -> Self {
        Self {
            key_path: None,
            password: None,
            username,
            host,
        }
    }

    /// Set the SSH key file path.
    pub fn with_key_path(mut self, key_path: Option<PathBuf>) -> Self {
        self.key_path = key_path;
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: Option<SecretValue>) -> Self {
        self.password = password;
        self
    }

    /// Resolve with the default strategy chain, prompting on the terminal.
    pub async fn determine_method(&self) -> Result<AuthMethod, CredentialError> {
        CredentialResolver::new(Arc::new(TerminalSecretReader))
            .resolve(self)
            .await
    }
}

/// One link of the resolution chain.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Produce a method, return `Ok(None)` to let the next strategy try,
    /// or fail the resolution.
    async fn resolve(&self, ctx: &AuthContext) -> Result<Option<AuthMethod>, CredentialError>;
}

/// Ordered chain of [`AuthStrategy`]s.
pub struct CredentialResolver {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl CredentialResolver {
    /// The standard chain: password, key file, agent.
    pub fn new(reader: Arc<dyn SecretReader>) -> Self {
        Self::with_strategies(vec![
            Box::new(PasswordStrategy),
            Box::new(KeyFileStrategy { reader }),
            Box::new(AgentStrategy),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn AuthStrategy>>) -> Self {
        Self { strategies }
    }

    /// Walk the chain and return the first method produced.
    pub async fn resolve(&self, ctx: &AuthContext) -> Result<AuthMethod, CredentialError> {
        for strategy in &self.strategies {
            if let Some(method) = strategy.resolve(ctx).await? {
                tracing::debug!(
                    "Using {} authentication for {}@{}",
                    strategy.name(),
                    ctx.username,
                    ctx.host
                );
                return Ok(method);
            }
            tracing::trace!("Authentication strategy {} declined", strategy.name());
        }

        Err(CredentialError::AgentUnavailable {
            reason: "no authentication method is available".to_string(),
        })
    }
}

/// Uses the supplied password.
pub struct PasswordStrategy;

#[async_trait]
impl AuthStrategy for PasswordStrategy {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn resolve(&self, ctx: &AuthContext) -> Result<Option<AuthMethod>, CredentialError> {
        Ok(ctx
            .password
            .as_ref()
            .map(|password| AuthMethod::with_password(password.expose())))
    }
}

/// Reads and decodes the supplied private key file.
pub struct KeyFileStrategy {
    reader: Arc<dyn SecretReader>,
}

impl KeyFileStrategy {
    pub fn new(reader: Arc<dyn SecretReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl AuthStrategy for KeyFileStrategy {
    fn name(&self) -> &'static str {
        "private key"
    }

    async fn resolve(&self, ctx: &AuthContext) -> Result<Option<AuthMethod>, CredentialError> {
        let Some(key_path) = ctx.key_path.as_deref() else {
            return Ok(None);
        };
        let path = expand_tilde(key_path);
        tracing::debug!("Authenticating with key: {:?}", path);

        let contents = Zeroizing::new(tokio::fs::read_to_string(&path).await.map_err(|source| {
            CredentialError::KeyRead {
                path: path.clone(),
                source,
            }
        })?);

        match russh::keys::decode_secret_key(&contents, None) {
            Ok(key) => Ok(Some(AuthMethod::with_key(key))),
            Err(err) if is_encrypted(&err, &contents) => {
                tracing::debug!("Key {:?} is passphrase protected", path);

                #[cfg(not(target_os = "windows"))]
                if let Some(identity) = find_agent_identity(&path).await {
                    tracing::debug!("Found matching identity in the SSH agent");
                    return Ok(Some(AuthMethod::with_agent_identity(identity)));
                }

                let passphrase = self
                    .reader
                    .read_secret(&format!("Enter passphrase for key {path:?}: "))
                    .map_err(CredentialError::Passphrase)?;
                let key = russh::keys::decode_secret_key(&contents, Some(passphrase.as_str()))
                    .map_err(|source| CredentialError::KeyParse {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Some(AuthMethod::with_key(key)))
            }
            Err(source) => Err(CredentialError::KeyParse { path, source }),
        }
    }
}

fn is_encrypted(err: &russh::keys::Error, contents: &str) -> bool {
    matches!(err, russh::keys::Error::KeyIsEncrypted) || contents.contains("ENCRYPTED")
}

/// Look up the agent identity whose public key matches `<key>.pub`.
///
/// Any failure (no agent, no public key file, no match) yields `None`.
#[cfg(not(target_os = "windows"))]
async fn find_agent_identity(key_path: &Path) -> Option<russh::keys::PublicKey> {
    let mut public_path = key_path.as_os_str().to_owned();
    public_path.push(".pub");
    let public_key = match russh::keys::load_public_key(&public_path) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!("No usable public key at {:?}: {}", public_path, e);
            return None;
        }
    };

    let mut agent = match russh::keys::agent::client::AgentClient::connect_env().await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::debug!("SSH agent not reachable: {}", e);
            return None;
        }
    };
    let identities = agent.request_identities().await.ok()?;

    identities
        .into_iter()
        .find(|identity| identity.key_data() == public_key.key_data())
}

/// Falls back to the running authentication agent.
pub struct AgentStrategy;

#[async_trait]
impl AuthStrategy for AgentStrategy {
    fn name(&self) -> &'static str {
        "agent"
    }

    #[cfg(not(target_os = "windows"))]
    async fn resolve(&self, _ctx: &AuthContext) -> Result<Option<AuthMethod>, CredentialError> {
        let mut agent = russh::keys::agent::client::AgentClient::connect_env()
            .await
            .map_err(|e| CredentialError::AgentUnavailable {
                reason: format!("cannot connect to the agent: {e}"),
            })?;

        let identities = agent
            .request_identities()
            .await
            .map_err(|e| CredentialError::AgentUnavailable {
                reason: format!("cannot list agent identities: {e}"),
            })?;

        if identities.is_empty() {
            return Err(CredentialError::AgentUnavailable {
                reason: "the agent holds no keys".to_string(),
            });
        }

        tracing::debug!("SSH agent offers {} identities", identities.len());
        Ok(Some(AuthMethod::with_agent()))
    }

    #[cfg(target_os = "windows")]
    async fn resolve(&self, _ctx: &AuthContext) -> Result<Option<AuthMethod>, CredentialError> {
        Err(CredentialError::AgentUnavailable {
            reason: "SSH agent authentication is not supported on Windows".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn resolver(passphrase: &str) -> CredentialResolver {
        CredentialResolver::new(Arc::new(FixedSecretReader::new(passphrase)))
    }

    #[test]
    fn test_auth_context_creation() {
        let ctx = AuthContext::new("testuser".to_string(), "testhost".to_string());
        assert_eq!(ctx.username, "testuser");
        assert_eq!(ctx.host, "testhost");
        assert_eq!(ctx.key_path, None);
        assert!(ctx.password.is_none());
    }

    #[tokio::test]
    async fn test_password_takes_priority_over_key() {
        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_password(SecretValue::new("secret".to_string()))
            .with_key_path(Some(PathBuf::from("/path/to/key")));

        let auth = resolver("unused").resolve(&ctx).await.unwrap();
        assert!(matches!(auth, AuthMethod::Password(ref p) if p.as_str() == "secret"));
    }

    #[tokio::test]
    async fn test_plain_key_file() {
        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_key_path(Some(fixture("id_ed25519_plain")));

        let auth = resolver("unused").resolve(&ctx).await.unwrap();
        assert!(matches!(auth, AuthMethod::PrivateKey(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_encrypted_key_uses_passphrase_reader() {
        let original = std::env::var_os("SSH_AUTH_SOCK");
        std::env::remove_var("SSH_AUTH_SOCK");

        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_key_path(Some(fixture("id_ed25519_encrypted")));
        let result = resolver("s3cret").resolve(&ctx).await;

        if let Some(sock) = original {
            std::env::set_var("SSH_AUTH_SOCK", sock);
        }
        assert!(matches!(result.unwrap(), AuthMethod::PrivateKey(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_encrypted_key_wrong_passphrase() {
        let original = std::env::var_os("SSH_AUTH_SOCK");
        std::env::remove_var("SSH_AUTH_SOCK");

        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_key_path(Some(fixture("id_ed25519_encrypted")));
        let result = resolver("wrong").resolve(&ctx).await;

        if let Some(sock) = original {
            std::env::set_var("SSH_AUTH_SOCK", sock);
        }
        assert!(matches!(result, Err(CredentialError::KeyParse { .. })));
    }

    #[tokio::test]
    async fn test_garbage_key_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join("broken_key");
        std::fs::write(&key_path, "fake key content").unwrap();

        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_key_path(Some(key_path));
        let result = resolver("unused").resolve(&ctx).await;
        assert!(matches!(result, Err(CredentialError::KeyParse { .. })));
    }

    #[tokio::test]
    async fn test_missing_key_is_read_error() {
        let ctx = AuthContext::new("user".to_string(), "host".to_string())
            .with_key_path(Some(PathBuf::from("/nonexistent/hashi-up/key")));
        let result = resolver("unused").resolve(&ctx).await;
        assert!(matches!(result, Err(CredentialError::KeyRead { .. })));
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    #[serial]
    async fn test_unreachable_agent_is_distinguished() {
        let original = std::env::var_os("SSH_AUTH_SOCK");
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var("SSH_AUTH_SOCK", temp_dir.path().join("missing.sock"));

        let ctx = AuthContext::new("user".to_string(), "host".to_string());
        let result = resolver("unused").resolve(&ctx).await;

        match original {
            Some(sock) => std::env::set_var("SSH_AUTH_SOCK", sock),
            None => std::env::remove_var("SSH_AUTH_SOCK"),
        }
        assert!(matches!(
            result,
            Err(CredentialError::AgentUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_chain_reports_agent_unavailable() {
        let ctx = AuthContext::new("user".to_string(), "host".to_string());
        let result = CredentialResolver::with_strategies(vec![]).resolve(&ctx).await;
        assert!(matches!(
            result,
            Err(CredentialError::AgentUnavailable { .. })
        ));
    }
}
