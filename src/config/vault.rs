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

//! Vault server configuration.

use clap::{Args, ValueEnum};

use super::hcl::{Block, Body};
use super::{
    require_all_or_none, require_distinct_file_names, tls_set_complete, GeneratedConfig, Product,
};
use crate::error::ValidationError;
use crate::utils::target_file_name;

/// Storage backend of a Vault server.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Local filesystem under /opt/vault
    #[default]
    File,
    /// Consul key-value store
    Consul,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Consul => "consul",
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Address to listen on, may be repeated
    #[arg(long, default_value = "0.0.0.0:8200")]
    pub address: Vec<String>,

    /// Full URL advertised to other servers for client redirection
    #[arg(long = "api-addr", default_value = "")]
    pub api_addr: String,

    /// Address advertised to other servers for request forwarding
    #[arg(long = "cluster-addr", default_value = "")]
    pub cluster_addr: String,

    /// Certificate used by the listeners
    #[arg(long = "cert-file", default_value = "")]
    pub cert_file: String,

    /// Private key of the listener certificate
    #[arg(long = "key-file", default_value = "")]
    pub key_file: String,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = StorageBackend::File)]
    pub storage: StorageBackend,

    /// Address of the Consul agent used as storage
    #[arg(long = "consul-addr", default_value = "127.0.0.1:8500")]
    pub consul_addr: String,

    /// Path in the Consul key-value store holding Vault data
    #[arg(long = "consul-path", default_value = "vault/")]
    pub consul_path: String,

    /// Consul ACL token with access to --consul-path
    #[arg(long = "consul-token", default_value = "")]
    pub consul_token: String,

    /// CA certificate for Consul communication
    #[arg(long = "consul-tls-ca-file", default_value = "")]
    pub consul_ca_file: String,

    /// Certificate for Consul communication
    #[arg(long = "consul-tls-cert-file", default_value = "")]
    pub consul_cert_file: String,

    /// Private key for Consul communication
    #[arg(long = "consul-tls-key-file", default_value = "")]
    pub consul_key_file: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: vec!["0.0.0.0:8200".to_string()],
            api_addr: String::new(),
            cluster_addr: String::new(),
            cert_file: String::new(),
            key_file: String::new(),
            storage: StorageBackend::File,
            consul_addr: "127.0.0.1:8500".to_string(),
            consul_path: "vault/".to_string(),
            consul_token: String::new(),
            consul_ca_file: String::new(),
            consul_cert_file: String::new(),
            consul_key_file: String::new(),
        }
    }
}

impl VaultConfig {
    pub fn enable_tls(&self) -> bool {
        tls_set_complete(&[&self.cert_file, &self.key_file])
    }

    pub fn enable_consul_tls(&self) -> bool {
        self.storage == StorageBackend::Consul
            && tls_set_complete(&[
                &self.consul_ca_file,
                &self.consul_cert_file,
                &self.consul_key_file,
            ])
    }

    fn path(&self, file: &str) -> String {
        target_file_name(file, Product::Vault.config_dir())
    }

    fn storage_body(&self) -> Body {
        match self.storage {
            StorageBackend::File => Body::new().attr("path", "/opt/vault"),
            StorageBackend::Consul => {
                let body = Body::new()
                    .attr("address", self.consul_addr.as_str())
                    .attr("path", self.consul_path.as_str())
                    .non_empty("token", &self.consul_token);
                if !self.enable_consul_tls() {
                    return body;
                }
                body.attr("scheme", "https")
                    .attr("tls_ca_file", self.path(&self.consul_ca_file))
                    .attr("tls_cert_file", self.path(&self.consul_cert_file))
                    .attr("tls_key_file", self.path(&self.consul_key_file))
            }
        }
    }

    fn listener(&self, address: &str) -> Block {
        let body = Body::new().attr("address", address);
        let body = if self.enable_tls() {
            body.attr("tls_disable", false)
                .attr("tls_cert_file", self.path(&self.cert_file))
                .attr("tls_key_file", self.path(&self.key_file))
        } else {
            body.attr("tls_disable", true)
        };
        Block::labeled("listener", "tcp", body)
    }
}

impl GeneratedConfig for VaultConfig {
    fn product(&self) -> Product {
        Product::Vault
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.address.iter().any(|a| a.trim().is_empty()) {
            return Err(ValidationError::empty("address"));
        }
        require_all_or_none(
            "tls",
            &[("cert-file", &self.cert_file), ("key-file", &self.key_file)],
        )?;
        if self.storage == StorageBackend::Consul {
            if self.consul_addr.trim().is_empty() {
                return Err(ValidationError::empty("consul-addr"));
            }
            require_all_or_none(
                "consul-tls",
                &[
                    ("consul-tls-ca-file", &self.consul_ca_file),
                    ("consul-tls-cert-file", &self.consul_cert_file),
                    ("consul-tls-key-file", &self.consul_key_file),
                ],
            )?;
        }
        require_distinct_file_names(self.product(), &self.files())
    }

    fn generate(&self) -> Body {
        let mut body = Body::new()
            .attr("ui", true)
            .block(Block::labeled(
                "storage",
                self.storage.as_str(),
                self.storage_body(),
            ))
            .non_empty("api_addr", &self.api_addr)
            .non_empty("cluster_addr", &self.cluster_addr);

        for address in &self.address {
            body = body.block(self.listener(address));
        }
        body
    }

    fn files(&self) -> Vec<String> {
        let mut files = Vec::new();
        if self.enable_tls() {
            files.push(self.cert_file.clone());
            files.push(self.key_file.clone());
        }
        if self.enable_consul_tls() {
            files.push(self.consul_ca_file.clone());
            files.push(self.consul_cert_file.clone());
            files.push(self.consul_key_file.clone());
        }
        files
    }
}
