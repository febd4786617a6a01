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

//! Nomad agent configuration.

use clap::Args;

use super::hcl::{Block, Body};
use super::{
    require_all_or_none, require_distinct_file_names, tls_set_complete, GeneratedConfig, Product,
};
use crate::error::ValidationError;
use crate::utils::target_file_name;

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct NomadConfig {
    /// Data center of the agent
    #[arg(long, default_value = "dc1")]
    pub datacenter: String,

    /// Address the agent binds all of its network services to
    #[arg(long, default_value = "")]
    pub address: String,

    /// Address the agent advertises for all of its network services
    #[arg(long, default_value = "")]
    pub advertise: String,

    /// Run the agent in server mode
    #[arg(long)]
    pub server: bool,

    /// Run the agent in client mode
    #[arg(long)]
    pub client: bool,

    /// Node class of a client agent
    #[arg(long = "node-class", default_value = "")]
    pub node_class: String,

    /// Number of servers expected before bootstrapping
    #[arg(long = "bootstrap-expect", default_value_t = 1)]
    pub bootstrap_expect: i64,

    /// Address of an agent to join at start time, may be repeated
    #[arg(long = "retry-join")]
    pub retry_join: Vec<String>,

    /// Gossip encryption key
    #[arg(long, default_value = "")]
    pub encrypt: String,

    /// Certificate authority used to verify client and server connections
    #[arg(long = "ca-file", default_value = "")]
    pub ca_file: String,

    /// Certificate presented by the agent
    #[arg(long = "cert-file", default_value = "")]
    pub cert_file: String,

    /// Private key of the agent certificate
    #[arg(long = "key-file", default_value = "")]
    pub key_file: String,

    /// Enable the ACL system
    #[arg(long)]
    pub acl: bool,
}

impl Default for NomadConfig {
    fn default() -> Self {
        Self {
            datacenter: "dc1".to_string(),
            address: String::new(),
            advertise: String::new(),
            server: false,
            client: false,
            node_class: String::new(),
            bootstrap_expect: 1,
            retry_join: Vec::new(),
            encrypt: String::new(),
            ca_file: String::new(),
            cert_file: String::new(),
            key_file: String::new(),
            acl: false,
        }
    }
}

impl NomadConfig {
    pub fn enable_tls(&self) -> bool {
        tls_set_complete(&[&self.ca_file, &self.cert_file, &self.key_file])
    }

    fn path(&self, file: &str) -> String {
        target_file_name(file, Product::Nomad.config_dir())
    }

    fn network_block(kind: &str, address: &str) -> Block {
        Block::new(
            kind,
            Body::new()
                .non_empty("http", address)
                .non_empty("rpc", address)
                .non_empty("serf", address),
        )
    }

    fn server_join(&self) -> Block {
        Block::new(
            "server_join",
            Body::new().non_empty_list("retry_join", &self.retry_join),
        )
    }
}

impl GeneratedConfig for NomadConfig {
    fn product(&self) -> Product {
        Product::Nomad
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.datacenter.trim().is_empty() {
            return Err(ValidationError::empty("datacenter"));
        }
        if !(self.server || self.client) {
            return Err(ValidationError::new(
                "mode",
                "either --server or --client mode must be enabled",
            ));
        }
        require_all_or_none(
            "tls",
            &[
                ("ca-file", &self.ca_file),
                ("cert-file", &self.cert_file),
                ("key-file", &self.key_file),
            ],
        )?;
        require_distinct_file_names(self.product(), &self.files())
    }

    fn generate(&self) -> Body {
        Body::new()
            .attr("datacenter", self.datacenter.as_str())
            .attr("data_dir", "/opt/nomad")
            .block(Self::network_block("addresses", &self.address))
            .block(Self::network_block("advertise", &self.advertise))
            .block_if(self.server, || {
                Block::new(
                    "server",
                    Body::new()
                        .attr("enabled", true)
                        .attr_if(self.bootstrap_expect > 0, "bootstrap_expect", self.bootstrap_expect)
                        .block(self.server_join())
                        .non_empty("encrypt", &self.encrypt),
                )
            })
            .block_if(self.client, || {
                Block::new(
                    "client",
                    Body::new()
                        .attr("enabled", true)
                        .non_empty("node_class", &self.node_class)
                        .block(self.server_join()),
                )
            })
            .block_if(self.enable_tls(), || {
                Block::new(
                    "tls",
                    Body::new()
                        .attr("http", true)
                        .attr("rpc", true)
                        .attr("ca_file", self.path(&self.ca_file))
                        .attr("cert_file", self.path(&self.cert_file))
                        .attr("key_file", self.path(&self.key_file)),
                )
            })
            .block_if(self.acl, || {
                Block::new("acl", Body::new().attr("enabled", true))
            })
    }

    fn files(&self) -> Vec<String> {
        if !self.enable_tls() {
            return Vec::new();
        }
        vec![
            self.ca_file.clone(),
            self.cert_file.clone(),
            self.key_file.clone(),
        ]
    }
}
