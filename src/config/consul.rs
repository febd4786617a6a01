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

//! Consul agent configuration.

use clap::Args;

use super::hcl::{Block, Body};
use super::{
    require_all_or_none, require_distinct_file_names, tls_set_complete, GeneratedConfig, Product,
};
use crate::error::ValidationError;
use crate::utils::target_file_name;

/// Flags describing a Consul agent.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConsulConfig {
    /// Data center of the agent
    #[arg(long, default_value = "dc1")]
    pub datacenter: String,

    /// Address to bind to for internal cluster communication
    #[arg(long = "bind-addr", default_value = "")]
    pub bind_addr: String,

    /// Address advertised to other nodes in the cluster
    #[arg(long = "advertise-addr", default_value = "")]
    pub advertise_addr: String,

    /// Address to bind client interfaces (HTTP, DNS, gRPC) to
    #[arg(long = "client-addr", default_value = "")]
    pub client_addr: String,

    /// Address for the DNS interface, overriding --client-addr
    #[arg(long = "dns-addr", default_value = "")]
    pub dns_addr: String,

    /// Address for the HTTP interface, overriding --client-addr
    #[arg(long = "http-addr", default_value = "")]
    pub http_addr: String,

    /// Address for the HTTPS interface, overriding --client-addr
    #[arg(long = "https-addr", default_value = "")]
    pub https_addr: String,

    /// Address for the gRPC interface, overriding --client-addr
    #[arg(long = "grpc-addr", default_value = "")]
    pub grpc_addr: String,

    /// Run the agent in server mode
    #[arg(long)]
    pub server: bool,

    /// Number of servers expected in the data center before bootstrapping
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

    /// Let servers distribute client certificates automatically
    #[arg(long = "auto-encrypt")]
    pub auto_encrypt: bool,

    /// Enable the ACL system with a default deny policy
    #[arg(long)]
    pub acl: bool,

    /// Token the agent uses for internal operations
    #[arg(long = "agent-token", default_value = "")]
    pub agent_token: String,

    /// Enable Consul Connect
    #[arg(long)]
    pub connect: bool,

    /// Disable the plain HTTP interface when TLS is enabled
    #[arg(long = "https-only")]
    pub https_only: bool,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            datacenter: "dc1".to_string(),
            bind_addr: String::new(),
            advertise_addr: String::new(),
            client_addr: String::new(),
            dns_addr: String::new(),
            http_addr: String::new(),
            https_addr: String::new(),
            grpc_addr: String::new(),
            server: false,
            bootstrap_expect: 1,
            retry_join: Vec::new(),
            encrypt: String::new(),
            ca_file: String::new(),
            cert_file: String::new(),
            key_file: String::new(),
            auto_encrypt: false,
            acl: false,
            agent_token: String::new(),
            connect: false,
            https_only: false,
        }
    }
}

impl ConsulConfig {
    pub fn enable_tls(&self) -> bool {
        self.auto_encrypt || tls_set_complete(&[&self.ca_file, &self.cert_file, &self.key_file])
    }

    /// Whether the agent presents its own certificate. Auto-encrypt clients
    /// receive theirs from the servers.
    fn presents_certificate(&self) -> bool {
        self.server || !self.auto_encrypt
    }

    fn path(&self, file: &str) -> String {
        target_file_name(file, Product::Consul.config_dir())
    }
}

impl GeneratedConfig for ConsulConfig {
    fn product(&self) -> Product {
        Product::Consul
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.datacenter.trim().is_empty() {
            return Err(ValidationError::empty("datacenter"));
        }

        let files = [&self.ca_file, &self.cert_file, &self.key_file];
        if self.auto_encrypt && !self.server {
            if self.ca_file.is_empty() {
                return Err(ValidationError::new(
                    "ca-file",
                    "--ca-file is required for auto-encrypt clients",
                ));
            }
        } else if self.auto_encrypt {
            if !tls_set_complete(&files) {
                return Err(ValidationError::new(
                    "tls",
                    "--ca-file, --cert-file and --key-file are required for auto-encrypt servers",
                ));
            }
        } else {
            require_all_or_none(
                "tls",
                &[
                    ("ca-file", &self.ca_file),
                    ("cert-file", &self.cert_file),
                    ("key-file", &self.key_file),
                ],
            )?;
        }

        require_distinct_file_names(self.product(), &self.files())
    }

    fn generate(&self) -> Body {
        let tls = self.enable_tls();

        let mut body = Body::new()
            .attr("datacenter", self.datacenter.as_str())
            .attr("data_dir", "/opt/consul")
            .non_empty("bind_addr", &self.bind_addr)
            .non_empty("advertise_addr", &self.advertise_addr)
            .non_empty("client_addr", &self.client_addr)
            .non_empty_list("retry_join", &self.retry_join)
            .block(Block::new(
                "ports",
                Body::new()
                    .attr_if(self.connect, "grpc", 8502i64)
                    .attr_if(tls, "https", 8501i64)
                    .attr_if(tls && self.https_only, "http", -1i64),
            ))
            .block(Block::new(
                "addresses",
                Body::new()
                    .non_empty("dns", &self.dns_addr)
                    .non_empty("http", &self.http_addr)
                    .non_empty("https", &self.https_addr)
                    .non_empty("grpc", &self.grpc_addr),
            ));

        if self.server {
            body = body
                .attr("ui", true)
                .attr("server", true)
                .attr_if(self.bootstrap_expect > 0, "bootstrap_expect", self.bootstrap_expect);
        }

        body = body.non_empty("encrypt", &self.encrypt);

        if tls {
            body = body
                .attr("ca_file", self.path(&self.ca_file))
                .attr_if(self.presents_certificate(), "cert_file", self.path(&self.cert_file))
                .attr_if(self.presents_certificate(), "key_file", self.path(&self.key_file))
                .attr("verify_incoming_rpc", true)
                .attr("verify_outgoing", true)
                .attr("verify_server_hostname", true);

            if self.auto_encrypt {
                let auto_encrypt = if self.server {
                    Body::new().attr("allow_tls", true)
                } else {
                    body = body.attr("verify_incoming_rpc", false);
                    Body::new().attr("tls", true)
                };
                body = body.block(Block::new("auto_encrypt", auto_encrypt));
            }
        }

        body.block_if(self.acl, || {
            Block::new(
                "acl",
                Body::new()
                    .attr("enabled", true)
                    .attr("default_policy", "deny")
                    .attr("down_policy", "extend-cache")
                    .attr("enable_token_persistence", true)
                    .block(Block::new(
                        "tokens",
                        Body::new().non_empty("agent", &self.agent_token),
                    )),
            )
        })
        .block_if(self.connect, || {
            Block::new("connect", Body::new().attr("enabled", true))
        })
    }

    fn files(&self) -> Vec<String> {
        if !self.enable_tls() {
            return Vec::new();
        }
        let mut files = vec![self.ca_file.clone()];
        if self.presents_certificate() {
            files.push(self.cert_file.clone());
            files.push(self.key_file.clone());
        }
        files.retain(|f| !f.is_empty());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::hcl::{render, Value};

    fn tls_config() -> ConsulConfig {
        ConsulConfig {
            ca_file: "~/certs/consul-agent-ca.pem".to_string(),
            cert_file: "/tmp/certs/dc1-server-consul-0.pem".to_string(),
            key_file: "dc1-server-consul-0-key.pem".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_config() {
        let text = ConsulConfig::default().render();
        assert_eq!(
            text,
            "# generated with hashi-up\n\ndatacenter = \"dc1\"\ndata_dir   = \"/opt/consul\"\n"
        );
    }

    #[test]
    fn test_tls_disabled_without_tls_flags() {
        let config = ConsulConfig {
            server: true,
            bind_addr: "10.0.0.5".to_string(),
            ..Default::default()
        };
        assert!(!config.enable_tls());
        assert!(config.files().is_empty());
        let body = config.generate();
        assert!(body.get("ca_file").is_none());
        assert!(body.find_block("ports").is_none());
    }

    #[test]
    fn test_partial_tls_is_rejected() {
        for missing in 0..3 {
            let mut config = tls_config();
            match missing {
                0 => config.ca_file.clear(),
                1 => config.cert_file.clear(),
                _ => config.key_file.clear(),
            }
            assert!(!config.enable_tls());
            let err = config.validate().unwrap_err();
            assert_eq!(err.field, "tls");
        }
        assert!(tls_config().validate().is_ok());
    }

    #[test]
    fn test_tls_files_sharing_a_base_name_are_rejected() {
        let config = ConsulConfig {
            ca_file: "/a/cert.pem".to_string(),
            cert_file: "/b/cert.pem".to_string(),
            key_file: "/b/key.pem".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "file");
        assert!(err.message.contains("/etc/consul.d/cert.pem"));

        let config = ConsulConfig {
            key_file: "/keys/consul.hcl".to_string(),
            ..tls_config()
        };
        assert_eq!(config.validate().unwrap_err().field, "file");
    }

    #[test]
    fn test_values_are_rendered_verbatim() {
        let config = ConsulConfig {
            datacenter: "eu-west".to_string(),
            bind_addr: "{{ GetPrivateIP }}".to_string(),
            advertise_addr: "192.168.1.10".to_string(),
            retry_join: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            encrypt: "pUqJrVyVRj5jsiYEkM/tFQYfWyJIv4s3XkvDwy7Cu5s=".to_string(),
            ..Default::default()
        };
        let body = config.generate();
        assert_eq!(body.get("datacenter"), Some(&Value::from("eu-west")));
        assert_eq!(body.get("bind_addr"), Some(&Value::from("{{ GetPrivateIP }}")));
        assert_eq!(body.get("advertise_addr"), Some(&Value::from("192.168.1.10")));
        assert_eq!(
            body.get("encrypt"),
            Some(&Value::from("pUqJrVyVRj5jsiYEkM/tFQYfWyJIv4s3XkvDwy7Cu5s="))
        );
        assert_eq!(
            body.get("retry_join"),
            Some(&Value::from(config.retry_join.as_slice()))
        );
        assert!(body.get("client_addr").is_none());
        assert!(body.find_block("addresses").is_none());
    }

    #[test]
    fn test_tls_paths_are_rewritten() {
        let body = tls_config().generate();
        assert_eq!(
            body.get("ca_file"),
            Some(&Value::from("/etc/consul.d/consul-agent-ca.pem"))
        );
        assert_eq!(
            body.get("cert_file"),
            Some(&Value::from("/etc/consul.d/dc1-server-consul-0.pem"))
        );
        assert_eq!(
            body.get("key_file"),
            Some(&Value::from("/etc/consul.d/dc1-server-consul-0-key.pem"))
        );
        let ports = body.find_block("ports").unwrap();
        assert_eq!(ports.body.get("https"), Some(&Value::Number(8501)));
        assert!(ports.body.get("http").is_none());
    }

    #[test]
    fn test_auto_encrypt_client() {
        let config = ConsulConfig {
            auto_encrypt: true,
            ca_file: "ca.pem".to_string(),
            https_only: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.files(), vec!["ca.pem".to_string()]);

        let body = config.generate();
        assert!(body.get("cert_file").is_none());
        assert_eq!(body.get("verify_incoming_rpc"), Some(&Value::Bool(false)));
        let auto_encrypt = body.find_block("auto_encrypt").unwrap();
        assert_eq!(auto_encrypt.body.get("tls"), Some(&Value::Bool(true)));
        let ports = body.find_block("ports").unwrap();
        assert_eq!(ports.body.get("http"), Some(&Value::Number(-1)));
    }

    #[test]
    fn test_auto_encrypt_server_requires_full_set() {
        let config = ConsulConfig {
            auto_encrypt: true,
            server: true,
            ca_file: "ca.pem".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConsulConfig {
            auto_encrypt: true,
            server: true,
            ..tls_config()
        };
        let body = config.generate();
        let auto_encrypt = body.find_block("auto_encrypt").unwrap();
        assert_eq!(auto_encrypt.body.get("allow_tls"), Some(&Value::Bool(true)));
        assert_eq!(body.get("verify_incoming_rpc"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_server_acl_and_connect_blocks() {
        let config = ConsulConfig {
            server: true,
            bootstrap_expect: 3,
            acl: true,
            agent_token: "agent-secret".to_string(),
            connect: true,
            ..Default::default()
        };
        let text = render(&config.generate());
        assert!(text.contains("server           = true\n"));
        assert!(text.contains("bootstrap_expect = 3\n"));
        assert!(text.contains("ports {\n  grpc = 8502\n}\n"));
        assert!(text.contains("  default_policy           = \"deny\"\n"));
        assert!(text.contains("  tokens {\n    agent = \"agent-secret\"\n  }\n"));
        assert!(text.ends_with("connect {\n  enabled = true\n}\n"));
    }

    #[test]
    fn test_acl_without_agent_token_has_no_tokens_block() {
        let config = ConsulConfig {
            acl: true,
            ..Default::default()
        };
        let body = config.generate();
        let acl = body.find_block("acl").unwrap();
        assert!(acl.body.find_block("tokens").is_none());
    }

    #[test]
    fn test_bootstrap_expect_zero_is_omitted() {
        let config = ConsulConfig {
            server: true,
            bootstrap_expect: 0,
            ..Default::default()
        };
        assert!(config.generate().get("bootstrap_expect").is_none());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = ConsulConfig {
            server: true,
            acl: true,
            connect: true,
            retry_join: vec!["a".to_string(), "b".to_string()],
            ..tls_config()
        };
        assert_eq!(config.render(), config.clone().render());
    }
}
