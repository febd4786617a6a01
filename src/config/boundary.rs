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

//! Boundary controller and worker configuration.
//!
//! A single node may run a controller, a worker, or both. Listeners are
//! only emitted for the roles that use them: `api` and `cluster` belong to
//! the controller, `proxy` to the worker.

use clap::Args;

use super::hcl::{Block, Body};
use super::{
    require_all_or_none, require_distinct_file_names, tls_set_complete, GeneratedConfig, Product,
};
use crate::error::ValidationError;
use crate::utils::target_file_name;

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BoundaryConfig {
    /// Unique name of this controller; enables the controller role
    #[arg(long = "controller-name", default_value = "")]
    pub controller_name: String,

    /// Unique name of this worker; enables the worker role
    #[arg(long = "worker-name", default_value = "")]
    pub worker_name: String,

    /// URL of the Postgres database used by the controller
    #[arg(long = "db-url", default_value = "")]
    pub database_url: String,

    /// Root KMS key
    #[arg(long = "root-key", default_value = "")]
    pub root_key: String,

    /// KMS key shared by controllers and workers to authenticate workers
    #[arg(long = "worker-auth-key", default_value = "")]
    pub worker_auth_key: String,

    /// KMS key used for recovery operations
    #[arg(long = "recovery-key", default_value = "")]
    pub recovery_key: String,

    /// Address of the API listener
    #[arg(long = "api-addr", default_value = "0.0.0.0")]
    pub api_addr: String,

    /// Private key of the API listener certificate
    #[arg(long = "api-key-file", default_value = "")]
    pub api_key_file: String,

    /// Certificate of the API listener
    #[arg(long = "api-cert-file", default_value = "")]
    pub api_cert_file: String,

    /// Address of the cluster listener
    #[arg(long = "cluster-addr", default_value = "127.0.0.1")]
    pub cluster_addr: String,

    /// Private key of the cluster listener certificate
    #[arg(long = "cluster-key-file", default_value = "")]
    pub cluster_key_file: String,

    /// Certificate of the cluster listener
    #[arg(long = "cluster-cert-file", default_value = "")]
    pub cluster_cert_file: String,

    /// Address of the proxy listener
    #[arg(long = "proxy-addr", default_value = "0.0.0.0")]
    pub proxy_addr: String,

    /// Private key of the proxy listener certificate
    #[arg(long = "proxy-key-file", default_value = "")]
    pub proxy_key_file: String,

    /// Certificate of the proxy listener
    #[arg(long = "proxy-cert-file", default_value = "")]
    pub proxy_cert_file: String,

    /// Address at which workers reach the controller
    #[arg(long = "public-cluster-addr", default_value = "")]
    pub public_cluster_addr: String,

    /// Address at which clients reach the worker for proxying
    #[arg(long = "public-addr", default_value = "")]
    pub public_addr: String,

    /// Controller address a worker connects to, may be repeated
    #[arg(long = "controller", default_value = "127.0.0.1")]
    pub controllers: Vec<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            controller_name: String::new(),
            worker_name: String::new(),
            database_url: String::new(),
            root_key: String::new(),
            worker_auth_key: String::new(),
            recovery_key: String::new(),
            api_addr: "0.0.0.0".to_string(),
            api_key_file: String::new(),
            api_cert_file: String::new(),
            cluster_addr: "127.0.0.1".to_string(),
            cluster_key_file: String::new(),
            cluster_cert_file: String::new(),
            proxy_addr: "0.0.0.0".to_string(),
            proxy_key_file: String::new(),
            proxy_cert_file: String::new(),
            public_cluster_addr: String::new(),
            public_addr: String::new(),
            controllers: vec!["127.0.0.1".to_string()],
        }
    }
}

/// A listener with an optional certificate pair.
struct Listener<'a> {
    purpose: &'static str,
    address: &'a str,
    cert_file: &'a String,
    key_file: &'a String,
}

impl Listener<'_> {
    fn tls_enabled(&self) -> bool {
        tls_set_complete(&[self.cert_file, self.key_file])
    }

    fn block(&self) -> Block {
        let body = Body::new()
            .attr("purpose", self.purpose)
            .attr("address", self.address);
        let body = if self.tls_enabled() {
            body.attr("tls_disable", false)
                .attr("tls_cert_file", boundary_path(self.cert_file))
                .attr("tls_key_file", boundary_path(self.key_file))
        } else {
            body.attr("tls_disable", true)
        };
        Block::labeled("listener", "tcp", body)
    }
}

fn boundary_path(file: &str) -> String {
    target_file_name(file, Product::Boundary.config_dir())
}

fn kms_block(purpose: &str, key: &str) -> Block {
    Block::labeled(
        "kms",
        "aead",
        Body::new()
            .attr("purpose", purpose)
            .attr("aead_type", "aes-gcm")
            .attr("key", key)
            .attr("key_id", format!("global_{purpose}")),
    )
}

impl BoundaryConfig {
    pub fn controller_enabled(&self) -> bool {
        !self.controller_name.is_empty()
    }

    pub fn worker_enabled(&self) -> bool {
        !self.worker_name.is_empty()
    }

    /// Listeners emitted for the enabled roles, in document order.
    fn listeners(&self) -> Vec<Listener<'_>> {
        let mut listeners = Vec::new();
        if self.controller_enabled() && !self.api_addr.is_empty() {
            listeners.push(Listener {
                purpose: "api",
                address: &self.api_addr,
                cert_file: &self.api_cert_file,
                key_file: &self.api_key_file,
            });
        }
        if self.controller_enabled() && !self.cluster_addr.is_empty() {
            listeners.push(Listener {
                purpose: "cluster",
                address: &self.cluster_addr,
                cert_file: &self.cluster_cert_file,
                key_file: &self.cluster_key_file,
            });
        }
        if self.worker_enabled() && !self.proxy_addr.is_empty() {
            listeners.push(Listener {
                purpose: "proxy",
                address: &self.proxy_addr,
                cert_file: &self.proxy_cert_file,
                key_file: &self.proxy_key_file,
            });
        }
        listeners
    }
}

impl GeneratedConfig for BoundaryConfig {
    fn product(&self) -> Product {
        Product::Boundary
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !self.controller_enabled() && !self.worker_enabled() {
            return Err(ValidationError::new(
                "role",
                "a --controller-name and/or a --worker-name is required",
            ));
        }

        if self.controller_enabled() {
            if self.database_url.is_empty() {
                return Err(ValidationError::new(
                    "db-url",
                    "--db-url is required when running a controller",
                ));
            }
            let keys = [&self.root_key, &self.worker_auth_key, &self.recovery_key];
            if keys.iter().any(|k| k.is_empty()) {
                return Err(ValidationError::new(
                    "kms",
                    "--root-key, --worker-auth-key and --recovery-key are required when running a controller",
                ));
            }
        }

        if self.worker_enabled() && self.worker_auth_key.is_empty() {
            return Err(ValidationError::new(
                "worker-auth-key",
                "--worker-auth-key is required when running a worker",
            ));
        }

        require_all_or_none(
            "api-tls",
            &[("api-key-file", &self.api_key_file), ("api-cert-file", &self.api_cert_file)],
        )?;
        require_all_or_none(
            "cluster-tls",
            &[
                ("cluster-key-file", &self.cluster_key_file),
                ("cluster-cert-file", &self.cluster_cert_file),
            ],
        )?;
        require_all_or_none(
            "proxy-tls",
            &[
                ("proxy-key-file", &self.proxy_key_file),
                ("proxy-cert-file", &self.proxy_cert_file),
            ],
        )?;
        require_distinct_file_names(self.product(), &self.files())
    }

    fn generate(&self) -> Body {
        let mut body = Body::new()
            .block_if(self.controller_enabled(), || {
                Block::new(
                    "controller",
                    Body::new()
                        .attr("name", self.controller_name.as_str())
                        .block(Block::new(
                            "database",
                            Body::new().attr("url", self.database_url.as_str()),
                        ))
                        .non_empty("public_cluster_addr", &self.public_cluster_addr),
                )
            })
            .block_if(self.worker_enabled(), || {
                Block::new(
                    "worker",
                    Body::new()
                        .attr("name", self.worker_name.as_str())
                        .attr("controllers", self.controllers.as_slice())
                        .non_empty("public_addr", &self.public_addr),
                )
            });

        for listener in self.listeners() {
            body = body.block(listener.block());
        }

        body.block_if(!self.root_key.is_empty(), || kms_block("root", &self.root_key))
            .block_if(!self.worker_auth_key.is_empty(), || {
                kms_block("worker-auth", &self.worker_auth_key)
            })
            .block_if(!self.recovery_key.is_empty(), || {
                kms_block("recovery", &self.recovery_key)
            })
    }

    fn files(&self) -> Vec<String> {
        self.listeners()
            .into_iter()
            .filter(|l| l.tls_enabled())
            .flat_map(|l| [l.cert_file.clone(), l.key_file.clone()])
            .collect()
    }
}

/// Minimal controller configuration used to initialise the database.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryDatabaseConfig {
    /// URL of the Postgres database to initialise
    #[arg(long = "db-url", default_value = "")]
    pub database_url: String,

    /// Root KMS key
    #[arg(long = "root-key", default_value = "")]
    pub root_key: String,
}

impl GeneratedConfig for BoundaryDatabaseConfig {
    fn product(&self) -> Product {
        Product::Boundary
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.database_url.is_empty() {
            return Err(ValidationError::new(
                "db-url",
                "--db-url is required when initializing the database",
            ));
        }
        if self.root_key.is_empty() {
            return Err(ValidationError::new(
                "root-key",
                "--root-key is required when initializing the database",
            ));
        }
        Ok(())
    }

    fn generate(&self) -> Body {
        Body::new()
            .block(Block::new(
                "controller",
                Body::new().block(Block::new(
                    "database",
                    Body::new().attr("url", self.database_url.as_str()),
                )),
            ))
            .block(kms_block("root", &self.root_key))
    }

    fn files(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::hcl::Value;

    fn controller() -> BoundaryConfig {
        BoundaryConfig {
            controller_name: "ctrl-0".to_string(),
            database_url: "postgresql://boundary:secret@db:5432/boundary".to_string(),
            root_key: "cm9vdA==".to_string(),
            worker_auth_key: "d29ya2Vy".to_string(),
            recovery_key: "cmVjb3Zlcnk=".to_string(),
            ..Default::default()
        }
    }

    fn worker() -> BoundaryConfig {
        BoundaryConfig {
            worker_name: "worker-0".to_string(),
            worker_auth_key: "d29ya2Vy".to_string(),
            ..Default::default()
        }
    }

    fn purposes(body: &Body, kind: &str) -> Vec<Value> {
        body.blocks(kind)
            .filter_map(|b| b.body.get("purpose").cloned())
            .collect()
    }

    #[test]
    fn test_role_is_required() {
        let err = BoundaryConfig::default().validate().unwrap_err();
        assert_eq!(err.field, "role");
    }

    #[test]
    fn test_controller_requirements() {
        assert!(controller().validate().is_ok());

        let no_db = BoundaryConfig {
            database_url: String::new(),
            ..controller()
        };
        assert_eq!(no_db.validate().unwrap_err().field, "db-url");

        let no_recovery = BoundaryConfig {
            recovery_key: String::new(),
            ..controller()
        };
        assert_eq!(no_recovery.validate().unwrap_err().field, "kms");
    }

    #[test]
    fn test_worker_requires_auth_key() {
        assert!(worker().validate().is_ok());
        let config = BoundaryConfig {
            worker_auth_key: String::new(),
            ..worker()
        };
        assert_eq!(config.validate().unwrap_err().field, "worker-auth-key");
    }

    #[test]
    fn test_tls_pairs_all_or_nothing() {
        let config = BoundaryConfig {
            api_cert_file: "api.pem".to_string(),
            ..controller()
        };
        assert_eq!(config.validate().unwrap_err().field, "api-tls");

        let config = BoundaryConfig {
            proxy_key_file: "proxy-key.pem".to_string(),
            ..worker()
        };
        assert_eq!(config.validate().unwrap_err().field, "proxy-tls");
    }

    #[test]
    fn test_controller_document() {
        let config = BoundaryConfig {
            public_cluster_addr: "10.0.0.5".to_string(),
            ..controller()
        };
        let body = config.generate();

        let ctrl = body.find_block("controller").unwrap();
        assert_eq!(ctrl.body.get("name"), Some(&Value::from("ctrl-0")));
        let db = ctrl.body.find_block("database").unwrap();
        assert_eq!(
            db.body.get("url"),
            Some(&Value::from("postgresql://boundary:secret@db:5432/boundary"))
        );
        assert_eq!(ctrl.body.get("public_cluster_addr"), Some(&Value::from("10.0.0.5")));
        assert!(body.find_block("worker").is_none());

        assert_eq!(
            purposes(&body, "listener"),
            vec![Value::from("api"), Value::from("cluster")]
        );
        assert_eq!(
            purposes(&body, "kms"),
            vec![
                Value::from("root"),
                Value::from("worker-auth"),
                Value::from("recovery")
            ]
        );
        let root = body.find_block("kms").unwrap();
        assert_eq!(root.labels, vec!["aead".to_string()]);
        assert_eq!(root.body.get("key_id"), Some(&Value::from("global_root")));
    }

    #[test]
    fn test_worker_document() {
        let config = BoundaryConfig {
            controllers: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            public_addr: "203.0.113.7".to_string(),
            ..worker()
        };
        let body = config.generate();
        let worker = body.find_block("worker").unwrap();
        assert_eq!(
            worker.body.get("controllers"),
            Some(&Value::from(config.controllers.as_slice()))
        );
        assert_eq!(worker.body.get("public_addr"), Some(&Value::from("203.0.113.7")));
        assert_eq!(purposes(&body, "listener"), vec![Value::from("proxy")]);
        assert_eq!(purposes(&body, "kms"), vec![Value::from("worker-auth")]);
    }

    #[test]
    fn test_every_tls_pair_is_uploaded() {
        let config = BoundaryConfig {
            worker_name: "worker-0".to_string(),
            api_cert_file: "~/tls/api.pem".to_string(),
            api_key_file: "~/tls/api-key.pem".to_string(),
            proxy_cert_file: "proxy.pem".to_string(),
            proxy_key_file: "proxy-key.pem".to_string(),
            ..controller()
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            config.files(),
            vec![
                "~/tls/api.pem".to_string(),
                "~/tls/api-key.pem".to_string(),
                "proxy.pem".to_string(),
                "proxy-key.pem".to_string()
            ]
        );

        let body = config.generate();
        let api = body.find_block("listener").unwrap();
        assert_eq!(api.body.get("tls_disable"), Some(&Value::Bool(false)));
        assert_eq!(
            api.body.get("tls_cert_file"),
            Some(&Value::from("/etc/boundary.d/api.pem"))
        );
    }

    #[test]
    fn test_listeners_may_share_a_pair_but_not_a_name() {
        let shared = BoundaryConfig {
            worker_name: "worker-0".to_string(),
            api_cert_file: "/tls/boundary.pem".to_string(),
            api_key_file: "/tls/boundary-key.pem".to_string(),
            proxy_cert_file: "/tls/boundary.pem".to_string(),
            proxy_key_file: "/tls/boundary-key.pem".to_string(),
            ..controller()
        };
        assert!(shared.validate().is_ok());

        let clashing = BoundaryConfig {
            proxy_cert_file: "/other/boundary.pem".to_string(),
            ..shared
        };
        let err = clashing.validate().unwrap_err();
        assert_eq!(err.field, "file");
    }

    #[test]
    fn test_database_config() {
        let config = BoundaryDatabaseConfig {
            database_url: "postgresql://db/boundary".to_string(),
            root_key: "cm9vdA==".to_string(),
        };
        assert!(config.validate().is_ok());
        assert!(config.files().is_empty());
        assert_eq!(
            config.render(),
            "# generated with hashi-up\n\n\
             controller {\n\
             \x20 database {\n\
             \x20   url = \"postgresql://db/boundary\"\n\
             \x20 }\n\
             }\n\
             \n\
             kms \"aead\" {\n\
             \x20 purpose   = \"root\"\n\
             \x20 aead_type = \"aes-gcm\"\n\
             \x20 key       = \"cm9vdA==\"\n\
             \x20 key_id    = \"global_root\"\n\
             }\n"
        );

        let missing = BoundaryDatabaseConfig {
            root_key: String::new(),
            ..config
        };
        assert_eq!(missing.validate().unwrap_err().field, "root-key");
    }
}
