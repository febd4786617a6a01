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

//! Configuration generation for the supported products.
//!
//! Each product has a flag struct implementing [`GeneratedConfig`]:
//! `validate` rejects contradictory flags before any I/O, `generate` is a
//! pure mapping to a [`Body`] tree, and `files` lists the local files the
//! generated document refers to and which therefore must be uploaded.

pub mod boundary;
pub mod consul;
pub mod hcl;
pub mod nomad;
pub mod vault;
pub mod version;

pub use boundary::{BoundaryConfig, BoundaryDatabaseConfig};
pub use consul::ConsulConfig;
pub use hcl::{render, Block, Body, Value};
pub use nomad::NomadConfig;
pub use vault::{StorageBackend, VaultConfig};

use crate::error::ValidationError;
use crate::utils::file_name;
use std::collections::HashMap;
use std::fmt;

/// A product that can be installed and managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Consul,
    Nomad,
    Vault,
    Boundary,
}

impl Product {
    /// Release and service name, e.g. `consul`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Consul => "consul",
            Self::Nomad => "nomad",
            Self::Vault => "vault",
            Self::Boundary => "boundary",
        }
    }

    /// Capitalized name used in progress messages.
    pub fn title(self) -> &'static str {
        match self {
            Self::Consul => "Consul",
            Self::Nomad => "Nomad",
            Self::Vault => "Vault",
            Self::Boundary => "Boundary",
        }
    }

    /// Directory the configuration lives in on the target.
    pub fn config_dir(self) -> &'static str {
        match self {
            Self::Consul => "/etc/consul.d",
            Self::Nomad => "/etc/nomad.d",
            Self::Vault => "/etc/vault.d",
            Self::Boundary => "/etc/boundary.d",
        }
    }

    /// File name of the main configuration file.
    pub fn config_file_name(self) -> String {
        format!("{}.hcl", self.name())
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A flag struct that can produce a configuration document.
pub trait GeneratedConfig {
    fn product(&self) -> Product;

    /// Reject missing or contradictory flags.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Build the document. Assumes `validate` passed.
    fn generate(&self) -> Body;

    /// Local files referenced by the document, in upload order.
    fn files(&self) -> Vec<String>;

    /// Validated and rendered document.
    fn render(&self) -> String {
        hcl::render(&self.generate())
    }
}

/// True when every path of a TLS file set is present.
pub(crate) fn tls_set_complete(files: &[&String]) -> bool {
    files.iter().all(|f| !f.is_empty())
}

/// Require a file set to be complete or entirely absent.
pub(crate) fn require_all_or_none(
    field: &str,
    files: &[(&str, &String)],
) -> Result<(), ValidationError> {
    let present = files.iter().filter(|(_, path)| !path.is_empty()).count();
    if present != 0 && present != files.len() {
        let names: Vec<&str> = files.iter().map(|(name, _)| *name).collect();
        return Err(ValidationError::incomplete_set(field, &names));
    }
    Ok(())
}

/// Require referenced files to keep distinct names once copied into the
/// product's config directory. The same path listed twice is fine; two
/// different paths sharing a base name, or a file named like the main
/// configuration file, are not.
pub(crate) fn require_distinct_file_names(
    product: Product,
    files: &[String],
) -> Result<(), ValidationError> {
    let config_file_name = product.config_file_name();
    let mut seen: HashMap<String, &str> = HashMap::new();
    for path in files.iter().filter(|p| !p.is_empty()) {
        let name = file_name(path);
        if name == config_file_name {
            return Err(ValidationError::new(
                "file",
                format!("{path} would replace the generated {config_file_name}"),
            ));
        }
        match seen.get(&name) {
            Some(previous) if *previous != path.as_str() => {
                return Err(ValidationError::new(
                    "file",
                    format!(
                        "{previous} and {path} would both be installed as {}/{name}",
                        product.config_dir()
                    ),
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(name, path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_names() {
        assert_eq!(Product::Consul.name(), "consul");
        assert_eq!(Product::Boundary.title(), "Boundary");
        assert_eq!(Product::Vault.config_dir(), "/etc/vault.d");
        assert_eq!(Product::Nomad.config_file_name(), "nomad.hcl");
    }

    #[test]
    fn test_require_all_or_none() {
        let empty = String::new();
        let set = "x.pem".to_string();
        assert!(require_all_or_none("tls", &[("cert-file", &empty), ("key-file", &empty)]).is_ok());
        assert!(require_all_or_none("tls", &[("cert-file", &set), ("key-file", &set)]).is_ok());
        let err = require_all_or_none("tls", &[("cert-file", &set), ("key-file", &empty)]).unwrap_err();
        assert_eq!(
            err.message,
            "either all or none of --cert-file, --key-file must be provided"
        );
    }

    #[test]
    fn test_distinct_file_names() {
        let files = vec![
            "/pki/ca.pem".to_string(),
            "/a/cert.pem".to_string(),
            "/a/cert.pem".to_string(),
            String::new(),
        ];
        assert!(require_distinct_file_names(Product::Consul, &files).is_ok());

        let files = vec!["/a/cert.pem".to_string(), "/b/cert.pem".to_string()];
        let err = require_distinct_file_names(Product::Nomad, &files).unwrap_err();
        assert_eq!(err.field, "file");
        assert_eq!(
            err.message,
            "/a/cert.pem and /b/cert.pem would both be installed as /etc/nomad.d/cert.pem"
        );

        let files = vec!["/tls/vault.hcl".to_string()];
        let err = require_distinct_file_names(Product::Vault, &files).unwrap_err();
        assert_eq!(err.message, "/tls/vault.hcl would replace the generated vault.hcl");
    }
}
