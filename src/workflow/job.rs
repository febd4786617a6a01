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

//! Description of one provisioning run.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Product;
use crate::error::ValidationError;
use crate::scripts::Script;
use crate::utils::file_name;

/// Workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Preparing,
    UploadingPackage,
    UploadingConfig,
    UploadingExtraFiles,
    InvokingScript,
    CleaningUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparing => "preparing",
            Self::UploadingPackage => "uploading-package",
            Self::UploadingConfig => "uploading-config",
            Self::UploadingExtraFiles => "uploading-extra-files",
            Self::InvokingScript => "invoking-script",
            Self::CleaningUp => "cleaning-up",
        };
        f.write_str(name)
    }
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Content(Vec<u8>),
    LocalFile(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(_) => f.write_str("the generated configuration"),
            Self::LocalFile(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A file placed in the working directory before the payload runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub stage: Stage,
    pub source: Source,
    /// Path relative to the working directory.
    pub destination: String,
    pub mode: &'static str,
    /// Progress line printed before the upload.
    pub message: String,
}

/// Ordered uploads followed by one payload invocation.
///
/// Built once from the parsed flags and never mutated while running.
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) product: Product,
    pub(crate) uploads: Vec<Upload>,
    pub(crate) script: Script,
    pub(crate) env: Vec<(String, String)>,
    pub(crate) action: String,
}

impl Job {
    /// Start a job that ends by running `script`. `action` is the progress
    /// line printed before the payload runs, e.g. `Installing Consul ...`.
    pub fn new(product: Product, script: Script, action: impl Into<String>) -> Self {
        Self {
            product,
            uploads: Vec::new(),
            script,
            env: vec![("SERVICE".to_string(), product.name().to_string())],
            action: action.into(),
        }
    }

    /// Upload a local release archive instead of downloading one.
    pub fn package(mut self, path: impl Into<PathBuf>) -> Self {
        self.uploads.push(Upload {
            stage: Stage::UploadingPackage,
            source: Source::LocalFile(path.into()),
            destination: format!("{}.zip", self.product.name()),
            mode: "0640",
            message: format!("Uploading {} package ...", self.product.title()),
        });
        self
    }

    /// Upload a generated configuration document.
    pub fn generated_config(mut self, document: String) -> Self {
        self.uploads.push(Upload {
            stage: Stage::UploadingConfig,
            source: Source::Content(document.into_bytes()),
            destination: self.config_destination(),
            mode: "0640",
            message: format!("Uploading generated {} configuration ...", self.product.title()),
        });
        self
    }

    /// Upload a user supplied configuration file verbatim.
    pub fn custom_config(mut self, path: &str) -> Self {
        let destination = self.config_destination();
        self.uploads.push(Upload {
            stage: Stage::UploadingConfig,
            source: Source::LocalFile(PathBuf::from(path)),
            message: format!(
                "Uploading {} as {} ...",
                path,
                self.product.config_file_name()
            ),
            destination,
            mode: "0640",
        });
        self
    }

    /// Upload auxiliary files next to the configuration, keeping their base
    /// names. Empty paths and repeated paths are skipped.
    pub fn extra_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            if path.is_empty() || self.has_local_file(path) {
                continue;
            }
            self.uploads.push(Upload {
                stage: Stage::UploadingExtraFiles,
                source: Source::LocalFile(PathBuf::from(path)),
                destination: format!("config/{}", file_name(path)),
                mode: "0640",
                message: format!("Uploading {path} ..."),
            });
        }
        self
    }

    /// Pass `name=value` to the payload.
    pub fn env(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.env.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.env.push((name.to_string(), value)),
        }
        self
    }

    /// Reject uploads from different sources that land on the same path.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashMap<&str, &Source> = HashMap::new();
        for upload in &self.uploads {
            match seen.get(upload.destination.as_str()) {
                Some(previous) if **previous != upload.source => {
                    return Err(ValidationError::new(
                        "file",
                        format!(
                            "{} and {} would both be uploaded as {}",
                            previous, upload.source, upload.destination
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    seen.insert(&upload.destination, &upload.source);
                }
            }
        }
        Ok(())
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    fn config_destination(&self) -> String {
        format!("config/{}", self.product.config_file_name())
    }

    fn has_local_file(&self, path: &str) -> bool {
        self.uploads
            .iter()
            .any(|u| u.source == Source::LocalFile(PathBuf::from(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts;

    #[test]
    fn test_upload_layout() {
        let job = Job::new(Product::Consul, scripts::INSTALL, "Installing Consul ...")
            .package("/dl/consul_1.16.2_linux_amd64.zip")
            .generated_config("datacenter = \"dc1\"\n".to_string())
            .extra_files(["~/certs/ca.pem", "", "/etc/pki/agent.pem"]);

        let destinations: Vec<&str> = job.uploads().iter().map(|u| u.destination.as_str()).collect();
        assert_eq!(
            destinations,
            vec!["consul.zip", "config/consul.hcl", "config/ca.pem", "config/agent.pem"]
        );
        let stages: Vec<Stage> = job.uploads().iter().map(|u| u.stage).collect();
        assert!(stages.windows(2).all(|w| w[0] <= w[1]));
        assert!(job.uploads().iter().all(|u| u.mode == "0640"));
    }

    #[test]
    fn test_extra_files_are_deduplicated() {
        let job = Job::new(Product::Nomad, scripts::INSTALL, "Installing Nomad ...")
            .extra_files(["ca.pem", "cert.pem"])
            .extra_files(["ca.pem"]);
        assert_eq!(job.uploads().len(), 2);
    }

    #[test]
    fn test_colliding_destinations_are_rejected() {
        let job = Job::new(Product::Consul, scripts::INSTALL, "Installing Consul ...")
            .generated_config("datacenter = \"dc1\"\n".to_string())
            .extra_files(["/a/cert.pem", "/b/cert.pem"]);
        let err = job.validate().unwrap_err();
        assert_eq!(err.field, "file");
        assert_eq!(
            err.message,
            "/a/cert.pem and /b/cert.pem would both be uploaded as config/cert.pem"
        );

        let job = Job::new(Product::Consul, scripts::INSTALL, "Installing Consul ...")
            .generated_config("datacenter = \"dc1\"\n".to_string())
            .extra_files(["/home/ops/consul.hcl"]);
        let err = job.validate().unwrap_err();
        assert_eq!(
            err.message,
            "the generated configuration and /home/ops/consul.hcl would both be uploaded as config/consul.hcl"
        );

        let job = Job::new(Product::Consul, scripts::INSTALL, "Installing Consul ...")
            .custom_config("/srv/consul.hcl")
            .extra_files(["/srv/consul.hcl", "/srv/ca.pem"]);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_env_starts_with_service_and_replaces() {
        let job = Job::new(Product::Vault, scripts::INSTALL, "Installing Vault ...")
            .env("VERSION", "1.15.0")
            .env("VERSION", "1.15.1");
        assert_eq!(
            job.env,
            vec![
                ("SERVICE".to_string(), "vault".to_string()),
                ("VERSION".to_string(), "1.15.1".to_string())
            ]
        );
    }

    #[test]
    fn test_custom_config_message() {
        let job = Job::new(Product::Boundary, scripts::INSTALL, "Installing Boundary ...")
            .custom_config("./controller.hcl");
        let upload = &job.uploads()[0];
        assert_eq!(upload.destination, "config/boundary.hcl");
        assert_eq!(upload.message, "Uploading ./controller.hcl as boundary.hcl ...");
    }
}
