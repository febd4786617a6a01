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

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::{InstallOptions, TargetArgs};
use crate::config::{version, GeneratedConfig, Product};
use crate::scripts;
use crate::utils::expand_tilde;
use crate::workflow::{self, Job};

pub struct InstallParams<'a, C: GeneratedConfig> {
    pub target: &'a TargetArgs,
    pub options: &'a InstallOptions,
    pub config: &'a C,
    /// Product specific payload parameters.
    pub env: Vec<(&'static str, String)>,
}

/// Install `params.config.product()` on the target.
///
/// With `--config-file` the generation flags are ignored entirely; otherwise
/// they are validated before the target is touched.
pub async fn install<C: GeneratedConfig>(params: InstallParams<'_, C>) -> Result<()> {
    let options = params.options;

    let generated = match &options.config_file {
        Some(_) => None,
        None => {
            params.config.validate()?;
            Some(params.config.render())
        }
    };

    if options.show {
        return show(options, generated.as_deref()).await;
    }

    let target = params.target.to_target();
    target.validate()?;

    let job = install_job(&params, generated);
    job.validate()?;

    let product = params.config.product();
    let job = match resolve_version(product, options.version.as_deref(), options.package.as_deref()).await? {
        Some(version) => job.env("VERSION", version),
        None => job,
    };

    workflow::provision(&target, &job).await
}

/// Print the document that would be uploaded.
async fn show(options: &InstallOptions, generated: Option<&str>) -> Result<()> {
    match (generated, options.config_file.as_deref()) {
        (Some(document), _) => print!("{document}"),
        (None, Some(path)) => {
            let document = tokio::fs::read_to_string(expand_tilde(Path::new(path)))
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            print!("{document}");
        }
        (None, None) => {}
    }
    Ok(())
}

/// Uploads and payload parameters of an install, without the version.
fn install_job<C: GeneratedConfig>(params: &InstallParams<'_, C>, generated: Option<String>) -> Job {
    let product = params.config.product();
    let options = params.options;

    let mut job = Job::new(
        product,
        scripts::INSTALL,
        format!("Installing {} ...", product.title()),
    );
    if let Some(package) = &options.package {
        job = job.package(package);
    }
    job = match (&options.config_file, generated) {
        (Some(path), _) => job.custom_config(path),
        (None, Some(document)) => job
            .generated_config(document)
            .extra_files(params.config.files()),
        (None, None) => job,
    };
    job = job
        .extra_files(&options.files)
        .env("SKIP_ENABLE", options.skip_enable.to_string())
        .env("SKIP_START", options.skip_start.to_string());
    for (name, value) in &params.env {
        job = job.env(name, value.clone());
    }
    job
}

/// The explicit version, nothing when a package is uploaded, or the latest
/// stable release otherwise.
pub(crate) async fn resolve_version(
    product: Product,
    version: Option<&str>,
    package: Option<&str>,
) -> Result<Option<String>> {
    if let Some(version) = version {
        return Ok(Some(version.trim_start_matches('v').to_string()));
    }
    if package.is_some() {
        return Ok(None);
    }
    let latest = version::latest_version(product).await.context(
        "Unable to get the latest version number, define a version manually with the --version flag",
    )?;
    Ok(Some(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsulConfig;
    use crate::error::ValidationError;
    use crate::workflow::Source;
    use std::io::Write;
    use std::path::PathBuf;

    /// TLS flags that fail validation on their own.
    fn half_tls_consul() -> ConsulConfig {
        ConsulConfig {
            server: true,
            ca_file: "/pki/ca.pem".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_explicit_version_wins() {
        let version = resolve_version(Product::Consul, Some("v1.16.2"), Some("consul.zip"))
            .await
            .unwrap();
        assert_eq!(version.as_deref(), Some("1.16.2"));
    }

    #[tokio::test]
    async fn test_package_skips_lookup() {
        let version = resolve_version(Product::Nomad, None, Some("nomad.zip"))
            .await
            .unwrap();
        assert_eq!(version, None);
    }

    #[tokio::test]
    async fn test_show_with_config_file_ignores_generation_flags() {
        let mut custom = tempfile::NamedTempFile::new().unwrap();
        custom.write_all(b"server = true\n").unwrap();
        let options = InstallOptions {
            show: true,
            config_file: Some(custom.path().to_str().unwrap().to_string()),
            ..Default::default()
        };
        let config = half_tls_consul();
        assert!(config.validate().is_err());

        // No target address either: --show returns before the target is validated.
        let result = install(InstallParams {
            target: &TargetArgs::default(),
            options: &options,
            config: &config,
            env: Vec::new(),
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_show_validates_generation_flags() {
        let options = InstallOptions {
            show: true,
            ..Default::default()
        };
        let err = install(InstallParams {
            target: &TargetArgs::default(),
            options: &options,
            config: &half_tls_consul(),
            env: Vec::new(),
        })
        .await
        .unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>().unwrap().field, "tls");
    }

    #[test]
    fn test_config_file_replaces_generated_document_and_its_files() {
        let options = InstallOptions {
            config_file: Some("/srv/consul.hcl".to_string()),
            files: vec!["/srv/extra.hcl".to_string()],
            ..Default::default()
        };
        let config = ConsulConfig {
            ca_file: "/pki/ca.pem".to_string(),
            cert_file: "/pki/agent.pem".to_string(),
            key_file: "/pki/agent-key.pem".to_string(),
            ..half_tls_consul()
        };
        let params = InstallParams {
            target: &TargetArgs::default(),
            options: &options,
            config: &config,
            env: vec![("SERVICE_TYPE", "exec".to_string())],
        };

        let job = install_job(&params, None);
        let sources: Vec<&Source> = job.uploads().iter().map(|u| &u.source).collect();
        assert_eq!(
            sources,
            vec![
                &Source::LocalFile(PathBuf::from("/srv/consul.hcl")),
                &Source::LocalFile(PathBuf::from("/srv/extra.hcl")),
            ]
        );
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_extra_file_named_like_config_is_rejected() {
        let options = InstallOptions {
            files: vec!["/home/ops/consul.hcl".to_string()],
            ..Default::default()
        };
        let config = ConsulConfig::default();
        let params = InstallParams {
            target: &TargetArgs::default(),
            options: &options,
            config: &config,
            env: Vec::new(),
        };

        let job = install_job(&params, Some(config.render()));
        assert_eq!(job.validate().unwrap_err().field, "file");
    }
}
