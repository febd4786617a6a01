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

//! End-to-end workflow runs against the local machine.
//!
//! The payloads used here only inspect the working directory, so the tests
//! need nothing beyond a POSIX shell and a writable /tmp.

use std::fs;
use std::path::Path;

use hashi_up::config::{ConsulConfig, GeneratedConfig, Product};
use hashi_up::operator::{LocalOperator, OperatorError};
use hashi_up::scripts::Script;
use hashi_up::workflow::{self, Job, WORK_DIR_PREFIX};

const INSPECT: Script = Script {
    file_name: "install.sh",
    body: r#"set -e
cp "$TMP_DIR/config/consul.hcl" "$OUT_DIR/consul.hcl"
ls "$TMP_DIR/config" > "$OUT_DIR/listing"
printf '%s' "$TMP_DIR" > "$OUT_DIR/tmp_dir"
printf '%s %s %s' "$SERVICE" "$VERSION" "${SUDO_PASS:-none}" > "$OUT_DIR/env"
"#,
};

const FAIL: Script = Script {
    file_name: "install.sh",
    body: r#"printf '%s' "$TMP_DIR" > "$OUT_DIR/tmp_dir"
exit 1
"#,
};

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[tokio::test]
async fn test_local_install_uploads_and_cleans_up() {
    let out = tempfile::tempdir().unwrap();
    let cert = out.path().join("agent.pem");
    fs::write(&cert, "-----BEGIN CERTIFICATE-----\n").unwrap();

    let config = ConsulConfig {
        server: true,
        ..Default::default()
    };
    let document = config.render();

    let job = Job::new(Product::Consul, INSPECT, "Installing Consul ...")
        .generated_config(document.clone())
        .extra_files([cert.to_str().unwrap()])
        .env("VERSION", "1.16.2")
        .env("OUT_DIR", out.path().to_str().unwrap());

    workflow::run(&LocalOperator::quiet(), &job, None).await.unwrap();

    assert_eq!(read(out.path(), "consul.hcl"), document);
    assert_eq!(read(out.path(), "listing"), "agent.pem\nconsul.hcl\n");
    assert_eq!(read(out.path(), "env"), "consul 1.16.2 none");

    let tmp_dir = read(out.path(), "tmp_dir");
    assert!(tmp_dir.starts_with(WORK_DIR_PREFIX));
    assert!(!Path::new(&tmp_dir).exists());
}

#[tokio::test]
async fn test_local_custom_config_is_verbatim() {
    let out = tempfile::tempdir().unwrap();
    let custom = out.path().join("custom.hcl");
    fs::write(&custom, "# hand written\nserver = true\n").unwrap();

    let config = ConsulConfig {
        server: true,
        bootstrap_expect: 3,
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    let job = Job::new(Product::Consul, INSPECT, "Installing Consul ...")
        .custom_config(custom.to_str().unwrap())
        .env("VERSION", "1.16.2")
        .env("OUT_DIR", out.path().to_str().unwrap());

    workflow::run(&LocalOperator::quiet(), &job, None).await.unwrap();

    assert_eq!(read(out.path(), "consul.hcl"), "# hand written\nserver = true\n");
}

#[tokio::test]
async fn test_local_failure_still_removes_work_dir() {
    let out = tempfile::tempdir().unwrap();
    let job = Job::new(Product::Nomad, FAIL, "Installing Nomad ...")
        .generated_config("datacenter = \"dc1\"\n".to_string())
        .env("OUT_DIR", out.path().to_str().unwrap());

    let err = workflow::run(&LocalOperator::quiet(), &job, None)
        .await
        .unwrap_err();
    let exit_failure = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<OperatorError>(),
            Some(OperatorError::CommandFailed { exit_status: 1 })
        )
    });
    assert!(exit_failure);

    let tmp_dir = read(out.path(), "tmp_dir");
    assert!(!tmp_dir.is_empty());
    assert!(!Path::new(&tmp_dir).exists());
}

#[tokio::test]
async fn test_sudo_password_reaches_payload() {
    let out = tempfile::tempdir().unwrap();
    let job = Job::new(Product::Consul, INSPECT, "Installing Consul ...")
        .generated_config(ConsulConfig::default().render())
        .env("VERSION", "1.16.2")
        .env("OUT_DIR", out.path().to_str().unwrap());
    let sudo = hashi_up::security::SecretValue::new("it's secret".to_string());

    workflow::run(&LocalOperator::quiet(), &job, sudo.as_ref())
        .await
        .unwrap();

    assert_eq!(read(out.path(), "env"), "consul 1.16.2 it's secret");
}
