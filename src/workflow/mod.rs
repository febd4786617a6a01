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

//! Provisioning workflow.
//!
//! A [`Job`] is executed against one [`Operator`]: a uniquely named working
//! directory is created on the target, the job's files are uploaded into
//! it in order, the payload is piped into `sh -` with its parameters in the
//! environment, and the working directory is removed again. Removal is
//! attempted exactly once on every path, including failures; its own
//! failure is logged and never replaces the workflow result.

mod job;

pub use job::{Job, Source, Stage, Upload};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::operator::{self, Operator};
use crate::security::SecretValue;
use crate::target::Target;
use crate::utils::output;
use crate::utils::shell::{env_assignments, quote};

/// Prefix of the working directory created on the target.
pub const WORK_DIR_PREFIX: &str = "/tmp/hashi-up.";

const REDACTED: &str = "********";

/// Connect to `target`, run `job`, and close the session.
pub async fn provision(target: &Target, job: &Job) -> Result<()> {
    let sudo_password = target
        .resolved_sudo_password()
        .context("Failed to read the sudo password")?;

    tracing::info!("Connecting to {}", target.display_name());
    let operator = operator::connect(target).await?;

    let result = run(operator.as_ref(), job, sudo_password.as_ref()).await;

    if let Err(e) = operator.close().await {
        tracing::warn!("Failed to close session to {}: {}", target.display_name(), e);
    }
    result
}

/// Run `job` on an already open operator.
pub async fn run(
    operator: &dyn Operator,
    job: &Job,
    sudo_password: Option<&SecretValue>,
) -> Result<()> {
    job.validate()?;
    let dir = work_dir();

    let result = run_stages(operator, job, &dir, sudo_password).await;

    tracing::info!(stage = %Stage::CleaningUp, "Removing {}", dir);
    if let Err(e) = operator.execute(&format!("rm -rf {}", quote(&dir))).await {
        tracing::warn!("Failed to remove working directory {}: {}", dir, e);
    }

    result
}

async fn run_stages(
    operator: &dyn Operator,
    job: &Job,
    dir: &str,
    sudo_password: Option<&SecretValue>,
) -> Result<()> {
    tracing::info!(stage = %Stage::Preparing, "Creating {}", dir);
    operator
        .execute(&format!("mkdir -p {}", quote(&format!("{dir}/config"))))
        .await
        .context("Failed to create the working directory on the target")?;

    for upload in job.uploads() {
        tracing::info!(stage = %upload.stage, "Uploading {}", upload.destination);
        output::info(&upload.message);
        let remote_path = format!("{dir}/{}", upload.destination);
        let uploaded = match &upload.source {
            Source::Content(bytes) => {
                let mut reader: &[u8] = bytes;
                operator.upload(&mut reader, &remote_path, upload.mode).await
            }
            Source::LocalFile(path) => operator.upload_file(path, &remote_path, upload.mode).await,
        };
        uploaded.with_context(|| format!("Failed to upload {}", upload.destination))?;
    }

    let script_path = format!("{dir}/{}", job.script.file_name);
    let mut body = job.script.body.as_bytes();
    operator
        .upload(&mut body, &script_path, "0755")
        .await
        .context("Failed to upload the installation script")?;

    tracing::info!(
        stage = %Stage::InvokingScript,
        "{}",
        payload_command(dir, job, sudo_password.map(|_| REDACTED))
    );
    output::info(&job.action);
    let command = payload_command(dir, job, sudo_password.map(SecretValue::expose));
    operator.execute(&command).await.with_context(|| {
        format!("{} failed on the target", job.action.trim_end_matches(" ..."))
    })?;

    output::info("Done.");
    Ok(())
}

/// `cat <dir>/<script> | TMP_DIR=.. <job env> [SUDO_PASS=..] sh -`
fn payload_command(dir: &str, job: &Job, sudo_password: Option<&str>) -> String {
    let mut vars: Vec<(&str, &str)> = vec![("TMP_DIR", dir)];
    vars.extend(job.env.iter().map(|(name, value)| (name.as_str(), value.as_str())));
    if let Some(password) = sudo_password {
        vars.push(("SUDO_PASS", password));
    }
    format!(
        "cat {} | {} sh -",
        quote(&format!("{dir}/{}", job.script.file_name)),
        env_assignments(vars)
    )
}

fn work_dir() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{WORK_DIR_PREFIX}{}", &id[..8])
}
