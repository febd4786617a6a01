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

use anyhow::Result;

use super::install::resolve_version;
use crate::cli::BoundaryInitDatabaseArgs;
use crate::config::{GeneratedConfig, Product};
use crate::scripts;
use crate::workflow::{self, Job};

/// Run `boundary database init` on the target.
pub async fn init_database(args: &BoundaryInitDatabaseArgs) -> Result<()> {
    let generated = match &args.config_file {
        Some(_) => None,
        None => {
            args.config.validate()?;
            Some(args.config.render())
        }
    };

    let target = args.target.to_target();
    target.validate()?;

    let version = resolve_version(Product::Boundary, args.version.as_deref(), args.package.as_deref()).await?;

    let mut job = Job::new(
        Product::Boundary,
        scripts::BOUNDARY_INIT_DB,
        "Initializing Boundary database ...",
    );
    if let Some(package) = &args.package {
        job = job.package(package);
    }
    job = match (&args.config_file, generated) {
        (Some(path), _) => job.custom_config(path),
        (None, Some(document)) => job.generated_config(document),
        (None, None) => job,
    };
    if let Some(version) = version {
        job = job.env("VERSION", version);
    }

    workflow::provision(&target, &job).await
}
