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

//! Latest release lookup on the HashiCorp release index.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::IgnoredAny;
use serde::Deserialize;

use super::Product;

const RELEASES_URL: &str = "https://releases.hashicorp.com";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    #[error("Failed to query the release index: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Release index returned HTTP {0}")]
    Status(u16),
    #[error("No stable release of {0} found in the release index")]
    NoStableRelease(String),
}

#[derive(Deserialize)]
struct ReleaseIndex {
    versions: HashMap<String, IgnoredAny>,
}

/// Query the release index and return the newest stable version of `product`.
pub async fn latest_version(product: Product) -> Result<String, VersionError> {
    let url = format!("{RELEASES_URL}/{}/index.json", product.name());
    tracing::debug!("Looking up latest {} release at {}", product, url);

    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .user_agent(concat!("hashi-up/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(VersionError::Status(response.status().as_u16()));
    }
    let index: ReleaseIndex = response.json().await?;

    let latest = latest_stable(index.versions.keys().map(String::as_str))
        .ok_or_else(|| VersionError::NoStableRelease(product.name().to_string()))?;
    tracing::info!("Latest {} release is {}", product, latest);
    Ok(latest)
}

/// Highest version without pre-release or build metadata. Entries that are
/// not valid semantic versions are skipped.
pub fn latest_stable<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    versions
        .into_iter()
        .filter_map(|v| semver::Version::parse(v).ok())
        .filter(|v| v.pre.is_empty() && v.build.is_empty())
        .max()
        .map(|v| v.to_string())
}
