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

//! Host key verification policy for remote targets.
//!
//! Verification is opt-in: provisioning freshly created machines is the
//! common case, and their keys are not in `known_hosts` yet.

use super::tokio_client::ServerCheckMethod;
use directories::BaseDirs;
use std::path::PathBuf;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Create a ServerCheckMethod for the requested policy.
///
/// With `strict` set, the host key must be present in the user's
/// known_hosts file; unknown or changed keys abort the connection.
pub fn get_check_method(strict: bool) -> ServerCheckMethod {
    if !strict {
        tracing::debug!("Host key checking disabled");
        return ServerCheckMethod::NoCheck;
    }

    match get_default_known_hosts_path() {
        Some(path) => {
            if !path.exists() {
                tracing::warn!(
                    "Known hosts file not found at {:?}, every host key will be rejected",
                    path
                );
            } else {
                tracing::debug!("Using known_hosts file: {:?} (strict mode)", path);
            }
            ServerCheckMethod::DefaultKnownHostsFile
        }
        None => {
            tracing::warn!("Could not determine home directory, host keys cannot be verified");
            ServerCheckMethod::DefaultKnownHostsFile
        }
    }
}
