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

//! Local path helpers.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the current user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = if path_str == "~" {
        ""
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        rest
    } else {
        return path.to_path_buf();
    };

    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()))
}

/// Last component of `path` after tilde expansion, or an empty string.
pub fn file_name(path: &str) -> String {
    expand_tilde(Path::new(path))
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Location a local file will have on the target once uploaded into
/// `base_dir`: the base directory joined with the file's base name.
pub fn target_file_name(path: &str, base_dir: &str) -> String {
    format!("{}/{}", base_dir.trim_end_matches('/'), file_name(path))
}

/// Parse an octal permission string such as `644`, `0644` or `0o644`.
pub fn parse_mode(mode: &str) -> Option<u32> {
    let digits = mode.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|value| *value <= 0o7777)
}
