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

//! POSIX shell quoting for values interpolated into remote command lines.

/// Quote `value` so `sh` treats it as a single literal word.
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '=' | ','))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render `NAME=value` assignments, quoting every value.
pub fn env_assignments<'a, I>(vars: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    vars.into_iter()
        .map(|(name, value)| format!("{}={}", name, quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}
