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

//! Configuration errors raised before any filesystem or network I/O.

/// Error type for invalid, missing or contradictory flags.
///
/// # Examples
///
/// ```
/// use hashi_up::error::ValidationError;
///
/// let err = ValidationError::new("ssh-target-addr", "required unless --local is set");
/// assert!(err.to_string().contains("ssh-target-addr"));
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for '{field}': {message}")]
pub struct ValidationError {
    /// The flag that failed validation
    pub field: String,
    /// Description of why validation failed
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an error for an empty field.
    pub fn empty(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} cannot be empty"),
            field,
        }
    }

    /// Create an error for a set of flags that must be given together.
    pub fn incomplete_set(field: impl Into<String>, members: &[&str]) -> Self {
        Self {
            field: field.into(),
            message: format!(
                "either all or none of {} must be provided",
                members
                    .iter()
                    .map(|m| format!("--{m}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}
