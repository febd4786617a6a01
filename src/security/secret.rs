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

//! Secret values read from flags, environment variables or files.
//!
//! Passwords and sudo passwords are kept in a `SecretString`, zeroized on
//! drop and redacted in `Debug` output.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A secure wrapper for passwords that automatically clears memory on drop.
#[derive(Clone)]
pub struct SecretValue {
    inner: SecretString,
}

impl SecretValue {
    /// Wrap `value`, returning `None` for an empty string.
    pub fn new(value: String) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        Some(Self {
            inner: SecretString::new(value.into_boxed_str()),
        })
    }

    /// Borrow the secret.
    ///
    /// The returned string should be used immediately and not stored.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("value", &"[REDACTED]")
            .finish()
    }
}
