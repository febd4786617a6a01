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

//! User-facing progress lines.
//!
//! These are printed regardless of the log filter; diagnostics belong in
//! `tracing` instead.

use owo_colors::OwoColorize;
use std::fmt::Display;

/// Print an `[INFO]` progress line to stdout.
pub fn info(message: impl Display) {
    println!("{} {}", "[INFO]".green(), message);
}

/// Print an `[ERROR]` line to stderr.
pub fn error(message: impl Display) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

/// Print a remediation hint to stderr.
pub fn hint(message: impl Display) {
    eprintln!("{} {}", "hint:".yellow(), message);
}
