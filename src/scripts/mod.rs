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

//! Shell payloads executed on the target.
//!
//! Every payload is the shared prelude (`common.sh`) followed by the
//! action body. Payloads take all parameters from environment variables
//! and are piped into `sh -`.

/// An embedded payload and the file name it is uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    pub file_name: &'static str,
    pub body: &'static str,
}

pub const INSTALL: Script = Script {
    file_name: "install.sh",
    body: concat!(include_str!("common.sh"), include_str!("install.sh")),
};

pub const UNINSTALL: Script = Script {
    file_name: "uninstall.sh",
    body: concat!(include_str!("common.sh"), include_str!("uninstall.sh")),
};

pub const SERVICE: Script = Script {
    file_name: "run.sh",
    body: concat!(include_str!("common.sh"), include_str!("service.sh")),
};

pub const BOUNDARY_INIT_DB: Script = Script {
    file_name: "install.sh",
    body: concat!(include_str!("common.sh"), include_str!("boundary_init_db.sh")),
};
