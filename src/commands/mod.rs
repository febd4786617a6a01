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

//! Entry points of the subcommands.

pub mod init_database;
pub mod install;
pub mod manage;

use anyhow::Result;

use crate::cli::{BoundaryCommand, Commands, ConsulCommand, NomadCommand, VaultCommand};
use crate::config::Product;
use install::{install, InstallParams};
use manage::manage;

/// Run a parsed command line.
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Consul { action } => match action {
            ConsulCommand::Install(args) => {
                let service_type = if args.config.retry_join.is_empty() {
                    "exec"
                } else {
                    "notify"
                };
                install(InstallParams {
                    target: &args.target,
                    options: &args.install,
                    config: &args.config,
                    env: vec![("SERVICE_TYPE", service_type.to_string())],
                })
                .await
            }
            ConsulCommand::Manage(command) => manage(Product::Consul, &command).await,
        },
        Commands::Nomad { action } => match action {
            NomadCommand::Install(args) => {
                install(InstallParams {
                    target: &args.target,
                    options: &args.install,
                    config: &args.config,
                    env: Vec::new(),
                })
                .await
            }
            NomadCommand::Manage(command) => manage(Product::Nomad, &command).await,
        },
        Commands::Vault { action } => match action {
            VaultCommand::Install(args) => {
                install(InstallParams {
                    target: &args.target,
                    options: &args.install,
                    config: &args.config,
                    env: Vec::new(),
                })
                .await
            }
            VaultCommand::Manage(command) => manage(Product::Vault, &command).await,
        },
        Commands::Boundary { action } => match action {
            BoundaryCommand::Install(args) => {
                install(InstallParams {
                    target: &args.target,
                    options: &args.install,
                    config: &args.config,
                    env: Vec::new(),
                })
                .await
            }
            BoundaryCommand::InitDatabase(args) => init_database::init_database(&args).await,
            BoundaryCommand::Manage(command) => manage(Product::Boundary, &command).await,
        },
        Commands::Version => {
            println!("hashi-up {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
