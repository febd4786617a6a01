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

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BoundaryConfig, BoundaryDatabaseConfig, ConsulConfig, NomadConfig, VaultConfig};
use crate::security::SecretValue;
use crate::target::Target;

#[derive(Parser, Debug)]
#[command(
    name = "hashi-up",
    version,
    about = "Install HashiCorp agents on local or remote hosts",
    long_about = "hashi-up installs and manages Consul, Nomad, Vault and Boundary agents.\nA configuration file is generated from flags (or taken verbatim with --config-file),\nuploaded together with certificates and an optional release archive, and an install\nscript sets up the binary and a systemd service on the target.\nTargets are reached over SSH, or the local machine is used with --local.",
    after_help = "EXAMPLES:\n  Consul server over SSH:   hashi-up consul install -r 10.0.0.5 --server --client-addr 0.0.0.0\n  Nomad client locally:     hashi-up nomad install --local --client --retry-join 10.0.0.5\n  Preview configuration:    hashi-up vault install --show --storage consul\n  Restart a service:        hashi-up consul restart -r 10.0.0.5 -u ubuntu -k ~/.ssh/id_ed25519"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Install and manage Consul")]
    Consul {
        #[command(subcommand)]
        action: ConsulCommand,
    },

    #[command(about = "Install and manage Nomad")]
    Nomad {
        #[command(subcommand)]
        action: NomadCommand,
    },

    #[command(about = "Install and manage Vault")]
    Vault {
        #[command(subcommand)]
        action: VaultCommand,
    },

    #[command(about = "Install and manage Boundary")]
    Boundary {
        #[command(subcommand)]
        action: BoundaryCommand,
    },

    #[command(about = "Print the version of hashi-up")]
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConsulCommand {
    #[command(about = "Install a Consul agent on the target")]
    Install(Box<ConsulInstallArgs>),

    #[command(flatten)]
    Manage(ManageCommand),
}

#[derive(Subcommand, Debug)]
pub enum NomadCommand {
    #[command(about = "Install a Nomad agent on the target")]
    Install(Box<NomadInstallArgs>),

    #[command(flatten)]
    Manage(ManageCommand),
}

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    #[command(about = "Install a Vault server on the target")]
    Install(Box<VaultInstallArgs>),

    #[command(flatten)]
    Manage(ManageCommand),
}

#[derive(Subcommand, Debug)]
pub enum BoundaryCommand {
    #[command(about = "Install a Boundary controller and/or worker on the target")]
    Install(Box<BoundaryInstallArgs>),

    #[command(
        name = "init-database",
        about = "Initialise the Boundary database from the target",
        long_about = "Uploads a minimal controller configuration (database URL and root key)\nand runs `boundary database init` on the target. The boundary binary is\ninstalled first when missing."
    )]
    InitDatabase(Box<BoundaryInitDatabaseArgs>),

    #[command(flatten)]
    Manage(ManageCommand),
}

/// Actions shared by every product.
#[derive(Subcommand, Debug)]
pub enum ManageCommand {
    #[command(about = "Stop the service and remove binary, configuration and data")]
    Uninstall(TargetArgs),

    #[command(about = "Start the service")]
    Start(TargetArgs),

    #[command(about = "Stop the service")]
    Stop(TargetArgs),

    #[command(about = "Restart the service")]
    Restart(TargetArgs),

    #[command(about = "Reload the service configuration")]
    Reload(TargetArgs),
}

impl ManageCommand {
    pub fn target(&self) -> &TargetArgs {
        match self {
            Self::Uninstall(t) | Self::Start(t) | Self::Stop(t) | Self::Restart(t) | Self::Reload(t) => t,
        }
    }

    /// systemctl verb, or `None` for uninstall.
    pub fn service_action(&self) -> Option<&'static str> {
        match self {
            Self::Uninstall(_) => None,
            Self::Start(_) => Some("start"),
            Self::Stop(_) => Some("stop"),
            Self::Restart(_) => Some("restart"),
            Self::Reload(_) => Some("reload"),
        }
    }
}

/// Where to run and how to authenticate.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    #[arg(
        short = 'r',
        long = "ssh-target-addr",
        help = "Remote target address as host[:port] (port defaults to 22)"
    )]
    pub addr: Option<String>,

    #[arg(
        short = 'u',
        long = "ssh-target-user",
        default_value = "root",
        help = "Username for the SSH login"
    )]
    pub user: String,

    #[arg(
        short = 'k',
        long = "ssh-target-key",
        help = "Private key for the SSH login\nEncrypted keys are looked up in the SSH agent first, then a passphrase is prompted\nWithout a key or password the SSH agent is used"
    )]
    pub key: Option<PathBuf>,

    #[arg(
        short = 'p',
        long = "ssh-target-password",
        env = "SSH_TARGET_PASSWORD",
        hide_env_values = true,
        help = "Password for the SSH login, or a path to a file containing it"
    )]
    pub password: Option<String>,

    #[arg(
        short = 's',
        long = "ssh-target-sudo-pass",
        env = "SSH_TARGET_SUDO_PASS",
        hide_env_values = true,
        help = "Password for sudo on the target, or a path to a file containing it"
    )]
    pub sudo_password: Option<String>,

    #[arg(long, help = "Run on the local machine instead of over SSH")]
    pub local: bool,

    #[arg(
        long = "strict-host-key-checking",
        help = "Verify the server host key against ~/.ssh/known_hosts\nWithout this flag any host key is accepted"
    )]
    pub strict_host_key_checking: bool,
}

impl TargetArgs {
    pub fn to_target(&self) -> Target {
        Target {
            address: self.addr.clone().unwrap_or_default(),
            user: self.user.clone(),
            key: self.key.clone(),
            password: self.password.clone().and_then(SecretValue::new),
            sudo_password: self.sudo_password.clone().and_then(SecretValue::new),
            local: self.local,
            strict_host_key_checking: self.strict_host_key_checking,
        }
    }
}

/// Flags shared by every install command.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallOptions {
    #[arg(long, help = "Print the generated configuration and exit")]
    pub show: bool,

    #[arg(long, help = "Release to install, defaults to the latest stable release")]
    pub version: Option<String>,

    #[arg(long, help = "Upload this release archive instead of downloading")]
    pub package: Option<String>,

    #[arg(
        short = 'c',
        long = "config-file",
        help = "Upload this configuration file verbatim\nAll configuration flags are ignored"
    )]
    pub config_file: Option<String>,

    #[arg(
        short = 'f',
        long = "file",
        help = "Additional file, e.g. a certificate, to upload next to the configuration (repeatable)"
    )]
    pub files: Vec<String>,

    #[arg(long = "skip-enable", help = "Do not enable or start the service")]
    pub skip_enable: bool,

    #[arg(long = "skip-start", help = "Enable but do not start the service")]
    pub skip_start: bool,
}

#[derive(Args, Debug)]
pub struct ConsulInstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub install: InstallOptions,
    #[command(flatten)]
    pub config: ConsulConfig,
}

#[derive(Args, Debug)]
pub struct NomadInstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub install: InstallOptions,
    #[command(flatten)]
    pub config: NomadConfig,
}

#[derive(Args, Debug)]
pub struct VaultInstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub install: InstallOptions,
    #[command(flatten)]
    pub config: VaultConfig,
}

#[derive(Args, Debug)]
pub struct BoundaryInstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub install: InstallOptions,
    #[command(flatten)]
    pub config: BoundaryConfig,
}

#[derive(Args, Debug)]
pub struct BoundaryInitDatabaseArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(long, help = "Release to install, defaults to the latest stable release")]
    pub version: Option<String>,
    #[arg(long, help = "Upload this release archive instead of downloading")]
    pub package: Option<String>,
    #[arg(
        short = 'c',
        long = "config-file",
        help = "Upload this configuration file verbatim\n--db-url and --root-key are ignored"
    )]
    pub config_file: Option<String>,
    #[command(flatten)]
    pub config: BoundaryDatabaseConfig,
}
