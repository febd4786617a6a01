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

use clap::Parser;
use std::process::ExitCode;

use hashi_up::{
    cli::Cli,
    commands::dispatch,
    operator::OperatorError,
    ssh::CredentialError,
    utils::{init_logging, output},
};

/// Print remediation guidance for the distinguished error kinds.
fn print_hints(err: &anyhow::Error) {
    for cause in err.chain() {
        let credential = cause.downcast_ref::<CredentialError>().or_else(|| {
            match cause.downcast_ref::<OperatorError>() {
                Some(OperatorError::Credential(inner)) => Some(inner),
                _ => None,
            }
        });
        if let Some(CredentialError::AgentUnavailable { .. }) = credential {
            output::hint(
                "no usable SSH agent: load a key with `ssh-add`, or pass --ssh-target-key or --ssh-target-password",
            );
            return;
        }
        if let Some(OperatorError::TargetConnect { address, .. }) =
            cause.downcast_ref::<OperatorError>()
        {
            output::hint(format!(
                "check that {address} is reachable and that --ssh-target-user and the key or password are correct"
            ));
            return;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            print_hints(&err);
            ExitCode::FAILURE
        }
    }
}
