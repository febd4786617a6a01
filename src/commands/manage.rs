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

use anyhow::Result;

use crate::cli::ManageCommand;
use crate::config::Product;
use crate::scripts;
use crate::workflow::{self, Job};

/// Build the job for an uninstall or systemctl action.
pub fn manage_job(product: Product, command: &ManageCommand) -> Job {
    match command.service_action() {
        None => Job::new(
            product,
            scripts::UNINSTALL,
            format!("Uninstalling {} ...", product.title()),
        ),
        Some(action) => Job::new(
            product,
            scripts::SERVICE,
            format!("Running systemctl {action} {} ...", product.name()),
        )
        .env("ACTION", action),
    }
}

pub async fn manage(product: Product, command: &ManageCommand) -> Result<()> {
    let target = command.target().to_target();
    target.validate()?;
    workflow::provision(&target, &manage_job(product, command)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TargetArgs;

    #[test]
    fn test_uninstall_job() {
        let job = manage_job(Product::Vault, &ManageCommand::Uninstall(TargetArgs::default()));
        assert!(job.uploads().is_empty());
        assert_eq!(job.script, scripts::UNINSTALL);
        assert_eq!(job.env, vec![("SERVICE".to_string(), "vault".to_string())]);
    }

    #[test]
    fn test_service_job() {
        let job = manage_job(Product::Nomad, &ManageCommand::Restart(TargetArgs::default()));
        assert_eq!(job.script, scripts::SERVICE);
        assert!(job
            .env
            .contains(&("ACTION".to_string(), "restart".to_string())));
    }
}
