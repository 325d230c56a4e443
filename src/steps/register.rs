// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use tracing::info;

use crate::error::ProvisionError;
use crate::orchestrator::{Outcome, Step};
use crate::system::{Invocation, System};

/// Reloads systemd's unit cache and enables the drum engine services. Must run
/// last: the units reference files written by earlier steps.
pub struct RegisterServices {
    services: Vec<String>,
}

impl RegisterServices {
    pub fn new(services: Vec<String>) -> RegisterServices {
        RegisterServices { services }
    }
}

impl Step for RegisterServices {
    fn description(&self) -> &str {
        "Registering services"
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        system.run(&Invocation::new("systemctl").arg("daemon-reload"))?;
        for service in self.services.iter() {
            system.run(&Invocation::new("systemctl").arg("enable").arg(service))?;
            info!(service, "Enabled service.");
        }
        Ok(Outcome::Applied)
    }
}
