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
use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::orchestrator::{Outcome, Step};
use crate::system::{try_ignoring, Ignorable, Invocation, System};

const ACTIONS: [&str; 3] = ["stop", "disable", "mask"];

/// Which service manager instance a unit belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The operating user's service manager.
    User,
    System,
}

/// Stops, disables and masks services that would otherwise grab the audio device.
///
/// Best-effort: units that don't exist, are already in the requested state, or
/// whose user session manager isn't running are skipped. Anything else, notably
/// permission failures, fails the step.
pub struct DisableServices {
    user: String,
    services: Vec<String>,
}

impl DisableServices {
    pub fn new(user: &str, services: Vec<String>) -> DisableServices {
        DisableServices {
            user: user.to_string(),
            services,
        }
    }

    fn systemctl(&self, scope: Scope) -> Invocation {
        match scope {
            Scope::User => Invocation::new("systemctl")
                .arg("--user")
                .arg(format!("--machine={}@", self.user)),
            Scope::System => Invocation::new("systemctl"),
        }
    }
}

impl Step for DisableServices {
    fn description(&self) -> &str {
        "Disabling conflicting audio services"
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        let ignorable = [
            Ignorable::NotFound,
            Ignorable::AlreadyDone,
            Ignorable::NoSession,
        ];

        for scope in [Scope::User, Scope::System] {
            for service in self.services.iter() {
                for action in ACTIONS {
                    let invocation = self.systemctl(scope).arg(action).arg(service);
                    match try_ignoring(system.run(&invocation), &ignorable)? {
                        Some(_) => debug!(?scope, service, action, "Done."),
                        None => debug!(?scope, service, action, "Nothing to do."),
                    }
                }
            }
            info!(?scope, services = self.services.len(), "Disabled conflicting services.");
        }

        Ok(Outcome::Applied)
    }
}
