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
use tracing::{info, warn};

use crate::error::ProvisionError;
use crate::orchestrator::{Outcome, Step};
use crate::system::{try_ignoring, Ignorable, Invocation, System};

/// Creates the realtime group on platforms that don't ship one.
pub struct EnsureGroup {
    group: String,
}

impl EnsureGroup {
    pub fn new(group: &str) -> EnsureGroup {
        EnsureGroup {
            group: group.to_string(),
        }
    }
}

impl Step for EnsureGroup {
    fn description(&self) -> &str {
        "Ensuring the realtime group exists"
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        // -f succeeds if the group already exists.
        let created = try_ignoring(
            system.run(&Invocation::new("groupadd").arg("-f").arg(&self.group)),
            &[Ignorable::AlreadyDone, Ignorable::NotFound],
        )?;
        match created {
            Some(_) => info!(group = self.group, "Realtime group present."),
            None => warn!(group = self.group, "Unable to create realtime group, continuing."),
        }
        Ok(Outcome::Applied)
    }
}

/// Adds the operating user to the audio and realtime groups.
///
/// Membership is checked first, so a user already in every group is left
/// alone. A group that doesn't exist on this platform is skipped with a warning.
pub struct JoinGroups {
    user: String,
    groups: Vec<String>,
    description: String,
}

impl JoinGroups {
    pub fn new(user: &str, groups: Vec<String>) -> JoinGroups {
        JoinGroups {
            user: user.to_string(),
            groups,
            description: format!("Adding {} to the audio groups", user),
        }
    }

    fn current_groups(&self, system: &dyn System) -> Result<Vec<String>, ProvisionError> {
        let output = system.run(&Invocation::new("id").arg("-nG").arg(&self.user))?;
        Ok(output
            .stdout
            .split_whitespace()
            .map(|group| group.to_string())
            .collect())
    }
}

impl Step for JoinGroups {
    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        let current = self.current_groups(system)?;
        let mut outcome = Outcome::AlreadyPresent;

        for group in self.groups.iter() {
            if current.contains(group) {
                info!(user = self.user, group, "Already a member.");
                continue;
            }

            let joined = try_ignoring(
                system.run(
                    &Invocation::new("usermod")
                        .arg("-aG")
                        .arg(group)
                        .arg(&self.user),
                ),
                &[Ignorable::NotFound],
            )?;
            match joined {
                Some(_) => {
                    info!(user = self.user, group, "Added to group.");
                    outcome = Outcome::Applied;
                }
                None => warn!(group, "Group does not exist on this system, skipping."),
            }
        }

        Ok(outcome)
    }
}
