// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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
use crate::config::Settings;
use crate::error::ProvisionError;
use crate::kit::{Fetcher, Installer};
use crate::orchestrator::{Outcome, Step};
use crate::system::System;

pub struct InstallKit<'a> {
    installer: Installer<'a>,
    description: String,
}

impl<'a> InstallKit<'a> {
    pub fn new(settings: &Settings, fetcher: &'a dyn Fetcher) -> InstallKit<'a> {
        InstallKit {
            installer: Installer::new(settings, fetcher),
            description: format!("Installing the {} drum kit", settings.kit().name()),
        }
    }
}

impl Step for InstallKit<'_> {
    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        let outcome = self.installer.install(system)?;
        if outcome == Outcome::AlreadyPresent {
            println!(
                "      kit already present at {}",
                self.installer.kit().directory().display()
            );
        }
        Ok(outcome)
    }
}
