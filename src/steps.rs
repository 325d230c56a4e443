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
use crate::artifacts;
use crate::config::Settings;
use crate::kit::Fetcher;
use crate::orchestrator::{Orchestrator, Step};
use crate::system::System;

mod groups;
mod install_kit;
mod packages;
mod register;
mod services;
mod write_files;

pub use groups::{EnsureGroup, JoinGroups};
pub use install_kit::InstallKit;
pub use packages::InstallPackages;
pub use register::RegisterServices;
pub use services::{DisableServices, Scope};
pub use write_files::WriteFiles;

/// The provisioning steps, in the order they must run.
pub fn build<'a>(settings: &Settings, fetcher: &'a dyn Fetcher) -> Vec<Box<dyn Step + 'a>> {
    vec![
        Box::new(InstallPackages::new(settings.packages())),
        Box::new(DisableServices::new(
            settings.user(),
            settings.conflicting_services(),
        )),
        Box::new(EnsureGroup::new(settings.realtime_group())),
        Box::new(JoinGroups::new(settings.user(), settings.groups())),
        Box::new(WriteFiles::new(
            "Writing realtime resource limits",
            settings,
            artifacts::limits_policy,
        )),
        Box::new(InstallKit::new(settings, fetcher)),
        Box::new(WriteFiles::new(
            "Writing helper start scripts",
            settings,
            artifacts::helper_scripts,
        )),
        Box::new(WriteFiles::new(
            "Writing systemd service units",
            settings,
            artifacts::service_units,
        )),
        Box::new(WriteFiles::new(
            "Writing JACK auto-connect rules",
            settings,
            artifacts::autoconnect_rules,
        )),
        Box::new(RegisterServices::new(
            artifacts::SERVICES.iter().map(|s| s.to_string()).collect(),
        )),
    ]
}

/// What to do once provisioning succeeds.
pub fn post_run_instructions(settings: &Settings) -> String {
    format!(
        "Next steps:\n\
         \x20 1. Plug in the audio interface and the drum module.\n\
         \x20 2. Reboot so that group membership and realtime limits take effect: sudo reboot\n\
         \x20 3. Check the services: systemctl status {}\n\
         \x20 4. Follow the logs: journalctl -fu jackd -u drumgizmo\n\
         The kit is installed at {}.",
        artifacts::SERVICES.join(" "),
        settings.kit_dir().display()
    )
}

/// The provisioning orchestrator for the given settings.
pub fn orchestrator<'a>(
    settings: &Settings,
    system: &'a dyn System,
    fetcher: &'a dyn Fetcher,
) -> Orchestrator<'a> {
    Orchestrator::new(
        settings.user(),
        system,
        build(settings, fetcher),
        post_run_instructions(settings),
    )
}
