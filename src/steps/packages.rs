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

/// Refreshes the package index and installs packages. Already installed
/// packages are left alone by apt, so this converges on its own.
pub struct InstallPackages {
    packages: Vec<String>,
}

impl InstallPackages {
    pub fn new(packages: Vec<String>) -> InstallPackages {
        InstallPackages { packages }
    }

    fn apt_get(&self) -> Invocation {
        // jackd2 asks about realtime priority through debconf otherwise.
        Invocation::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive")
    }
}

impl Step for InstallPackages {
    fn description(&self) -> &str {
        "Refreshing package index and installing packages"
    }

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        system
            .run(&self.apt_get().arg("update"))
            .map_err(ProvisionError::PackageInstallFailure)?;

        info!(packages = self.packages.join(" "), "Installing packages.");
        system
            .run(&self.apt_get().args(["install", "-y"]).args(&self.packages))
            .map_err(ProvisionError::PackageInstallFailure)?;

        Ok(Outcome::Applied)
    }
}
