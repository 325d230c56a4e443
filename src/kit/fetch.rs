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
use std::path::Path;

use tracing::info;

use crate::error::ProvisionError;
use crate::system::{Invocation, System};

/// Gets a kit archive onto disk and unpacks it.
pub trait Fetcher {
    /// Downloads `url` to `archive`.
    fn download(&self, system: &dyn System, url: &str, archive: &Path)
        -> Result<(), ProvisionError>;

    /// Extracts `archive` into the directory `into`, creating it if needed.
    fn extract(&self, system: &dyn System, archive: &Path, into: &Path)
        -> Result<(), ProvisionError>;
}

/// Downloads with wget and extracts with unzip.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wget;

impl Fetcher for Wget {
    fn download(
        &self,
        system: &dyn System,
        url: &str,
        archive: &Path,
    ) -> Result<(), ProvisionError> {
        info!(url, archive = %archive.display(), "Downloading kit.");
        system.run(
            &Invocation::new("wget")
                .args(["-q", "-O"])
                .arg(archive.to_string_lossy())
                .arg(url),
        )?;
        Ok(())
    }

    fn extract(
        &self,
        system: &dyn System,
        archive: &Path,
        into: &Path,
    ) -> Result<(), ProvisionError> {
        info!(archive = %archive.display(), into = %into.display(), "Extracting kit.");
        system.run(
            &Invocation::new("unzip")
                .args(["-q", "-o"])
                .arg(archive.to_string_lossy())
                .arg("-d")
                .arg(into.to_string_lossy()),
        )?;
        Ok(())
    }
}
