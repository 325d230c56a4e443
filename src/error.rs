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
use std::{io, path::PathBuf};

use crate::artifacts::TemplateError;
use crate::system::CommandError;

/// Why a provisioning step could not converge.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("drumpi must be run by '{expected}' (e.g. `sudo drumpi`), not by '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    #[error("package installation failed: {0}")]
    PackageInstallFailure(#[source] CommandError),

    #[error("no directory containing {descriptor} found in the extracted kit at {}", .searched.display())]
    KitStructureNotFound {
        descriptor: String,
        searched: PathBuf,
    },

    #[error("kit verification failed, {} is missing", .missing.display())]
    KitVerificationFailed { missing: PathBuf },

    #[error("unable to write {}: {source}", .path.display())]
    ArtifactWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A step that failed, and the step it was.
#[derive(Debug, thiserror::Error)]
#[error("step {index} ({description}) failed: {cause}")]
pub struct StepFailure {
    pub index: usize,
    pub description: String,
    #[source]
    pub cause: ProvisionError,
}
