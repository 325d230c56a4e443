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
use crate::artifacts::{Artifact, TemplateError};
use crate::config::Settings;
use crate::error::ProvisionError;
use crate::orchestrator::{Outcome, Step};
use crate::system::System;

type Render = fn(&Settings) -> Result<Vec<Artifact>, TemplateError>;

/// Renders and writes a group of artifacts. Always rewrites, never skips.
pub struct WriteFiles {
    description: &'static str,
    settings: Settings,
    render: Render,
}

impl WriteFiles {
    pub fn new(description: &'static str, settings: &Settings, render: Render) -> WriteFiles {
        WriteFiles {
            description,
            settings: settings.clone(),
            render,
        }
    }
}

impl Step for WriteFiles {
    fn description(&self) -> &str {
        self.description
    }

    fn run(&self, _: &dyn System) -> Result<Outcome, ProvisionError> {
        for artifact in (self.render)(&self.settings)? {
            artifact.write(&self.settings)?;
        }
        Ok(Outcome::Applied)
    }
}
