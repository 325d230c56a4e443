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
use std::process::{Command, Stdio};

use tracing::debug;

use super::{CommandError, CommandFailure, Invocation, Output};

/// Runs invocations as child processes of drumpi, with drumpi's own rights.
#[derive(Clone, Copy, Debug, Default)]
pub struct Process;

impl super::System for Process {
    fn run(&self, invocation: &Invocation) -> Result<Output, CommandError> {
        let command = invocation.to_string();
        debug!(command, "Running command.");

        let output = Command::new(invocation.program())
            .args(invocation.get_args())
            .envs(invocation.get_env().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandFailure {
                command,
                code: output.status.code(),
                stderr,
            }
            .into());
        }

        Ok(Output { stdout, stderr })
    }
}
