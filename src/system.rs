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
use std::{fmt, io};

use tracing::debug;

#[cfg(test)]
pub mod mock;
mod process;

pub use process::Process;

/// Runs external programs. Everything drumpi does to the system outside of
/// writing files goes through here.
pub trait System {
    /// Runs the invocation to completion. A non-zero exit is a CommandError::Failed.
    fn run(&self, invocation: &Invocation) -> Result<Output, CommandError>;
}

/// A program and its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: &str) -> Invocation {
        Invocation {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Invocation {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Invocation {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args.iter() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful invocation.
#[derive(Clone, Debug, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// An invocation that ran and exited unsuccessfully.
#[derive(Clone, Debug, thiserror::Error)]
#[error("'{command}' exited with {}: {}", code_display(.code), .stderr.trim())]
pub struct CommandFailure {
    pub command: String,
    pub code: Option<i32>,
    pub stderr: String,
}

fn code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unable to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Failed(#[from] CommandFailure),
}

/// Failure outcomes that mean "nothing to do" rather than "something broke".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ignorable {
    /// The unit, group or user does not exist.
    NotFound,
    /// The target is already in the requested state.
    AlreadyDone,
    /// There is no user session manager to talk to.
    NoSession,
}

const DENIED_MARKERS: [&str; 4] = [
    "access denied",
    "permission denied",
    "interactive authentication required",
    "operation not permitted",
];
const NO_SESSION_MARKERS: [&str; 3] = [
    "failed to connect to bus",
    "failed to connect to user scope bus",
    "$dbus_session_bus_address",
];
const NOT_FOUND_MARKERS: [&str; 4] = [
    "not loaded",
    "does not exist",
    "not found",
    "no such file",
];
// Specific phrasings only: "File ... already exists" from `systemctl mask` means
// a real unit file blocks the mask, which is a fault.
const ALREADY_MARKERS: [&str; 4] = [
    "is already masked",
    "is already disabled",
    "already a member",
    "already active",
];

/// systemctl's exit status for "unit not loaded / program not installed".
const SYSTEMCTL_NOT_INSTALLED: i32 = 5;

impl CommandFailure {
    /// Classifies the failure from its stderr and exit status. Permission
    /// failures are never classified, whatever else the message says.
    pub fn classify(&self) -> Option<Ignorable> {
        let stderr = self.stderr.to_lowercase();
        let contains_any = |markers: &[&str]| markers.iter().any(|m| stderr.contains(m));

        if contains_any(&DENIED_MARKERS) {
            return None;
        }
        if contains_any(&NO_SESSION_MARKERS) {
            return Some(Ignorable::NoSession);
        }
        if contains_any(&NOT_FOUND_MARKERS) {
            return Some(Ignorable::NotFound);
        }
        if contains_any(&ALREADY_MARKERS) {
            return Some(Ignorable::AlreadyDone);
        }
        if self.command.starts_with("systemctl") && self.code == Some(SYSTEMCTL_NOT_INSTALLED) {
            return Some(Ignorable::NotFound);
        }
        None
    }
}

/// Suppresses failures of the given classes. Returns Ok(None) for a suppressed
/// failure; every other failure, including spawn errors, is returned as is.
pub fn try_ignoring(
    result: Result<Output, CommandError>,
    ignorable: &[Ignorable],
) -> Result<Option<Output>, CommandError> {
    match result {
        Ok(output) => Ok(Some(output)),
        Err(CommandError::Failed(failure)) => match failure.classify() {
            Some(class) if ignorable.contains(&class) => {
                debug!(
                    command = failure.command,
                    class = ?class,
                    stderr = failure.stderr.trim(),
                    "Suppressed best-effort failure."
                );
                Ok(None)
            }
            _ => Err(CommandError::Failed(failure)),
        },
        Err(e) => Err(e),
    }
}
