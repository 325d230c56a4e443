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
use std::sync::Mutex;

use tracing::info;

use super::{CommandError, CommandFailure, Invocation, Output};

/// A scripted reaction to any command line containing `matcher`.
struct Reaction {
    matcher: String,
    result: Result<String, CommandFailure>,
}

/// A mock system. Doesn't actually run anything; records every command line
/// and answers from a script. Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct System {
    reactions: Vec<Reaction>,
    calls: Mutex<Vec<String>>,
}

impl System {
    pub fn new() -> System {
        System::default()
    }

    /// Commands containing `matcher` succeed with the given stdout.
    pub fn respond(mut self, matcher: &str, stdout: &str) -> System {
        self.reactions.push(Reaction {
            matcher: matcher.to_string(),
            result: Ok(stdout.to_string()),
        });
        self
    }

    /// Commands containing `matcher` exit with `code` and the given stderr.
    pub fn fail(mut self, matcher: &str, code: i32, stderr: &str) -> System {
        self.reactions.push(Reaction {
            matcher: matcher.to_string(),
            result: Err(CommandFailure {
                command: String::new(),
                code: Some(code),
                stderr: stderr.to_string(),
            }),
        });
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The command lines run so far that contain `fragment`.
    pub fn calls_containing(&self, fragment: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.contains(fragment))
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl super::System for System {
    fn run(&self, invocation: &Invocation) -> Result<Output, CommandError> {
        let command = invocation.to_string();
        info!(command, "Running command (mock).");
        self.calls.lock().unwrap().push(command.clone());

        // The first matching reaction wins.
        match self
            .reactions
            .iter()
            .find(|reaction| command.contains(&reaction.matcher))
            .map(|reaction| &reaction.result)
        {
            Some(Ok(stdout)) => Ok(Output {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Some(Err(failure)) => Err(CommandFailure {
                command,
                ..failure.clone()
            }
            .into()),
            None => Ok(Output::default()),
        }
    }
}
