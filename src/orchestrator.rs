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
use std::fmt;

use tracing::{error, info, span, Level};

use crate::error::{ProvisionError, StepFailure};
use crate::system::System;

/// What a step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The step changed (or rewrote) something.
    Applied,
    /// The step found the system already converged and did nothing.
    AlreadyPresent,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::AlreadyPresent => write!(f, "already present"),
        }
    }
}

/// One convergent change to the system. Running a step on a system it has
/// already converged must leave the system as it is.
pub trait Step {
    fn description(&self) -> &str;

    fn run(&self, system: &dyn System) -> Result<Outcome, ProvisionError>;
}

/// Progress through a run.
#[derive(Clone, Copy, Debug)]
pub struct RunState {
    current: usize,
    total: usize,
}

impl RunState {
    pub fn new(total: usize) -> RunState {
        RunState { current: 0, total }
    }

    /// Moves to the next step and returns its 1-based index.
    pub fn advance(&mut self) -> usize {
        self.current += 1;
        self.current
    }

    /// Percent complete once the current step is done, rounded down.
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.current * 100 / self.total
    }

    pub fn progress_line(&self, description: &str) -> String {
        format!(
            "[{}/{}] {} ({}% complete)",
            self.current,
            self.total,
            description,
            self.percent()
        )
    }
}

/// Why a run stopped.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Nothing was run.
    #[error(transparent)]
    Precondition(ProvisionError),

    /// The step failed; the steps before it stay applied.
    #[error(transparent)]
    Step(#[from] StepFailure),
}

/// The outcome of every step of a successful run.
#[derive(Debug, Default)]
pub struct Summary {
    pub steps: Vec<(String, Outcome)>,
}

impl Summary {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.steps.iter().filter(|(_, o)| *o == outcome).count()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Provisioning complete: {} steps ({} applied, {} already present).",
            self.steps.len(),
            self.count(Outcome::Applied),
            self.count(Outcome::AlreadyPresent)
        )?;
        for (index, (description, outcome)) in self.steps.iter().enumerate() {
            writeln!(f, "  {:>2}. {} ({})", index + 1, description, outcome)?;
        }
        Ok(())
    }
}

/// Runs steps in order, stopping at the first failure. There is no rollback:
/// every step is convergent, so the recovery path is fixing the cause and
/// running everything again.
pub struct Orchestrator<'a> {
    expected_user: String,
    system: &'a dyn System,
    steps: Vec<Box<dyn Step + 'a>>,
    instructions: String,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        expected_user: &str,
        system: &'a dyn System,
        steps: Vec<Box<dyn Step + 'a>>,
        instructions: String,
    ) -> Orchestrator<'a> {
        Orchestrator {
            expected_user: expected_user.to_string(),
            system,
            steps,
            instructions,
        }
    }

    /// Checks the invoking user, then runs every step.
    pub fn run(&self, invoking_user: Option<&str>) -> Result<Summary, RunError> {
        let actual = invoking_user.unwrap_or("unknown");
        if actual != self.expected_user {
            return Err(RunError::Precondition(ProvisionError::IdentityMismatch {
                expected: self.expected_user.clone(),
                actual: actual.to_string(),
            }));
        }

        let mut state = RunState::new(self.steps.len());
        let mut summary = Summary::default();
        for step in self.steps.iter() {
            let index = state.advance();
            let span = span!(Level::INFO, "step", index);
            let _enter = span.enter();

            println!("{}", state.progress_line(step.description()));
            match step.run(self.system) {
                Ok(outcome) => {
                    info!(step = step.description(), %outcome, "Step finished.");
                    summary.steps.push((step.description().to_string(), outcome));
                }
                Err(cause) => {
                    error!(step = step.description(), err = %cause, "Step failed.");
                    return Err(StepFailure {
                        index,
                        description: step.description().to_string(),
                        cause,
                    }
                    .into());
                }
            }
        }

        println!();
        print!("{}", summary);
        println!();
        println!("{}", self.instructions);
        Ok(summary)
    }
}
