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
use std::{thread, time::Duration};

use tracing::debug;

/// The condition polled for never became true.
#[derive(Debug, thiserror::Error)]
#[error("condition not met after {attempts} attempts, {interval:?} apart")]
pub struct PollTimeout {
    pub attempts: u32,
    pub interval: Duration,
}

/// A bounded poll: at most `attempts` probes, `interval` apart.
///
/// The same parameters are rendered into the generated helper scripts, so the
/// shell loops and the Rust loop wait for exactly the same amount of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Poll {
    interval: Duration,
    attempts: u32,
}

impl Poll {
    /// Creates a new poll. A zero attempt count is treated as one attempt.
    pub fn new(interval: Duration, attempts: u32) -> Poll {
        Poll {
            interval,
            attempts: attempts.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The interval in seconds as understood by sleep(1), e.g. "0.2".
    pub fn shell_interval(&self) -> String {
        format!("{}", self.interval.as_secs_f64())
    }

    /// Probes until the probe yields a value or the attempts are exhausted.
    /// There is no sleep after the final attempt.
    pub fn until<T, F>(&self, mut probe: F) -> Result<T, PollTimeout>
    where
        F: FnMut() -> Option<T>,
    {
        for attempt in 1..=self.attempts {
            if let Some(value) = probe() {
                return Ok(value);
            }
            debug!(attempt, attempts = self.attempts, "Condition not met yet.");
            if attempt < self.attempts {
                thread::sleep(self.interval);
            }
        }

        Err(PollTimeout {
            attempts: self.attempts,
            interval: self.interval,
        })
    }
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, time::Duration};

    use super::Poll;

    #[test]
    fn test_immediate_success() {
        let probes = Cell::new(0);
        let poll = Poll::new(Duration::from_millis(1), 5);
        let result = poll.until(|| {
            probes.set(probes.get() + 1);
            Some("ready")
        });
        assert_eq!(result.unwrap(), "ready");
        assert_eq!(probes.get(), 1);
    }

    #[test]
    fn test_success_after_retries() {
        let probes = Cell::new(0);
        let poll = Poll::new(Duration::from_millis(1), 5);
        let result = poll.until(|| {
            probes.set(probes.get() + 1);
            (probes.get() == 3).then_some(probes.get())
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(probes.get(), 3);
    }

    #[test]
    fn test_timeout_is_bounded() {
        let probes = Cell::new(0);
        let poll = Poll::new(Duration::from_millis(1), 4);
        let result: Result<(), _> = poll.until(|| {
            probes.set(probes.get() + 1);
            None
        });
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(probes.get(), 4);
    }

    #[test]
    fn test_zero_attempts_probes_once() {
        let probes = Cell::new(0);
        let poll = Poll::new(Duration::from_millis(1), 0);
        let _: Result<(), _> = poll.until(|| {
            probes.set(probes.get() + 1);
            None
        });
        assert_eq!(probes.get(), 1);
    }

    #[test]
    fn test_shell_interval() {
        let poll = Poll::new(Duration::from_millis(200), 50);
        assert_eq!(poll.shell_interval(), "0.2");
        assert_eq!(Poll::new(Duration::from_secs(1), 3).shell_interval(), "1");
    }
}
