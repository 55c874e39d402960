use std::time::{Duration, Instant};

use crate::error::ProjectionError;
use crate::ProjectionResult;

/// Cooperative wall-clock budget. Checked between periods and between solver
/// iterations; a running step is never interrupted.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after_ms(budget_ms: u64) -> Self {
        Deadline {
            started: Instant::now(),
            budget: Duration::from_millis(budget_ms),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn check(&self) -> ProjectionResult<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.budget {
            return Err(ProjectionError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.budget.as_millis() as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_expires_immediately() {
        let d = Deadline::after_ms(0);
        assert!(d.is_expired());
        let err = d.check().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_generous_budget_passes() {
        let d = Deadline::after_ms(60_000);
        assert!(d.check().is_ok());
    }
}
