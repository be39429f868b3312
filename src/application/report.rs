//! Outcome of a completed verification run

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Summary of a run that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub expected_undone: u64,
    pub cycles_completed: u32,
    pub observations: u64,
    pub polls: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run started {} passed in {:.1?}: {} mutation cycles, {} observations of {} undone tasks, {} polls",
            self.started_at.to_rfc3339(),
            self.elapsed,
            self.cycles_completed,
            self.observations,
            self.expected_undone,
            self.polls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_summarises_the_run() {
        let report = RunReport {
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
            expected_undone: 201,
            cycles_completed: 1000,
            observations: 4000,
            polls: 1000,
        };

        let text = report.to_string();
        assert!(text.contains("1000 mutation cycles"));
        assert!(text.contains("4000 observations of 201 undone tasks"));
    }
}
