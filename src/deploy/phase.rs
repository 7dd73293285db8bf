// ABOUTME: Run phases for logging and failure attribution.
// ABOUTME: The type-state Rollout enforces ordering; this enum only names where a run is.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ReadingState,
    Publishing,
    Triggering,
    Verifying,
    Done,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunPhase::Idle => "idle",
            RunPhase::ReadingState => "reading_state",
            RunPhase::Publishing => "publishing",
            RunPhase::Triggering => "triggering",
            RunPhase::Verifying => "verifying",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        })
    }
}
