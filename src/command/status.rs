use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`Command`](super::Command).
///
/// Transitions are monotonic: `Waiting -> Running -> {Success, Failed, Aborted}`
/// or `Waiting -> Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandStatus {
    Waiting,
    Running,
    Success,
    Failed,
    Aborted,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandStatus::Success | CommandStatus::Failed | CommandStatus::Aborted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Waiting => "waiting",
            CommandStatus::Running => "running",
            CommandStatus::Success => "success",
            CommandStatus::Failed => "failed",
            CommandStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!CommandStatus::Waiting.is_terminal());
        assert!(!CommandStatus::Running.is_terminal());
        assert!(CommandStatus::Success.is_terminal());
        assert!(CommandStatus::Failed.is_terminal());
        assert!(CommandStatus::Aborted.is_terminal());
    }
}
