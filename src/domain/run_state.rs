//! Per-run lifecycle: `Idle → SchemaEnsured → Collected → Loaded | Failed`.
//!
//! A run never leaves `Loaded` or `Failed`; retries start a fresh machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    SchemaEnsured,
    Collected,
    Loaded,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }

    /// The state a successful step moves this one to, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::SchemaEnsured),
            Self::SchemaEnsured => Some(Self::Collected),
            Self::Collected => Some(Self::Loaded),
            Self::Loaded | Self::Failed => None,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SchemaEnsured => "schema_ensured",
            Self::Collected => "collected",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunStateError {
    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },
}

/// Tracks the current state of one run and the path it took.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    current: RunState,
    history: Vec<RunState>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Move to `next`. Only the single forward step or `Failed` are allowed.
    pub fn transition(&mut self, next: RunState) -> Result<RunState, RunStateError> {
        let allowed = match next {
            RunState::Failed => !self.current.is_terminal(),
            other => self.current.successor() == Some(other),
        };

        if !allowed {
            return Err(RunStateError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        tracing::debug!(from = %self.current, to = %next, "run state transition");
        self.current = next;
        self.history.push(next);
        Ok(next)
    }

    /// Advance one step along the happy path.
    pub fn advance(&mut self) -> Result<RunState, RunStateError> {
        let next = self.current.successor().ok_or(RunStateError::InvalidTransition {
            from: self.current,
            to: self.current,
        })?;
        self.transition(next)
    }

    pub fn fail(&mut self) -> Result<RunState, RunStateError> {
        self.transition(RunState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn happy_path_reaches_loaded() {
        let mut machine = RunStateMachine::new();
        machine.advance().unwrap();
        machine.advance().unwrap();
        machine.advance().unwrap();

        assert_eq!(machine.current(), RunState::Loaded);
        assert_eq!(
            machine.history(),
            &[RunState::Idle, RunState::SchemaEnsured, RunState::Collected, RunState::Loaded]
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn any_open_state_can_fail(#[case] steps: usize) {
        let mut machine = RunStateMachine::new();
        for _ in 0..steps {
            machine.advance().unwrap();
        }
        assert_eq!(machine.fail().unwrap(), RunState::Failed);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut machine = RunStateMachine::new();
        machine.fail().unwrap();
        assert!(machine.advance().is_err());
        assert!(machine.fail().is_err());

        let mut loaded = RunStateMachine::new();
        for _ in 0..3 {
            loaded.advance().unwrap();
        }
        assert!(loaded.fail().is_err());
    }

    #[test]
    fn skipping_a_step_is_rejected() {
        let mut machine = RunStateMachine::new();
        let err = machine.transition(RunState::Collected).unwrap_err();
        assert_eq!(
            err,
            RunStateError::InvalidTransition {
                from: RunState::Idle,
                to: RunState::Collected
            }
        );
        assert_eq!(machine.current(), RunState::Idle);
    }
}
