//! Export lifecycle state machine.
//!
//! ```text
//! Idle → Preparing → Capturing ──┬──→ Finalizing → Done
//!            │          │        │        │
//!            │          └→ Transcoding ───┘
//!            └──────────→ Transcoding
//!
//! any state except Idle/Done → Failed
//! ```
//!
//! `Capturing → Transcoding` is the only fallback edge; nothing ever
//! leads back into `Capturing`.

use rampcut_common::{RampcutError, RampcutResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportState {
    Idle,
    Preparing,
    Capturing,
    Transcoding,
    Finalizing,
    Done,
    Failed,
}

impl ExportState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Preparing => "Preparing export",
            Self::Capturing => "Capturing",
            Self::Transcoding => "Transcoding",
            Self::Finalizing => "Finalizing",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    /// Whether an execution path owns the export resources.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Capturing | Self::Transcoding)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ExportState::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Capturing)
                | (Preparing, Transcoding)
                | (Capturing, Transcoding)
                | (Capturing, Finalizing)
                | (Transcoding, Finalizing)
                | (Finalizing, Done)
                | (Preparing | Capturing | Transcoding | Finalizing, Failed)
        )
    }
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks the current state and every state visited by one export.
#[derive(Debug, Clone)]
pub struct ExportStateMachine {
    current: ExportState,
    history: Vec<ExportState>,
}

impl Default for ExportStateMachine {
    fn default() -> Self {
        Self {
            current: ExportState::Idle,
            history: vec![ExportState::Idle],
        }
    }
}

impl ExportStateMachine {
    pub fn current(&self) -> ExportState {
        self.current
    }

    pub fn history(&self) -> &[ExportState] {
        &self.history
    }

    /// Number of times `state` was entered.
    pub fn visits(&self, state: ExportState) -> usize {
        self.history.iter().filter(|s| **s == state).count()
    }

    pub fn transition(&mut self, next: ExportState) -> RampcutResult<()> {
        if !self.current.can_transition_to(next) {
            return Err(RampcutError::Other(anyhow::anyhow!(
                "Illegal export state transition {:?} -> {:?}",
                self.current,
                next
            )));
        }
        tracing::debug!(from = ?self.current, to = ?next, "Export state changed");
        self.current = next;
        self.history.push(next);
        Ok(())
    }

    /// Return to `Idle` with a fresh history.
    ///
    /// Callers must hold the export busy flag, so no export is in flight and a
    /// non-terminal state can only be left over from an abandoned run.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_then_fallback_path() {
        let mut machine = ExportStateMachine::default();
        for state in [
            ExportState::Preparing,
            ExportState::Capturing,
            ExportState::Transcoding,
            ExportState::Finalizing,
            ExportState::Done,
        ] {
            machine.transition(state).unwrap();
        }
        assert_eq!(machine.visits(ExportState::Transcoding), 1);
        assert_eq!(machine.history().len(), 6);
    }

    #[test]
    fn never_returns_to_capturing() {
        let mut machine = ExportStateMachine::default();
        machine.transition(ExportState::Preparing).unwrap();
        machine.transition(ExportState::Capturing).unwrap();
        machine.transition(ExportState::Transcoding).unwrap();
        assert!(machine.transition(ExportState::Capturing).is_err());
        assert!(machine.transition(ExportState::Transcoding).is_err());
        assert_eq!(machine.current(), ExportState::Transcoding);
    }

    #[test]
    fn failure_reachable_from_working_states_only() {
        let mut machine = ExportStateMachine::default();
        assert!(machine.transition(ExportState::Failed).is_err());
        machine.transition(ExportState::Preparing).unwrap();
        machine.transition(ExportState::Failed).unwrap();
        assert!(machine.transition(ExportState::Done).is_err());
    }

    #[test]
    fn reset_clears_abandoned_and_finished_runs() {
        let mut machine = ExportStateMachine::default();
        machine.transition(ExportState::Preparing).unwrap();
        machine.transition(ExportState::Transcoding).unwrap();
        machine.reset();
        assert_eq!(machine.current(), ExportState::Idle);
        assert_eq!(machine.history(), &[ExportState::Idle]);
        machine.transition(ExportState::Preparing).unwrap();

        machine.transition(ExportState::Failed).unwrap();
        machine.reset();
        assert_eq!(machine.current(), ExportState::Idle);
        assert_eq!(machine.history(), &[ExportState::Idle]);
    }
}
