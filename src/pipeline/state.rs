use std::fmt;

use crate::error::{ReleaseError, Result};

/// Where a release run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Validated,
    TestBuilt,
    Tagged,
    Installed,
    RemovingBuild,
    RemovingTag,
    CleanedUp,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Created => "created",
            PipelineState::Validated => "validated",
            PipelineState::TestBuilt => "test-built",
            PipelineState::Tagged => "tagged",
            PipelineState::Installed => "installed",
            PipelineState::RemovingBuild => "removing-build",
            PipelineState::RemovingTag => "removing-tag",
            PipelineState::CleanedUp => "cleaned-up",
        }
    }

    /// Whether `next` may directly follow `self`.
    ///
    /// Every state may move to `CleanedUp`; stages that are switched off
    /// (no test build, no tag) are skipped over.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == CleanedUp {
            return true;
        }
        matches!(
            (*self, next),
            (Created, Validated)
                | (Created | Validated, RemovingBuild | RemovingTag)
                | (Validated, TestBuilt | Tagged | Installed)
                | (TestBuilt, Tagged | Installed)
                | (Tagged, Installed)
                | (RemovingBuild, RemovingTag)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Records the states a run passes through and rejects illegal edges.
#[derive(Debug, Clone)]
pub struct StateMachine {
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        StateMachine {
            history: vec![PipelineState::Created],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Created)
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(ReleaseError::internal(format!(
                "illegal pipeline transition {} -> {}",
                current, next
            )));
        }
        log::debug!("pipeline: {} -> {}", current, next);
        self.history.push(next);
        Ok(())
    }

    /// Move to `CleanedUp`. Calling it again is a no-op.
    pub fn finish(&mut self) {
        if self.current() != PipelineState::CleanedUp {
            self.history.push(PipelineState::CleanedUp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_full_release_path() {
        let mut machine = StateMachine::new();
        for state in [Validated, TestBuilt, Tagged, Installed] {
            machine.advance(state).unwrap();
        }
        machine.finish();
        machine.finish();
        assert_eq!(
            machine.history(),
            &[Created, Validated, TestBuilt, Tagged, Installed, CleanedUp]
        );
    }

    #[test]
    fn test_skipped_stages() {
        assert!(Validated.can_transition_to(Installed));
        assert!(TestBuilt.can_transition_to(Installed));
        assert!(RemovingBuild.can_transition_to(RemovingTag));
    }

    #[test]
    fn test_illegal_transitions() {
        let mut machine = StateMachine::new();
        assert!(machine.advance(Tagged).is_err());
        assert!(!Installed.can_transition_to(Tagged));
        assert!(!Tagged.can_transition_to(RemovingTag));
        assert!(!CleanedUp.can_transition_to(Validated));
    }

    #[test]
    fn test_every_state_can_clean_up() {
        for state in [
            Created,
            Validated,
            TestBuilt,
            Tagged,
            Installed,
            RemovingBuild,
            RemovingTag,
            CleanedUp,
        ] {
            assert!(state.can_transition_to(CleanedUp), "{}", state);
        }
    }
}
