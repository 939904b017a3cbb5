use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of the game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No game has been played since start-up.
    Idle,
    /// Drafted players hold their roles.
    Active,
    /// The last game is over; a new one may start.
    Ended,
}

impl SessionPhase {
    /// Lowercase name used in API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Active => "active",
            SessionPhase::Ended => "ended",
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Admin drafts the queue head into a new game.
    Start,
    /// Admin closes the running game.
    End,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the machine was in.
    pub from: SessionPhase,
    /// Event that was rejected.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Nothing was planned.
    NoPending,
    /// The plan id does not match the pending plan.
    IdMismatch {
        /// Id of the pending plan.
        expected: PlanId,
        /// Id supplied by the caller.
        got: PlanId,
    },
    /// The machine left the phase the plan started from.
    PhaseMismatch {
        /// Phase recorded in the plan.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// Another transition was applied after this plan was made.
    VersionMismatch {
        /// Version the plan would produce.
        expected: usize,
        /// Version applying now would produce.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// Nothing was planned.
    NoPending,
    /// The plan id does not match the pending plan.
    IdMismatch {
        /// Id of the pending plan.
        expected: PlanId,
        /// Id supplied by the caller.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Token required to apply or abort this plan.
    pub id: PlanId,
    /// Phase at planning time.
    pub from: SessionPhase,
    /// Phase reached once applied.
    pub to: SessionPhase,
    /// Event that triggered the plan.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// When the plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Incremented on each applied transition.
    pub version: usize,
    /// Target phase of the pending plan, if any.
    pub pending: Option<SessionPhase>,
}

/// Two-step (plan, then apply or abort) state machine guarding session start and end.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::resume(SessionPhase::Idle)
    }
}

impl SessionStateMachine {
    /// Machine in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a phase restored from storage.
    pub fn resume(phase: SessionPhase) -> Self {
        Self {
            phase,
            version: 0,
            pending: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Validate `event` against the current phase and reserve the transition.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, returning the new phase.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Drop a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        match (self.phase, event) {
            (SessionPhase::Idle | SessionPhase::Ended, SessionEvent::Start) => {
                Ok(SessionPhase::Active)
            }
            (SessionPhase::Active, SessionEvent::End) => Ok(SessionPhase::Ended),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        assert_eq!(SessionStateMachine::new().phase(), SessionPhase::Idle);
    }

    #[test]
    fn games_can_follow_each_other() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::Active);
        assert_eq!(apply(&mut sm, SessionEvent::End), SessionPhase::Ended);
        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::Active);
        assert_eq!(sm.snapshot().version, 3);
    }

    #[test]
    fn second_start_is_invalid() {
        let mut sm = SessionStateMachine::resume(SessionPhase::Active);
        let err = sm.plan(SessionEvent::Start).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition(InvalidTransition {
                from: SessionPhase::Active,
                event: SessionEvent::Start,
            })
        );
    }

    #[test]
    fn end_requires_an_active_game() {
        let mut sm = SessionStateMachine::new();
        assert!(matches!(
            sm.plan(SessionEvent::End),
            Err(PlanError::InvalidTransition(_))
        ));
    }

    #[test]
    fn pending_plan_blocks_others_until_aborted() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::Start).unwrap();
        assert_eq!(sm.snapshot().pending, Some(SessionPhase::Active));
        assert_eq!(sm.plan(SessionEvent::Start).unwrap_err(), PlanError::AlreadyPending);

        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), SessionPhase::Idle);
    }

    #[test]
    fn applying_a_foreign_plan_keeps_the_pending_one() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::Start).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert_eq!(sm.apply(plan.id).unwrap(), SessionPhase::Active);
    }
}
