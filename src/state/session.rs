use std::time::SystemTime;

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{AssignmentEntity, GameSessionEntity, SessionStatus},
    state::presets::RolePreset,
};

/// One drafted player bound to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Assignment identifier.
    pub id: Uuid,
    /// Player holding the card.
    pub player_id: Uuid,
    /// Nickname captured when the player was drafted.
    pub nickname: String,
    /// Role label.
    pub role: String,
    /// Whether the card reached the player.
    pub delivered: bool,
}

/// A drafted game with its own copy of the preset roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Session identifier.
    pub id: Uuid,
    /// Preset the session was started from.
    pub preset_id: Uuid,
    /// Preset name at start time.
    pub preset_name: String,
    /// Roles of the preset at start time.
    pub roles: Vec<String>,
    /// Active or ended.
    pub status: SessionStatus,
    /// Cards in draft order.
    pub assignments: Vec<Assignment>,
    /// Start time.
    pub created_at: SystemTime,
    /// End time, once ended.
    pub ended_at: Option<SystemTime>,
}

/// Game session rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Only one game may run at a time.
    #[error("a game session is already active")]
    AlreadyActive,
    /// The operation needs a running game.
    #[error("no game session is active")]
    NoActiveSession,
    /// Fewer queued players than seats.
    #[error("not enough players in queue: {required} required, {available} available")]
    InsufficientQueue {
        /// Seats the preset needs.
        required: usize,
        /// Players currently queued.
        available: usize,
    },
    /// Requested player count differs from the preset.
    #[error("preset `{preset}` is designed for {expected} players, not {requested}")]
    PlayerCountMismatch {
        /// Preset name.
        preset: String,
        /// Seats the preset was built for.
        expected: u32,
        /// Seats the caller asked for.
        requested: u32,
    },
    /// Unknown assignment.
    #[error("assignment `{0}` not found in the active session")]
    AssignmentNotFound(Uuid),
}

/// Uniformly permuted copy of `roles` (Fisher-Yates via [`SliceRandom::shuffle`]).
pub fn shuffled_roles<R: Rng + ?Sized>(roles: &[String], rng: &mut R) -> Vec<String> {
    let mut roles = roles.to_vec();
    roles.shuffle(rng);
    roles
}

impl GameSession {
    /// Bind drafted players, in queue order, to a shuffled copy of the preset roles.
    ///
    /// `drafted` holds `(player_id, nickname)` pairs and must have exactly as many entries as
    /// the preset has roles.
    pub fn draft<R: Rng + ?Sized>(
        preset: &RolePreset,
        drafted: Vec<(Uuid, String)>,
        rng: &mut R,
        now: SystemTime,
    ) -> Result<Self, SessionError> {
        if drafted.len() != preset.roles.len() {
            return Err(SessionError::InsufficientQueue {
                required: preset.roles.len(),
                available: drafted.len(),
            });
        }

        let assignments = drafted
            .into_iter()
            .zip(shuffled_roles(&preset.roles, rng))
            .map(|((player_id, nickname), role)| Assignment {
                id: Uuid::new_v4(),
                player_id,
                nickname,
                role,
                delivered: false,
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            preset_id: preset.id,
            preset_name: preset.name.clone(),
            roles: preset.roles.clone(),
            status: SessionStatus::Active,
            assignments,
            created_at: now,
            ended_at: None,
        })
    }

    /// Whether the game is still running.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Whether `player_id` holds a card.
    pub fn includes_player(&self, player_id: &Uuid) -> bool {
        self.assignments
            .iter()
            .any(|assignment| assignment.player_id == *player_id)
    }

    /// Flag an assignment as delivered. Returns `false` when it already was.
    pub fn mark_delivered(&mut self, assignment_id: &Uuid) -> Result<bool, SessionError> {
        if !self.is_active() {
            return Err(SessionError::NoActiveSession);
        }
        let assignment = self
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id == *assignment_id)
            .ok_or(SessionError::AssignmentNotFound(*assignment_id))?;
        if assignment.delivered {
            return Ok(false);
        }
        assignment.delivered = true;
        Ok(true)
    }

    /// Mark the session ended; fails when it already is.
    pub fn end(&mut self, now: SystemTime) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NoActiveSession);
        }
        self.status = SessionStatus::Ended;
        self.ended_at = Some(now);
        Ok(())
    }
}

impl From<AssignmentEntity> for Assignment {
    fn from(value: AssignmentEntity) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            nickname: value.nickname,
            role: value.role,
            delivered: value.delivered,
        }
    }
}

impl From<Assignment> for AssignmentEntity {
    fn from(value: Assignment) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            nickname: value.nickname,
            role: value.role,
            delivered: value.delivered,
        }
    }
}

impl From<GameSessionEntity> for GameSession {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: value.id,
            preset_id: value.preset_id,
            preset_name: value.preset_name,
            roles: value.roles,
            status: value.status,
            assignments: value.assignments.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
            ended_at: value.ended_at,
        }
    }
}

impl From<GameSession> for GameSessionEntity {
    fn from(value: GameSession) -> Self {
        Self {
            id: value.id,
            preset_id: value.preset_id,
            preset_name: value.preset_name,
            roles: value.roles,
            status: value.status,
            assignments: value.assignments.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
            ended_at: value.ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn trio() -> RolePreset {
        RolePreset {
            id: Uuid::new_v4(),
            name: "Trio".into(),
            player_count: 3,
            roles: vec!["Civilian".into(), "Mafia".into(), "Detective".into()],
            created_at: SystemTime::now(),
        }
    }

    fn drafted(n: usize) -> Vec<(Uuid, String)> {
        (0..n)
            .map(|index| (Uuid::new_v4(), format!("player-{index}")))
            .collect()
    }

    #[test]
    fn draft_is_a_permutation_of_the_preset() {
        let preset = trio();
        let players = drafted(3);
        let mut rng = StdRng::seed_from_u64(7);
        let session =
            GameSession::draft(&preset, players.clone(), &mut rng, SystemTime::now()).unwrap();

        let drafted_ids: Vec<Uuid> = session.assignments.iter().map(|a| a.player_id).collect();
        let expected_ids: Vec<Uuid> = players.iter().map(|(id, _)| *id).collect();
        assert_eq!(drafted_ids, expected_ids);

        let mut assigned: Vec<String> = session.assignments.iter().map(|a| a.role.clone()).collect();
        let mut expected = preset.roles.clone();
        assigned.sort();
        expected.sort();
        assert_eq!(assigned, expected);
        assert!(session.assignments.iter().all(|a| !a.delivered));
    }

    #[test]
    fn draft_requires_one_player_per_role() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = GameSession::draft(&trio(), drafted(2), &mut rng, SystemTime::now()).unwrap_err();
        assert_eq!(
            err,
            SessionError::InsufficientQueue {
                required: 3,
                available: 2
            }
        );
    }

    #[test]
    fn shuffle_reaches_every_arrangement_roughly_evenly() {
        let roles: Vec<String> = ["A", "B", "C"].iter().map(|r| r.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut seen: HashMap<Vec<String>, usize> = HashMap::new();
        let rounds = 6_000;
        for _ in 0..rounds {
            *seen.entry(shuffled_roles(&roles, &mut rng)).or_default() += 1;
        }

        assert_eq!(seen.len(), 6);
        for count in seen.values() {
            // 1000 expected per arrangement.
            assert!((800..=1200).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn delivery_marking_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session =
            GameSession::draft(&trio(), drafted(3), &mut rng, SystemTime::now()).unwrap();
        let id = session.assignments[0].id;

        assert_eq!(session.mark_delivered(&id), Ok(true));
        assert_eq!(session.mark_delivered(&id), Ok(false));
        assert_eq!(
            session.mark_delivered(&Uuid::nil()),
            Err(SessionError::AssignmentNotFound(Uuid::nil()))
        );
    }

    #[test]
    fn ended_session_rejects_further_changes() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut session =
            GameSession::draft(&trio(), drafted(3), &mut rng, SystemTime::now()).unwrap();
        session.end(SystemTime::now()).unwrap();

        assert!(!session.is_active());
        assert!(session.ended_at.is_some());
        assert_eq!(session.end(SystemTime::now()), Err(SessionError::NoActiveSession));
        let id = session.assignments[0].id;
        assert_eq!(session.mark_delivered(&id), Err(SessionError::NoActiveSession));
    }
}
