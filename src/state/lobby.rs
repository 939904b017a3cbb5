//! The in-memory lobby aggregate: roster, waiting queue, preset catalog and current session.
//!
//! Every mutating method records the durable changes it made in a journal. Callers work on a
//! clone, drain the journal with [`Lobby::take_changes`], persist it, and only then swap the
//! clone in, so a failed write never leaks into the live state.

use std::time::SystemTime;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::lobby_store::{LobbyChange, LobbySnapshot},
    state::{
        presets::{PresetCatalog, PresetError, RolePreset},
        queue::{QueueEntry, QueueError, WaitingQueue},
        roster::{NewPlayer, Player, PlayerChanges, Roster, RosterError},
        session::{GameSession, SessionError},
    },
};

/// Typed failure of a lobby operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// Player registry rule.
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// Queue admission rule.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// Preset rule.
    #[error(transparent)]
    Preset(#[from] PresetError),
    /// Game session rule.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The player holds a card in the running game.
    #[error("player `{0}` is part of the active game")]
    PlayerInActiveSession(Uuid),
}

/// Result of one chat registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Player admitted to the queue.
    Success {
        /// Admitted player.
        player: Player,
        /// 1-based position.
        position: usize,
    },
    /// Player already holds a queue entry.
    AlreadyQueued {
        /// Queued player.
        player: Player,
    },
    /// Registration refused.
    Failed {
        /// Absent when the chat identity is unknown.
        player: Option<Player>,
        /// Why the attempt was refused.
        reason: String,
    },
}

/// Players, queue, presets and the latest session, with a journal of pending store changes.
#[derive(Debug, Clone, Default)]
pub struct Lobby {
    roster: Roster,
    queue: WaitingQueue,
    presets: PresetCatalog,
    session: Option<GameSession>,
    journal: Vec<LobbyChange>,
}

impl Lobby {
    /// Empty lobby with an optional queue admission cap.
    pub fn new(queue_capacity: Option<usize>) -> Self {
        Self {
            queue: WaitingQueue::new(queue_capacity),
            ..Self::default()
        }
    }

    /// Rebuild the lobby from a storage snapshot.
    ///
    /// Queue entries pointing at unknown players are dropped.
    pub fn hydrate(snapshot: LobbySnapshot, queue_capacity: Option<usize>) -> Self {
        let roster = Roster::from_players(snapshot.players.into_iter().map(Into::into).collect());
        let entries: Vec<QueueEntry> = snapshot
            .queue
            .into_iter()
            .map(QueueEntry::from)
            .filter(|entry| roster.get(&entry.player_id).is_ok())
            .collect();

        Self {
            queue: WaitingQueue::from_entries(entries, queue_capacity),
            roster,
            presets: PresetCatalog::from_presets(
                snapshot.presets.into_iter().map(Into::into).collect(),
            ),
            session: snapshot.session.map(Into::into),
            journal: Vec::new(),
        }
    }

    /// Drain the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<LobbyChange> {
        std::mem::take(&mut self.journal)
    }

    /// Registered players.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Waiting queue.
    pub fn queue(&self) -> &WaitingQueue {
        &self.queue
    }

    /// Role presets.
    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    /// Most recent session, active or ended.
    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    /// Latest session while it is active.
    pub fn active_session(&self) -> Option<&GameSession> {
        self.session.as_ref().filter(|session| session.is_active())
    }

    /// Queued players in FIFO order with their positions.
    pub fn queued_players(&self) -> Vec<(usize, &QueueEntry, &Player)> {
        self.queue
            .iter()
            .filter_map(|entry| {
                self.roster
                    .get(&entry.player_id)
                    .ok()
                    .map(|player| (entry, player))
            })
            .enumerate()
            .map(|(index, (entry, player))| (index + 1, entry, player))
            .collect()
    }

    /// Register a player.
    pub fn create_player(&mut self, new: NewPlayer, now: SystemTime) -> Result<Player, LobbyError> {
        let player = self.roster.create(new, now)?;
        self.journal
            .push(LobbyChange::UpsertPlayer(player.clone().into()));
        Ok(player)
    }

    /// Replace a player's editable fields.
    pub fn update_player(
        &mut self,
        id: &Uuid,
        changes: PlayerChanges,
    ) -> Result<Player, LobbyError> {
        let player = self.roster.update(id, changes)?;
        self.journal
            .push(LobbyChange::UpsertPlayer(player.clone().into()));
        Ok(player)
    }

    /// Delete a player and their queue entry. Players drafted into the active game are kept.
    pub fn delete_player(&mut self, id: &Uuid) -> Result<Option<Player>, LobbyError> {
        if self
            .active_session()
            .is_some_and(|session| session.includes_player(id))
        {
            return Err(LobbyError::PlayerInActiveSession(*id));
        }
        let removed = self.roster.remove(id);
        if removed.is_some() {
            self.queue.remove(id);
            self.journal.push(LobbyChange::DeletePlayer(*id));
        }
        Ok(removed)
    }

    /// Admit a known player at the tail of the queue, returning their 1-based position.
    pub fn enqueue(&mut self, player_id: &Uuid, now: SystemTime) -> Result<usize, LobbyError> {
        self.roster.get(player_id)?;
        let (entry, position) = self.queue.enqueue(*player_id, now)?;
        self.journal
            .push(LobbyChange::InsertQueueEntry(entry.into()));
        Ok(position)
    }

    /// Handle the registration command sent by `chat_id`.
    ///
    /// Refusals are outcomes, not errors: they leave the lobby untouched and record nothing.
    pub fn register_from_chat(&mut self, chat_id: &str, now: SystemTime) -> RegistrationOutcome {
        let Some(player) = self.roster.find_by_chat_id(chat_id.trim()).cloned() else {
            return RegistrationOutcome::Failed {
                player: None,
                reason: "not registered on the platform".into(),
            };
        };

        match self.enqueue(&player.id, now) {
            Ok(position) => RegistrationOutcome::Success { player, position },
            Err(LobbyError::Queue(QueueError::AlreadyQueued(_))) => {
                RegistrationOutcome::AlreadyQueued { player }
            }
            Err(err) => RegistrationOutcome::Failed {
                player: Some(player),
                reason: err.to_string(),
            },
        }
    }

    /// Remove a player from the queue; absent players are a no-op.
    pub fn dequeue(&mut self, player_id: &Uuid) -> bool {
        let removed = self.queue.remove(player_id).is_some();
        if removed {
            self.journal
                .push(LobbyChange::DeleteQueueEntries(vec![*player_id]));
        }
        removed
    }

    /// Empty the queue; returns how many entries were removed.
    pub fn clear_queue(&mut self) -> usize {
        let removed = self.queue.clear();
        self.journal.push(LobbyChange::ClearQueue);
        removed
    }

    /// Store a new preset.
    pub fn create_preset(
        &mut self,
        name: &str,
        player_count: Option<u32>,
        roles: Vec<String>,
        now: SystemTime,
    ) -> Result<RolePreset, LobbyError> {
        let preset = self.presets.create(name, player_count, roles, now)?;
        self.journal
            .push(LobbyChange::UpsertPreset(preset.clone().into()));
        Ok(preset)
    }

    /// Remove a preset; `None` when it did not exist.
    pub fn delete_preset(&mut self, id: &Uuid) -> Option<RolePreset> {
        let removed = self.presets.delete(id);
        if removed.is_some() {
            self.journal.push(LobbyChange::DeletePreset(*id));
        }
        removed
    }

    /// Draft the head of the queue into a new session.
    ///
    /// Either the drafted entries leave the queue and the session becomes active, or nothing
    /// changes at all.
    pub fn start_session<R: Rng + ?Sized>(
        &mut self,
        preset_id: &Uuid,
        player_count: Option<u32>,
        rng: &mut R,
        now: SystemTime,
    ) -> Result<GameSession, LobbyError> {
        if self.active_session().is_some() {
            return Err(SessionError::AlreadyActive.into());
        }

        let preset = self.presets.get(preset_id)?.clone();
        if let Some(requested) = player_count
            && requested != preset.player_count
        {
            return Err(SessionError::PlayerCountMismatch {
                preset: preset.name,
                expected: preset.player_count,
                requested,
            }
            .into());
        }

        let required = preset.roles.len();
        let drafted: Vec<(Uuid, String)> = self
            .queue
            .dequeue_head(required)
            .into_iter()
            .filter_map(|entry| {
                self.roster
                    .get(&entry.player_id)
                    .ok()
                    .map(|player| (player.id, player.nickname.clone()))
            })
            .collect();
        if drafted.len() < required {
            return Err(SessionError::InsufficientQueue {
                required,
                available: self.queue.count(),
            }
            .into());
        }

        let session = GameSession::draft(&preset, drafted, rng, now)?;
        let drafted_ids: Vec<Uuid> = session
            .assignments
            .iter()
            .map(|assignment| assignment.player_id)
            .collect();
        self.queue.remove_many(&drafted_ids);
        self.session = Some(session.clone());

        self.journal
            .push(LobbyChange::DeleteQueueEntries(drafted_ids));
        self.journal
            .push(LobbyChange::UpsertSession(session.clone().into()));
        Ok(session)
    }

    /// Flag an assignment of session `session_id` as delivered.
    ///
    /// Fails with [`SessionError::NoActiveSession`] when that session is no longer the active
    /// one, so a dispatch racing with `end` stops instead of touching a finished game.
    pub fn mark_delivered(
        &mut self,
        session_id: &Uuid,
        assignment_id: &Uuid,
    ) -> Result<bool, LobbyError> {
        let session = self
            .session
            .as_mut()
            .filter(|session| session.is_active() && session.id == *session_id)
            .ok_or(SessionError::NoActiveSession)?;
        let changed = session.mark_delivered(assignment_id)?;
        if changed {
            self.journal
                .push(LobbyChange::UpsertSession(session.clone().into()));
        }
        Ok(changed)
    }

    /// End the active session and flush the whole remaining queue.
    pub fn end_session(&mut self, now: SystemTime) -> Result<GameSession, LobbyError> {
        let session = self
            .session
            .as_mut()
            .ok_or(SessionError::NoActiveSession)?;
        session.end(now)?;
        let ended = session.clone();

        self.queue.clear();
        self.journal
            .push(LobbyChange::UpsertSession(ended.clone().into()));
        self.journal.push(LobbyChange::ClearQueue);
        Ok(ended)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn lobby_with_players(names: &[&str]) -> (Lobby, Vec<Player>) {
        let mut lobby = Lobby::new(None);
        let players = names
            .iter()
            .map(|name| {
                lobby
                    .create_player(
                        NewPlayer {
                            chat_id: name.to_string(),
                            nickname: name.to_uppercase(),
                            contact_id: Some(format!("tg-{name}")),
                            phone: None,
                        },
                        SystemTime::now(),
                    )
                    .unwrap()
            })
            .collect();
        lobby.take_changes();
        (lobby, players)
    }

    fn trio(lobby: &mut Lobby) -> RolePreset {
        let preset = lobby
            .create_preset(
                "Trio",
                Some(3),
                vec!["Civilian".into(), "Mafia".into(), "Detective".into()],
                SystemTime::now(),
            )
            .unwrap();
        lobby.take_changes();
        preset
    }

    #[test]
    fn registration_outcomes_follow_the_queue() {
        let (mut lobby, _) = lobby_with_players(&["alice"]);

        let first = lobby.register_from_chat("alice", SystemTime::now());
        assert!(matches!(first, RegistrationOutcome::Success { position: 1, .. }));
        assert_eq!(lobby.take_changes().len(), 1);

        let second = lobby.register_from_chat("alice", SystemTime::now());
        assert!(matches!(second, RegistrationOutcome::AlreadyQueued { .. }));
        assert!(lobby.take_changes().is_empty());

        let ghost = lobby.register_from_chat("ghost123", SystemTime::now());
        assert!(matches!(ghost, RegistrationOutcome::Failed { player: None, .. }));
        assert_eq!(lobby.queue().count(), 1);
    }

    #[test]
    fn capacity_refusal_is_a_failed_outcome() {
        let mut lobby = Lobby::new(Some(1));
        for name in ["alice", "bob"] {
            lobby
                .create_player(
                    NewPlayer {
                        chat_id: name.into(),
                        nickname: name.into(),
                        ..NewPlayer::default()
                    },
                    SystemTime::now(),
                )
                .unwrap();
        }
        lobby.register_from_chat("alice", SystemTime::now());
        let outcome = lobby.register_from_chat("bob", SystemTime::now());
        match outcome {
            RegistrationOutcome::Failed { player, reason } => {
                assert!(player.is_some());
                assert!(reason.contains("full"), "{reason}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn start_with_short_queue_changes_nothing() {
        let (mut lobby, players) = lobby_with_players(&["a", "b"]);
        let preset = trio(&mut lobby);
        for player in &players {
            lobby.enqueue(&player.id, SystemTime::now()).unwrap();
        }
        lobby.take_changes();

        let mut rng = StdRng::seed_from_u64(9);
        let err = lobby
            .start_session(&preset.id, None, &mut rng, SystemTime::now())
            .unwrap_err();
        assert_eq!(
            err,
            LobbyError::Session(SessionError::InsufficientQueue {
                required: 3,
                available: 2
            })
        );
        assert_eq!(lobby.queue().count(), 2);
        assert!(lobby.session().is_none());
        assert!(lobby.take_changes().is_empty());
    }

    #[test]
    fn start_rejects_player_count_that_disagrees_with_preset() {
        let (mut lobby, _) = lobby_with_players(&[]);
        let preset = trio(&mut lobby);
        let mut rng = StdRng::seed_from_u64(9);
        let err = lobby
            .start_session(&preset.id, Some(4), &mut rng, SystemTime::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LobbyError::Session(SessionError::PlayerCountMismatch { .. })
        ));
    }

    #[test]
    fn drafted_player_cannot_be_deleted_while_the_game_runs() {
        let (mut lobby, players) = lobby_with_players(&["a", "b", "c"]);
        let preset = trio(&mut lobby);
        for player in &players {
            lobby.enqueue(&player.id, SystemTime::now()).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(11);
        lobby
            .start_session(&preset.id, None, &mut rng, SystemTime::now())
            .unwrap();

        let err = lobby.delete_player(&players[0].id).unwrap_err();
        assert_eq!(err, LobbyError::PlayerInActiveSession(players[0].id));

        lobby.end_session(SystemTime::now()).unwrap();
        assert!(lobby.delete_player(&players[0].id).unwrap().is_some());
    }

    #[test]
    fn mark_delivered_ignores_stale_sessions() {
        let (mut lobby, players) = lobby_with_players(&["a", "b", "c"]);
        let preset = trio(&mut lobby);
        for player in &players {
            lobby.enqueue(&player.id, SystemTime::now()).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(5);
        let session = lobby
            .start_session(&preset.id, None, &mut rng, SystemTime::now())
            .unwrap();
        let assignment = session.assignments[0].id;
        lobby.end_session(SystemTime::now()).unwrap();

        let err = lobby.mark_delivered(&session.id, &assignment).unwrap_err();
        assert_eq!(err, LobbyError::Session(SessionError::NoActiveSession));
    }

    #[test]
    fn hydrate_drops_entries_of_unknown_players() {
        let (mut lobby, players) = lobby_with_players(&["a"]);
        lobby.enqueue(&players[0].id, SystemTime::now()).unwrap();

        let snapshot = LobbySnapshot {
            players: players.iter().cloned().map(Into::into).collect(),
            queue: vec![
                lobby.queue().iter().next().cloned().unwrap().into(),
                crate::dao::models::QueueEntryEntity {
                    player_id: Uuid::new_v4(),
                    sequence: 7,
                    added_at: SystemTime::now(),
                },
            ],
            presets: Vec::new(),
            session: None,
        };

        let restored = Lobby::hydrate(snapshot, None);
        assert_eq!(restored.queue().count(), 1);
        assert_eq!(restored.queued_players()[0].2.chat_id, "a");
    }
}
