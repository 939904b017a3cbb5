use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::QueueEntryEntity;

/// A player's place in the waiting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Queued player.
    pub player_id: Uuid,
    /// Strictly increasing insertion key.
    pub sequence: u64,
    /// Admission time.
    pub added_at: SystemTime,
}

/// Reasons an admission to the waiting queue is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The player already holds a slot.
    #[error("player `{0}` is already queued")]
    AlreadyQueued(Uuid),
    /// No slot left.
    #[error("queue is full ({capacity} players)")]
    CapacityExceeded {
        /// Configured maximum queue length.
        capacity: usize,
    },
}

/// FIFO waiting line; each player holds at most one entry.
///
/// Entries are kept in insertion order, so the map order is the FIFO order and
/// positions are 1-based indexes into it.
#[derive(Debug, Clone, Default)]
pub struct WaitingQueue {
    entries: IndexMap<Uuid, QueueEntry>,
    next_sequence: u64,
    capacity: Option<usize>,
}

impl WaitingQueue {
    /// Create an empty queue with an optional admission cap.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            next_sequence: 1,
            capacity,
        }
    }

    /// Rebuild a queue from persisted entries, restoring FIFO order from their sequence keys.
    pub fn from_entries(mut entries: Vec<QueueEntry>, capacity: Option<usize>) -> Self {
        entries.sort_by_key(|entry| entry.sequence);
        let next_sequence = entries.last().map_or(1, |entry| entry.sequence + 1);
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.player_id, entry))
                .collect(),
            next_sequence,
            capacity,
        }
    }

    /// Append a player at the tail and return the new entry with its 1-based position.
    pub fn enqueue(
        &mut self,
        player_id: Uuid,
        now: SystemTime,
    ) -> Result<(QueueEntry, usize), QueueError> {
        if self.entries.contains_key(&player_id) {
            return Err(QueueError::AlreadyQueued(player_id));
        }
        if let Some(capacity) = self.capacity
            && self.entries.len() >= capacity
        {
            return Err(QueueError::CapacityExceeded { capacity });
        }

        let entry = QueueEntry {
            player_id,
            sequence: self.next_sequence,
            added_at: now,
        };
        self.next_sequence += 1;
        self.entries.insert(player_id, entry.clone());
        Ok((entry, self.entries.len()))
    }

    /// The `n` earliest entries, without removing them.
    pub fn dequeue_head(&self, n: usize) -> Vec<&QueueEntry> {
        self.entries.values().take(n).collect()
    }

    /// Remove a player's entry; absent players are ignored.
    pub fn remove(&mut self, player_id: &Uuid) -> Option<QueueEntry> {
        self.entries.shift_remove(player_id)
    }

    /// Remove the entries of every listed player, returning the ids that were actually queued.
    pub fn remove_many(&mut self, player_ids: &[Uuid]) -> Vec<Uuid> {
        player_ids
            .iter()
            .filter(|id| self.entries.shift_remove(*id).is_some())
            .copied()
            .collect()
    }

    /// Drop every entry and return how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Number of queued players.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the player holds a slot.
    pub fn contains(&self, player_id: &Uuid) -> bool {
        self.entries.contains_key(player_id)
    }

    /// 1-based position of a queued player.
    pub fn position(&self, player_id: &Uuid) -> Option<usize> {
        self.entries.get_index_of(player_id).map(|index| index + 1)
    }

    /// Admission cap; `None` when uncapped.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }
}

impl From<QueueEntryEntity> for QueueEntry {
    fn from(value: QueueEntryEntity) -> Self {
        Self {
            player_id: value.player_id,
            sequence: value.sequence,
            added_at: value.added_at,
        }
    }
}

impl From<QueueEntry> for QueueEntryEntity {
    fn from(value: QueueEntry) -> Self {
        Self {
            player_id: value.player_id,
            sequence: value.sequence,
            added_at: value.added_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn head_follows_insertion_order() {
        let mut queue = WaitingQueue::new(None);
        let players = ids(5);
        for (index, id) in players.iter().enumerate() {
            let (_, position) = queue.enqueue(*id, SystemTime::now()).unwrap();
            assert_eq!(position, index + 1);
        }

        let head: Vec<Uuid> = queue.dequeue_head(3).iter().map(|e| e.player_id).collect();
        assert_eq!(head, players[..3]);
        assert_eq!(queue.count(), 5, "peeking must not remove entries");
        assert_eq!(queue.dequeue_head(10).len(), 5);
    }

    #[test]
    fn second_enqueue_is_rejected_without_side_effects() {
        let mut queue = WaitingQueue::new(None);
        let id = Uuid::new_v4();
        queue.enqueue(id, SystemTime::now()).unwrap();

        let err = queue.enqueue(id, SystemTime::now()).unwrap_err();
        assert_eq!(err, QueueError::AlreadyQueued(id));
        assert_eq!(queue.count(), 1);
    }

    #[test]
    fn capacity_caps_admission() {
        let mut queue = WaitingQueue::new(Some(2));
        for id in ids(2) {
            queue.enqueue(id, SystemTime::now()).unwrap();
        }
        let err = queue.enqueue(Uuid::new_v4(), SystemTime::now()).unwrap_err();
        assert_eq!(err, QueueError::CapacityExceeded { capacity: 2 });
    }

    #[test]
    fn removal_is_idempotent_and_keeps_order() {
        let mut queue = WaitingQueue::new(None);
        let players = ids(3);
        for id in &players {
            queue.enqueue(*id, SystemTime::now()).unwrap();
        }

        assert!(queue.remove(&players[1]).is_some());
        assert!(queue.remove(&players[1]).is_none());
        assert_eq!(queue.position(&players[2]), Some(2));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn sequences_stay_monotonic_after_removals_and_rehydration() {
        let mut queue = WaitingQueue::new(None);
        let players = ids(3);
        for id in &players {
            queue.enqueue(*id, SystemTime::now()).unwrap();
        }
        queue.remove(&players[2]);

        let mut persisted: Vec<QueueEntry> = queue.iter().cloned().collect();
        persisted.reverse();
        let mut restored = WaitingQueue::from_entries(persisted, None);
        let order: Vec<Uuid> = restored.iter().map(|e| e.player_id).collect();
        assert_eq!(order, players[..2]);

        let (entry, position) = restored.enqueue(players[2], SystemTime::now()).unwrap();
        assert_eq!(position, 3);
        assert!(entry.sequence > 2);
    }
}
