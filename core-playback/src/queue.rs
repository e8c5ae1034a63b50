//! Play queue and shuffle history.
//!
//! The queue is an ordered list of episodes with unique ids. It is a
//! to-play list, not a cursor: the current episode does not have to be in it,
//! and removing entries never touches what is playing.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::types::{Episode, EpisodeId};

/// Ordered, duplicate-free list of upcoming episodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayQueue {
    entries: Vec<Episode>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Episode> {
        self.entries.iter()
    }

    pub fn contains(&self, id: &EpisodeId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: &EpisodeId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    /// Append `episode` unless an entry with the same id is already queued.
    ///
    /// Returns whether the queue changed.
    pub fn add(&mut self, episode: Episode) -> bool {
        if self.contains(&episode.id) {
            return false;
        }
        self.entries.push(episode);
        true
    }

    /// Remove every entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &EpisodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entry after `current`, wrapping to the front.
    ///
    /// A `current` that is absent or not queued counts as position -1, so the
    /// first entry is returned.
    pub fn next_after(&self, current: Option<&EpisodeId>) -> Option<&Episode> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match current.and_then(|id| self.index_of(id)) {
            Some(index) => (index + 1) % self.entries.len(),
            None => 0,
        };
        self.entries.get(next)
    }

    /// Entry before `current`, wrapping to the back.
    ///
    /// The first entry, and a `current` that is not queued, both wrap to the
    /// last entry.
    pub fn previous_before(&self, current: Option<&EpisodeId>) -> Option<&Episode> {
        let last = self.entries.len().checked_sub(1)?;
        let previous = match current.and_then(|id| self.index_of(id)) {
            Some(index) if index > 0 => index - 1,
            _ => last,
        };
        self.entries.get(previous)
    }

    /// Uniform random pick among entries `history` has not seen.
    ///
    /// When every entry has been played the history is reset and the pick is
    /// made from the whole queue.
    pub fn pick_shuffled<R: Rng + ?Sized>(
        &self,
        history: &mut PlayHistory,
        rng: &mut R,
    ) -> Option<&Episode> {
        let unplayed: Vec<&Episode> = self
            .entries
            .iter()
            .filter(|e| !history.contains(&e.id))
            .collect();

        if unplayed.is_empty() {
            history.clear();
            return self.entries.choose(rng);
        }

        unplayed.choose(rng).copied()
    }
}

/// Ids of episodes that started playing since the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayHistory {
    played: HashSet<EpisodeId>,
}

impl PlayHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: EpisodeId) {
        self.played.insert(id);
    }

    pub fn contains(&self, id: &EpisodeId) -> bool {
        self.played.contains(id)
    }

    pub fn len(&self) -> usize {
        self.played.len()
    }

    pub fn is_empty(&self) -> bool {
        self.played.is_empty()
    }

    pub fn clear(&mut self) {
        self.played.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn episode(id: &str) -> Episode {
        Episode::new(id, format!("Episode {id}"), format!("/api/audio/{id}.mp3"))
    }

    fn queue_of(ids: &[&str]) -> PlayQueue {
        let mut queue = PlayQueue::new();
        for id in ids {
            queue.add(episode(id));
        }
        queue
    }

    fn ids(queue: &PlayQueue) -> Vec<&str> {
        queue.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(!queue.add(episode("a")));
        assert!(queue.add(episode("c")));
        assert_eq!(ids(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_reports_change() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert!(queue.remove(&EpisodeId::from("b")));
        assert!(!queue.remove(&EpisodeId::from("b")));
        assert_eq!(ids(&queue), vec!["a", "c"]);
    }

    #[test]
    fn test_next_wraps_and_starts_at_front() {
        let queue = queue_of(&["a", "b", "c"]);
        let next = |current: Option<&str>| {
            let current = current.map(EpisodeId::from);
            queue.next_after(current.as_ref()).map(|e| e.id.as_str().to_string())
        };

        assert_eq!(next(Some("a")).as_deref(), Some("b"));
        assert_eq!(next(Some("c")).as_deref(), Some("a"));
        assert_eq!(next(Some("zzz")).as_deref(), Some("a"));
        assert_eq!(next(None).as_deref(), Some("a"));
    }

    #[test]
    fn test_previous_wraps_to_back() {
        let queue = queue_of(&["a", "b", "c"]);
        let prev = |current: Option<&str>| {
            let current = current.map(EpisodeId::from);
            queue
                .previous_before(current.as_ref())
                .map(|e| e.id.as_str().to_string())
        };

        assert_eq!(prev(Some("b")).as_deref(), Some("a"));
        assert_eq!(prev(Some("a")).as_deref(), Some("c"));
        assert_eq!(prev(Some("zzz")).as_deref(), Some("c"));
        assert_eq!(prev(None).as_deref(), Some("c"));
    }

    #[test]
    fn test_navigation_on_empty_queue() {
        let queue = PlayQueue::new();
        let mut history = PlayHistory::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(queue.next_after(None).is_none());
        assert!(queue.previous_before(None).is_none());
        assert!(queue.pick_shuffled(&mut history, &mut rng).is_none());
    }

    #[test]
    fn test_shuffle_only_picks_unplayed() {
        let queue = queue_of(&["a", "b", "c"]);
        let mut history = PlayHistory::new();
        history.record(EpisodeId::from("a"));
        history.record(EpisodeId::from("c"));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pick = queue.pick_shuffled(&mut history, &mut rng).unwrap();
            assert_eq!(pick.id.as_str(), "b");
        }
    }

    #[test]
    fn test_shuffle_resets_history_when_exhausted() {
        let queue = queue_of(&["a", "b"]);
        let mut history = PlayHistory::new();
        history.record(EpisodeId::from("a"));
        history.record(EpisodeId::from("b"));

        let mut rng = StdRng::seed_from_u64(3);
        let pick = queue.pick_shuffled(&mut history, &mut rng).unwrap();
        assert!(queue.contains(&pick.id));
        assert!(history.is_empty());
    }
}
