use std::fmt::{Debug, Formatter};

use crate::geometry::Geometry;
use crate::word_pool::WordPool;
use crate::{SlotId, WordId};

/// May the same word fill more than one slot in a grid?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordReuse {
    /// Only crossing letters are checked, so any two slots can repeat a word. The initial AC-3 pass
    /// still never lets a word be its own crossing partner.
    #[default]
    Allowed,

    /// Every slot in a grid must hold a different word.
    Forbidden,
}

/// Decides whether a partial assignment satisfies the puzzle's binary constraints.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyChecker<'a> {
    geometry: &'a Geometry,
    pool: &'a WordPool,
    word_reuse: WordReuse,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(geometry: &'a Geometry, pool: &'a WordPool, word_reuse: WordReuse) -> Self {
        ConsistencyChecker { geometry, pool, word_reuse }
    }

    /// Check every pair of assigned slots: crossing pairs must agree on their shared letter, and
    /// with `WordReuse::Forbidden` no two slots may hold the same word.
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        let assigned: Vec<(SlotId, WordId)> = assignment.iter().collect();

        assigned.iter().enumerate().all(|(idx, &(slot_id, word_id))| {
            assigned[idx + 1..]
                .iter()
                .all(|&(other_slot_id, other_word_id)| {
                    self.pair_consistent(slot_id, word_id, other_slot_id, other_word_id)
                })
        })
    }

    /// Would adding `word_id` in `slot_id` keep an already-consistent assignment consistent? Only
    /// pairs involving the new slot need checking.
    pub fn consistent_with(&self, assignment: &Assignment, slot_id: SlotId, word_id: WordId) -> bool {
        match self.word_reuse {
            WordReuse::Allowed => self.geometry.neighbors(slot_id).iter().all(|&neighbor| {
                assignment.get(neighbor).map_or(true, |other_word_id| {
                    self.pair_consistent(slot_id, word_id, neighbor, other_word_id)
                })
            }),
            WordReuse::Forbidden => assignment
                .iter()
                .filter(|&(other_slot_id, _)| other_slot_id != slot_id)
                .all(|(other_slot_id, other_word_id)| {
                    self.pair_consistent(slot_id, word_id, other_slot_id, other_word_id)
                }),
        }
    }

    fn pair_consistent(
        &self,
        slot_id: SlotId,
        word_id: WordId,
        other_slot_id: SlotId,
        other_word_id: WordId,
    ) -> bool {
        if self.word_reuse == WordReuse::Forbidden && word_id == other_word_id {
            return false;
        }

        match self.geometry.overlap(slot_id, other_slot_id) {
            Some(overlap) => self.pool[word_id].agrees_with(&self.pool[other_word_id], overlap),
            None => true,
        }
    }
}

/// A partial mapping from slots to words. Each successful `try_set` is recorded on a trail, so a
/// caller can take a `checkpoint` before branching and `rollback` to it on every way out.
#[derive(Clone, PartialEq, Eq)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    trail: Vec<SlotId>,
}

impl Debug for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Assignment {
    /// An empty assignment for a grid with `slot_count` slots.
    pub fn new(slot_count: usize) -> Assignment {
        Assignment { words: vec![None; slot_count], trail: Vec::with_capacity(slot_count) }
    }

    /// How many slots have a word?
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.trail.len() == self.words.len()
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    pub fn contains(&self, slot_id: SlotId) -> bool {
        self.words[slot_id].is_some()
    }

    /// Assigned (slot, word) pairs in slot id order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    /// The slots in the order they were assigned.
    pub fn assigned_slots(&self) -> &[SlotId] {
        &self.trail
    }

    /// Put `word_id` in an unassigned slot if that keeps the assignment consistent. Returns false,
    /// leaving the assignment untouched, if the slot is taken or the word conflicts.
    pub fn try_set(
        &mut self,
        checker: &ConsistencyChecker,
        slot_id: SlotId,
        word_id: WordId,
    ) -> bool {
        if self.contains(slot_id) || !checker.consistent_with(self, slot_id, word_id) {
            return false;
        }

        self.words[slot_id] = Some(word_id);
        self.trail.push(slot_id);
        true
    }

    /// Clear a slot, returning the word it held.
    pub fn unset(&mut self, slot_id: SlotId) -> Option<WordId> {
        let word_id = self.words[slot_id].take()?;
        if let Some(position) = self.trail.iter().rposition(|&assigned| assigned == slot_id) {
            self.trail.remove(position);
        }
        Some(word_id)
    }

    /// Record the current number of assigned slots.
    pub fn checkpoint(&self) -> usize {
        self.trail.len()
    }

    /// Clear every slot assigned since `checkpoint`, most recent first.
    pub fn rollback(&mut self, checkpoint: usize) {
        while self.trail.len() > checkpoint {
            if let Some(slot_id) = self.trail.pop() {
                self.words[slot_id] = None;
            }
        }
    }
}
