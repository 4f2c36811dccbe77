use bit_set::BitSet;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::errors::{DomainError, DomainWipeout};
use crate::geometry::Geometry;
use crate::word_pool::WordPool;
use crate::{SlotId, WordId};

/// The candidate words still available for each slot, as sets of ids into a shared `WordPool`.
///
/// Domains only ever shrink through `remove`/`restrict_to`. Every removal is recorded in a trail
/// so that a search branch can take a `checkpoint` and later `rollback` its own eliminations;
/// `commit` discards the trail once eliminations should become permanent.
#[derive(Clone)]
pub struct Domains {
    pool: Arc<WordPool>,
    candidates: Vec<BitSet>,

    /// Cached `candidates[slot_id].len()`, since counting the bits is linear in the pool size.
    remaining_option_counts: Vec<usize>,

    /// Eliminations made since the last `commit`, oldest first.
    trail: Vec<(SlotId, WordId)>,
}

impl Debug for Domains {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domains")
            .field("pool", &self.pool)
            .field("remaining_option_counts", &self.remaining_option_counts)
            .field("trail", &format!("({} entries)", self.trail.len()))
            .finish()
    }
}

impl Domains {
    /// Give every slot in the geometry the whole pool as its initial domain.
    pub fn uniform(geometry: &Geometry, pool: impl Into<Arc<WordPool>>) -> Domains {
        let pool = pool.into();
        let mut all_words = BitSet::with_capacity(pool.len());
        for word_id in 0..pool.len() {
            all_words.insert(word_id);
        }

        Domains {
            remaining_option_counts: vec![pool.len(); geometry.slot_count()],
            candidates: vec![all_words; geometry.slot_count()],
            trail: vec![],
            pool,
        }
    }

    /// Give each slot its own initial candidates, listed in slot id order. Every candidate must
    /// already be in the pool.
    pub fn with_candidates<I, C, S>(
        geometry: &Geometry,
        pool: impl Into<Arc<WordPool>>,
        candidates_by_slot: I,
    ) -> Result<Domains, DomainError>
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pool = pool.into();

        let mut candidates: Vec<BitSet> = vec![];
        for slot_candidates in candidates_by_slot {
            let mut word_ids = BitSet::with_capacity(pool.len());
            for word in slot_candidates {
                let word = word.as_ref();
                let word_id = pool
                    .id_of(word)
                    .ok_or_else(|| DomainError::UnknownWord { word: word.to_string() })?;
                word_ids.insert(word_id);
            }
            candidates.push(word_ids);
        }

        if candidates.len() != geometry.slot_count() {
            return Err(DomainError::SlotCountMismatch {
                expected: geometry.slot_count(),
                found: candidates.len(),
            });
        }

        Ok(Domains {
            remaining_option_counts: candidates.iter().map(BitSet::len).collect(),
            candidates,
            trail: vec![],
            pool,
        })
    }

    pub fn pool(&self) -> &Arc<WordPool> {
        &self.pool
    }

    pub fn slot_count(&self) -> usize {
        self.candidates.len()
    }

    /// How many candidates are left for this slot?
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.remaining_option_counts[slot_id]
    }

    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.remaining_option_counts[slot_id] == 0
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.candidates[slot_id].contains(word_id)
    }

    /// The remaining candidates for a slot, in ascending id order.
    pub fn options(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        self.candidates[slot_id].iter()
    }

    /// The remaining candidates for a slot as strings, in ascending id order.
    pub fn words(&self, slot_id: SlotId) -> impl Iterator<Item = &str> + '_ {
        self.options(slot_id).map(move |word_id| self.pool[word_id].string.as_str())
    }

    /// How many of the slot's candidates put each letter in the given cell? Candidates too short
    /// to reach the cell aren't counted.
    pub fn letter_counts(&self, slot_id: SlotId, cell_idx: usize) -> HashMap<char, usize> {
        let mut counts: HashMap<char, usize> = HashMap::new();
        for word_id in self.options(slot_id) {
            if let Some(&letter) = self.pool[word_id].chars.get(cell_idx) {
                *counts.entry(letter).or_insert(0) += 1;
            }
        }
        counts
    }

    /// The first slot with no candidates left, if any.
    pub fn first_empty_slot(&self) -> Option<SlotId> {
        self.remaining_option_counts.iter().position(|&count| count == 0)
    }

    /// Fail with the first slot that has no candidates left, if any.
    pub fn check_nonempty(&self) -> Result<(), DomainWipeout> {
        match self.first_empty_slot() {
            Some(slot_id) => Err(DomainWipeout { slot_id }),
            None => Ok(()),
        }
    }

    /// Eliminate a candidate from a slot. Returns false if it was already gone.
    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        if !self.candidates[slot_id].remove(word_id) {
            return false;
        }
        self.remaining_option_counts[slot_id] -= 1;
        self.trail.push((slot_id, word_id));
        true
    }

    /// Eliminate every candidate for the slot except `word_id`, returning how many were removed.
    pub fn restrict_to(&mut self, slot_id: SlotId, word_id: WordId) -> usize {
        let doomed: Vec<WordId> =
            self.options(slot_id).filter(|&option| option != word_id).collect();
        for &option in &doomed {
            self.remove(slot_id, option);
        }
        doomed.len()
    }

    /// Record the current position in the trail.
    pub fn checkpoint(&self) -> usize {
        self.trail.len()
    }

    /// Restore every candidate eliminated since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        while self.trail.len() > checkpoint {
            if let Some((slot_id, word_id)) = self.trail.pop() {
                self.candidates[slot_id].insert(word_id);
                self.remaining_option_counts[slot_id] += 1;
            }
        }
    }

    /// Make every elimination so far permanent by forgetting the trail.
    pub fn commit(&mut self) {
        self.trail.clear();
    }
}
