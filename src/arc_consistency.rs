//! This module contains a crossword-specific implementation of the AC-3 algorithm. For our
//! purposes, an arc (x, y) is consistent when every remaining option for slot x has at least one
//! *different* remaining option in slot y that puts the same letter in their shared cell. We keep
//! revising arcs until no more eliminations are possible or some slot runs out of options.
//! Propagation during search can relax "different" to any agreeing option (see `Support`).

use bit_set::BitSet;
use log::{debug, trace};
use std::collections::VecDeque;

use crate::domains::Domains;
use crate::errors::DomainWipeout;
use crate::geometry::Geometry;
use crate::{SlotId, WordId};

/// Result from a successful call to `ac3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArcConsistencySuccess {
    /// How many arcs were revised (popped from the queue).
    pub revisions: usize,

    /// How many options were removed across all slots.
    pub eliminations: usize,
}

/// Result from a call to `ac3`. The error names the slot whose options ran out.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, DomainWipeout>;

/// FIFO of arcs waiting to be revised. An arc that's already waiting isn't added a second time,
/// since revising it once will account for every change made before it's popped.
#[derive(Debug)]
struct ConsistencyQueue {
    queue: VecDeque<(SlotId, SlotId)>,
    pending: BitSet,
    slot_count: usize,
}

impl ConsistencyQueue {
    fn new(slot_count: usize) -> ConsistencyQueue {
        ConsistencyQueue {
            queue: VecDeque::new(),
            pending: BitSet::with_capacity(slot_count * slot_count),
            slot_count,
        }
    }

    fn with_initial_queue<Items>(slot_count: usize, items: Items) -> ConsistencyQueue
    where
        Items: IntoIterator<Item = (SlotId, SlotId)>,
    {
        let mut queue = ConsistencyQueue::new(slot_count);
        for (x, y) in items {
            queue.enqueue(x, y);
        }
        queue
    }

    fn pop_front(&mut self) -> Option<(SlotId, SlotId)> {
        let arc = self.queue.pop_front()?;
        self.pending.remove(arc.0 * self.slot_count + arc.1);
        Some(arc)
    }

    fn enqueue(&mut self, x: SlotId, y: SlotId) {
        if self.pending.insert(x * self.slot_count + y) {
            self.queue.push_back((x, y));
        }
    }
}

/// Which of a neighbor's options may support an option across their crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Support {
    /// A different word with the right letter. This is the rule for the initial pass.
    #[default]
    DistinctWord,

    /// Any word with the right letter, including the option itself. Propagation during search uses
    /// this when words may repeat, so that it never prunes a fill the consistency check accepts.
    AnyWord,
}

/// Make slot `x` arc-consistent with slot `y`: remove each option for `x` that has no distinct
/// partner among `y`'s options agreeing on the shared cell. When the slots don't cross, any
/// distinct partner will do. Returns true iff `x` lost any options.
///
/// `domains` must have been built for `geometry`.
pub fn revise(geometry: &Geometry, domains: &mut Domains, x: SlotId, y: SlotId) -> bool {
    revise_with(geometry, domains, x, y, Support::DistinctWord)
}

/// Like `revise`, but with the given rule for which of `y`'s options count as support.
///
/// `domains` must have been built for `geometry`.
pub fn revise_with(
    geometry: &Geometry,
    domains: &mut Domains,
    x: SlotId,
    y: SlotId,
    support: Support,
) -> bool {
    debug_assert_eq!(domains.slot_count(), geometry.slot_count());

    let pool = domains.pool().clone();
    let partner_count = domains.len(y);

    let doomed: Vec<WordId> = match geometry.overlap(x, y) {
        Some(overlap) => {
            // Count how many of y's options put each letter in the crossing cell, so that each
            // of x's options can be checked without scanning y again.
            let letter_counts = domains.letter_counts(y, overlap.other_cell);

            domains
                .options(x)
                .filter(|&word_id| {
                    let word = &pool[word_id];
                    let Some(letter) = word.chars.get(overlap.cell) else {
                        return true;
                    };
                    let matching = letter_counts.get(letter).copied().unwrap_or(0);

                    // Under the distinct rule the word can't support itself, so discount it if
                    // it's one of the matches.
                    let self_match = support == Support::DistinctWord
                        && domains.contains(y, word_id)
                        && word.agrees_with(word, overlap.reversed());
                    matching <= usize::from(self_match)
                })
                .collect()
        }
        None => domains
            .options(x)
            .filter(|&word_id| {
                let self_match = support == Support::DistinctWord && domains.contains(y, word_id);
                partner_count <= usize::from(self_match)
            })
            .collect(),
    };

    for &word_id in &doomed {
        domains.remove(x, word_id);
    }

    if !doomed.is_empty() {
        trace!("Revising ({x}, {y}) eliminated {} options", doomed.len());
    }

    !doomed.is_empty()
}

/// Establish arc consistency with a queue-driven AC-3 pass. `arcs` is the initial queue; `None`
/// means every arc in the grid. Whenever revising (x, y) shrinks x, each arc (z, x) for the other
/// neighbors z of x is queued again. We stop as soon as any slot is left without options.
///
/// `domains` must have been built for `geometry`.
pub fn ac3(
    geometry: &Geometry,
    domains: &mut Domains,
    arcs: Option<Vec<(SlotId, SlotId)>>,
) -> ArcConsistencyResult {
    ac3_with(geometry, domains, arcs, Support::DistinctWord)
}

/// Like `ac3`, revising every arc with the given support rule.
///
/// `domains` must have been built for `geometry`.
pub fn ac3_with(
    geometry: &Geometry,
    domains: &mut Domains,
    arcs: Option<Vec<(SlotId, SlotId)>>,
    support: Support,
) -> ArcConsistencyResult {
    debug_assert_eq!(domains.slot_count(), geometry.slot_count());

    let slot_count = geometry.slot_count();
    let mut queue = match arcs {
        Some(arcs) => ConsistencyQueue::with_initial_queue(slot_count, arcs),
        None => ConsistencyQueue::with_initial_queue(slot_count, geometry.arcs()),
    };

    let mut success = ArcConsistencySuccess::default();
    let starting_option_count: usize = (0..slot_count).map(|slot_id| domains.len(slot_id)).sum();

    while let Some((x, y)) = queue.pop_front() {
        success.revisions += 1;

        if !revise_with(geometry, domains, x, y, support) {
            continue;
        }

        if domains.is_empty(x) {
            debug!("AC-3 emptied slot {x} after {} revisions", success.revisions);
            return Err(DomainWipeout { slot_id: x });
        }

        for &z in geometry.neighbors(x) {
            if z != y {
                queue.enqueue(z, x);
            }
        }
    }

    let remaining_option_count: usize =
        (0..slot_count).map(|slot_id| domains.len(slot_id)).sum();
    success.eliminations = starting_option_count - remaining_option_count;

    debug!(
        "AC-3 converged after {} revisions with {} eliminations",
        success.revisions, success.eliminations
    );

    Ok(success)
}

/// The arcs pointing into `slot_id` from each of its neighbors, which are the ones that need
/// revisiting after the slot's options change.
pub fn arcs_toward(geometry: &Geometry, slot_id: SlotId) -> Vec<(SlotId, SlotId)> {
    geometry.neighbors(slot_id).iter().map(|&neighbor| (neighbor, slot_id)).collect()
}
