//! This module implements grid filling as a backtracking search. Before searching we make the
//! domains node-consistent and then arc-consistent with AC-3, which may prove the grid unfillable
//! without trying a single word. The search itself picks slots with a `VariableOrdering`, tries
//! their candidates in the order given by a `ValueOrdering`, and only accepts a word if it agrees
//! with every crossing word already placed.
//!
//! Instead of recursing, the search keeps an explicit stack of frames (one per slot it has
//! branched on), so depth is bounded by the heap rather than the call stack. Every change to the
//! assignment or the domains is made through a trail, and each frame remembers where the trails
//! stood when it was pushed, so backing out of a branch always restores the state it started from.

use instant::{Duration, Instant};
use log::{debug, info, trace};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::arc_consistency::{ac3, ac3_with, arcs_toward, Support};
use crate::assignment::{Assignment, ConsistencyChecker, WordReuse};
use crate::domains::Domains;
use crate::errors::{DomainWipeout, FillFailure};
use crate::geometry::Geometry;
use crate::heuristics::{
    LeastConstrainingValue, MinimumRemainingValues, ValueOrdering, VariableOrdering,
};
use crate::node_consistency::enforce_node_consistency;
use crate::{SlotId, WordId, MAX_SLOT_COUNT};

/// How many times should we loop before checking whether we've passed our deadline or been asked
/// to abort?
pub const INTERRUPT_FREQUENCY: u64 = 10;

/// Settings for a fill attempt.
#[derive(Debug, Clone, Default)]
pub struct FillConfig {
    /// Whether a word may appear in more than one slot.
    pub word_reuse: WordReuse,

    /// After each tentative choice, shrink the chosen slot's domain to that word and re-run AC-3
    /// from its neighbors, undoing the eliminations when the choice is withdrawn. This prunes
    /// doomed branches earlier at the cost of more work per state, and never changes whether a
    /// fill is found.
    pub maintain_arc_consistency: bool,

    /// Give up with `FillFailure::TimedOut` once this moment has passed.
    pub deadline: Option<Instant>,

    /// Give up with `FillFailure::Aborted` once another thread sets this flag.
    pub abort: Option<Arc<AtomicBool>>,
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Slots branched on.
    pub states: u64,

    /// Candidate words tried, whether or not they were accepted.
    pub attempts: u64,

    pub backtracks: u64,

    /// Options removed by node consistency and the initial AC-3 pass.
    pub initial_eliminations: usize,

    /// Options removed while maintaining arc consistency during the search.
    pub branch_eliminations: usize,

    pub initial_propagation_time: Duration,
    pub duration: Duration,
}

/// A struct recording a slot assignment made during the filling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// A complete fill: one word per slot, indexed by slot id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    words: Vec<String>,
}

impl Solution {
    pub fn word(&self, slot_id: SlotId) -> &str {
        &self.words[slot_id]
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> {
        self.words.iter().map(String::as_str).enumerate()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub solution: Solution,

    /// The choices in the order the search made them.
    pub choices: SmallVec<[Choice; MAX_SLOT_COUNT]>,

    pub statistics: Statistics,
}

/// One slot the search has branched on.
#[derive(Debug)]
struct Frame {
    slot_id: SlotId,

    /// The slot's candidates in the order they should be tried.
    candidates: Vec<WordId>,
    next_candidate_idx: usize,

    /// Position of the domain trail before any of this slot's candidates were tried.
    domain_checkpoint: usize,
}

/// Finds a fill for one grid. Construct it with `Solver::new`, optionally swap in a config or
/// different ordering strategies, and call `find_fill`.
pub struct Solver<'a, V = MinimumRemainingValues, O = LeastConstrainingValue> {
    geometry: &'a Geometry,
    domains: Domains,
    config: FillConfig,
    variable_ordering: V,
    value_ordering: O,
}

impl<'a> Solver<'a> {
    pub fn new(geometry: &'a Geometry, domains: Domains) -> Self {
        Solver {
            geometry,
            domains,
            config: FillConfig::default(),
            variable_ordering: MinimumRemainingValues,
            value_ordering: LeastConstrainingValue,
        }
    }
}

impl<'a, V: VariableOrdering, O: ValueOrdering> Solver<'a, V, O> {
    pub fn with_config(self, config: FillConfig) -> Self {
        Solver { config, ..self }
    }

    pub fn with_variable_ordering<W: VariableOrdering>(
        self,
        variable_ordering: W,
    ) -> Solver<'a, W, O> {
        Solver {
            geometry: self.geometry,
            domains: self.domains,
            config: self.config,
            variable_ordering,
            value_ordering: self.value_ordering,
        }
    }

    pub fn with_value_ordering<P: ValueOrdering>(self, value_ordering: P) -> Solver<'a, V, P> {
        Solver {
            geometry: self.geometry,
            domains: self.domains,
            config: self.config,
            variable_ordering: self.variable_ordering,
            value_ordering,
        }
    }

    /// Search for a valid fill for the grid.
    pub fn find_fill(mut self) -> Result<FillSuccess, FillFailure> {
        let start = Instant::now();
        let slot_count = self.geometry.slot_count();

        if self.domains.slot_count() != slot_count {
            return Err(FillFailure::SlotCountMismatch {
                expected: slot_count,
                found: self.domains.slot_count(),
            });
        }

        let mut statistics = Statistics::default();

        // Prune the domains before searching. Anything eliminated here can never be part of a
        // solution, so we commit it rather than leaving it on the trail.
        let node_eliminations = match enforce_node_consistency(self.geometry, &mut self.domains) {
            Ok(eliminations) => eliminations,
            Err(DomainWipeout { slot_id }) => {
                info!(
                    "No candidates of length {} for slot {slot_id}",
                    self.geometry.slot(slot_id).length
                );
                return Err(FillFailure::Unsatisfiable);
            }
        };
        let arc_consistency = match ac3(self.geometry, &mut self.domains, None) {
            Ok(success) => success,
            Err(DomainWipeout { slot_id }) => {
                info!("Arc consistency left slot {slot_id} without candidates");
                return Err(FillFailure::Unsatisfiable);
            }
        };
        self.domains.commit();

        statistics.initial_eliminations = node_eliminations + arc_consistency.eliminations;
        statistics.initial_propagation_time = start.elapsed();
        debug!(
            "Initial propagation eliminated {} options in {:?}",
            statistics.initial_eliminations, statistics.initial_propagation_time
        );

        let result = self.search(&mut statistics);
        statistics.duration = start.elapsed();

        match result {
            Ok(assignment) => {
                info!("Found a fill: {statistics:?}");

                let pool = self.domains.pool();
                let solution = Solution {
                    words: (0..slot_count)
                        .map(|slot_id| {
                            assignment
                                .get(slot_id)
                                .map(|word_id| pool[word_id].string.clone())
                                .unwrap_or_default()
                        })
                        .collect(),
                };
                let choices = assignment
                    .assigned_slots()
                    .iter()
                    .filter_map(|&slot_id| {
                        assignment.get(slot_id).map(|word_id| Choice { slot_id, word_id })
                    })
                    .collect();

                Ok(FillSuccess { solution, choices, statistics })
            }
            Err(failure) => {
                info!("Fill failed ({failure}): {statistics:?}");
                Err(failure)
            }
        }
    }

    /// Has the caller asked us to stop?
    fn check_interrupt(&self) -> Result<(), FillFailure> {
        if let Some(deadline) = self.config.deadline {
            if Instant::now() >= deadline {
                return Err(FillFailure::TimedOut);
            }
        }
        if let Some(abort) = &self.config.abort {
            if abort.load(Ordering::Relaxed) {
                return Err(FillFailure::Aborted);
            }
        }
        Ok(())
    }

    /// Run the backtracking search over the (already pruned) domains.
    fn search(&mut self, statistics: &mut Statistics) -> Result<Assignment, FillFailure> {
        let geometry = self.geometry;
        let pool = Arc::clone(self.domains.pool());
        let checker = ConsistencyChecker::new(geometry, &pool, self.config.word_reuse);

        // Propagation inside a branch must accept whatever the checker accepts, so a word can
        // support itself across a crossing unless words may not repeat.
        let support = match self.config.word_reuse {
            WordReuse::Allowed => Support::AnyWord,
            WordReuse::Forbidden => Support::DistinctWord,
        };

        let mut assignment = Assignment::new(geometry.slot_count());
        let mut frames: Vec<Frame> = Vec::with_capacity(geometry.slot_count());
        let mut iterations: u64 = 0;

        // Pick a slot to branch on, then work through its candidates until one is accepted (and
        // we go pick the next slot) or they run out (and we withdraw the parent frame's choice).
        'slot_selection: loop {
            if assignment.is_complete() {
                return Ok(assignment);
            }

            let slot_id = match self.variable_ordering.select_unassigned_variable(
                geometry,
                &self.domains,
                &assignment,
            ) {
                Some(slot_id) => slot_id,

                // The assignment is incomplete but the strategy has nothing to offer, so there's
                // no way forward.
                None => return Err(FillFailure::Unsatisfiable),
            };

            statistics.states += 1;
            let candidates = self.value_ordering.order_domain_values(
                geometry,
                &self.domains,
                &assignment,
                slot_id,
            );
            trace!(
                "Branching on slot {slot_id} with {} candidates at depth {}",
                candidates.len(),
                frames.len()
            );

            frames.push(Frame {
                slot_id,
                candidates,
                next_candidate_idx: 0,
                domain_checkpoint: self.domains.checkpoint(),
            });

            'option_selection: loop {
                if iterations % INTERRUPT_FREQUENCY == 0 {
                    self.check_interrupt()?;
                }
                iterations += 1;

                let (choice, domain_checkpoint) = match frames.last_mut() {
                    Some(frame) => {
                        let choice = frame
                            .candidates
                            .get(frame.next_candidate_idx)
                            .map(|&word_id| Choice { slot_id: frame.slot_id, word_id });
                        frame.next_candidate_idx += 1;
                        (choice, frame.domain_checkpoint)
                    }

                    // We've backtracked out of the root frame, so every possibility is exhausted.
                    None => return Err(FillFailure::Unsatisfiable),
                };

                // If this frame is out of candidates, drop it and withdraw the parent's choice so
                // that the parent moves on to its next candidate.
                let Some(choice) = choice else {
                    frames.pop();
                    statistics.backtracks += 1;
                    if let Some(parent) = frames.last() {
                        assignment.unset(parent.slot_id);
                        self.domains.rollback(parent.domain_checkpoint);
                    }
                    continue 'option_selection;
                };

                statistics.attempts += 1;

                if !assignment.try_set(&checker, choice.slot_id, choice.word_id) {
                    continue 'option_selection;
                }

                if self.config.maintain_arc_consistency {
                    let restricted = self.domains.restrict_to(choice.slot_id, choice.word_id);
                    let arcs = arcs_toward(geometry, choice.slot_id);
                    match ac3_with(geometry, &mut self.domains, Some(arcs), support) {
                        Ok(success) => {
                            statistics.branch_eliminations += restricted + success.eliminations;
                        }
                        Err(DomainWipeout { slot_id: emptied_slot_id }) => {
                            trace!(
                                "Choosing word {} for slot {} empties slot {emptied_slot_id}",
                                choice.word_id,
                                choice.slot_id
                            );
                            assignment.unset(choice.slot_id);
                            self.domains.rollback(domain_checkpoint);
                            continue 'option_selection;
                        }
                    }
                }

                continue 'slot_selection;
            }
        }
    }
}

/// Fill the grid with the default strategies and settings, or return `None` if it can't be done.
pub fn solve(geometry: &Geometry, domains: Domains) -> Option<Solution> {
    Solver::new(geometry, domains).find_fill().ok().map(|success| success.solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction::Across;
    use crate::geometry::Slot;
    use crate::heuristics::{DomainOrder, InputOrder};
    use crate::word_pool::WordPool;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// ___
    /// _#_
    /// ___
    fn ring_geometry() -> Geometry {
        Geometry::from_mask(&[
            vec![true, true, true],
            vec![true, false, true],
            vec![true, true, true],
        ])
        .unwrap()
    }

    fn ring_words() -> WordPool {
        WordPool::new(["cab", "bee", "cot", "ten", "tab", "bet", "net", "tee", "ace"])
    }

    fn assert_valid_fill(geometry: &Geometry, solution: &Solution) {
        assert_eq!(solution.len(), geometry.slot_count());
        for (slot_id, word) in solution.iter() {
            assert_eq!(word.chars().count(), geometry.slot(slot_id).length);
            for &neighbor in geometry.neighbors(slot_id) {
                let overlap = geometry.overlap(slot_id, neighbor).unwrap();
                assert_eq!(
                    word.chars().nth(overlap.cell),
                    solution.word(neighbor).chars().nth(overlap.other_cell),
                    "slots {slot_id} and {neighbor} disagree"
                );
            }
        }
    }

    #[test]
    fn test_fill_ring() {
        init_logger();
        let geometry = ring_geometry();

        let result = Solver::new(&geometry, Domains::uniform(&geometry, ring_words()))
            .find_fill()
            .expect("Failed to find a fill");

        println!("{:?}", result.statistics);
        assert_valid_fill(&geometry, &result.solution);
        assert_eq!(result.choices.len(), 4);
    }

    #[test]
    fn test_strategies_and_mac_agree_on_fillability() {
        init_logger();
        let geometry = ring_geometry();

        let configs = [
            FillConfig::default(),
            FillConfig { maintain_arc_consistency: true, ..FillConfig::default() },
            FillConfig { word_reuse: WordReuse::Forbidden, ..FillConfig::default() },
        ];

        for config in configs {
            let solution = Solver::new(&geometry, Domains::uniform(&geometry, ring_words()))
                .with_config(config.clone())
                .with_variable_ordering(InputOrder)
                .with_value_ordering(DomainOrder)
                .find_fill()
                .expect("Failed to find a fill")
                .solution;
            assert_valid_fill(&geometry, &solution);

            let solution = Solver::new(&geometry, Domains::uniform(&geometry, ring_words()))
                .with_config(config)
                .find_fill()
                .expect("Failed to find a fill")
                .solution;
            assert_valid_fill(&geometry, &solution);
        }
    }

    #[test]
    fn test_forbidden_reuse_needs_distinct_words() {
        let geometry = Geometry::from_slots(
            3,
            3,
            vec![Slot::new(0, 0, Across, 3), Slot::new(2, 0, Across, 3)],
        )
        .unwrap();
        let forbidden = FillConfig { word_reuse: WordReuse::Forbidden, ..FillConfig::default() };

        let solution = solve(&geometry, Domains::uniform(&geometry, WordPool::new(["cat"])))
            .expect("Failed to find a fill");
        assert_eq!(solution.words(), &["cat".to_string(), "cat".to_string()]);

        let failure = Solver::new(&geometry, Domains::uniform(&geometry, WordPool::new(["cat"])))
            .with_config(forbidden.clone())
            .find_fill()
            .unwrap_err();
        assert_eq!(failure, FillFailure::Unsatisfiable);

        let solution = Solver::new(
            &geometry,
            Domains::uniform(&geometry, WordPool::new(["cat", "dog"])),
        )
        .with_config(forbidden)
        .find_fill()
        .expect("Failed to find a fill")
        .solution;
        assert_ne!(solution.word(0), solution.word(1));
    }

    #[test]
    fn test_fill_fails_gracefully() {
        let geometry = ring_geometry();
        // Every word ends in 't' but nothing starts with it, so the corners can't work.
        let domains = Domains::uniform(&geometry, WordPool::new(["cat", "bat", "cot", "act"]));

        assert_eq!(
            Solver::new(&geometry, domains).find_fill().unwrap_err(),
            FillFailure::Unsatisfiable
        );
    }

    #[test]
    fn test_search_exhausts_when_propagation_is_not_enough() {
        init_logger();
        let geometry = ring_geometry();
        let candidates = || {
            vec![
                vec!["acb", "bca"],
                vec!["aba", "bbc"],
                vec!["bca", "acb"],
                vec!["abb", "bca", "caa"],
            ]
        };
        let pool = Arc::new(WordPool::new(["aba", "abb", "acb", "bbc", "bca", "caa"]));

        // Every arc has support, but whichever word goes across the top, the bottom slot ends up
        // needing a word that isn't available.
        let mut domains = Domains::with_candidates(&geometry, pool.clone(), candidates()).unwrap();
        assert!(ac3(&geometry, &mut domains, None).is_ok());

        for maintain_arc_consistency in [false, true] {
            let domains = Domains::with_candidates(&geometry, pool.clone(), candidates()).unwrap();
            let result = Solver::new(&geometry, domains)
                .with_config(FillConfig { maintain_arc_consistency, ..FillConfig::default() })
                .find_fill();
            assert_eq!(result.unwrap_err(), FillFailure::Unsatisfiable);
        }
    }

    #[test]
    fn test_abort_flag_interrupts_search() {
        let geometry = ring_geometry();
        let abort = Arc::new(AtomicBool::new(true));

        let result = Solver::new(&geometry, Domains::uniform(&geometry, ring_words()))
            .with_config(FillConfig { abort: Some(abort), ..FillConfig::default() })
            .find_fill();

        assert_eq!(result.unwrap_err(), FillFailure::Aborted);
    }

    #[test]
    fn test_deadline_interrupts_search() {
        let geometry = ring_geometry();

        let failure = Solver::new(&geometry, Domains::uniform(&geometry, ring_words()))
            .with_config(FillConfig { deadline: Some(Instant::now()), ..FillConfig::default() })
            .find_fill()
            .unwrap_err();

        assert_eq!(failure, FillFailure::TimedOut);
        assert!(failure.is_interrupted());
    }

    #[test]
    fn test_mismatched_domains_are_rejected() {
        let geometry = ring_geometry();
        let other_geometry =
            Geometry::from_slots(1, 3, vec![Slot::new(0, 0, Across, 3)]).unwrap();

        let failure = Solver::new(&geometry, Domains::uniform(&other_geometry, ring_words()))
            .find_fill()
            .unwrap_err();

        assert_eq!(failure, FillFailure::SlotCountMismatch { expected: 4, found: 1 });
    }

    #[test]
    fn test_empty_geometry_is_trivially_filled() {
        let geometry = Geometry::from_mask(&[vec![false, false]]).unwrap();

        let solution = solve(&geometry, Domains::uniform(&geometry, WordPool::new(["ox"])));
        assert_eq!(solution.map(|solution| solution.is_empty()), Some(true));
    }

    /// __
    /// __
    /// _#
    #[test]
    fn test_mac_matches_baseline_when_crossing_slots_share_a_word() {
        init_logger();
        let geometry =
            Geometry::from_mask(&[vec![true, true], vec![true, true], vec![true, false]]).unwrap();
        let pool = Arc::new(WordPool::new(["ba", "ab", "aa", "abb", "baa"]));

        // Every fill repeats a two-letter word across a crossing.
        for maintain_arc_consistency in [false, true] {
            let result = Solver::new(&geometry, Domains::uniform(&geometry, pool.clone()))
                .with_config(FillConfig { maintain_arc_consistency, ..FillConfig::default() })
                .find_fill()
                .expect("Failed to find a fill");

            println!("{:?}", result.statistics);
            assert_valid_fill(&geometry, &result.solution);

            let failure = Solver::new(&geometry, Domains::uniform(&geometry, pool.clone()))
                .with_config(FillConfig {
                    word_reuse: WordReuse::Forbidden,
                    maintain_arc_consistency,
                    ..FillConfig::default()
                })
                .find_fill()
                .unwrap_err();
            assert_eq!(failure, FillFailure::Unsatisfiable);
        }
    }

    #[test]
    fn test_mac_agrees_with_baseline_on_random_grids() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);

        for _ in 0..5_000 {
            let height = rng.usize(2..=3);
            let width = rng.usize(2..=3);
            let mut mask = Vec::with_capacity(height);
            for _ in 0..height {
                let mut row = Vec::with_capacity(width);
                for _ in 0..width {
                    row.push(rng.u8(0..3) != 0);
                }
                mask.push(row);
            }
            let geometry = Geometry::from_mask(&mask).unwrap();

            let mut words = Vec::new();
            for _ in 0..rng.usize(1..=6) {
                let mut word = String::new();
                for _ in 0..rng.usize(2..=3) {
                    word.push(if rng.bool() { 'a' } else { 'b' });
                }
                words.push(word);
            }
            let pool = Arc::new(WordPool::new(words.iter().map(String::as_str)));

            for word_reuse in [WordReuse::Allowed, WordReuse::Forbidden] {
                let mut outcomes = Vec::new();
                for maintain_arc_consistency in [false, true] {
                    let result = Solver::new(&geometry, Domains::uniform(&geometry, pool.clone()))
                        .with_config(FillConfig {
                            word_reuse,
                            maintain_arc_consistency,
                            ..FillConfig::default()
                        })
                        .find_fill();
                    if let Ok(success) = &result {
                        assert_valid_fill(&geometry, &success.solution);
                    }
                    outcomes.push(result.is_ok());
                }
                assert_eq!(outcomes[0], outcomes[1], "{mask:?} {words:?} {word_reuse:?}");
            }
        }
    }
}
