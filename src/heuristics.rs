//! Strategies for choosing which slot the search fills next and in what order it tries words.
//! The defaults are minimum-remaining-values with a degree tie-break and least-constraining
//! value; the plain orderings exist for testing and comparison.

use std::cmp::Reverse;

use crate::assignment::Assignment;
use crate::domains::Domains;
use crate::geometry::Geometry;
use crate::{SlotId, WordId};

/// Picks the next slot to fill.
pub trait VariableOrdering {
    /// Return an unassigned slot, or `None` if the assignment is complete.
    fn select_unassigned_variable(
        &self,
        geometry: &Geometry,
        domains: &Domains,
        assignment: &Assignment,
    ) -> Option<SlotId>;
}

/// Orders the candidates for a slot.
pub trait ValueOrdering {
    /// Return a permutation of the slot's remaining candidates, in the order they should be
    /// tried. Slots that are already assigned get an empty list.
    fn order_domain_values(
        &self,
        geometry: &Geometry,
        domains: &Domains,
        assignment: &Assignment,
        slot_id: SlotId,
    ) -> Vec<WordId>;
}

/// Choose the unassigned slot with the fewest remaining candidates. Ties go to the slot crossing
/// the most other slots, and then to the lowest slot id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumRemainingValues;

impl VariableOrdering for MinimumRemainingValues {
    fn select_unassigned_variable(
        &self,
        geometry: &Geometry,
        domains: &Domains,
        assignment: &Assignment,
    ) -> Option<SlotId> {
        // `min_by_key` keeps the first of several equal minimums, which gives us the id tie-break.
        (0..geometry.slot_count())
            .filter(|&slot_id| !assignment.contains(slot_id))
            .min_by_key(|&slot_id| (domains.len(slot_id), Reverse(geometry.degree(slot_id))))
    }
}

/// Choose the unassigned slot with the lowest id.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl VariableOrdering for InputOrder {
    fn select_unassigned_variable(
        &self,
        geometry: &Geometry,
        _domains: &Domains,
        assignment: &Assignment,
    ) -> Option<SlotId> {
        (0..geometry.slot_count()).find(|&slot_id| !assignment.contains(slot_id))
    }
}

/// Try first the words that rule out the fewest candidates in crossing slots. A candidate's cost
/// is the number of (neighbor, neighbor candidate) pairs that disagree with it on the crossing
/// letter. The sort is stable, so words with equal cost stay in id order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastConstrainingValue;

impl ValueOrdering for LeastConstrainingValue {
    fn order_domain_values(
        &self,
        geometry: &Geometry,
        domains: &Domains,
        assignment: &Assignment,
        slot_id: SlotId,
    ) -> Vec<WordId> {
        if assignment.contains(slot_id) {
            return vec![];
        }

        let pool = domains.pool();

        // For each crossing, how many of the neighbor's candidates put each letter in the shared
        // cell? Anything that doesn't match this word's letter there is ruled out by it.
        let crossings: Vec<_> = geometry
            .neighbors(slot_id)
            .iter()
            .filter_map(|&neighbor| {
                let overlap = geometry.overlap(slot_id, neighbor)?;
                Some((
                    overlap.cell,
                    domains.len(neighbor),
                    domains.letter_counts(neighbor, overlap.other_cell),
                ))
            })
            .collect();

        let mut scored_options: Vec<(usize, WordId)> = domains
            .options(slot_id)
            .map(|word_id| {
                let word = &pool[word_id];
                let ruled_out: usize = crossings
                    .iter()
                    .map(|(cell_idx, neighbor_option_count, letter_counts)| {
                        let compatible = word
                            .chars
                            .get(*cell_idx)
                            .and_then(|letter| letter_counts.get(letter))
                            .copied()
                            .unwrap_or(0);
                        neighbor_option_count - compatible
                    })
                    .sum();
                (ruled_out, word_id)
            })
            .collect();

        scored_options.sort_by_key(|&(ruled_out, _)| ruled_out);
        scored_options.into_iter().map(|(_, word_id)| word_id).collect()
    }
}

/// Try a slot's candidates in id order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainOrder;

impl ValueOrdering for DomainOrder {
    fn order_domain_values(
        &self,
        _geometry: &Geometry,
        domains: &Domains,
        assignment: &Assignment,
        slot_id: SlotId,
    ) -> Vec<WordId> {
        if assignment.contains(slot_id) {
            return vec![];
        }
        domains.options(slot_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{ConsistencyChecker, WordReuse};
    use crate::geometry::Direction::{Across, Down};
    use crate::geometry::Slot;
    use crate::word_pool::WordPool;

    /// Slot 0 across the top, slot 1 down from its middle cell, slot 2 a lone across entry at the
    /// bottom, slot 3 a short down entry from slot 0's last cell.
    fn geometry() -> Geometry {
        Geometry::from_slots(
            5,
            5,
            vec![
                Slot::new(0, 0, Across, 3),
                Slot::new(0, 1, Down, 3),
                Slot::new(4, 0, Across, 5),
                Slot::new(0, 2, Down, 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mrv_prefers_smallest_domain() {
        let geometry = geometry();
        let domains = Domains::with_candidates(
            &geometry,
            WordPool::new(["cat", "ace", "ox", "hello", "to"]),
            vec![vec!["cat", "ace"], vec!["cat", "ace"], vec!["hello"], vec!["ox", "to"]],
        )
        .unwrap();

        let assignment = Assignment::new(4);
        assert_eq!(
            MinimumRemainingValues.select_unassigned_variable(&geometry, &domains, &assignment),
            Some(2)
        );
    }

    #[test]
    fn test_mrv_breaks_ties_by_degree_then_id() {
        let geometry = geometry();
        let domains = Domains::with_candidates(
            &geometry,
            WordPool::new(["cat", "ace", "hello", "world", "ox", "to"]),
            vec![vec!["cat", "ace"], vec!["cat", "ace"], vec!["hello", "world"], vec!["ox", "to"]],
        )
        .unwrap();
        let pool = domains.pool().clone();
        let checker = ConsistencyChecker::new(&geometry, &pool, WordReuse::Allowed);
        let mut assignment = Assignment::new(4);

        // Slot 0 crosses two slots; everything else crosses at most one.
        assert_eq!(
            MinimumRemainingValues.select_unassigned_variable(&geometry, &domains, &assignment),
            Some(0)
        );

        // With slot 0 gone, slots 1 and 3 (degree 1) beat slot 2 (degree 0), and 1 has the lower id.
        assert!(assignment.try_set(&checker, 0, 0));
        assert_eq!(
            MinimumRemainingValues.select_unassigned_variable(&geometry, &domains, &assignment),
            Some(1)
        );

        assert!(assignment.try_set(&checker, 1, 1));
        assert!(assignment.try_set(&checker, 3, 5));
        assert_eq!(
            MinimumRemainingValues.select_unassigned_variable(&geometry, &domains, &assignment),
            Some(2)
        );

        assert!(assignment.try_set(&checker, 2, 2));
        assert_eq!(
            MinimumRemainingValues.select_unassigned_variable(&geometry, &domains, &assignment),
            None
        );
    }

    #[test]
    fn test_input_order_skips_assigned_slots() {
        let geometry = geometry();
        let domains = Domains::uniform(&geometry, WordPool::new(["cat"]));
        let pool = domains.pool().clone();
        let checker = ConsistencyChecker::new(&geometry, &pool, WordReuse::Allowed);
        let mut assignment = Assignment::new(4);

        assert_eq!(InputOrder.select_unassigned_variable(&geometry, &domains, &assignment), Some(0));
        assert!(assignment.try_set(&checker, 0, 0));
        assert_eq!(InputOrder.select_unassigned_variable(&geometry, &domains, &assignment), Some(1));
    }

    #[test]
    fn test_lcv_orders_by_eliminations() {
        let geometry = geometry();
        let domains = Domains::with_candidates(
            &geometry,
            WordPool::new(["tax", "cat", "bat", "ace", "aim", "ice", "xi", "to", "ta", "hello"]),
            vec![
                vec!["tax", "cat", "bat"],
                vec!["ace", "aim", "ice"],
                vec!["hello"],
                vec!["xi", "to", "ta"],
            ],
        )
        .unwrap();
        let assignment = Assignment::new(4);

        // tax: 'a' rules out ice (1), 'x' rules out to, ta (2) => 3
        // cat: 'a' rules out ice (1), 't' rules out xi (1)     => 2
        // bat: 'a' rules out ice (1), 't' rules out xi (1)     => 2
        let ordered =
            LeastConstrainingValue.order_domain_values(&geometry, &domains, &assignment, 0);
        let words: Vec<&str> =
            ordered.iter().map(|&word_id| domains.pool()[word_id].string.as_str()).collect();
        assert_eq!(words, vec!["cat", "bat", "tax"]);
    }

    #[test]
    fn test_lcv_returns_a_permutation() {
        let geometry = geometry();
        let domains = Domains::uniform(
            &geometry,
            WordPool::new(["tax", "cat", "bat", "ace", "aim", "ice", "xi", "to", "ta", "hello"]),
        );
        let assignment = Assignment::new(4);

        for slot_id in 0..geometry.slot_count() {
            let mut ordered =
                LeastConstrainingValue.order_domain_values(&geometry, &domains, &assignment, slot_id);
            ordered.sort_unstable();
            assert_eq!(ordered, domains.options(slot_id).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_orderings_skip_assigned_slots() {
        let geometry = geometry();
        let domains = Domains::uniform(&geometry, WordPool::new(["cat", "ace"]));
        let pool = domains.pool().clone();
        let checker = ConsistencyChecker::new(&geometry, &pool, WordReuse::Allowed);
        let mut assignment = Assignment::new(4);
        assert!(assignment.try_set(&checker, 0, 0));

        assert!(LeastConstrainingValue
            .order_domain_values(&geometry, &domains, &assignment, 0)
            .is_empty());
        assert!(DomainOrder.order_domain_values(&geometry, &domains, &assignment, 0).is_empty());
        assert_eq!(DomainOrder.order_domain_values(&geometry, &domains, &assignment, 1), vec![0, 1]);
    }
}
