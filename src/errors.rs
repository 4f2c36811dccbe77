//! Error types for building puzzle inputs and for fill attempts that don't produce a solution.

use crate::geometry::Slot;
use crate::SlotId;

/// Problems with a fillable-cell mask or a caller-supplied slot list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("grid must have at least one row and one column")]
    EmptyMask,

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedMask { row: usize, expected: usize, found: usize },

    #[error("slots must have a length of at least one cell")]
    ZeroLengthSlot,

    #[error("slot {slot} extends past the edge of the grid")]
    SlotOutOfBounds { slot: Slot },

    #[error("slot {slot} appears more than once")]
    DuplicateSlot { slot: Slot },

    #[error("slots {first} and {second} share more than one cell")]
    MultipleSharedCells { first: Slot, second: Slot },

    #[error("more than two slots cover cell ({row}, {column})")]
    TooManySlotsInCell { row: usize, column: usize },
}

/// Problems with an initial domain store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("got candidates for {found} slots, expected {expected}")]
    SlotCountMismatch { expected: usize, found: usize },

    #[error("candidate \"{word}\" is not in the word pool")]
    UnknownWord { word: String },
}

/// Reasons a fill attempt can end without a solution. Only `Unsatisfiable` means the puzzle has
/// no solution; the interrupted variants say nothing either way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FillFailure {
    #[error("no assignment satisfies every crossing")]
    Unsatisfiable,

    #[error("search passed its deadline")]
    TimedOut,

    #[error("search was aborted")]
    Aborted,

    #[error("domain store covers {found} slots but the geometry has {expected}")]
    SlotCountMismatch { expected: usize, found: usize },
}

impl FillFailure {
    /// Was the search cut short rather than run to completion?
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, FillFailure::TimedOut | FillFailure::Aborted)
    }
}

/// A propagation step emptied the domain of the given slot, so the puzzle can't be filled from
/// this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainWipeout {
    pub slot_id: SlotId,
}
