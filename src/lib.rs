//! A crossword-style constraint-satisfaction solver. Given an immutable puzzle [`Geometry`] and an
//! initial [`Domains`] store, we prune each slot's candidates with node consistency and AC-3, then
//! run a heuristic-guided backtracking search for a complete, crossing-consistent assignment.
//!
//! ```
//! use crossfill::{solve, Direction, Domains, Geometry, Slot, WordPool};
//!
//! let geometry = Geometry::from_slots(3, 3, vec![
//!     Slot::new(0, 0, Direction::Across, 3),
//!     Slot::new(0, 1, Direction::Down, 3),
//! ]).unwrap();
//! let domains = Domains::uniform(&geometry, WordPool::new(["cat", "ace", "dog"]));
//!
//! let solution = solve(&geometry, domains).unwrap();
//! assert_eq!(solution.word(0), "cat");
//! assert_eq!(solution.word(1), "ace");
//! ```

pub mod arc_consistency;
pub mod assignment;
pub mod backtracking_search;
pub mod domains;
pub mod errors;
pub mod geometry;
pub mod heuristics;
pub mod node_consistency;
pub mod word_pool;

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the `Geometry`'s `slots` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the `WordPool`.
pub type WordId = usize;

pub use assignment::{Assignment, ConsistencyChecker, WordReuse};
pub use backtracking_search::{solve, FillConfig, FillSuccess, Solution, Solver, Statistics};
pub use domains::Domains;
pub use errors::{DomainError, FillFailure, GeometryError};
pub use geometry::{Direction, Geometry, Overlap, Slot};
pub use heuristics::{
    DomainOrder, InputOrder, LeastConstrainingValue, MinimumRemainingValues, ValueOrdering,
    VariableOrdering,
};
pub use word_pool::{Word, WordPool};
