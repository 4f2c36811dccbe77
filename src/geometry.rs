use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use crate::errors::GeometryError;
use crate::{SlotId, MAX_SLOT_LENGTH};

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A run of cells that needs to hold a single word. Two slots are the same slot iff all four
/// fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub row: usize,
    pub column: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Slot {
    pub fn new(row: usize, column: usize, direction: Direction, length: usize) -> Slot {
        Slot { row, column, direction, length }
    }

    /// Generate the coords for each cell of this slot, stopping early if a coordinate would not fit
    /// in a `usize`.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map_while(move |cell_idx| self.offset_cell(cell_idx))
    }

    /// The coords of the cell `cell_idx` steps from the start, if they fit in a `usize`.
    fn offset_cell(&self, cell_idx: usize) -> Option<GridCoord> {
        match self.direction {
            Direction::Across => Some((self.row, self.column.checked_add(cell_idx)?)),
            Direction::Down => Some((self.row.checked_add(cell_idx)?, self.column)),
        }
    }

    /// The coords of the last cell in the slot. Only meaningful for slots with a nonzero length.
    fn end_cell(&self) -> Option<GridCoord> {
        self.offset_cell(self.length.saturating_sub(1))
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) {} x{}", self.row, self.column, self.direction, self.length)
    }
}

/// A crossing between two slots: the letter at `cell` in the first slot must equal the letter at
/// `other_cell` in the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Overlap {
    pub cell: usize,
    pub other_cell: usize,
}

impl Overlap {
    /// The same crossing, seen from the other slot.
    #[must_use]
    pub fn reversed(self) -> Overlap {
        Overlap { cell: self.other_cell, other_cell: self.cell }
    }
}

/// The immutable shape of a puzzle: its dimensions, which cells are fillable, the slots, and the
/// precomputed overlap for every pair of slots.
pub struct Geometry {
    height: usize,
    width: usize,
    mask: Vec<Vec<bool>>,
    slots: Vec<Slot>,

    /// Flattened `slot_count * slot_count` matrix; entry `x * slot_count + y` describes how slot
    /// `x` crosses slot `y`.
    overlaps: Vec<Option<Overlap>>,

    /// For each slot, the ids of the slots crossing it, in ascending order.
    neighbors: Vec<SmallVec<[SlotId; MAX_SLOT_LENGTH]>>,
}

impl Debug for Geometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("slots", &self.slots)
            .field("neighbors", &self.neighbors)
            .finish()
    }
}

impl Geometry {
    /// Derive a geometry from a fillable-cell mask, where `true` marks a cell that takes a letter.
    /// Every maximal horizontal or vertical run of two or more fillable cells becomes a slot.
    /// Slots are numbered in reading order, with an across slot coming before a down slot that
    /// starts in the same cell.
    pub fn from_mask(mask: &[Vec<bool>]) -> Result<Geometry, GeometryError> {
        let height = mask.len();
        let width = mask.first().map_or(0, |row| row.len());
        if height == 0 || width == 0 {
            return Err(GeometryError::EmptyMask);
        }
        for (row, cells) in mask.iter().enumerate() {
            if cells.len() != width {
                return Err(GeometryError::RaggedMask { row, expected: width, found: cells.len() });
            }
        }

        let fillable = |row: usize, column: usize| mask[row][column];

        let mut slots: Vec<Slot> = vec![];
        for row in 0..height {
            for column in 0..width {
                if !fillable(row, column) {
                    continue;
                }

                if column == 0 || !fillable(row, column - 1) {
                    let length = (column..width).take_while(|&c| fillable(row, c)).count();
                    if length > 1 {
                        slots.push(Slot::new(row, column, Direction::Across, length));
                    }
                }

                if row == 0 || !fillable(row - 1, column) {
                    let length = (row..height).take_while(|&r| fillable(r, column)).count();
                    if length > 1 {
                        slots.push(Slot::new(row, column, Direction::Down, length));
                    }
                }
            }
        }

        Geometry::build(height, width, mask.to_vec(), slots)
    }

    /// Build a geometry from an explicit list of slots. The fillable-cell mask is the union of the
    /// slots' cells. Slot ids follow the order of `slots`.
    pub fn from_slots(
        height: usize,
        width: usize,
        slots: Vec<Slot>,
    ) -> Result<Geometry, GeometryError> {
        let mut mask: Vec<Vec<bool>> = (0..height).map(|_| vec![false; width]).collect();

        for (slot_id, slot) in slots.iter().enumerate() {
            if slot.length == 0 {
                return Err(GeometryError::ZeroLengthSlot);
            }
            match slot.end_cell() {
                Some((end_row, end_column)) if end_row < height && end_column < width => {}
                _ => return Err(GeometryError::SlotOutOfBounds { slot: *slot }),
            }
            if slots[..slot_id].contains(slot) {
                return Err(GeometryError::DuplicateSlot { slot: *slot });
            }

            for (row, column) in slot.cell_coords() {
                mask[row][column] = true;
            }
        }

        Geometry::build(height, width, mask, slots)
    }

    /// Compute the overlap map and neighbor lists for a validated set of slots.
    fn build(
        height: usize,
        width: usize,
        mask: Vec<Vec<bool>>,
        slots: Vec<Slot>,
    ) -> Result<Geometry, GeometryError> {
        let slot_count = slots.len();

        // Build a map from cell location to the slots involved, which we can then use to calculate
        // crossings.
        let mut entries_by_loc: HashMap<GridCoord, SmallVec<[(SlotId, usize); 2]>> =
            HashMap::new();
        for (slot_id, slot) in slots.iter().enumerate() {
            for (cell_idx, loc) in slot.cell_coords().enumerate() {
                let entries = entries_by_loc.entry(loc).or_default();
                if entries.len() == 2 {
                    return Err(GeometryError::TooManySlotsInCell { row: loc.0, column: loc.1 });
                }
                entries.push((slot_id, cell_idx));
            }
        }

        // Walk the slots in order (rather than the map) so that error reporting is deterministic.
        let mut overlaps: Vec<Option<Overlap>> = vec![None; slot_count * slot_count];
        for (slot_id, slot) in slots.iter().enumerate() {
            for (cell_idx, loc) in slot.cell_coords().enumerate() {
                for &(other_slot_id, other_cell_idx) in &entries_by_loc[&loc] {
                    if other_slot_id <= slot_id {
                        continue;
                    }
                    if overlaps[slot_id * slot_count + other_slot_id].is_some() {
                        return Err(GeometryError::MultipleSharedCells {
                            first: *slot,
                            second: slots[other_slot_id],
                        });
                    }

                    let overlap = Overlap { cell: cell_idx, other_cell: other_cell_idx };
                    overlaps[slot_id * slot_count + other_slot_id] = Some(overlap);
                    overlaps[other_slot_id * slot_count + slot_id] = Some(overlap.reversed());
                }
            }
        }

        let neighbors = (0..slot_count)
            .map(|slot_id| {
                (0..slot_count)
                    .filter(|&other_slot_id| overlaps[slot_id * slot_count + other_slot_id].is_some())
                    .collect()
            })
            .collect();

        Ok(Geometry { height, width, mask, slots, overlaps, neighbors })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Does the given cell take a letter? Cells outside the grid never do.
    pub fn is_fillable(&self, row: usize, column: usize) -> bool {
        self.mask.get(row).and_then(|cells| cells.get(column)).copied().unwrap_or(false)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, slot_id: SlotId) -> &Slot {
        &self.slots[slot_id]
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Look up the id of a slot by value.
    pub fn slot_id(&self, slot: &Slot) -> Option<SlotId> {
        self.slots.iter().position(|candidate| candidate == slot)
    }

    /// How does slot `x` cross slot `y`, if at all? A slot never overlaps itself.
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<Overlap> {
        self.overlaps[x * self.slots.len() + y]
    }

    /// The slots crossing `slot_id`, in ascending id order.
    pub fn neighbors(&self, slot_id: SlotId) -> &[SlotId] {
        &self.neighbors[slot_id]
    }

    /// How many slots cross `slot_id`?
    pub fn degree(&self, slot_id: SlotId) -> usize {
        self.neighbors[slot_id].len()
    }

    /// Every ordered pair of crossing slots, grouped by the first slot.
    pub fn arcs(&self) -> impl Iterator<Item = (SlotId, SlotId)> + '_ {
        self.neighbors
            .iter()
            .enumerate()
            .flat_map(|(slot_id, neighbors)| neighbors.iter().map(move |&other| (slot_id, other)))
    }
}
