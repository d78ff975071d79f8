use serde::{Deserialize, Serialize};

use crate::types::Coord2;

/// One square of the minefield.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub is_mine: bool,
    /// How many of the up-to-8 surrounding cells hold a mine. Filled in
    /// once when mines are placed, never recomputed.
    pub neighboring_mines: u8,
    pub flagged: bool,
    pub cleared: bool,
}

impl Cell {
    /// Neither cleared nor flagged yet.
    pub const fn is_untouched(&self) -> bool {
        !self.cleared && !self.flagged
    }
}

/// A cell whose visible state changed during a reveal.
///
/// Flagged cells are protected from clearing and never show up here, so
/// `neighboring_mines` is always meaningful for display.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChangedCell {
    pub coords: Coord2,
    pub neighboring_mines: u8,
}

impl ChangedCell {
    pub(crate) const fn new(coords: Coord2, neighboring_mines: u8) -> Self {
        Self {
            coords,
            neighboring_mines,
        }
    }
}
