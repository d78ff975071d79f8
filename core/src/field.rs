use std::collections::BTreeSet;

use ndarray::Array2;
use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

use crate::types::{nd, neighbors};
use crate::*;

/// A grid of [`Cell`]s, a fixed number of which contain mines.
///
/// Construction is two-phase: the shape and mine count are fixed up front,
/// the mines themselves are committed later, possibly around an exclusion
/// zone, so a session can guarantee a safe opening move.
///
/// Coordinate arguments are assumed in bounds; anything else is a caller
/// bug and panics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    cells: Array2<Cell>,
    mine_count: CellCount,
    armed: bool,
}

impl Field {
    /// A covered field of `config.size` cells with no mines placed yet.
    pub fn new(config: GameConfig) -> Self {
        Self {
            cells: Array2::default(nd(config.size)),
            mine_count: config.mines,
            armed: false,
        }
    }

    /// Builds an armed field with mines at exactly the given coordinates.
    pub fn from_mine_coords(size: Coord2, mines: &[Coord2]) -> Result<Self> {
        let config = GameConfig::new(size, mines.len() as CellCount)?;
        let mut field = Self::new(config);
        for &coords in mines {
            field.cells[nd(coords)].is_mine = true;
        }
        // recount in case the list held duplicates
        field.mine_count = field.count_cells(|cell| cell.is_mine);
        field.count_neighboring_mines();
        field.armed = true;
        Ok(field)
    }

    /// Randomly distributes the field's mines over every cell not in
    /// `excluded`, drawing uniformly without replacement, then fills in
    /// the neighboring-mine count of every cell.
    pub fn place_mines<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        excluded: &BTreeSet<Coord2>,
    ) -> Result<()> {
        assert!(!self.armed, "mines already placed");

        let total = usize::from(self.total_cells());
        let eligible = total - excluded.len();
        if usize::from(self.mine_count) > eligible {
            return Err(ConfigError::ExclusionTooLarge);
        }

        // mark the exclusion zone as occupied so the draw skips it
        for &coords in excluded {
            self.cells[nd(coords)].is_mine = true;
        }

        let mut free = eligible;
        let mut placed = 0;
        while placed < self.mine_count {
            let mut slot = rng.random_range(0..free);
            for (i, cell) in self.cells.iter_mut().enumerate() {
                if cell.is_mine {
                    slot += 1;
                }
                if i == slot {
                    cell.is_mine = true;
                    placed += 1;
                    free -= 1;
                    break;
                }
            }
        }

        // undo the exclusion marks
        for &coords in excluded {
            self.cells[nd(coords)].is_mine = false;
        }

        let count = self.count_cells(|cell| cell.is_mine);
        if count != self.mine_count {
            log::warn!(
                "placed mine count mismatch, actual: {}, requested: {}",
                count,
                self.mine_count
            );
        }

        self.count_neighboring_mines();
        self.armed = true;
        log::debug!("placed {} mines across {} cells", self.mine_count, total);
        Ok(())
    }

    fn count_neighboring_mines(&mut self) {
        let size = self.size();
        for cell in self.cells.iter_mut() {
            cell.neighboring_mines = 0;
        }
        for coords in self.mine_coords() {
            for pos in neighbors(coords, size) {
                self.cells[nd(pos)].neighboring_mines += 1;
            }
        }
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.cells.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn width(&self) -> Coord {
        self.size().0
    }

    pub fn height(&self) -> Coord {
        self.size().1
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len() as CellCount
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    /// Whether mines have been committed to the board yet.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn config(&self) -> GameConfig {
        GameConfig::new_unchecked(self.size(), self.mine_count)
    }

    pub fn cell(&self, coords: Coord2) -> Cell {
        self.cells[nd(coords)]
    }

    /// The up-to-8 in-bounds neighbors of `coords`, row-major.
    pub fn neighbors(&self, coords: Coord2) -> Neighbors {
        let size = self.size();
        assert!(
            coords.0 < size.0 && coords.1 < size.1,
            "coordinate out of bounds: {coords:?}"
        );
        neighbors(coords, size)
    }

    /// Coordinates of every mined cell, row-major.
    pub fn mine_coords(&self) -> Vec<Coord2> {
        self.cells
            .indexed_iter()
            .filter(|(_, cell)| cell.is_mine)
            .map(|((x, y), _)| (x as Coord, y as Coord))
            .collect()
    }

    /// Attempts to clear the cell, returning `false` on detonation.
    ///
    /// A flagged cell is protected: it stays covered and the call reports
    /// `true`.
    pub fn clear(&mut self, coords: Coord2) -> bool {
        let cell = &mut self.cells[nd(coords)];
        if cell.flagged {
            return true;
        }
        cell.cleared = true;
        !cell.is_mine
    }

    /// Places or removes a flag, returning the new flag state. Cleared
    /// cells cannot be flagged.
    pub fn flag(&mut self, coords: Coord2, value: bool) -> bool {
        let cell = &mut self.cells[nd(coords)];
        if cell.cleared {
            return false;
        }
        cell.flagged = value;
        value
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> bool {
        let flagged = !self.cells[nd(coords)].flagged;
        self.flag(coords, flagged)
    }

    pub fn flags_placed(&self) -> CellCount {
        self.count_cells(|cell| cell.flagged)
    }

    /// Mines that have not been flagged yet.
    pub fn mines_left(&self) -> CellCount {
        self.mine_count - self.count_cells(|cell| cell.flagged && cell.is_mine)
    }

    /// Cells that are neither cleared nor flagged.
    pub fn cells_left(&self) -> CellCount {
        self.count_cells(Cell::is_untouched)
    }

    fn count_cells(&self, pred: impl Fn(&Cell) -> bool) -> CellCount {
        self.cells.iter().filter(|&cell| pred(cell)).count() as CellCount
    }
}
