use std::collections::VecDeque;

use crate::*;

/// Result of one clear action: whether the player survived, and every
/// cell whose visible state changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearOutcome {
    pub success: bool,
    pub changed: Vec<ChangedCell>,
}

impl ClearOutcome {
    pub(crate) const fn untouched(success: bool) -> Self {
        Self {
            success,
            changed: Vec::new(),
        }
    }
}

/// Clears `start` and, when it has no neighboring mines, cascades outward
/// over the connected zero-count region and its one-cell boundary.
///
/// The work-list is explicit so a region spanning the whole grid cannot
/// overflow the call stack, and the `cleared` bit doubles as the visited
/// marker: a cell is cleared at most once, which bounds the traversal.
/// Flagged cells stop the cascade and stay untouched. Detonation is
/// reported through `success`, never through the changed list.
pub fn clear_region(field: &mut Field, start: Coord2) -> ClearOutcome {
    let cell = field.cell(start);
    if cell.flagged || cell.cleared {
        // flags protect the cell; re-clearing a cleared cell changes nothing
        return ClearOutcome::untouched(true);
    }

    if !field.clear(start) {
        log::debug!("mine detonated at {:?}", start);
        return ClearOutcome::untouched(false);
    }

    let first = field.cell(start).neighboring_mines;
    let mut changed = vec![ChangedCell::new(start, first)];
    log::debug!("cleared cell at {:?}, mine count: {}", start, first);

    if first == 0 {
        let mut frontier = VecDeque::from([start]);
        while let Some(coords) = frontier.pop_front() {
            for pos in field.neighbors(coords) {
                if !field.cell(pos).is_untouched() {
                    continue;
                }
                // neighbors of a zero-count cell are never mines
                field.clear(pos);
                let count = field.cell(pos).neighboring_mines;
                changed.push(ChangedCell::new(pos, count));
                log::trace!("flood cleared cell at {:?}, mine count: {}", pos, count);
                if count == 0 {
                    frontier.push_back(pos);
                }
            }
        }
    }

    ClearOutcome {
        success: true,
        changed,
    }
}
