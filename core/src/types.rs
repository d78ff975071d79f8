/// Single coordinate axis used for board width, height, and positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(x, y)`, 0-based, with `x < width` and
/// `y < height`.
pub type Coord2 = (Coord, Coord);

pub(crate) const fn nd((x, y): Coord2) -> (usize, usize) {
    (x as usize, y as usize)
}

// Row-major sweep over the 3x3 box around a cell, center skipped.
const OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Applies `delta` to `center`, returning a value only when it stays in
/// bounds.
fn offset_within(center: Coord2, delta: (i8, i8), bounds: Coord2) -> Option<Coord2> {
    let x = center.0.checked_add_signed(delta.0)?;
    if x >= bounds.0 {
        return None;
    }
    let y = center.1.checked_add_signed(delta.1)?;
    if y >= bounds.1 {
        return None;
    }
    Some((x, y))
}

/// Iterates the up-to-8 in-bounds neighbors of a cell in row-major order.
///
/// The iterator owns its cursor, so it never borrows the grid it came from
/// and can be restarted by asking for a fresh one.
#[derive(Copy, Clone, Debug)]
pub struct Neighbors {
    center: Coord2,
    bounds: Coord2,
    cursor: u8,
}

pub(crate) const fn neighbors(center: Coord2, bounds: Coord2) -> Neighbors {
    Neighbors {
        center,
        bounds,
        cursor: 0,
    }
}

impl Iterator for Neighbors {
    type Item = Coord2;

    fn next(&mut self) -> Option<Coord2> {
        while let Some(&delta) = OFFSETS.get(usize::from(self.cursor)) {
            self.cursor += 1;
            if let Some(coords) = offset_within(self.center, delta, self.bounds) {
                return Some(coords);
            }
        }
        None
    }
}
