//! Grid: fixed lattice of cells, each optionally occupied by one tile.

use crate::tile::TileId;

/// Lattice coordinate. `y` grows upward, so `Direction::Up` is `+y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Shift direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit step (dx, dy) on the lattice.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Right and up moves process tiles from the high end of the `(x, y)` order.
    pub fn processes_descending(&self) -> bool {
        matches!(self, Self::Right | Self::Up)
    }
}

/// Single addressable position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub coord: Coord,
    pub occupant: Option<TileId>,
}

/// Board lattice. Cells are stored column-major: `index = x * height + y`.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                cells.push(Cell {
                    coord: Coord::new(x as i32, y as i32),
                    occupant: None,
                });
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    #[inline]
    fn index(&self, coord: Coord) -> Option<usize> {
        let (x, y) = (coord.x, coord.y);
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(x as usize * self.height + y as usize)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.index(coord).is_some()
    }

    /// Cell at `coord`; `None` when out of bounds.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Every coordinate, column-major.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells.iter().map(|c| c.coord)
    }

    /// Tile occupying `coord`, if any. Out of bounds reads as empty.
    pub fn occupant(&self, coord: Coord) -> Option<TileId> {
        self.cell(coord).and_then(|c| c.occupant)
    }

    /// Next coordinate in `dir`, or `None` at the edge.
    pub fn neighbor(&self, coord: Coord, dir: Direction) -> Option<Coord> {
        let next = coord.step(dir);
        self.contains(next).then_some(next)
    }

    pub fn empty_cells(&self) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|c| c.occupant.is_none())
            .map(|c| c.coord)
            .collect()
    }

    pub fn set_occupant(&mut self, coord: Coord, tile: TileId) {
        if let Some(i) = self.index(coord) {
            self.cells[i].occupant = Some(tile);
        }
    }

    pub fn clear_occupant(&mut self, coord: Coord) {
        if let Some(i) = self.index(coord) {
            self.cells[i].occupant = None;
        }
    }

    /// Drop every occupancy link.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.occupant = None;
        }
    }
}
