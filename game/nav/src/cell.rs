use common::*;

/// A cell on the traversal surface, minimum corner at (0, 0)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Cell(pub i32, pub i32);

/// Surface dimensions, fixed for the lifetime of the map
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct GridDims {
    x: u32,
    z: u32,
}

impl Cell {
    pub const fn x(self) -> i32 {
        self.0
    }

    pub const fn z(self) -> i32 {
        self.1
    }

    pub fn offset(self, dx: i32, dz: i32) -> Cell {
        Cell(self.0 + dx, self.1 + dz)
    }

    pub fn manhattan_distance(self, other: Cell) -> u32 {
        let dx = (self.0 - other.0).abs() as u32;
        let dz = (self.1 - other.1).abs() as u32;
        dx + dz
    }

    pub fn is_adjacent_to(self, other: Cell) -> bool {
        let dx = (self.0 - other.0).abs();
        let dz = (self.1 - other.1).abs();
        dx <= 1 && dz <= 1 && (dx, dz) != (0, 0)
    }
}

impl GridDims {
    pub fn new(x: u32, z: u32) -> Self {
        assert!(x > 0 && z > 0, "surface must be non-empty");
        Self { x, z }
    }

    pub const fn x(self) -> u32 {
        self.x
    }

    pub const fn z(self) -> u32 {
        self.z
    }

    pub fn cell_count(self) -> usize {
        self.x as usize * self.z as usize
    }

    pub fn contains(self, cell: Cell) -> bool {
        cell.0 >= 0 && cell.1 >= 0 && (cell.0 as u32) < self.x && (cell.1 as u32) < self.z
    }

    /// Linear index, bijective with in-bounds cells
    pub fn index_of(self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.0 as usize + self.x as usize * cell.1 as usize)
    }

    pub fn cell_of(self, index: usize) -> Cell {
        debug_assert!(index < self.cell_count(), "index {} out of range", index);
        let x = (index % self.x as usize) as i32;
        let z = (index / self.x as usize) as i32;
        Cell(x, z)
    }
}

/// 8-directional step offsets, cardinals first
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

pub const fn is_diagonal_offset(dx: i32, dz: i32) -> bool {
    dx != 0 && dz != 0
}

/// Standard 8-directional distance in the given move cost units
pub fn octile_cost(a: Cell, b: Cell, cardinal: u32, diagonal: u32) -> u32 {
    let dx = (a.0 - b.0).abs() as u32;
    let dz = (a.1 - b.1).abs() as u32;
    let (hi, lo) = if dx > dz { (dx, dz) } else { (dz, dx) };
    lo * diagonal + (hi - lo) * cardinal
}

impl Debug for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "({}, {})", self.0, self.1)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "({}, {})", self.0, self.1)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, z): (i32, i32)) -> Self {
        Cell(x, z)
    }
}

slog_value_display!(Cell);
