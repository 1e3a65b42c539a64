/// A lattice site. `z` is signed so positions above or below the lattice can be represented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Site {
    #[inline(always)]
    pub fn new(x: i32, y: i32, z: i32) -> Self { Self { x, y, z } }

    /// The raw neighbouring site in `dir`, without any boundary handling.
    #[inline(always)]
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.delta();
        Self { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }
}

/// The six axis-aligned unit moves of the walker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Fixed ordering used when a direction is drawn by index.
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    #[inline(always)]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::Up => (0, 0, 1),
            Direction::Down => (0, 0, -1),
            Direction::North => (0, 1, 0),
            Direction::South => (0, -1, 0),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
        }
    }
}

/// Periodic wrap of a coordinate into [0, n).
#[inline(always)]
pub fn wrap(v: i32, n: i32) -> i32 {
    v.rem_euclid(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_handles_both_edges() {
        assert_eq!(wrap(-1, 4), 3);
        assert_eq!(wrap(4, 4), 0);
        assert_eq!(wrap(2, 4), 2);
    }

    #[test]
    fn directions_cover_each_axis_both_ways() {
        let sum = Direction::ALL.iter().fold((0, 0, 0), |acc, d| {
            let (dx, dy, dz) = d.delta();
            assert_eq!(dx.abs() + dy.abs() + dz.abs(), 1);
            (acc.0 + dx, acc.1 + dy, acc.2 + dz)
        });
        assert_eq!(sum, (0, 0, 0));
    }
}
