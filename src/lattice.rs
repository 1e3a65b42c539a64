use crate::coord::{wrap, Direction, Site};
use anyhow::{Context, Result};
use dla_common::CellRecord;

/// Dense 3D occupancy grid with periodic x/y and bounded z.
///
/// A cell value of 0 means empty; a positive value is the launch step at which the
/// cell was occupied. Occupied cells are never written again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    width: i32,
    height: i32,
    cells: Vec<u32>,
}

impl Lattice {
    /// Allocates a zero-filled `width x width x height` lattice.
    /// Allocation failure is returned as an error instead of aborting the process.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("Lattice dimensions must be positive (got {}x{}x{}).", width, width, height);
        }
        let w = i32::try_from(width).context("lattice width does not fit in i32")?;
        let h = i32::try_from(height).context("lattice height does not fit in i32")?;
        let num_cells = (width as usize)
            .checked_mul(width as usize)
            .and_then(|n| n.checked_mul(height as usize))
            .with_context(|| format!("Lattice size {}x{}x{} overflows usize", width, width, height))?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(num_cells)
            .map_err(|e| anyhow::anyhow!("Failed to allocate lattice of {} cells: {}", num_cells, e))?;
        cells.resize(num_cells, 0);

        Ok(Self { width: w, height: h, cells })
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    /// Whether `z` lies inside the bounded axis.
    #[inline(always)]
    pub fn contains_z(&self, z: i32) -> bool {
        z >= 0 && z < self.height
    }

    // Only place where coordinates are flattened. x/y are wrapped, z must be in range.
    #[inline(always)]
    fn index(&self, site: Site) -> usize {
        assert!(self.contains_z(site.z), "z = {} outside lattice of height {}", site.z, self.height);
        let x = wrap(site.x, self.width) as usize;
        let y = wrap(site.y, self.width) as usize;
        let w = self.width as usize;
        let h = self.height as usize;
        x * w * h + y * h + site.z as usize
    }

    /// Moves `site` one step in `dir`, wrapping x/y. Returns `None` when z leaves the lattice.
    #[inline(always)]
    pub fn neighbor(&self, site: Site, dir: Direction) -> Option<Site> {
        let next = site.offset(dir);
        if !self.contains_z(next.z) {
            return None;
        }
        Some(Site::new(wrap(next.x, self.width), wrap(next.y, self.width), next.z))
    }

    /// Stored step for `site`, 0 if empty.
    ///
    /// # Panics
    /// If `site.z` is outside `[0, height)`. Check with [`Lattice::contains_z`] first.
    #[inline(always)]
    pub fn value(&self, site: Site) -> u32 {
        self.cells[self.index(site)]
    }

    #[inline(always)]
    pub fn is_occupied(&self, site: Site) -> bool {
        self.value(site) > 0
    }

    /// True if any of the six face neighbours is occupied. z-neighbours outside the lattice count as empty.
    pub fn has_occupied_neighbor(&self, site: Site) -> bool {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(site, dir))
            .any(|n| self.is_occupied(n))
    }

    /// Permanently occupies `site` with `step`.
    ///
    /// # Panics
    /// If the cell is already occupied or `step` is 0. Both are caller bugs.
    pub fn deposit(&mut self, site: Site, step: u32) {
        assert!(step > 0, "deposit step must be positive");
        let idx = self.index(site);
        assert_eq!(self.cells[idx], 0, "cell {:?} is already occupied", site);
        self.cells[idx] = step;
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0).count()
    }

    /// Iterates the occupied cells in lexicographic (x, y, z) order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellRecord> + '_ {
        let w = self.width as usize;
        let h = self.height as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0)
            .map(move |(idx, &step)| CellRecord {
                x: (idx / (w * h)) as u32,
                y: ((idx / h) % w) as u32,
                z: (idx % h) as u32,
                step,
            })
    }
}
