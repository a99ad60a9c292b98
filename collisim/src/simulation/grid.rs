//! # Uniform grid broad phase
//!
//! The arena is cut into square cells of side `cell_size`. Every live body
//! is filed under exactly one cell, the one containing its center:
//!
//! ```text
//! row = floor(x / cell_size)      (0 .. rows, rows = floor(width  / cell_size) + 1)
//! col = floor(y / cell_size)      (0 .. cols, cols = floor(height / cell_size) + 1)
//! ```
//!
//! With `cell_size >= 2 * max_radius`, two overlapping circles always sit in
//! the same or in adjacent cells, so candidate pairs only need to be drawn
//! from a cell and its 8 neighbors. Each cell is paired with just 4 of
//! them (down-left, down, down-right, right in row/col terms); applied to
//! every cell this visits each neighboring cell pair exactly once.
//!
//! The grid never owns bodies. It stores [`BodyHandle`]s and reads
//! positions from the [`Bodies`] registry when it rebuckets.

use super::error::{SimError, SimResult};
use super::states::{Arena, Bodies, BodyHandle, NVec2};

/// Neighbor offsets (d_row, d_col) scanned from each cell
const FORWARD_NEIGHBORS: [(isize, isize); 4] = [(1, -1), (1, 0), (1, 1), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub occupied_cells: usize,
    pub total_entries: usize,
}

pub struct UniformGrid {
    cell_size: f64,
    rows: usize,
    cols: usize,
    cells: Vec<Vec<BodyHandle>>, // row-major, rows * cols
    locations: Vec<Option<(BodyHandle, usize)>>, // handle index -> (owner, cell index)
    moves: Vec<(BodyHandle, usize)>, // rebucket scratch, reused every frame
}

impl UniformGrid {
    pub fn new(arena: Arena, cell_size: f64) -> SimResult<Self> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }

        let rows = (arena.width / cell_size).floor() as usize + 1;
        let cols = (arena.height / cell_size).floor() as usize + 1;

        Ok(Self {
            cell_size,
            rows,
            cols,
            cells: vec![Vec::new(); rows * cols],
            locations: Vec::new(),
            moves: Vec::new(),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// (rows, cols)
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Cell covering `x`, or `None` outside the grid extent
    pub fn cell_of(&self, x: &NVec2) -> Option<CellCoord> {
        let row = (x.x / self.cell_size).floor();
        let col = (x.y / self.cell_size).floor();
        if !(row >= 0.0 && col >= 0.0) {
            return None;
        }

        let (row, col) = (row as usize, col as usize);
        (row < self.rows && col < self.cols).then_some(CellCoord { row, col })
    }

    /// Cell a body is currently filed under
    pub fn cell_of_handle(&self, handle: BodyHandle) -> Option<CellCoord> {
        self.location(handle)
            .filter(|&idx| self.cells[idx].contains(&handle))
            .map(|idx| self.coord(idx))
    }

    pub fn cell_members(&self, coord: CellCoord) -> &[BodyHandle] {
        self.cells
            .get(coord.row * self.cols + coord.col)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// File `handle` under the cell covering `x`.
    /// Spawn-time positions are validated here; nothing is inserted on error.
    pub fn insert(&mut self, handle: BodyHandle, x: &NVec2) -> SimResult<()> {
        let coord = self.cell_of(x).ok_or(SimError::OutOfBounds {
            x: x.x,
            y: x.y,
            width: self.rows as f64 * self.cell_size,
            height: self.cols as f64 * self.cell_size,
        })?;

        self.remove(handle);
        let idx = self.index(coord);
        self.cells[idx].push(handle);
        self.set_location(handle, Some(idx));
        Ok(())
    }

    /// Drop `handle` from whatever cell holds it. Returns whether it was filed.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(idx) = self.location(handle) else {
            return false;
        };
        self.set_location(handle, None);

        let cell = &mut self.cells[idx];
        match cell.iter().position(|&h| h == handle) {
            Some(pos) => {
                cell.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Move every body whose position left its cell into the matching cell.
    ///
    /// Each cell is scanned in full before any of its entries move: moves
    /// are buffered and applied afterwards, so no entry is skipped or seen
    /// twice while the cell is being read. Handles whose body was removed
    /// from the registry are dropped.
    pub fn rebucket(&mut self, bodies: &Bodies) {
        let mut moves = std::mem::take(&mut self.moves);
        let mut stale = Vec::new();

        for idx in 0..self.cells.len() {
            moves.clear();
            for &handle in &self.cells[idx] {
                match bodies.get(handle) {
                    Some(body) => {
                        let target = self.locate(&body.x);
                        if target != idx {
                            moves.push((handle, target));
                        }
                    }
                    None => stale.push(handle),
                }
            }

            for &(handle, target) in &moves {
                let cell = &mut self.cells[idx];
                if let Some(pos) = cell.iter().position(|&h| h == handle) {
                    cell.swap_remove(pos);
                }
                self.cells[target].push(handle);
                self.set_location(handle, Some(target));
            }
        }

        for handle in stale {
            if let Some(idx) = self.location(handle) {
                self.cells[idx].retain(|&h| h != handle);
                self.set_location(handle, None);
            } else {
                // slot already reused by a newer body: purge the stale entry only
                for cell in &mut self.cells {
                    cell.retain(|&h| h != handle);
                }
            }
        }
        self.moves = moves;
    }

    /// Lazy sequence of every candidate pair: intra-cell pairs once each,
    /// then pairs with the 4 forward neighbors.
    pub fn neighbor_pairs(&self) -> NeighborPairs<'_> {
        NeighborPairs {
            grid: self,
            cell: 0,
            i: 0,
            stage: 0,
            j: 1,
        }
    }

    /// Every live body filed exactly once, under the cell its position maps to
    pub fn is_consistent(&self, bodies: &Bodies) -> bool {
        let filed: usize = self.cells.iter().map(Vec::len).sum();
        if filed != bodies.len() {
            return false;
        }

        bodies.iter().all(|(handle, body)| {
            let expected = self.cell_of(&body.x);
            expected.is_some() && self.cell_of_handle(handle) == expected
        })
    }

    pub fn stats(&self) -> GridStats {
        GridStats {
            occupied_cells: self.cells.iter().filter(|c| !c.is_empty()).count(),
            total_entries: self.cells.iter().map(Vec::len).sum(),
        }
    }

    // helpers ==============================================================================

    fn index(&self, coord: CellCoord) -> usize {
        coord.row * self.cols + coord.col
    }

    fn coord(&self, idx: usize) -> CellCoord {
        CellCoord {
            row: idx / self.cols,
            col: idx % self.cols,
        }
    }

    fn neighbor(&self, idx: usize, d_row: isize, d_col: isize) -> Option<usize> {
        let CellCoord { row, col } = self.coord(idx);
        let row = row.checked_add_signed(d_row).filter(|&r| r < self.rows)?;
        let col = col.checked_add_signed(d_col).filter(|&c| c < self.cols)?;
        Some(row * self.cols + col)
    }

    /// Cell index for a live body during a step.
    ///
    /// A body outside the grid here means containment was skipped upstream.
    /// Debug builds abort; release builds clamp into the edge cell and warn.
    fn locate(&self, x: &NVec2) -> usize {
        if let Some(coord) = self.cell_of(x) {
            return self.index(coord);
        }

        debug_assert!(false, "body at ({}, {}) is outside the grid", x.x, x.y);
        tracing::warn!(x = x.x, y = x.y, "body outside the grid, clamping to edge cell");

        let clamp = |v: f64, n: usize| -> usize {
            if v.is_nan() {
                0
            } else {
                (v / self.cell_size).floor().clamp(0.0, (n - 1) as f64) as usize
            }
        };
        clamp(x.x, self.rows) * self.cols + clamp(x.y, self.cols)
    }

    fn location(&self, handle: BodyHandle) -> Option<usize> {
        self.locations
            .get(handle.index())
            .copied()
            .flatten()
            .filter(|(owner, _)| *owner == handle)
            .map(|(_, idx)| idx)
    }

    fn set_location(&mut self, handle: BodyHandle, idx: Option<usize>) {
        let i = handle.index();
        if i >= self.locations.len() {
            self.locations.resize(i + 1, None);
        }
        self.locations[i] = idx.map(|idx| (handle, idx));
    }
}

/// Iterator returned by [`UniformGrid::neighbor_pairs`]
pub struct NeighborPairs<'a> {
    grid: &'a UniformGrid,
    cell: usize,
    i: usize, // body within `cell`
    stage: usize, // 0 = same cell, 1..=4 = FORWARD_NEIGHBORS[stage - 1]
    j: usize, // partner within the cell of the current stage
}

impl<'a> Iterator for NeighborPairs<'a> {
    type Item = (BodyHandle, BodyHandle);

    fn next(&mut self) -> Option<Self::Item> {
        let cells = &self.grid.cells;
        loop {
            let members = cells.get(self.cell)?;

            if self.i >= members.len() {
                self.cell += 1;
                self.i = 0;
                self.stage = 0;
                self.j = 1;
                continue;
            }
            let a = members[self.i];

            if self.stage == 0 {
                if let Some(&b) = members.get(self.j) {
                    self.j += 1;
                    return Some((a, b));
                }
                self.stage = 1;
                self.j = 0;
                continue;
            }

            if self.stage <= FORWARD_NEIGHBORS.len() {
                let (d_row, d_col) = FORWARD_NEIGHBORS[self.stage - 1];
                if let Some(n) = self.grid.neighbor(self.cell, d_row, d_col) {
                    if let Some(&b) = cells[n].get(self.j) {
                        self.j += 1;
                        return Some((a, b));
                    }
                }
                self.stage += 1;
                self.j = 0;
                continue;
            }

            self.i += 1;
            self.stage = 0;
            self.j = self.i + 1;
        }
    }
}
