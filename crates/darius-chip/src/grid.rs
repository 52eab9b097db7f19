//! Processing-element grid topology.
//!
//! The systolic array is a fixed 8 × 8 grid. Rows consume input-feature-map
//! depth (one depth lane per row), columns produce output channels (one
//! output channel per column). Both are synthesis-time constants of the
//! bitstream and cannot be changed per call.
//!
//! ```text
//!              col 0   col 1   ...   col 7      ← output channels
//!   row 0  ──▶ [PE] ─▶ [PE] ─▶ ... ─▶ [PE]
//!   row 1  ──▶ [PE] ─▶ [PE] ─▶ ... ─▶ [PE]
//!     ...
//!   row 7  ──▶ [PE] ─▶ [PE] ─▶ ... ─▶ [PE]
//!    ↑
//!   ifm depth lanes
//! ```

/// Number of PE rows (input depth lanes).
pub const ROWS: usize = 8;

/// Number of PE columns (output channels computed in parallel).
pub const COLS: usize = 8;

/// Grid topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTopology {
    /// PE rows.
    pub rows: usize,
    /// PE columns.
    pub cols: usize,
}

impl GridTopology {
    /// The grid shipped in the Darius bitstream.
    pub const DARIUS: Self = Self { rows: ROWS, cols: COLS };

    /// Multiply-accumulates retired per clock when every PE is busy.
    #[must_use]
    pub const fn macs_per_cycle(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of row slices needed to cover `depth` input channels.
    #[must_use]
    pub const fn row_slices(&self, depth: u64) -> u64 {
        depth.div_ceil(self.rows as u64)
    }

    /// Number of column slices needed to cover `depth` output channels.
    #[must_use]
    pub const fn col_slices(&self, depth: u64) -> u64 {
        depth.div_ceil(self.cols as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darius_grid_geometry() {
        let grid = GridTopology::DARIUS;
        assert_eq!(grid.macs_per_cycle(), 64);
        assert_eq!(grid.row_slices(8), 1);
        assert_eq!(grid.row_slices(9), 2);
        assert_eq!(grid.col_slices(512), 64);
        assert_eq!(grid.col_slices(0), 0);
        assert_eq!(grid.row_slices(u64::from(u32::MAX)), 1 << 29);
    }
}
