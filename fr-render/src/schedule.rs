//! Cells and chunk levels: which pixels a refinement visit evaluates.

use std::ops::Range;

use fr_core::Size;

/// Refinement level of one cell.
///
/// Starts at the cell's maximum chunk size and halves on every visit down to 1;
/// the visit at size 1 finishes the cell and later visits do nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkState {
    size: usize,
    max: usize,
    finished: bool,
}

impl ChunkState {
    /// `max` must be a power of two.
    pub fn new(max: usize) -> Self {
        ChunkState {
            size: max,
            max,
            finished: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Moves to the next level after a completed visit.
    pub fn advance(&mut self) {
        if self.size > 1 {
            self.size /= 2;
        } else {
            self.finished = true;
        }
    }

    /// Marks the cell done without visiting it, e.g. when it holds no pixels.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Whether the current level evaluates pixel (x, y).
    ///
    /// Pixels on the chunk grid are sampled, except those on the grid of the previous
    /// (twice as coarse) level, which already hold their own value.
    pub fn samples(&self, x: usize, y: usize) -> bool {
        let s = self.size;
        if x % s != 0 || y % s != 0 {
            return false;
        }
        s == self.max || (x / s) % 2 == 1 || (y / s) % 2 == 1
    }
}

/// A rectangle of pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub x: Range<usize>,
    pub y: Range<usize>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }
}

/// Splits a frame into a `grid` of cells, row-major.
///
/// Bounds are proportional, rounded down to a multiple of `align`; the last
/// row and column run to the frame's edge. Frames small next to `align`
/// can leave some cells empty.
pub fn cells(frame: Size, grid: Size, align: usize) -> Vec<Cell> {
    let align = align.max(1);
    let bound = |i: usize, n: usize, len: usize| {
        if i == n {
            len
        } else {
            let b = i * len / n;
            b - b % align
        }
    };
    let mut out = Vec::with_capacity(grid.area());
    for cy in 0..grid.height {
        for cx in 0..grid.width {
            out.push(Cell {
                x: bound(cx, grid.width, frame.width)..bound(cx + 1, grid.width, frame.width),
                y: bound(cy, grid.height, frame.height)..bound(cy + 1, grid.height, frame.height),
            });
        }
    }
    out
}
