#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Two coordinate spaces meet here: pixel space ([`Point`], [`Size`]) where
//! pointer input arrives, and cell space ([`Cell`], [`CellRect`]) where items
//! are arranged. [`CellMetrics`] converts between them.

use serde::{Deserialize, Serialize};

/// A position in pixel space (origin at the top-left of the page viewport).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Translate by a delta.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Delta from `self` to `other`.
    #[inline]
    #[must_use]
    pub fn delta_to(self, other: Self) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let (dx, dy) = self.delta_to(other);
        dx.hypot(dy)
    }
}

/// A size in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero, negative, or not finite.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// One grid cell (column, row). Signed so that search frontiers may step
/// outside the grid before being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    #[inline]
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Manhattan distance to another cell.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }
}

/// A rectangle of cells, half-open on the right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellRect {
    /// Left column (inclusive).
    pub col: i32,
    /// Top row (inclusive).
    pub row: i32,
    /// Width in cells.
    pub span_x: i32,
    /// Height in cells.
    pub span_y: i32,
}

impl CellRect {
    #[inline]
    #[must_use]
    pub const fn new(col: i32, row: i32, span_x: i32, span_y: i32) -> Self {
        Self {
            col,
            row,
            span_x,
            span_y,
        }
    }

    /// Rectangle anchored at `cell`.
    #[inline]
    #[must_use]
    pub const fn at(cell: Cell, span_x: i32, span_y: i32) -> Self {
        Self::new(cell.col, cell.row, span_x, span_y)
    }

    /// Top-left cell.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Cell {
        Cell::new(self.col, self.row)
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.col.saturating_add(self.span_x)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.row.saturating_add(self.span_y)
    }

    /// Area in cells. Empty rectangles have area 0.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.span_x as u64 * self.span_y as u64
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.span_x <= 0 || self.span_y <= 0
    }

    /// Check if a cell lies inside the rectangle.
    #[inline]
    #[must_use]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.col >= self.col
            && cell.col < self.right()
            && cell.row >= self.row
            && cell.row < self.bottom()
    }

    /// Half-open axis-aligned intersection test.
    #[must_use]
    pub fn intersects(&self, other: &CellRect) -> bool {
        self.intersection_opt(other).is_some()
    }

    /// Intersection with another rectangle, `None` when they do not overlap.
    #[must_use]
    pub fn intersection_opt(&self, other: &CellRect) -> Option<CellRect> {
        let col = self.col.max(other.col);
        let row = self.row.max(other.row);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if col < right && row < bottom {
            Some(CellRect::new(col, row, right - col, bottom - row))
        } else {
            None
        }
    }

    /// Clip to a `columns` x `rows` grid. Out-of-bounds portions are dropped;
    /// returns `None` when nothing remains.
    #[must_use]
    pub fn clip(&self, columns: u16, rows: u16) -> Option<CellRect> {
        self.intersection_opt(&CellRect::new(0, 0, i32::from(columns), i32::from(rows)))
    }

    /// Whether the whole rectangle lies inside a `columns` x `rows` grid.
    #[must_use]
    pub fn fits_within(&self, columns: u16, rows: u16) -> bool {
        !self.is_empty()
            && self.col >= 0
            && self.row >= 0
            && self.right() <= i32::from(columns)
            && self.bottom() <= i32::from(rows)
    }

    /// Iterate covered cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.row..self.bottom())
            .flat_map(move |row| (self.col..self.right()).map(move |col| Cell::new(col, row)))
    }
}

/// Pixel size of one cell for a given viewport and grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellMetrics {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl CellMetrics {
    #[must_use]
    pub const fn new(cell_width: f32, cell_height: f32) -> Self {
        Self {
            cell_width,
            cell_height,
        }
    }

    /// Divide a viewport evenly into `columns` x `rows` cells.
    ///
    /// A degenerate viewport or an empty grid yields 1x1 pixel cells so that
    /// downstream division never produces NaN.
    #[must_use]
    pub fn for_viewport(viewport: Size, columns: u16, rows: u16) -> Self {
        if viewport.is_degenerate() || columns == 0 || rows == 0 {
            return Self::new(1.0, 1.0);
        }
        Self::new(
            viewport.width / f32::from(columns),
            viewport.height / f32::from(rows),
        )
    }

    /// Cell containing a pixel point (floor).
    #[must_use]
    pub fn cell_at(&self, point: Point) -> Cell {
        Cell::new(
            (point.x / self.cell_width).floor() as i32,
            (point.y / self.cell_height).floor() as i32,
        )
    }

    /// Fractional cell coordinates of a pixel point.
    #[must_use]
    pub fn to_cell_space(&self, point: Point) -> (f32, f32) {
        (point.x / self.cell_width, point.y / self.cell_height)
    }

    /// Pixel position of a fractional cell coordinate.
    #[must_use]
    pub fn to_pixels(&self, col: f32, row: f32) -> Point {
        Point::new(col * self.cell_width, row * self.cell_height)
    }

    /// Pixel extent of a span.
    #[must_use]
    pub fn span_size(&self, span_x: f32, span_y: f32) -> Size {
        Size::new(span_x * self.cell_width, span_y * self.cell_height)
    }
}
