//! Spawn placement: center first, then a fixed square spiral.
//!
//! Given identical occupancy and span, [`PlacementEngine::find_spawn_position`]
//! always returns the same cell. The spiral order is part of the contract.

use homegrid_core::geometry::Cell;

use crate::grid::{GridConfig, GridOccupancy};
use crate::item::Item;

/// Spiral direction order as (dcol, drow): right, down, left, up.
const SPIRAL_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Finds a free rectangle for a new item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementEngine {
    grid: GridConfig,
}

impl PlacementEngine {
    #[must_use]
    pub const fn new(grid: GridConfig) -> Self {
        Self { grid }
    }

    #[must_use]
    pub const fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Centered candidate for a span: `((COLUMNS - span_x) / 2, (ROWS - span_y) / 2)`,
    /// or `None` when the span does not fit the grid at all.
    #[must_use]
    pub fn center(&self, span_x: i32, span_y: i32) -> Option<Cell> {
        let free_cols = i32::from(self.grid.columns) - span_x;
        let free_rows = i32::from(self.grid.rows) - span_y;
        if span_x < 1 || span_y < 1 || free_cols < 0 || free_rows < 0 {
            return None;
        }
        Some(Cell::new(free_cols / 2, free_rows / 2))
    }

    /// Longest spiral leg walked before giving up.
    #[must_use]
    pub fn max_spiral_leg(&self) -> i32 {
        2 * i32::from(self.grid.rows.max(self.grid.columns))
    }

    /// Find a spawn position for a `span_x` x `span_y` item among
    /// `page_items`. `None` means the page is full for that span and the
    /// caller must try another page or create one.
    #[must_use]
    pub fn find_spawn_position<'a>(
        &self,
        span_x: i32,
        span_y: i32,
        page_items: impl IntoIterator<Item = &'a Item>,
    ) -> Option<Cell> {
        let occupancy = GridOccupancy::from_items(&self.grid, page_items);
        self.find_in(&occupancy, span_x, span_y)
    }

    /// Same search against a prebuilt occupancy matrix.
    #[must_use]
    pub fn find_in(&self, occupancy: &GridOccupancy, span_x: i32, span_y: i32) -> Option<Cell> {
        let center = self.center(span_x, span_y)?;
        let found = SpiralCells::new(center, self.max_spiral_leg())
            .find(|cell| occupancy.can_place(*cell, span_x, span_y));
        if found.is_none() {
            tracing::debug!(
                target: "homegrid.placement",
                span_x,
                span_y,
                occupied = occupancy.occupied_count(),
                "no spawn position on page"
            );
        }
        found
    }
}

/// Square spiral traversal starting at (and including) a center cell.
///
/// Walks right, down, left, up, lengthening the leg after every second turn.
/// Cells outside the grid are yielded too; callers reject them.
#[derive(Debug, Clone)]
pub struct SpiralCells {
    current: Cell,
    direction: usize,
    leg_len: i32,
    walked: i32,
    turns: u8,
    max_leg: i32,
    started: bool,
}

impl SpiralCells {
    #[must_use]
    pub fn new(center: Cell, max_leg: i32) -> Self {
        Self {
            current: center,
            direction: 0,
            leg_len: 1,
            walked: 0,
            turns: 0,
            max_leg,
            started: false,
        }
    }
}

impl Iterator for SpiralCells {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if !self.started {
            self.started = true;
            return Some(self.current);
        }
        if self.leg_len > self.max_leg {
            return None;
        }

        let (dcol, drow) = SPIRAL_DIRECTIONS[self.direction];
        self.current = Cell::new(self.current.col + dcol, self.current.row + drow);
        self.walked += 1;

        if self.walked == self.leg_len {
            self.walked = 0;
            self.direction = (self.direction + 1) % SPIRAL_DIRECTIONS.len();
            self.turns += 1;
            if self.turns == 2 {
                self.turns = 0;
                self.leg_len += 1;
            }
        }
        Some(self.current)
    }
}
