//! Grid dimensions and the per-page occupancy matrix.
//!
//! [`GridOccupancy`] is the single read model every search and resolve
//! operation consults. It is rebuilt from the item list on demand and never
//! cached across mutations.

use std::fmt;

use homegrid_core::geometry::{Cell, CellRect};
use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};

/// Default number of columns per page.
pub const DEFAULT_COLUMNS: u16 = 4;
/// Default number of rows per page.
pub const DEFAULT_ROWS: u16 = 6;

/// How items settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Items snap to whole cells; transforms are reset on every settle.
    #[default]
    Grid,
    /// Items keep fractional positions and their transform.
    Freeform,
}

/// Fixed logical grid dimensions, identical on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u16,
    pub rows: u16,
    pub layout_mode: LayoutMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            layout_mode: LayoutMode::Grid,
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_layout_mode(mut self, layout_mode: LayoutMode) -> Self {
        self.layout_mode = layout_mode;
        self
    }

    /// The whole page as a cell rectangle.
    #[must_use]
    pub fn bounds(&self) -> CellRect {
        CellRect::new(0, 0, i32::from(self.columns), i32::from(self.rows))
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::from(self.columns) * usize::from(self.rows)
    }

    /// Clamp a span to the grid (at least 1, at most the grid size).
    #[must_use]
    pub fn clamp_span(&self, span_x: i32, span_y: i32) -> (i32, i32) {
        (
            span_x.clamp(1, i32::from(self.columns.max(1))),
            span_y.clamp(1, i32::from(self.rows.max(1))),
        )
    }

    /// Clamp an origin so that a `span_x` x `span_y` rectangle stays inside
    /// the grid. Spans larger than the grid pin to the top-left.
    #[must_use]
    pub fn clamp_origin(&self, origin: Cell, span_x: i32, span_y: i32) -> Cell {
        let max_col = (i32::from(self.columns) - span_x).max(0);
        let max_row = (i32::from(self.rows) - span_y).max(0);
        Cell::new(origin.col.clamp(0, max_col), origin.row.clamp(0, max_row))
    }
}

/// Boolean `columns` x `rows` matrix; a cell is `true` when an item's
/// rounded span rectangle covers it.
#[derive(Clone, PartialEq, Eq)]
pub struct GridOccupancy {
    columns: u16,
    rows: u16,
    cells: Vec<bool>,
}

impl GridOccupancy {
    /// An empty page.
    #[must_use]
    pub fn empty(grid: &GridConfig) -> Self {
        Self {
            columns: grid.columns,
            rows: grid.rows,
            cells: vec![false; grid.cell_count()],
        }
    }

    /// Occupancy of exactly the given items. Callers restrict the list to
    /// one page.
    #[must_use]
    pub fn from_items<'a>(grid: &GridConfig, items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut occupancy = Self::empty(grid);
        for item in items {
            occupancy.occupy(item.cell_rect());
        }
        occupancy
    }

    /// Occupancy of the items on `page`, optionally leaving one item out
    /// (typically the one being placed).
    #[must_use]
    pub fn for_page<'a>(
        grid: &GridConfig,
        items: impl IntoIterator<Item = &'a Item>,
        page: usize,
        exclude: Option<ItemId>,
    ) -> Self {
        Self::from_items(
            grid,
            items
                .into_iter()
                .filter(|item| item.page() == page && Some(item.id()) != exclude),
        )
    }

    #[must_use]
    pub const fn columns(&self) -> u16 {
        self.columns
    }

    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Mark a rectangle occupied. Out-of-bounds portions are clipped.
    pub fn occupy(&mut self, rect: CellRect) {
        let Some(clipped) = rect.clip(self.columns, self.rows) else {
            return;
        };
        for cell in clipped.cells() {
            if let Some(index) = self.index(cell) {
                self.cells[index] = true;
            }
        }
    }

    /// Whether a cell is covered. Cells outside the grid report `false`.
    #[must_use]
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|index| self.cells[index])
    }

    /// True iff the rectangle at `origin` is fully in bounds and every
    /// covered cell is free.
    #[must_use]
    pub fn can_place(&self, origin: Cell, span_x: i32, span_y: i32) -> bool {
        let rect = CellRect::at(origin, span_x, span_y);
        rect.fits_within(self.columns, self.rows) && rect.cells().all(|cell| !self.is_occupied(cell))
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|occupied| **occupied).count()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|occupied| *occupied)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.col < 0
            || cell.row < 0
            || cell.col >= i32::from(self.columns)
            || cell.row >= i32::from(self.rows)
        {
            return None;
        }
        Some(cell.row as usize * usize::from(self.columns) + cell.col as usize)
    }
}

impl fmt::Debug for GridOccupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOccupancy")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("occupied", &self.occupied_count())
            .finish()
    }
}

/// One text row per grid row, `#` for occupied and `.` for free.
impl fmt::Display for GridOccupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..i32::from(self.rows) {
            for col in 0..i32::from(self.columns) {
                let glyph = if self.is_occupied(Cell::new(col, row)) { '#' } else { '.' };
                write!(f, "{glyph}")?;
            }
            if row + 1 < i32::from(self.rows) {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemContent, Placement};

    fn item(raw: u64, placement: Placement) -> Item {
        Item::new(
            ItemId::new(raw).expect("non-zero id"),
            ItemContent::Clock,
            placement,
        )
    }

    #[test]
    fn defaults_are_four_by_six_grid() {
        let grid = GridConfig::default();
        assert_eq!((grid.columns, grid.rows), (4, 6));
        assert_eq!(grid.layout_mode, LayoutMode::Grid);
    }

    #[test]
    fn occupancy_marks_rounded_spans() {
        let grid = GridConfig::default();
        let items = [item(1, Placement::new(0.6, 0.0, 1.5, 1.0, 0))];
        let occ = GridOccupancy::from_items(&grid, &items);
        assert!(!occ.is_occupied(Cell::new(0, 0)));
        assert!(occ.is_occupied(Cell::new(1, 0)));
        assert!(occ.is_occupied(Cell::new(2, 0)));
        assert_eq!(occ.occupied_count(), 2);
    }

    #[test]
    fn out_of_bounds_portions_are_clipped() {
        let grid = GridConfig::default();
        let items = [item(1, Placement::new(3.0, 5.0, 3.0, 3.0, 0))];
        let occ = GridOccupancy::from_items(&grid, &items);
        assert_eq!(occ.occupied_count(), 1);
        assert!(occ.is_occupied(Cell::new(3, 5)));
    }

    #[test]
    fn for_page_filters_page_and_excluded_item() {
        let grid = GridConfig::default();
        let items = [
            item(1, Placement::cell(0, 0, 0)),
            item(2, Placement::cell(1, 0, 1)),
            item(3, Placement::cell(2, 0, 0)),
        ];
        let occ = GridOccupancy::for_page(&grid, &items, 0, ItemId::new(3));
        assert!(occ.is_occupied(Cell::new(0, 0)));
        assert!(!occ.is_occupied(Cell::new(1, 0)));
        assert!(!occ.is_occupied(Cell::new(2, 0)));
    }

    #[test]
    fn can_place_requires_bounds_and_free_cells() {
        let grid = GridConfig::default();
        let items = [item(1, Placement::cell(1, 1, 0))];
        let occ = GridOccupancy::from_items(&grid, &items);
        assert!(occ.can_place(Cell::new(2, 2), 2, 2));
        assert!(!occ.can_place(Cell::new(0, 0), 2, 2));
        assert!(!occ.can_place(Cell::new(3, 0), 2, 1));
        assert!(!occ.can_place(Cell::new(-1, 0), 1, 1));
    }

    #[test]
    fn display_renders_matrix() {
        let grid = GridConfig::new(3, 2);
        let items = [item(1, Placement::new(1.0, 0.0, 2.0, 1.0, 0))];
        let occ = GridOccupancy::from_items(&grid, &items);
        assert_eq!(occ.to_string(), ".##\n...");
    }

    #[test]
    fn clamp_origin_keeps_span_inside() {
        let grid = GridConfig::default();
        assert_eq!(grid.clamp_origin(Cell::new(3, 5), 2, 2), Cell::new(2, 4));
        assert_eq!(grid.clamp_origin(Cell::new(-2, -1), 1, 1), Cell::new(0, 0));
        assert_eq!(grid.clamp_span(0, 9), (1, 6));
    }
}
