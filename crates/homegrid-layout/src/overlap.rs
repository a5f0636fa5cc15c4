//! Overlap resolution after a move or resize.
//!
//! Two layers:
//!
//! - [`OverlapResolver::resolve`] displaces every item the moved item now
//!   overlaps to its nearest free cell (4-neighbour BFS, Up/Down/Left/Right).
//! - [`OverlapResolver::resolve_drop`] is the policy above it: swap when
//!   exactly one equal-area item is hit, relocate the mover when it is
//!   smaller than something it hit, otherwise displace everything it hit.
//!
//! Neither layer fails. Items with no free cell are reported as unresolved
//! and the caller decides what to do with them.
//!
//! Overlapping items are resolved in input-list order (store insertion
//! order). Earlier items win contested cells.

use std::collections::VecDeque;

use homegrid_core::geometry::{Cell, CellRect};
use rustc_hash::FxHashSet;

use crate::grid::{GridConfig, GridOccupancy};
use crate::item::{Item, ItemId, Placement};

/// BFS expansion order as (dcol, drow): up, down, left, right.
const BFS_DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// One item moved to a new top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub id: ItemId,
    pub to: Cell,
}

/// Result of displacing overlapped items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlapResolution {
    /// Relocations in resolution order.
    pub moves: Vec<Relocation>,
    /// Overlapped items for which no free cell exists on the page.
    pub unresolved: Vec<ItemId>,
}

impl OverlapResolution {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.moves.is_empty() && self.unresolved.is_empty()
    }

    #[must_use]
    pub fn target_of(&self, id: ItemId) -> Option<Cell> {
        self.moves.iter().find(|m| m.id == id).map(|m| m.to)
    }
}

/// Outcome of the drop policy.
#[derive(Debug, Clone, PartialEq)]
pub enum DropResolution {
    /// Nothing overlapped.
    Clear,
    /// Exactly one equal-area item overlapped: the two exchange
    /// position and span. `other_to` is the mover's pre-move placement.
    Swap {
        other: ItemId,
        moved_to: Placement,
        other_to: Placement,
    },
    /// The mover is smaller than an item it hit and moves itself.
    /// `None` when no free cell exists for it.
    RelocateMoved { to: Option<Cell> },
    /// The mover displaces every item it overlaps.
    Displace(OverlapResolution),
}

/// Finds non-overlapping placements after a move or resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlapResolver {
    grid: GridConfig,
}

impl OverlapResolver {
    #[must_use]
    pub const fn new(grid: GridConfig) -> Self {
        Self { grid }
    }

    /// Items on the mover's page whose rounded rectangles intersect it.
    #[must_use]
    pub fn overlapping<'a>(&self, moved: &Item, page_items: &[&'a Item]) -> Vec<&'a Item> {
        page_items
            .iter()
            .copied()
            .filter(|item| item.id() != moved.id() && moved.overlaps(item))
            .collect()
    }

    /// Displace every item `moved` overlaps to its nearest free cell.
    ///
    /// `moved` carries its new placement. Occupancy is seeded with the
    /// mover and every non-overlapping item; each accepted cell is marked
    /// immediately so later items cannot take it.
    #[must_use]
    pub fn resolve(&self, moved: &Item, page_items: &[&Item]) -> OverlapResolution {
        let overlapping = self.overlapping(moved, page_items);
        if overlapping.is_empty() {
            return OverlapResolution::default();
        }

        let displaced: FxHashSet<ItemId> = overlapping.iter().map(|item| item.id()).collect();
        let mut occupancy = GridOccupancy::from_items(
            &self.grid,
            page_items
                .iter()
                .copied()
                .filter(|item| item.page() == moved.page())
                .filter(|item| item.id() != moved.id() && !displaced.contains(&item.id())),
        );
        occupancy.occupy(moved.cell_rect());

        let mut resolution = OverlapResolution::default();
        for item in overlapping {
            let rect = item.cell_rect();
            match self.nearest_free(&occupancy, rect.origin(), rect.span_x, rect.span_y) {
                Some(to) => {
                    occupancy.occupy(CellRect::at(to, rect.span_x, rect.span_y));
                    resolution.moves.push(Relocation { id: item.id(), to });
                }
                None => {
                    tracing::debug!(
                        target: "homegrid.overlap",
                        item = %item.id(),
                        span_x = rect.span_x,
                        span_y = rect.span_y,
                        "overlapped item left unresolved"
                    );
                    resolution.unresolved.push(item.id());
                }
            }
        }
        resolution
    }

    /// Nearest cell (BFS ring order, ties broken Up/Down/Left/Right) where a
    /// `span_x` x `span_y` rectangle fits. The start is clamped into the grid.
    #[must_use]
    pub fn nearest_free(
        &self,
        occupancy: &GridOccupancy,
        start: Cell,
        span_x: i32,
        span_y: i32,
    ) -> Option<Cell> {
        let bounds = self.grid.bounds();
        let start = self.grid.clamp_origin(start, 1, 1);
        if !bounds.contains(start) {
            return None;
        }

        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);

        while let Some(cell) = queue.pop_front() {
            if occupancy.can_place(cell, span_x, span_y) {
                return Some(cell);
            }
            for (dcol, drow) in BFS_DIRECTIONS {
                let next = Cell::new(cell.col + dcol, cell.row + drow);
                if bounds.contains(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Apply the asymmetric drop policy.
    ///
    /// `moved` carries its dropped placement, `origin` its placement before
    /// the drag. `page_items` are the items on the drop page; the mover is
    /// ignored if present.
    #[must_use]
    pub fn resolve_drop(
        &self,
        moved: &Item,
        origin: Placement,
        page_items: &[&Item],
    ) -> DropResolution {
        let overlapping = self.overlapping(moved, page_items);
        if overlapping.is_empty() {
            return DropResolution::Clear;
        }

        let moved_area = moved.area();
        if let [other] = overlapping.as_slice()
            && other.area() == moved_area
        {
            let dropped = moved.placement;
            let theirs = other.placement;
            return DropResolution::Swap {
                other: other.id(),
                moved_to: Placement::new(
                    theirs.col,
                    theirs.row,
                    theirs.span_x,
                    theirs.span_y,
                    dropped.page,
                ),
                other_to: origin,
            };
        }

        self.resolve_by_area(moved, &overlapping, page_items)
    }

    /// The drop policy without the swap: a resized item never hands its
    /// old span to a neighbour.
    #[must_use]
    pub fn resolve_resize(&self, resized: &Item, page_items: &[&Item]) -> DropResolution {
        let overlapping = self.overlapping(resized, page_items);
        if overlapping.is_empty() {
            return DropResolution::Clear;
        }
        self.resolve_by_area(resized, &overlapping, page_items)
    }

    /// Smaller mover relocates itself; otherwise everything it hits moves.
    fn resolve_by_area(&self, moved: &Item, overlapping: &[&Item], page_items: &[&Item]) -> DropResolution {
        let moved_area = moved.area();
        if overlapping.iter().any(|item| item.area() > moved_area) {
            let occupancy = GridOccupancy::from_items(
                &self.grid,
                page_items
                    .iter()
                    .copied()
                    .filter(|item| item.id() != moved.id() && item.page() == moved.page()),
            );
            let rect = moved.cell_rect();
            let to = self.nearest_free(&occupancy, rect.origin(), rect.span_x, rect.span_y);
            return DropResolution::RelocateMoved { to };
        }

        DropResolution::Displace(self.resolve(moved, page_items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemContent;

    fn item(raw: u64, col: f32, row: f32, span_x: f32, span_y: f32) -> Item {
        Item::new(
            ItemId::new(raw).expect("non-zero id"),
            ItemContent::Clock,
            Placement::new(col, row, span_x, span_y, 0),
        )
    }

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).expect("non-zero id")
    }

    #[test]
    fn no_overlap_is_noop() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let moved = item(1, 0.0, 0.0, 1.0, 1.0);
        let other = item(2, 1.0, 0.0, 1.0, 1.0);
        let res = resolver.resolve(&moved, &[&moved, &other]);
        assert!(res.is_noop());
    }

    #[test]
    fn displaced_item_goes_up_first() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let moved = item(1, 1.0, 2.0, 1.0, 1.0);
        let other = item(2, 1.0, 2.0, 1.0, 1.0);
        let res = resolver.resolve(&moved, &[&other]);
        assert_eq!(res.moves, vec![Relocation { id: id(2), to: Cell::new(1, 1) }]);
        assert!(res.unresolved.is_empty());
    }

    #[test]
    fn bfs_tie_break_follows_up_down_left_right() {
        let resolver = OverlapResolver::new(GridConfig::default());
        // Mover covers (1,2); (1,1) is taken, so the next ring member is down.
        let moved = item(1, 1.0, 2.0, 1.0, 1.0);
        let blocker = item(2, 1.0, 1.0, 1.0, 1.0);
        let other = item(3, 1.0, 2.0, 1.0, 1.0);
        let res = resolver.resolve(&moved, &[&blocker, &other]);
        assert_eq!(res.target_of(id(3)), Some(Cell::new(1, 3)));
    }

    #[test]
    fn earlier_items_win_contested_cells() {
        let resolver = OverlapResolver::new(GridConfig::new(3, 1));
        // Mover is 2 wide over (0,0)-(1,0); two 1x1 items under it.
        let moved = item(1, 0.0, 0.0, 2.0, 1.0);
        let a = item(2, 0.0, 0.0, 1.0, 1.0);
        let b = item(3, 1.0, 0.0, 1.0, 1.0);
        let res = resolver.resolve(&moved, &[&a, &b]);
        assert_eq!(res.target_of(id(2)), Some(Cell::new(2, 0)));
        assert_eq!(res.unresolved, vec![id(3)]);
    }

    #[test]
    fn equal_area_single_overlap_swaps() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let origin = Placement::cell(0, 0, 0);
        let moved = item(1, 2.0, 3.0, 1.0, 1.0);
        let other = item(2, 2.0, 3.0, 1.0, 1.0);
        let res = resolver.resolve_drop(&moved, origin, &[&other]);
        assert_eq!(
            res,
            DropResolution::Swap {
                other: id(2),
                moved_to: Placement::cell(2, 3, 0),
                other_to: origin,
            }
        );
    }

    #[test]
    fn resize_onto_equal_area_neighbour_displaces_it() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let resized = item(1, 1.0, 2.0, 2.0, 1.0);
        let wide = item(2, 2.0, 2.0, 2.0, 1.0);
        let DropResolution::Displace(res) = resolver.resolve_resize(&resized, &[&resized, &wide]) else {
            unreachable!("resize never swaps");
        };
        assert_eq!(res.moves.len(), 1);
        assert_eq!(res.moves[0].id, id(2));
        assert!(!resized.cell_rect().intersects(&CellRect::at(res.moves[0].to, 2, 1)));
    }

    #[test]
    fn huge_span_compares_areas_without_overflow() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let huge = item(2, 0.0, 0.0, 70_000.0, 70_000.0);
        let moved = item(1, 3.0, 5.0, 1.0, 1.0);
        let res = resolver.resolve_drop(&moved, Placement::cell(0, 0, 0), &[&huge]);
        assert_eq!(res, DropResolution::RelocateMoved { to: None });
    }

    #[test]
    fn smaller_mover_relocates_itself() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let big = item(2, 0.0, 0.0, 2.0, 2.0);
        let moved = item(1, 1.0, 1.0, 1.0, 1.0);
        let res = resolver.resolve_drop(&moved, Placement::cell(3, 5, 0), &[&big]);
        assert_eq!(res, DropResolution::RelocateMoved { to: Some(Cell::new(1, 2)) });
    }

    #[test]
    fn larger_mover_displaces_everything_it_hits() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let moved = item(1, 0.0, 0.0, 2.0, 2.0);
        let a = item(2, 0.0, 0.0, 1.0, 1.0);
        let b = item(3, 1.0, 1.0, 1.0, 1.0);
        let DropResolution::Displace(res) =
            resolver.resolve_drop(&moved, Placement::cell(3, 5, 0), &[&a, &b])
        else {
            unreachable!("larger mover displaces");
        };
        assert_eq!(res.moves.len(), 2);
        let moved_rect = moved.cell_rect();
        for reloc in &res.moves {
            assert!(!moved_rect.intersects(&CellRect::at(reloc.to, 1, 1)));
        }
    }

    #[test]
    fn equal_area_with_two_overlaps_displaces() {
        let resolver = OverlapResolver::new(GridConfig::default());
        let moved = item(1, 0.0, 0.0, 2.0, 1.0);
        let a = item(2, 0.0, 0.0, 1.0, 2.0);
        let b = item(3, 1.0, 0.0, 1.0, 1.0);
        let res = resolver.resolve_drop(&moved, Placement::cell(3, 5, 0), &[&a, &b]);
        assert!(matches!(res, DropResolution::Displace(_)));
    }

    #[test]
    fn full_page_leaves_overlapped_unresolved() {
        let resolver = OverlapResolver::new(GridConfig::new(1, 1));
        let moved = item(1, 0.0, 0.0, 1.0, 1.0);
        let other = item(2, 0.0, 0.0, 1.0, 1.0);
        let res = resolver.resolve(&moved, &[&other]);
        assert_eq!(res.unresolved, vec![id(2)]);
        assert!(res.moves.is_empty());
    }
}
