//! The single owned item model.
//!
//! [`ItemStore`] holds every top-level item by id, the order items were
//! inserted in (which is the "input-list order" overlap resolution uses and
//! the order persisted), the page count, and the id allocator. Folder and
//! page operations live in [`crate::folder`] and [`crate::pages`] as further
//! `impl ItemStore` blocks, so one owner is mutated through explicit methods.

use std::fmt;

use homegrid_core::geometry::Cell;
use rustc_hash::FxHashMap;

use crate::grid::{GridConfig, LayoutMode};
use crate::item::{IdAllocator, Item, ItemContent, ItemId, ItemKind, Placement, Transform};
use crate::overlap::OverlapResolution;

/// Errors from item store mutations and persistence.
#[derive(Debug)]
pub enum StoreError {
    /// Page index outside `0..page_count`.
    PageOutOfRange { page: usize, page_count: usize },
    /// No top-level item with this id.
    UnknownItem(ItemId),
    /// Reading or writing the backing file failed.
    Io(std::io::Error),
    /// The persisted document was not a JSON array of items.
    Json(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageOutOfRange { page, page_count } => {
                write!(f, "page {page} out of range (page count {page_count})")
            }
            Self::UnknownItem(id) => write!(f, "unknown item {id}"),
            Self::Io(err) => write!(f, "item store I/O error: {err}"),
            Self::Json(err) => write!(f, "item store JSON error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Structural problems found by [`ItemStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreIssue {
    PageOutOfRange { id: ItemId, page: usize },
    SpanBelowOne { id: ItemId },
    UndersizedFolder { id: ItemId, children: usize },
    InvalidFolderMember { folder: ItemId, member: ItemId, kind: ItemKind },
    OrderMismatch,
}

/// Owned `id -> Item` model with insertion order and page count.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStore {
    items: FxHashMap<ItemId, Item>,
    order: Vec<ItemId>,
    pub(crate) page_count: usize,
    ids: IdAllocator,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore {
    /// An empty store with one page.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pages(1)
    }

    /// An empty store with `page_count` pages (at least one).
    #[must_use]
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            items: FxHashMap::default(),
            order: Vec::new(),
            page_count: page_count.max(1),
            ids: IdAllocator::new(),
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reserve a fresh id without inserting anything.
    pub fn allocate_id(&mut self) -> ItemId {
        self.ids.allocate()
    }

    /// Create and append an item.
    pub fn insert(
        &mut self,
        content: ItemContent,
        placement: Placement,
    ) -> Result<ItemId, StoreError> {
        self.check_page(placement.page)?;
        let id = self.ids.allocate();
        self.order.push(id);
        self.items.insert(id, Item::new(id, content, placement));
        Ok(id)
    }

    /// Append an already-built item (its id must come from this store).
    pub fn insert_item(&mut self, item: Item) -> Result<ItemId, StoreError> {
        self.check_page(item.page())?;
        let id = item.id();
        if self.items.insert(id, item).is_none() {
            self.order.push(id);
        }
        Ok(id)
    }

    /// Remove a top-level item.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(item)
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Items on one page, in insertion order.
    #[must_use]
    pub fn page_items(&self, page: usize) -> Vec<&Item> {
        self.items().filter(|item| item.page() == page).collect()
    }

    /// Topmost (last inserted) item on `page` whose rounded rectangle covers `cell`.
    #[must_use]
    pub fn item_at(&self, page: usize, cell: Cell, exclude: Option<ItemId>) -> Option<&Item> {
        self.items()
            .filter(|item| item.page() == page && Some(item.id()) != exclude)
            .filter(|item| item.cell_rect().contains(cell))
            .last()
    }

    /// Position of an id in insertion order.
    #[must_use]
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.order.iter().position(|existing| *existing == id)
    }

    pub fn set_placement(&mut self, id: ItemId, placement: Placement) -> Result<(), StoreError> {
        self.check_page(placement.page)?;
        let item = self.get_mut(id).ok_or(StoreError::UnknownItem(id))?;
        item.placement = placement;
        Ok(())
    }

    pub fn set_transform(&mut self, id: ItemId, transform: Transform) -> Result<(), StoreError> {
        let item = self.get_mut(id).ok_or(StoreError::UnknownItem(id))?;
        item.transform = transform;
        Ok(())
    }

    /// Settle one item for the given layout mode (snap + transform reset in
    /// grid mode).
    pub fn settle(&mut self, id: ItemId, mode: LayoutMode) -> Result<(), StoreError> {
        let item = self.get_mut(id).ok_or(StoreError::UnknownItem(id))?;
        item.settle(mode);
        Ok(())
    }

    /// Commit the relocations of an overlap resolution. Unresolved items are
    /// left untouched. Unknown ids are skipped.
    pub fn apply_resolution(&mut self, resolution: &OverlapResolution) {
        for reloc in &resolution.moves {
            if let Some(item) = self.get_mut(reloc.id) {
                item.placement = item
                    .placement
                    .moved_to(reloc.to.col as f32, reloc.to.row as f32);
            }
        }
    }

    /// Shrink spans wider or taller than `grid`, folder members included.
    /// Returns how many items were shrunk.
    pub fn fit_spans_to(&mut self, grid: &GridConfig) -> usize {
        let max_x = f32::from(grid.columns.max(1));
        let max_y = f32::from(grid.rows.max(1));
        let fitted: usize = self
            .items
            .values_mut()
            .map(|item| fit_span(item, max_x, max_y))
            .sum();
        if fitted > 0 {
            tracing::warn!(
                target: "homegrid.store",
                fitted,
                columns = grid.columns,
                rows = grid.rows,
                "spans larger than the grid were shrunk"
            );
        }
        fitted
    }

    pub(crate) fn check_page(&self, page: usize) -> Result<(), StoreError> {
        if page >= self.page_count {
            return Err(StoreError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    /// Replace an item in place, keeping its slot in insertion order.
    pub(crate) fn replace_at_slot(&mut self, old: ItemId, new_item: Item) {
        let new_id = new_item.id();
        match self.index_of(old) {
            Some(index) => {
                self.items.remove(&old);
                self.order[index] = new_id;
                self.items.insert(new_id, new_item);
            }
            None => {
                self.order.push(new_id);
                self.items.insert(new_id, new_item);
            }
        }
    }

    /// Inspect structural invariants.
    #[must_use]
    pub fn validate(&self) -> Vec<StoreIssue> {
        let mut issues = Vec::new();
        if self.order.len() != self.items.len()
            || self.order.iter().any(|id| !self.items.contains_key(id))
        {
            issues.push(StoreIssue::OrderMismatch);
        }
        for item in self.items() {
            if item.page() >= self.page_count {
                issues.push(StoreIssue::PageOutOfRange {
                    id: item.id(),
                    page: item.page(),
                });
            }
            if item.placement.span_x < 1.0 || item.placement.span_y < 1.0 {
                issues.push(StoreIssue::SpanBelowOne { id: item.id() });
            }
            if let Some(folder) = item.folder() {
                if folder.len() < 2 {
                    issues.push(StoreIssue::UndersizedFolder {
                        id: item.id(),
                        children: folder.len(),
                    });
                }
                for child in folder.children() {
                    if !child.kind().can_join_folder() {
                        issues.push(StoreIssue::InvalidFolderMember {
                            folder: item.id(),
                            member: child.id(),
                            kind: child.kind(),
                        });
                    }
                }
            }
        }
        issues
    }

    /// Deterministic FNV-1a hash over order, page count and item contents.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hash = OFFSET_BASIS;
        mix_u64(&mut hash, self.page_count as u64);
        mix_u64(&mut hash, self.ids.peek());
        for item in self.items() {
            mix_item(&mut hash, item);
        }
        hash
    }
}

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0001_0000_01b3;

fn mix(hash: &mut u64, byte: u8) {
    *hash ^= u64::from(byte);
    *hash = hash.wrapping_mul(PRIME);
}

fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        mix(hash, *byte);
    }
}

fn mix_u64(hash: &mut u64, value: u64) {
    mix_bytes(hash, &value.to_le_bytes());
}

fn mix_f32(hash: &mut u64, value: f32) {
    mix_bytes(hash, &value.to_bits().to_le_bytes());
}

fn mix_str(hash: &mut u64, value: &str) {
    mix_u64(hash, value.len() as u64);
    mix_bytes(hash, value.as_bytes());
}

fn mix_item(hash: &mut u64, item: &Item) {
    mix_u64(hash, item.id().get());
    mix_str(hash, item.kind().as_str());
    let p = item.placement;
    for value in [p.col, p.row, p.span_x, p.span_y] {
        mix_f32(hash, value);
    }
    mix_u64(hash, p.page as u64);
    let t = item.transform;
    for value in [t.rotation, t.scale_x, t.scale_y, t.tilt_x, t.tilt_y] {
        mix_f32(hash, value);
    }
    match &item.content {
        ItemContent::App(app) => {
            mix_str(hash, &app.package_name);
            mix_str(hash, &app.class_name);
        }
        ItemContent::Widget { widget_id } => mix_bytes(hash, &widget_id.to_le_bytes()),
        ItemContent::Clock => {}
        ItemContent::Folder(folder) => {
            mix_str(hash, &folder.name);
            mix_u64(hash, folder.len() as u64);
            for child in folder.children() {
                mix_item(hash, child);
            }
        }
    }
}

fn fit_span(item: &mut Item, max_x: f32, max_y: f32) -> usize {
    let placement = &mut item.placement;
    let mut fitted = usize::from(placement.span_x > max_x || placement.span_y > max_y);
    placement.span_x = placement.span_x.min(max_x);
    placement.span_y = placement.span_y.min(max_y);
    if let ItemContent::Folder(folder) = &mut item.content {
        for child in &mut folder.children {
            fitted += fit_span(child, max_x, max_y);
        }
    }
    fitted
}
