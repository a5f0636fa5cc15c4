#![forbid(unsafe_code)]

//! The arrangement engine: where items live on a paged grid.
//!
//! Everything here is synchronous and single-owner. [`ItemStore`] is the one
//! mutable model; occupancy is rebuilt from it for every query; placement and
//! overlap resolution are pure functions over borrowed items; folder and page
//! operations are methods on the store.
//!
//! ```
//! use homegrid_layout::{GridConfig, ItemContent, ItemStore, Placement, PlacementEngine};
//!
//! let grid = GridConfig::default();
//! let mut store = ItemStore::new();
//! let engine = PlacementEngine::new(grid);
//! let cell = engine
//!     .find_spawn_position(1, 1, store.page_items(0))
//!     .expect("empty page has room");
//! let id = store
//!     .insert(ItemContent::Clock, Placement::cell(cell.col, cell.row, 0))
//!     .expect("page 0 exists");
//! assert_eq!(store.get(id).map(|item| item.cell_rect().origin()), Some(cell));
//! ```

pub mod folder;
pub mod grid;
pub mod item;
pub mod overlap;
pub mod pages;
pub mod persist;
pub mod placement;
pub mod store;

pub use folder::{
    FolderChange, FolderError, FolderObserver, FolderRemoval, FolderRenderError, RemoveOutcome,
    Unobserved,
};
pub use grid::{DEFAULT_COLUMNS, DEFAULT_ROWS, GridConfig, GridOccupancy, LayoutMode};
pub use item::{
    AppRef, DEFAULT_FOLDER_NAME, Folder, Item, ItemContent, ItemId, ItemKind, MemberRef,
    Placement, Transform,
};
pub use overlap::{DropResolution, OverlapResolution, OverlapResolver, Relocation};
pub use pages::PageError;
pub use persist::{
    DecodedRecords, ItemRecord, ItemStoreBackend, JsonFileBackend, LoadReport, MemoryBackend,
    decode_records, encode_records,
};
pub use placement::{PlacementEngine, SpiralCells};
pub use store::{ItemStore, StoreError, StoreIssue};

pub use homegrid_core::geometry::{Cell, CellRect};
