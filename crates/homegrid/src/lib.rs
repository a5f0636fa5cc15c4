#![forbid(unsafe_code)]

//! Homegrid public facade.
//!
//! Re-exports the arrangement engine (`homegrid-layout`), the interaction
//! layer (`homegrid-runtime`) and the shared geometry and input types
//! (`homegrid-core`), plus a top-level [`Error`] and a prelude.
//!
//! ```
//! use homegrid::prelude::*;
//!
//! fn build() -> homegrid::Result<HomeScreen> {
//!     let mut home = HomeScreen::new(HomeConfig::default())?;
//!     home.set_viewport(Size::new(400.0, 600.0));
//!     home.spawn(ItemContent::Clock, 2, 1)?;
//!     Ok(home)
//! }
//!
//! let home = build().expect("default setup");
//! assert_eq!(home.store().len(), 1);
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use homegrid_core::event::{PointerEvent, PointerEventKind, SwipeDirection};
pub use homegrid_core::geometry::{Cell, CellMetrics, CellRect, Point, Size};

// --- Layout re-exports -----------------------------------------------------

pub use homegrid_layout::{
    AppRef, DropResolution, Folder, FolderChange, FolderError, FolderObserver, FolderRemoval,
    FolderRenderError, GridConfig, GridOccupancy, Item, ItemContent, ItemId, ItemKind, ItemRecord,
    ItemStore, ItemStoreBackend, JsonFileBackend, LayoutMode, LoadReport, MemberRef,
    MemoryBackend, OverlapResolution, OverlapResolver, PageError, Placement, PlacementEngine,
    Relocation, RemoveOutcome, StoreError, StoreIssue, Transform,
};

// --- Runtime re-exports ----------------------------------------------------

pub use homegrid_runtime::{
    AppSource, ArrangementPolicy, CancelReason, ConfigError, DragController, DragControllerError,
    DragEffect, DragPhase, DragState, DragTransition, EdgeSide, EngineError, HomeConfig,
    HomeEvent, HomeScreen, IconRequest, IconRequester, IconResponse, IconServer,
    InteractionConfig, RevertReason, SettleOutcome, SwipeIntent, TimerKind, UnresolvedPolicy,
    WidgetError, WidgetHost, WidgetSizeHints, icon_channel,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for homegrid hosts.
#[derive(Debug)]
pub enum Error {
    Engine(EngineError),
    Folder(FolderError),
    Store(StoreError),
    Page(PageError),
    Config(ConfigError),
    Drag(DragControllerError),
    Widget(WidgetError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Folder(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Page(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Drag(err) => write!(f, "{err}"),
            Self::Widget(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Folder(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Page(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Drag(err) => Some(err),
            Self::Widget(err) => Some(err),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Folder(err) => Self::Folder(err),
            EngineError::Store(err) => Self::Store(err),
            EngineError::Page(err) => Self::Page(err),
            EngineError::Config(err) => Self::Config(err),
            EngineError::Drag(err) => Self::Drag(err),
            EngineError::Widget(err) => Self::Widget(err),
            other => Self::Engine(other),
        }
    }
}

impl From<FolderError> for Error {
    fn from(err: FolderError) -> Self {
        Self::Folder(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PageError> for Error {
    fn from(err: PageError) -> Self {
        Self::Page(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<DragControllerError> for Error {
    fn from(err: DragControllerError) -> Self {
        Self::Drag(err)
    }
}

impl From<WidgetError> for Error {
    fn from(err: WidgetError) -> Self {
        Self::Widget(err)
    }
}

/// Standard result type for homegrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AppRef, Cell, Error, GridConfig, HomeConfig, HomeEvent, HomeScreen, Item, ItemContent,
        ItemId, ItemStore, LayoutMode, Placement, Point, PointerEvent, Result, SettleOutcome,
        Size,
    };

    pub use crate::{core, layout, runtime};
}

pub use homegrid_core as core;
pub use homegrid_layout as layout;
pub use homegrid_runtime as runtime;

/// Monotonic clock used for pointer timestamps and timer deadlines.
pub use web_time::{Duration, Instant};
