#![forbid(unsafe_code)]

//! The home screen: drag controller plus item store plus drop policy.
//!
//! [`HomeScreen`] owns the [`ItemStore`] and the [`DragController`]. The
//! host forwards pointer events and timer ticks and renders whatever the
//! returned [`HomeEvent`]s describe. While a drag is in flight the store is
//! untouched; the dragged item's on-screen position is derived from the
//! pointer delta and only committed on drop.

use std::fmt;

use homegrid_core::event::PointerEvent;
use homegrid_core::geometry::{Cell, CellMetrics, Point, Size};
use homegrid_layout::{
    AppRef, DropResolution, FolderError, FolderObserver, Item, ItemContent, ItemId, ItemKind,
    ItemRecord, ItemStore, ItemStoreBackend, LayoutMode, LoadReport, MemberRef, OverlapResolver,
    PageError, Placement, PlacementEngine, StoreError, Unobserved,
};
use web_time::Instant;

use crate::collab::{
    AppSource, IconChannelClosed, IconRequester, IconResponse, WidgetError, WidgetHost,
    WidgetSizeHints,
};
use crate::config::{ConfigError, HomeConfig, UnresolvedPolicy};
use crate::drag::{
    CancelReason, DragController, DragControllerError, DragEffect, DragState, DragTransition,
    EdgeSide, SwipeIntent,
};

/// What the host should show or do after an input.
#[derive(Debug, Clone, PartialEq)]
pub enum HomeEvent {
    Launch { item: ItemId, app: AppRef },
    OpenFolder { folder: ItemId },
    ContextMenu { at: Point },
    Swipe(SwipeIntent),
    PageChanged { page: usize },
    PageCreated { page: usize },
    DragStarted { item: ItemId },
    /// Pixel top-left of the dragged item on screen.
    DragMoved { item: ItemId, top_left: Point },
    Settled { item: ItemId, outcome: SettleOutcome },
    DragCancelled {
        item: Option<ItemId>,
        reason: CancelReason,
    },
}

/// How a drop or resize was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Nothing was in the way.
    Moved { to: Cell, page: usize },
    Swapped { other: ItemId },
    /// The item was smaller than what it hit and moved to the nearest free cell.
    Relocated { to: Cell },
    /// Overlapped items were pushed aside.
    Displaced {
        moved: Vec<ItemId>,
        relocated_elsewhere: Vec<ItemId>,
        left_overlapping: Vec<ItemId>,
    },
    MergedIntoFolder { folder: ItemId },
    AddedToFolder { folder: ItemId },
    /// The item is back at its pre-drag placement.
    Reverted { reason: RevertReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertReason {
    /// The folder render hook refused the change.
    FolderRejected,
    NoFreeCell,
    /// The item was removed while it was being dragged.
    ItemMissing,
}

/// Errors from [`HomeScreen`] operations.
#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Drag(DragControllerError),
    Folder(FolderError),
    Store(StoreError),
    Page(PageError),
    Widget(WidgetError),
    UnknownItem(ItemId),
    /// Structural changes are refused while a gesture is active.
    GestureActive,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration: {err}"),
            Self::Drag(err) => write!(f, "interaction config: {err}"),
            Self::Folder(err) => write!(f, "folder: {err}"),
            Self::Store(err) => write!(f, "item store: {err}"),
            Self::Page(err) => write!(f, "pages: {err}"),
            Self::Widget(err) => write!(f, "widget host: {err}"),
            Self::UnknownItem(id) => write!(f, "no item with id {id}"),
            Self::GestureActive => f.write_str("a gesture is in progress"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Drag(err) => Some(err),
            Self::Folder(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Page(err) => Some(err),
            Self::Widget(err) => Some(err),
            Self::UnknownItem(_) | Self::GestureActive => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<DragControllerError> for EngineError {
    fn from(err: DragControllerError) -> Self {
        Self::Drag(err)
    }
}

impl From<FolderError> for EngineError {
    fn from(err: FolderError) -> Self {
        Self::Folder(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PageError> for EngineError {
    fn from(err: PageError) -> Self {
        Self::Page(err)
    }
}

impl From<WidgetError> for EngineError {
    fn from(err: WidgetError) -> Self {
        Self::Widget(err)
    }
}

/// Bookkeeping for the drag in flight.
#[derive(Debug, Clone)]
struct DragSession {
    item: ItemId,
    origin: Placement,
    /// Pages appended by edge holds during this session, in creation order.
    created_pages: Vec<usize>,
}

/// What put an item at its new placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    Drop,
    Resize,
}

/// The orchestrator. Single-threaded; owned by the host's event loop.
pub struct HomeScreen {
    config: HomeConfig,
    store: ItemStore,
    drag: DragController,
    placement: PlacementEngine,
    resolver: OverlapResolver,
    current_page: usize,
    metrics: CellMetrics,
    session: Option<DragSession>,
    folder_observer: Option<Box<dyn FolderObserver>>,
    icons: Option<IconRequester>,
}

impl fmt::Debug for HomeScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeScreen")
            .field("config", &self.config)
            .field("items", &self.store.len())
            .field("page_count", &self.store.page_count())
            .field("current_page", &self.current_page)
            .field("drag", &self.drag.state())
            .finish_non_exhaustive()
    }
}

impl HomeScreen {
    /// Empty home screen with one page.
    pub fn new(config: HomeConfig) -> Result<Self, EngineError> {
        Self::with_store(config, ItemStore::new())
    }

    /// Spans larger than the configured grid are shrunk to fit.
    pub fn with_store(config: HomeConfig, mut store: ItemStore) -> Result<Self, EngineError> {
        let config = config.validated()?;
        store.fit_spans_to(&config.grid);
        let drag = DragController::new(config.interaction_config())?;
        Ok(Self {
            placement: PlacementEngine::new(config.grid),
            resolver: OverlapResolver::new(config.grid),
            metrics: CellMetrics::new(1.0, 1.0),
            config,
            store,
            drag,
            current_page: 0,
            session: None,
            folder_observer: None,
            icons: None,
        })
    }

    /// Load items through a backend. Malformed records are repaired or
    /// dropped; see [`LoadReport`].
    pub fn load(
        config: HomeConfig,
        backend: &mut impl ItemStoreBackend,
    ) -> Result<(Self, LoadReport), EngineError> {
        let (mut store, mut report) = ItemStore::load_from(backend)?;
        report.fitted_spans = store.fit_spans_to(&config.grid);
        tracing::info!(
            target: "homegrid.engine",
            loaded = report.loaded,
            dropped = report.dropped,
            fitted_spans = report.fitted_spans,
            pages = store.page_count(),
            "home screen loaded"
        );
        Ok((Self::with_store(config, store)?, report))
    }

    pub fn save(&self, backend: &mut impl ItemStoreBackend) -> Result<(), EngineError> {
        Ok(self.store.save_to(backend)?)
    }

    #[must_use]
    pub fn records(&self) -> Vec<ItemRecord> {
        self.store.to_records()
    }

    #[must_use]
    pub const fn config(&self) -> &HomeConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &ItemStore {
        &self.store
    }

    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub const fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// When the host should next call [`tick`](Self::tick), if ever.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.drag.next_deadline()
    }

    #[must_use]
    pub const fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    /// Resize the drawing surface. Cell metrics follow the grid config.
    pub fn set_viewport(&mut self, viewport: Size) {
        let grid = self.config.grid;
        self.metrics = CellMetrics::for_viewport(viewport, grid.columns, grid.rows);
        self.drag.set_viewport(viewport);
    }

    /// Install the render hook consulted by every folder operation.
    pub fn set_folder_observer(&mut self, observer: Box<dyn FolderObserver>) {
        self.folder_observer = Some(observer);
    }

    pub fn set_icon_requester(&mut self, requester: IconRequester) {
        self.icons = Some(requester);
    }

    pub fn set_current_page(&mut self, page: usize) -> Result<(), PageError> {
        if page >= self.store.page_count() {
            return Err(PageError::OutOfRange {
                index: page,
                page_count: self.store.page_count(),
            });
        }
        self.current_page = page;
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Input
    // ----------------------------------------------------------------------

    /// Feed one pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Vec<HomeEvent> {
        let hit = self.hit_test(event.position);
        let transition = self.drag.apply_event(&event, hit);
        let mut events = Vec::new();
        self.react(transition, &mut events);
        events
    }

    /// Fire due timers.
    pub fn tick(&mut self, now: Instant) -> Vec<HomeEvent> {
        let mut events = Vec::new();
        for transition in self.drag.tick(now) {
            self.react(transition, &mut events);
        }
        events
    }

    /// Abandon the active gesture; a dragged item returns to its origin.
    pub fn cancel_gesture(&mut self) -> Vec<HomeEvent> {
        let mut events = Vec::new();
        if let Some(transition) = self.drag.force_cancel() {
            self.react(transition, &mut events);
        }
        events
    }

    /// Top-level item under a pixel point on the current page.
    #[must_use]
    pub fn hit_test(&self, position: Point) -> Option<ItemId> {
        let cell = self.metrics.cell_at(position);
        self.store
            .item_at(self.current_page, cell, None)
            .map(Item::id)
    }

    fn react(&mut self, transition: DragTransition, events: &mut Vec<HomeEvent>) {
        for effect in transition.effects {
            match effect {
                DragEffect::Tap { target: Some(id), .. } => {
                    if let Some(item) = self.store.get(id) {
                        match &item.content {
                            ItemContent::App(app) => events.push(HomeEvent::Launch {
                                item: id,
                                app: app.clone(),
                            }),
                            ItemContent::Folder(_) => events.push(HomeEvent::OpenFolder { folder: id }),
                            ItemContent::Widget { .. } | ItemContent::Clock => {}
                        }
                    }
                }
                DragEffect::ContextMenu { at } => events.push(HomeEvent::ContextMenu { at }),
                DragEffect::Swipe { intent, .. } => {
                    events.push(HomeEvent::Swipe(intent));
                    match intent {
                        SwipeIntent::NextPage => self.turn_page(EdgeSide::Right, events),
                        SwipeIntent::PreviousPage => self.turn_page(EdgeSide::Left, events),
                        SwipeIntent::OpenDrawer | SwipeIntent::OpenNotifications => {}
                    }
                }
                DragEffect::DragStarted { item, .. } => self.begin_session(item, events),
                DragEffect::DragMoved {
                    item,
                    total_dx,
                    total_dy,
                    ..
                } => {
                    if let Some(session) = &self.session {
                        let top_left = self
                            .metrics
                            .to_pixels(session.origin.col, session.origin.row)
                            .offset(total_dx, total_dy);
                        events.push(HomeEvent::DragMoved { item, top_left });
                    }
                }
                DragEffect::PageTurnRequested { side } => self.turn_page(side, events),
                DragEffect::NewPageRequested { side } => self.create_page_at_edge(side, events),
                DragEffect::Dropped {
                    item,
                    total_dx,
                    total_dy,
                    ..
                } => {
                    let outcome = match self.session.take() {
                        Some(session) => self.settle_drop(&session, total_dx, total_dy),
                        None => SettleOutcome::Reverted {
                            reason: RevertReason::ItemMissing,
                        },
                    };
                    tracing::debug!(
                        target: "homegrid.engine",
                        item = %item,
                        outcome = ?outcome,
                        "drop settled"
                    );
                    events.push(HomeEvent::Settled { item, outcome });
                }
                DragEffect::Cancelled { item, reason } => {
                    self.abandon_session(events);
                    if item.is_some() {
                        events.push(HomeEvent::DragCancelled { item, reason });
                    }
                }
                DragEffect::Pressed { .. }
                | DragEffect::Tap { target: None, .. }
                | DragEffect::EdgeEntered { .. }
                | DragEffect::EdgeLeft { .. }
                | DragEffect::Noop { .. } => {}
            }
        }
    }

    fn begin_session(&mut self, item: ItemId, events: &mut Vec<HomeEvent>) {
        let Some(origin) = self.store.get(item).map(|found| found.placement) else {
            tracing::warn!(target: "homegrid.engine", item = %item, "long-pressed item vanished");
            self.drag.force_cancel();
            events.push(HomeEvent::DragCancelled {
                item: Some(item),
                reason: CancelReason::Programmatic,
            });
            return;
        };
        self.session = Some(DragSession {
            item,
            origin,
            created_pages: Vec::new(),
        });
        events.push(HomeEvent::DragStarted { item });
    }

    fn turn_page(&mut self, side: EdgeSide, events: &mut Vec<HomeEvent>) {
        let next = match side {
            EdgeSide::Left => self.current_page.checked_sub(1),
            EdgeSide::Right => Some(self.current_page + 1).filter(|page| *page < self.store.page_count()),
        };
        if let Some(page) = next {
            self.current_page = page;
            tracing::debug!(target: "homegrid.engine", page, ?side, "page turned");
            events.push(HomeEvent::PageChanged { page });
        }
    }

    /// Only the right edge of the last page creates pages, and only while
    /// that page holds something besides the dragged item.
    fn create_page_at_edge(&mut self, side: EdgeSide, events: &mut Vec<HomeEvent>) {
        let last = self.store.page_count() - 1;
        if side != EdgeSide::Right || self.current_page != last {
            return;
        }
        let dragged = self.session.as_ref().map(|session| session.item);
        let occupied = self
            .store
            .items()
            .any(|item| item.page() == last && Some(item.id()) != dragged);
        if !occupied {
            return;
        }
        let page = self.store.add_page();
        if let Some(session) = &mut self.session {
            session.created_pages.push(page);
        }
        self.current_page = page;
        tracing::info!(target: "homegrid.engine", page, "page created during drag");
        events.push(HomeEvent::PageCreated { page });
        events.push(HomeEvent::PageChanged { page });
    }

    fn abandon_session(&mut self, events: &mut Vec<HomeEvent>) {
        let Some(session) = self.session.take() else {
            return;
        };
        for page in session.created_pages.iter().rev() {
            if self.store.is_page_empty(*page) {
                if let Err(err) = self.store.remove_page(*page) {
                    tracing::warn!(target: "homegrid.engine", error = %err, "could not remove drag page");
                }
            }
        }
        let page = session.origin.page.min(self.store.page_count() - 1);
        if page != self.current_page {
            self.current_page = page;
            events.push(HomeEvent::PageChanged { page });
        }
    }

    // ----------------------------------------------------------------------
    // Drop reconciliation
    // ----------------------------------------------------------------------

    fn settle_drop(&mut self, session: &DragSession, total_dx: f32, total_dy: f32) -> SettleOutcome {
        let Some(moved) = self.store.get(session.item) else {
            return SettleOutcome::Reverted {
                reason: RevertReason::ItemMissing,
            };
        };
        let moved_kind = moved.kind();
        let origin = session.origin;
        let page = self.current_page;

        let (dx_cells, dy_cells) = self.metrics.to_cell_space(Point::new(total_dx, total_dy));
        let top_col = origin.col + dx_cells;
        let top_row = origin.row + dy_cells;
        let centroid = (top_col + origin.span_x / 2.0, top_row + origin.span_y / 2.0);
        let centroid_cell = Cell::new(centroid.0.floor() as i32, centroid.1.floor() as i32);

        if let Some(outcome) = self.try_folder_drop(session.item, moved_kind, page, centroid, centroid_cell) {
            return outcome;
        }

        let outcome = match self.config.grid.layout_mode {
            LayoutMode::Grid => {
                let rect = origin.cell_rect();
                let cell = self.config.grid.clamp_origin(
                    Cell::new(top_col.round() as i32, top_row.round() as i32),
                    rect.span_x,
                    rect.span_y,
                );
                let target = Placement::new(cell.col as f32, cell.row as f32, origin.span_x, origin.span_y, page);
                self.commit_placement(session.item, origin, target, Commit::Drop)
            }
            LayoutMode::Freeform => {
                let max_col = (f32::from(self.config.grid.columns) - origin.span_x).max(0.0);
                let max_row = (f32::from(self.config.grid.rows) - origin.span_y).max(0.0);
                let target = Placement::new(
                    top_col.clamp(0.0, max_col),
                    top_row.clamp(0.0, max_row),
                    origin.span_x,
                    origin.span_y,
                    page,
                );
                match self.store.set_placement(session.item, target) {
                    Ok(()) => SettleOutcome::Moved {
                        to: target.cell_rect().origin(),
                        page,
                    },
                    Err(_) => SettleOutcome::Reverted {
                        reason: RevertReason::ItemMissing,
                    },
                }
            }
        };

        if self.config.arrangement.trim_empty_pages_after_settle {
            self.store.trim_empty_trailing_pages();
            self.current_page = self.current_page.min(self.store.page_count() - 1);
        }
        outcome
    }

    /// Folder add or merge when the centroid lands in a target's folder zone.
    fn try_folder_drop(
        &mut self,
        dragged: ItemId,
        dragged_kind: ItemKind,
        page: usize,
        centroid: (f32, f32),
        centroid_cell: Cell,
    ) -> Option<SettleOutcome> {
        if !dragged_kind.can_join_folder() {
            return None;
        }
        let target = self.store.item_at(page, centroid_cell, Some(dragged))?;
        let zone = self.config.interaction.folder_zone_fraction;
        let placement = target.placement;
        let center_x = placement.col + placement.span_x / 2.0;
        let center_y = placement.row + placement.span_y / 2.0;
        let in_zone = (centroid.0 - center_x).abs() <= placement.span_x * zone / 2.0
            && (centroid.1 - center_y).abs() <= placement.span_y * zone / 2.0;
        if !in_zone {
            return None;
        }

        let target_id = target.id();
        let target_kind = target.kind();
        let mut fallback = Unobserved;
        let observer: &mut dyn FolderObserver = match self.folder_observer.as_deref_mut() {
            Some(observer) => observer,
            None => &mut fallback,
        };

        let result = if target_kind == ItemKind::Folder {
            self.store
                .add_to_folder_with(target_id, dragged, observer)
                .map(|()| SettleOutcome::AddedToFolder { folder: target_id })
        } else if target_kind.can_join_folder() {
            self.store
                .merge_to_folder_with(target_id, dragged, observer)
                .map(|folder| SettleOutcome::MergedIntoFolder { folder })
        } else {
            return None;
        };

        Some(result.unwrap_or_else(|err| {
            tracing::warn!(
                target: "homegrid.engine",
                item = %dragged,
                target = %target_id,
                error = %err,
                "folder drop rejected; item returns to its origin"
            );
            SettleOutcome::Reverted {
                reason: RevertReason::FolderRejected,
            }
        }))
    }

    /// Commit `target` for `id` through the asymmetric overlap policy.
    /// `origin` is where the item was before the move.
    fn commit_placement(
        &mut self,
        id: ItemId,
        origin: Placement,
        target: Placement,
        commit: Commit,
    ) -> SettleOutcome {
        let Some(current) = self.store.get(id) else {
            return SettleOutcome::Reverted {
                reason: RevertReason::ItemMissing,
            };
        };
        let mut candidate = current.clone();
        candidate.placement = target;
        let resolution = {
            let page_items = self.store.page_items(target.page);
            match commit {
                Commit::Drop => self.resolver.resolve_drop(&candidate, origin, &page_items),
                Commit::Resize => self.resolver.resolve_resize(&candidate, &page_items),
            }
        };

        match resolution {
            DropResolution::Clear => {
                self.place(id, target);
                SettleOutcome::Moved {
                    to: target.cell_rect().origin(),
                    page: target.page,
                }
            }
            DropResolution::Swap {
                other,
                moved_to,
                other_to,
            } => {
                self.place(id, moved_to);
                self.place(other, other_to);
                SettleOutcome::Swapped { other }
            }
            DropResolution::RelocateMoved { to: Some(cell) } => {
                self.place(id, target.moved_to(cell.col as f32, cell.row as f32));
                SettleOutcome::Relocated { to: cell }
            }
            DropResolution::RelocateMoved { to: None } => {
                self.place(id, origin);
                SettleOutcome::Reverted {
                    reason: RevertReason::NoFreeCell,
                }
            }
            DropResolution::Displace(resolution) => {
                self.place(id, target);
                self.store.apply_resolution(&resolution);
                let moved: Vec<ItemId> = resolution.moves.iter().map(|reloc| reloc.id).collect();
                for other in &moved {
                    self.settle(*other);
                }
                let (relocated_elsewhere, left_overlapping) = match self.config.arrangement.unresolved {
                    UnresolvedPolicy::LeaveInPlace => (Vec::new(), resolution.unresolved),
                    UnresolvedPolicy::RelocateToOtherPage => {
                        for other in &resolution.unresolved {
                            self.relocate_to_other_page(*other, target.page);
                        }
                        (resolution.unresolved, Vec::new())
                    }
                };
                SettleOutcome::Displaced {
                    moved,
                    relocated_elsewhere,
                    left_overlapping,
                }
            }
        }
    }

    fn place(&mut self, id: ItemId, placement: Placement) {
        if let Err(err) = self.store.set_placement(id, placement) {
            tracing::warn!(target: "homegrid.engine", item = %id, error = %err, "placement not committed");
            return;
        }
        self.settle(id);
    }

    fn settle(&mut self, id: ItemId) {
        if let Err(err) = self.store.settle(id, self.config.grid.layout_mode) {
            tracing::warn!(target: "homegrid.engine", item = %id, error = %err, "settle failed");
        }
    }

    fn relocate_to_other_page(&mut self, id: ItemId, avoid: usize) {
        let Some(item) = self.store.get(id) else {
            return;
        };
        let rect = item.cell_rect();
        let placement = item.placement;
        let (page, cell) = self.find_slot(rect.span_x, rect.span_y, None, Some(avoid));
        tracing::debug!(target: "homegrid.engine", item = %id, page, "unresolved item moved to another page");
        self.place(
            id,
            Placement::new(cell.col as f32, cell.row as f32, placement.span_x, placement.span_y, page),
        );
    }

    /// First free spawn cell: `preferred` page, then every other page in
    /// index order except `skip`, then a new page.
    fn find_slot(
        &mut self,
        span_x: i32,
        span_y: i32,
        preferred: Option<usize>,
        skip: Option<usize>,
    ) -> (usize, Cell) {
        let (span_x, span_y) = self.config.grid.clamp_span(span_x, span_y);
        let page_count = self.store.page_count();
        let candidates = preferred
            .filter(|page| *page < page_count)
            .into_iter()
            .chain((0..page_count).filter(|page| Some(*page) != preferred && Some(*page) != skip));
        for page in candidates {
            if let Some(cell) = self
                .placement
                .find_spawn_position(span_x, span_y, self.store.page_items(page))
            {
                return (page, cell);
            }
        }
        let page = self.store.add_page();
        tracing::debug!(target: "homegrid.engine", page, span_x, span_y, "every page full; page appended");
        let cell = self.placement.center(span_x, span_y).unwrap_or_else(|| {
            tracing::warn!(target: "homegrid.engine", span_x, span_y, "no center for span; using top-left");
            Cell::default()
        });
        (page, cell)
    }

    // ----------------------------------------------------------------------
    // Item operations
    // ----------------------------------------------------------------------

    /// Place a new item: current page first, then other pages, then a new page.
    pub fn spawn(&mut self, content: ItemContent, span_x: i32, span_y: i32) -> Result<ItemId, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        let (span_x, span_y) = self.config.grid.clamp_span(span_x, span_y);
        let (page, cell) = self.find_slot(span_x, span_y, Some(self.current_page), None);
        let app = match &content {
            ItemContent::App(app) => Some(app.clone()),
            _ => None,
        };
        let id = self.store.insert(
            content,
            Placement::new(cell.col as f32, cell.row as f32, span_x as f32, span_y as f32, page),
        )?;
        tracing::debug!(target: "homegrid.engine", item = %id, page, col = cell.col, row = cell.row, "item spawned");
        if let (Some(app), Some(icons)) = (app, &self.icons)
            && icons.request(id, app).is_err()
        {
            tracing::debug!(target: "homegrid.engine", "icon channel closed; request dropped");
        }
        Ok(id)
    }

    /// Allocate and bind a widget, then spawn it. The widget id is released
    /// if binding or spawning fails.
    pub fn spawn_widget(
        &mut self,
        host: &mut impl WidgetHost,
        provider: &AppRef,
        span_x: i32,
        span_y: i32,
    ) -> Result<ItemId, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        let widget_id = host.allocate_id()?;
        if let Err(err) = host.bind(widget_id, provider) {
            host.release(widget_id);
            return Err(err.into());
        }
        self.spawn(ItemContent::Widget { widget_id }, span_x, span_y)
            .inspect_err(|_| host.release(widget_id))
    }

    /// Size hints for a widget item at its current span.
    #[must_use]
    pub fn widget_size_hints(&self, id: ItemId) -> Option<WidgetSizeHints> {
        let item = self.store.get(id)?;
        item.widget_id()?;
        Some(WidgetSizeHints::for_span(
            item.placement.span_x,
            item.placement.span_y,
            self.metrics,
        ))
    }

    /// Change an item's span and resolve what it now overlaps.
    pub fn resize_item(&mut self, id: ItemId, span_x: i32, span_y: i32) -> Result<SettleOutcome, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        let origin = self.store.get(id).ok_or(EngineError::UnknownItem(id))?.placement;
        let (span_x, span_y) = self.config.grid.clamp_span(span_x, span_y);
        let cell = self
            .config
            .grid
            .clamp_origin(origin.cell_rect().origin(), span_x, span_y);
        let target = Placement::new(cell.col as f32, cell.row as f32, span_x as f32, span_y as f32, origin.page);
        Ok(self.commit_placement(id, origin, target, Commit::Resize))
    }

    /// Remove a top-level item. Widget ids are the caller's to release.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        self.store.remove(id).ok_or(EngineError::UnknownItem(id))
    }

    /// Take a member out of a folder and place it via spawn search.
    pub fn extract_from_folder(&mut self, folder: ItemId, member: &MemberRef) -> Result<ItemId, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        let removal = match self.folder_observer.as_deref_mut() {
            Some(observer) => self.store.remove_from_folder_with(folder, member, observer)?,
            None => self.store.remove_from_folder(folder, member)?,
        };
        let mut item = removal.removed;
        let rect = item.cell_rect();
        let (span_x, span_y) = self.config.grid.clamp_span(rect.span_x, rect.span_y);
        let (page, cell) = self.find_slot(span_x, span_y, Some(self.current_page), None);
        item.placement = Placement::new(
            cell.col as f32,
            cell.row as f32,
            item.placement.span_x.min(span_x as f32),
            item.placement.span_y.min(span_y as f32),
            page,
        );
        item.settle(self.config.grid.layout_mode);
        Ok(self.store.insert_item(item)?)
    }

    /// Spawn an item for every installed app not already on the home
    /// screen (top level or inside a folder). Returns the new ids.
    pub fn add_missing_apps(&mut self, source: &(impl AppSource + ?Sized)) -> Result<Vec<ItemId>, EngineError> {
        let present: Vec<AppRef> = self
            .store
            .items()
            .flat_map(|item| {
                let own = item.app().cloned();
                let children = item
                    .folder()
                    .map(|folder| {
                        folder
                            .children()
                            .iter()
                            .filter_map(|child| child.app().cloned())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                own.into_iter().chain(children)
            })
            .collect();

        let mut added = Vec::new();
        for app in source.load_apps() {
            if present.contains(&app) {
                continue;
            }
            added.push(self.spawn(ItemContent::App(app), 1, 1)?);
        }
        Ok(added)
    }

    /// Queue an icon request for every app, folder members included.
    /// Returns how many were sent; zero without a requester.
    pub fn request_icons(&self) -> Result<usize, IconChannelClosed> {
        let Some(icons) = &self.icons else {
            return Ok(0);
        };
        let mut sent = 0;
        for item in self.store.items() {
            let members = item.folder().map(|folder| folder.children()).unwrap_or_default();
            for candidate in std::iter::once(item).chain(members) {
                if let Some(app) = candidate.app() {
                    icons.request(candidate.id(), app.clone())?;
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }

    /// Icon responses that have arrived so far.
    #[must_use]
    pub fn drain_icon_responses(&self) -> Vec<IconResponse> {
        self.icons.as_ref().map(IconRequester::drain).unwrap_or_default()
    }

    // ----------------------------------------------------------------------
    // Pages
    // ----------------------------------------------------------------------

    pub fn add_page(&mut self) -> usize {
        self.store.add_page()
    }

    pub fn add_page_at(&mut self, index: usize) -> Result<(), EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        self.store.add_page_at(index)?;
        if self.current_page >= index {
            self.current_page += 1;
        }
        Ok(())
    }

    /// Delete a page and everything on it. Removing the only page is a
    /// no-op that returns `Ok(None)`.
    pub fn remove_page(&mut self, index: usize) -> Result<Option<Vec<Item>>, EngineError> {
        if self.drag.is_active() {
            return Err(EngineError::GestureActive);
        }
        let removed = self.store.remove_page(index)?;
        if removed.is_some() && self.current_page > 0 && self.current_page >= index {
            self.current_page -= 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homegrid_layout::GridConfig;

    fn screen() -> HomeScreen {
        let mut screen = HomeScreen::new(HomeConfig::default()).expect("default config");
        screen.set_viewport(Size::new(400.0, 600.0));
        screen
    }

    fn app(name: &str) -> ItemContent {
        ItemContent::App(AppRef::new(name, "Main"))
    }

    #[derive(Default)]
    struct FakeHost {
        next: i32,
        reject_bind: bool,
        released: Vec<i32>,
    }

    impl WidgetHost for FakeHost {
        fn allocate_id(&mut self) -> Result<i32, WidgetError> {
            self.next += 1;
            Ok(self.next)
        }

        fn bind(&mut self, widget_id: i32, _provider: &AppRef) -> Result<(), WidgetError> {
            if self.reject_bind {
                Err(WidgetError::BindRejected {
                    widget_id,
                    reason: "no permission".into(),
                })
            } else {
                Ok(())
            }
        }

        fn release(&mut self, widget_id: i32) {
            self.released.push(widget_id);
        }
    }

    #[test]
    fn spawn_starts_at_center() {
        let mut screen = screen();
        let id = screen.spawn(app("a"), 1, 1).expect("spawn");
        let item = screen.store().get(id).expect("stored");
        assert_eq!(item.cell_rect().origin(), Cell::new(1, 2));
        assert_eq!(item.page(), 0);
    }

    #[test]
    fn spawn_falls_back_to_new_page_when_full() {
        let config = HomeConfig {
            grid: GridConfig::new(2, 2),
            ..HomeConfig::default()
        };
        let mut screen = HomeScreen::new(config).expect("config");
        for name in ["a", "b", "c", "d"] {
            screen.spawn(app(name), 1, 1).expect("spawn");
        }
        assert_eq!(screen.store().page_count(), 1);
        let overflow = screen.spawn(app("e"), 1, 1).expect("spawn");
        assert_eq!(screen.store().page_count(), 2);
        assert_eq!(screen.store().get(overflow).map(Item::page), Some(1));
    }

    #[test]
    fn spawn_clamps_span_to_grid() {
        let mut screen = screen();
        let id = screen.spawn(ItemContent::Clock, 9, 0).expect("spawn");
        let rect = screen.store().get(id).expect("stored").cell_rect();
        assert_eq!((rect.span_x, rect.span_y), (4, 1));
    }

    #[test]
    fn widget_bind_failure_releases_id() {
        let mut screen = screen();
        let mut host = FakeHost {
            reject_bind: true,
            ..FakeHost::default()
        };
        let err = screen
            .spawn_widget(&mut host, &AppRef::new("w", "Provider"), 2, 2)
            .expect_err("bind rejected");
        assert!(matches!(err, EngineError::Widget(WidgetError::BindRejected { .. })));
        assert_eq!(host.released, vec![1]);
        assert!(screen.store().is_empty());
    }

    #[test]
    fn widget_spawn_and_hints() {
        let mut screen = screen();
        let mut host = FakeHost::default();
        let id = screen
            .spawn_widget(&mut host, &AppRef::new("w", "Provider"), 2, 2)
            .expect("bound");
        assert_eq!(screen.store().get(id).and_then(Item::widget_id), Some(1));
        let hints = screen.widget_size_hints(id).expect("widget");
        assert_eq!(hints.min, Size::new(200.0, 200.0));
        assert!(host.released.is_empty());
    }

    #[test]
    fn resize_displaces_neighbour() {
        let mut screen = screen();
        let big = screen.spawn(app("a"), 1, 1).expect("spawn");
        let neighbour = screen.spawn(app("b"), 1, 1).expect("spawn");
        let neighbour_before = screen.store().get(neighbour).expect("b").cell_rect();
        assert_eq!(neighbour_before.origin(), Cell::new(2, 2));

        let outcome = screen.resize_item(big, 2, 1).expect("resize");
        assert!(matches!(outcome, SettleOutcome::Displaced { ref moved, .. } if moved == &vec![neighbour]));
        let a = screen.store().get(big).expect("a");
        let b = screen.store().get(neighbour).expect("b");
        assert!(!a.overlaps(b));
        assert_eq!(a.cell_rect().span_x, 2);
    }

    #[test]
    fn resize_onto_equal_area_neighbour_keeps_its_span() {
        let mut store = ItemStore::new();
        let a = store.insert(app("a"), Placement::cell(1, 2, 0)).expect("a");
        let wide = store
            .insert(ItemContent::Clock, Placement::new(2.0, 2.0, 2.0, 1.0, 0))
            .expect("wide");
        let mut screen = HomeScreen::with_store(HomeConfig::default(), store).expect("config");

        let outcome = screen.resize_item(a, 2, 1).expect("resize");
        assert!(matches!(outcome, SettleOutcome::Displaced { ref moved, .. } if moved == &vec![wide]));
        let a = screen.store().get(a).expect("a");
        let wide = screen.store().get(wide).expect("wide");
        assert_eq!(a.cell_rect(), homegrid_core::geometry::CellRect::new(1, 2, 2, 1));
        assert_eq!((wide.cell_rect().span_x, wide.cell_rect().span_y), (2, 1));
        assert!(!a.overlaps(wide));
    }

    #[test]
    fn with_store_fits_spans_to_the_grid() {
        let mut store = ItemStore::new();
        let huge = store
            .insert(ItemContent::Clock, Placement::new(0.0, 0.0, 70_000.0, 70_000.0, 0))
            .expect("huge");
        let small = store.insert(ItemContent::Clock, Placement::cell(3, 5, 0)).expect("small");
        let mut screen = HomeScreen::with_store(HomeConfig::default(), store).expect("config");

        let rect = screen.store().get(huge).expect("huge").cell_rect();
        assert_eq!((rect.span_x, rect.span_y), (4, 6));
        let outcome = screen.resize_item(small, 1, 1).expect("resize");
        assert_eq!(
            outcome,
            SettleOutcome::Reverted {
                reason: RevertReason::NoFreeCell
            }
        );
    }

    #[test]
    fn extract_collapses_two_item_folder() {
        let mut screen = screen();
        let a = screen.spawn(app("a"), 1, 1).expect("spawn");
        let b = screen.spawn(app("b"), 1, 1).expect("spawn");
        let mut store = screen.store.clone();
        let folder = store.merge_to_folder(a, b).expect("merge");
        screen.store = store;

        let extracted = screen
            .extract_from_folder(folder, &MemberRef::Id(b))
            .expect("extract");
        assert_eq!(extracted, b);
        assert!(!screen.store().contains(folder));
        let promoted = screen.store().get(a).expect("promoted");
        let placed = screen.store().get(b).expect("placed");
        assert!(!promoted.overlaps(placed));
        assert!(screen.store().validate().is_empty());
    }

    #[test]
    fn add_missing_apps_skips_present_ones() {
        let mut screen = screen();
        screen.spawn(app("a"), 1, 1).expect("spawn");
        let apps = vec![AppRef::new("a", "Main"), AppRef::new("b", "Main")];
        let added = screen.add_missing_apps(&apps).expect("spawned");
        assert_eq!(added.len(), 1);
        assert_eq!(screen.store().len(), 2);
        assert!(screen.add_missing_apps(&apps).expect("no-op").is_empty());
    }

    #[test]
    fn remove_page_keeps_current_page_in_range() {
        let mut screen = screen();
        screen.add_page();
        screen.set_current_page(1).expect("page 1 exists");
        assert!(screen.remove_page(1).expect("in range").is_some());
        assert_eq!(screen.current_page(), 0);
        assert_eq!(screen.remove_page(0).expect("in range"), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = HomeConfig::default();
        config.interaction.folder_zone_fraction = 0.0;
        assert!(matches!(HomeScreen::new(config), Err(EngineError::Config(_))));
    }
}
