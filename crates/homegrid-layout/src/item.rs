//! Item model: the positioned units on the grid.
//!
//! Items are compared by [`ItemId`], never by value: two apps with the same
//! package on different pages are distinct items. Derived `PartialEq` on
//! [`Item`] compares contents and is only meant for snapshot comparisons.

use std::fmt;
use std::num::NonZeroU64;

use homegrid_core::geometry::CellRect;
use serde::{Deserialize, Serialize};

use crate::grid::LayoutMode;

/// Default display name for folders created by a merge.
pub const DEFAULT_FOLDER_NAME: &str = "Folder";

/// Stable identifier for an item. Allocated by the store, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(NonZeroU64);

impl ItemId {
    /// Wrap a raw id. Zero is reserved and rejected.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ItemId {
        let id = ItemId(NonZeroU64::MIN.saturating_add(self.next - 1));
        self.next = self.next.saturating_add(1);
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Closed set of item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    App,
    Widget,
    Clock,
    Folder,
}

impl ItemKind {
    /// Persisted type tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "APP",
            Self::Widget => "WIDGET",
            Self::Clock => "CLOCK",
            Self::Folder => "FOLDER",
        }
    }

    /// Parse a persisted type tag, ignoring ASCII case.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        [Self::App, Self::Widget, Self::Clock, Self::Folder]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag.trim()))
    }

    /// Folders hold apps and clocks only.
    #[must_use]
    pub const fn can_join_folder(self) -> bool {
        matches!(self, Self::App | Self::Clock)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque application identity (package + component).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppRef {
    pub package_name: String,
    pub class_name: String,
}

impl AppRef {
    #[must_use]
    pub fn new(package_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            class_name: class_name.into(),
        }
    }
}

/// Free-form transform. Only meaningful in [`LayoutMode::Freeform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        tilt_x: 0.0,
        tilt_y: 0.0,
    };

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A named, ordered group of items occupying one grid slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub name: String,
    pub(crate) children: Vec<Item>,
}

impl Folder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Children in display order.
    #[must_use]
    pub fn children(&self) -> &[Item] {
        &self.children
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Membership by identity.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.children.iter().any(|child| child.id == id)
    }

    pub(crate) fn position_of(&self, member: &MemberRef) -> Option<usize> {
        self.children.iter().position(|child| child.matches(member))
    }
}

/// What an item is.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemContent {
    App(AppRef),
    Widget { widget_id: i32 },
    Clock,
    Folder(Folder),
}

impl ItemContent {
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::App(_) => ItemKind::App,
            Self::Widget { .. } => ItemKind::Widget,
            Self::Clock => ItemKind::Clock,
            Self::Folder(_) => ItemKind::Folder,
        }
    }
}

/// Grid position, span and page of an item.
///
/// Coordinates are in cells and may be fractional in freeform mode. Spans
/// are kept at or above 1 by every constructor and setter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub col: f32,
    pub row: f32,
    pub span_x: f32,
    pub span_y: f32,
    pub page: usize,
}

impl Placement {
    #[must_use]
    pub fn new(col: f32, row: f32, span_x: f32, span_y: f32, page: usize) -> Self {
        Self {
            col: finite_or_zero(col),
            row: finite_or_zero(row),
            span_x: clamp_span(span_x),
            span_y: clamp_span(span_y),
            page,
        }
    }

    /// A 1x1 placement at an integer cell.
    #[must_use]
    pub fn cell(col: i32, row: i32, page: usize) -> Self {
        Self::new(col as f32, row as f32, 1.0, 1.0, page)
    }

    /// Rounded cell rectangle: `round(col)`/`round(row)` origin, spans
    /// rounded up.
    #[must_use]
    pub fn cell_rect(&self) -> CellRect {
        CellRect::new(
            self.col.round() as i32,
            self.row.round() as i32,
            self.span_x.ceil() as i32,
            self.span_y.ceil() as i32,
        )
    }

    /// Same span and page, new origin.
    #[must_use]
    pub fn moved_to(self, col: f32, row: f32) -> Self {
        Self::new(col, row, self.span_x, self.span_y, self.page)
    }

    #[must_use]
    pub fn on_page(self, page: usize) -> Self {
        Self { page, ..self }
    }
}

/// Spans below one (including zero, negative and NaN) become one.
#[must_use]
pub fn clamp_span(span: f32) -> f32 {
    if span.is_finite() && span >= 1.0 { span } else { 1.0 }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Reference to a folder member: by identity, or by app identity and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
    Id(ItemId),
    Matching { kind: ItemKind, app: Option<AppRef> },
}

/// A positioned unit on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: ItemId,
    pub content: ItemContent,
    pub placement: Placement,
    pub transform: Transform,
}

impl Item {
    #[must_use]
    pub fn new(id: ItemId, content: ItemContent, placement: Placement) -> Self {
        Self {
            id,
            content,
            placement,
            transform: Transform::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.placement.page
    }

    #[must_use]
    pub fn cell_rect(&self) -> CellRect {
        self.placement.cell_rect()
    }

    /// Visual area in cells.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.cell_rect().area()
    }

    #[must_use]
    pub fn app(&self) -> Option<&AppRef> {
        match &self.content {
            ItemContent::App(app) => Some(app),
            _ => None,
        }
    }

    #[must_use]
    pub fn widget_id(&self) -> Option<i32> {
        match self.content {
            ItemContent::Widget { widget_id } => Some(widget_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn folder(&self) -> Option<&Folder> {
        match &self.content {
            ItemContent::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub(crate) fn folder_mut(&mut self) -> Option<&mut Folder> {
        match &mut self.content {
            ItemContent::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    #[must_use]
    pub fn matches(&self, member: &MemberRef) -> bool {
        match member {
            MemberRef::Id(id) => self.id == *id,
            MemberRef::Matching { kind, app } => self.kind() == *kind && self.app() == app.as_ref(),
        }
    }

    /// Commit a settle: in grid mode the origin snaps to whole cells and
    /// the transform returns to identity; freeform keeps both.
    pub fn settle(&mut self, mode: LayoutMode) {
        if mode == LayoutMode::Grid {
            let rect = self.cell_rect();
            self.placement = self
                .placement
                .moved_to(rect.col as f32, rect.row as f32);
            self.transform = Transform::IDENTITY;
        }
    }

    /// Whether two items overlap: same page and intersecting rounded rects.
    #[must_use]
    pub fn overlaps(&self, other: &Item) -> bool {
        self.page() == other.page() && self.cell_rect().intersects(&other.cell_rect())
    }
}
