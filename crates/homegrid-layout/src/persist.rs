//! JSON persistence of the item list.
//!
//! The document is a JSON array of [`ItemRecord`] objects:
//!
//! ```json
//! [{"type": "APP", "packageName": "org.example.mail", "className": "Main",
//!   "col": 1, "row": 2, "spanX": 1, "spanY": 1, "page": 0,
//!   "rotation": 0, "scale": 1, "tiltX": 0, "tiltY": 0}]
//! ```
//!
//! Decoding is tolerant. A record that is not an object of the expected
//! shape, or has no known `type`, is dropped and counted; the rest still
//! load. Non-positive spans become 1, negative pages become 0. Documents
//! written before cell coordinates existed carry percentage `x`/`y` and
//! `width`/`height`, which are divided by 100.
//!
//! Item ids are not persisted; loading allocates fresh ones.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::item::{AppRef, Folder, Item, ItemContent, ItemKind, Placement, Transform};
use crate::store::{ItemStore, StoreError};

/// One persisted item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_y: Option<f32>,
    #[serde(default)]
    pub page: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<i32>,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f32>,
    #[serde(default)]
    pub tilt_x: f32,
    #[serde(default)]
    pub tilt_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_items: Option<Vec<ItemRecord>>,
    // Legacy percentage-based geometry.
    #[serde(default, skip_serializing)]
    pub x: Option<f32>,
    #[serde(default, skip_serializing)]
    pub y: Option<f32>,
    #[serde(default, skip_serializing)]
    pub width: Option<f32>,
    #[serde(default, skip_serializing)]
    pub height: Option<f32>,
}

impl ItemRecord {
    /// Encode an item (and its folder children).
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        let p = item.placement;
        let t = item.transform;
        let uniform = t.scale_x == t.scale_y;
        let mut record = Self {
            kind: Some(item.kind().as_str().to_owned()),
            col: Some(p.col),
            row: Some(p.row),
            span_x: Some(p.span_x),
            span_y: Some(p.span_y),
            page: i64::try_from(p.page).unwrap_or(i64::MAX),
            rotation: t.rotation,
            scale: uniform.then_some(t.scale_x),
            scale_x: (!uniform).then_some(t.scale_x),
            scale_y: (!uniform).then_some(t.scale_y),
            tilt_x: t.tilt_x,
            tilt_y: t.tilt_y,
            ..Self::default()
        };
        match &item.content {
            ItemContent::App(app) => {
                record.package_name = Some(app.package_name.clone());
                record.class_name = Some(app.class_name.clone());
            }
            ItemContent::Widget { widget_id } => record.widget_id = Some(*widget_id),
            ItemContent::Clock => {}
            ItemContent::Folder(folder) => {
                record.folder_name = Some(folder.name.clone());
                record.folder_items = Some(folder.children().iter().map(Self::from_item).collect());
            }
        }
        record
    }

    fn placement(&self, report: &mut LoadReport) -> Placement {
        let col = self.col.or(self.x.map(|x| x / 100.0)).unwrap_or(0.0);
        let row = self.row.or(self.y.map(|y| y / 100.0)).unwrap_or(0.0);
        let span_x = self.span_x.or(self.width.map(|w| w / 100.0)).unwrap_or(1.0);
        let span_y = self.span_y.or(self.height.map(|h| h / 100.0)).unwrap_or(1.0);
        if !(span_x >= 1.0 && span_y >= 1.0) {
            report.clamped_spans += 1;
        }
        let page = usize::try_from(self.page.max(0)).unwrap_or(0);
        Placement::new(col, row, span_x, span_y, page)
    }

    /// Non-finite components fall back to identity.
    fn transform(&self) -> Transform {
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        let uniform = finite_or(self.scale.unwrap_or(1.0), 1.0);
        Transform {
            rotation: finite_or(self.rotation, 0.0),
            scale_x: finite_or(self.scale_x.unwrap_or(uniform), 1.0),
            scale_y: finite_or(self.scale_y.unwrap_or(uniform), 1.0),
            tilt_x: finite_or(self.tilt_x, 0.0),
            tilt_y: finite_or(self.tilt_y, 0.0),
        }
    }
}

/// Counts from a tolerant load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// Records dropped as malformed (no known type, missing identity, bad shape).
    pub dropped: usize,
    /// Records whose span was below one and was clamped.
    pub clamped_spans: usize,
    /// Persisted folders with a single valid child, replaced by that child.
    pub collapsed_folders: usize,
    /// Spans larger than the grid, shrunk to fit. Filled in by the caller
    /// that knows the grid.
    pub fitted_spans: usize,
}

/// Records parsed from a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecords {
    pub records: Vec<ItemRecord>,
    /// Array entries that were not record-shaped and were skipped.
    pub malformed: usize,
}

/// Parse a document into records, dropping entries that are not
/// record-shaped. Fails only when the document is not a JSON array.
pub fn decode_records(document: &str) -> Result<DecodedRecords, StoreError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(document)?;
    let mut malformed = 0;
    let records = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ItemRecord>(value) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(target: "homegrid.store", error = %err, "dropping malformed item record");
                malformed += 1;
                None
            }
        })
        .collect();
    Ok(DecodedRecords { records, malformed })
}

/// Serialize records as a pretty JSON array.
pub fn encode_records(records: &[ItemRecord]) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(records)?)
}

impl ItemStore {
    /// Build a store from persisted records. The page count is
    /// `max(page) + 1`, at least one.
    #[must_use]
    pub fn from_records(records: &[ItemRecord]) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        let mut store = Self::new();
        let mut decoded = Vec::new();
        for record in records {
            match decode_item(&mut store, record, &mut report) {
                Some(item) => decoded.push(item),
                None => report.dropped += 1,
            }
        }

        let pages = decoded.iter().map(|item| item.page() + 1).max().unwrap_or(1);
        store.page_count = pages.max(1);
        for item in decoded {
            match store.insert_item(item) {
                Ok(_) => report.loaded += 1,
                Err(err) => {
                    tracing::warn!(target: "homegrid.store", error = %err, "item rejected on load");
                    report.dropped += 1;
                }
            }
        }
        if report.dropped > 0 || report.clamped_spans > 0 {
            tracing::warn!(
                target: "homegrid.store",
                loaded = report.loaded,
                dropped = report.dropped,
                clamped_spans = report.clamped_spans,
                "item store loaded with repairs"
            );
        }
        (store, report)
    }

    /// Records for every top-level item, in insertion order.
    #[must_use]
    pub fn to_records(&self) -> Vec<ItemRecord> {
        self.items().map(ItemRecord::from_item).collect()
    }

    /// Load through a backend. Entries the backend skipped as malformed
    /// count as dropped.
    pub fn load_from(backend: &mut impl ItemStoreBackend) -> Result<(Self, LoadReport), StoreError> {
        let decoded = backend.load()?;
        let (store, mut report) = Self::from_records(&decoded.records);
        report.dropped += decoded.malformed;
        Ok((store, report))
    }

    /// Save through a backend.
    pub fn save_to(&self, backend: &mut impl ItemStoreBackend) -> Result<(), StoreError> {
        backend.save(&self.to_records())
    }
}

fn decode_item(store: &mut ItemStore, record: &ItemRecord, report: &mut LoadReport) -> Option<Item> {
    let Some(kind) = record.kind.as_deref().and_then(ItemKind::parse) else {
        tracing::warn!(target: "homegrid.store", tag = ?record.kind, "dropping item without a known type");
        return None;
    };
    let placement = record.placement(report);
    let transform = record.transform();

    let content = match kind {
        ItemKind::App => {
            let package = record.package_name.as_deref().filter(|name| !name.is_empty())?;
            ItemContent::App(AppRef::new(package, record.class_name.clone().unwrap_or_default()))
        }
        ItemKind::Widget => ItemContent::Widget {
            widget_id: record.widget_id?,
        },
        ItemKind::Clock => ItemContent::Clock,
        ItemKind::Folder => {
            let mut folder = Folder::new(record.folder_name.clone().unwrap_or_default());
            for child in record.folder_items.iter().flatten() {
                match decode_item(store, child, report) {
                    Some(item) if item.kind().can_join_folder() => folder.children.push(item),
                    _ => report.dropped += 1,
                }
            }
            match folder.children.len() {
                0 => return None,
                1 => {
                    report.collapsed_folders += 1;
                    let mut only = folder.children.pop()?;
                    only.placement = Placement::new(
                        placement.col,
                        placement.row,
                        only.placement.span_x,
                        only.placement.span_y,
                        placement.page,
                    );
                    only.transform = transform;
                    return Some(only);
                }
                _ => ItemContent::Folder(folder),
            }
        }
    };
    Some(Item::new(store.allocate_id(), content, placement).with_transform(transform))
}

/// Where the item list lives.
pub trait ItemStoreBackend {
    fn load(&mut self) -> Result<DecodedRecords, StoreError>;
    fn save(&mut self, records: &[ItemRecord]) -> Result<(), StoreError>;
}

/// A JSON file on disk. A missing file loads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemStoreBackend for JsonFileBackend {
    fn load(&mut self) -> Result<DecodedRecords, StoreError> {
        let document = match std::fs::read_to_string(&self.path) {
            Ok(document) => document,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(DecodedRecords::default()),
            Err(err) => return Err(err.into()),
        };
        let decoded = decode_records(&document)?;
        tracing::debug!(
            target: "homegrid.store",
            path = %self.path.display(),
            records = decoded.records.len(),
            malformed = decoded.malformed,
            "item file read"
        );
        Ok(decoded)
    }

    fn save(&mut self, records: &[ItemRecord]) -> Result<(), StoreError> {
        let document = encode_records(records)?;
        std::fs::write(&self.path, document)?;
        Ok(())
    }
}

/// In-memory JSON document, for hosts without storage and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    document: Option<String>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
        }
    }

    #[must_use]
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl ItemStoreBackend for MemoryBackend {
    fn load(&mut self) -> Result<DecodedRecords, StoreError> {
        match &self.document {
            Some(document) => decode_records(document),
            None => Ok(DecodedRecords::default()),
        }
    }

    fn save(&mut self, records: &[ItemRecord]) -> Result<(), StoreError> {
        self.document = Some(encode_records(records)?);
        Ok(())
    }
}
