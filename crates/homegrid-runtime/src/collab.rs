//! Interfaces to the host: installed apps, icons, widgets.
//!
//! None of these ever feed a placement decision. Icons travel over a
//! request/response channel the engine never waits on; widget ids are
//! allocated and bound synchronously before an item is spawned.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use homegrid_core::geometry::{CellMetrics, Size};
use homegrid_layout::{AppRef, ItemId};

/// Lists the apps installed on the device.
pub trait AppSource {
    fn load_apps(&self) -> Vec<AppRef>;
}

impl AppSource for [AppRef] {
    fn load_apps(&self) -> Vec<AppRef> {
        self.to_vec()
    }
}

impl AppSource for Vec<AppRef> {
    fn load_apps(&self) -> Vec<AppRef> {
        self.clone()
    }
}

/// Ask the host for an app icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    /// Item that displays the icon. For folder members, the member id.
    pub item: ItemId,
    pub app: AppRef,
}

/// Host answer to an [`IconRequest`]. `icon` is encoded image data the
/// engine passes through untouched; `None` means the host has no icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconResponse {
    pub item: ItemId,
    pub app: AppRef,
    pub icon: Option<Vec<u8>>,
}

/// The other end of the icon channel went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconChannelClosed;

impl fmt::Display for IconChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("icon channel closed")
    }
}

impl std::error::Error for IconChannelClosed {}

/// Engine side of the icon channel.
#[derive(Debug)]
pub struct IconRequester {
    requests: Sender<IconRequest>,
    responses: Receiver<IconResponse>,
}

/// Host side of the icon channel. May live on another thread.
#[derive(Debug)]
pub struct IconServer {
    requests: Receiver<IconRequest>,
    responses: Sender<IconResponse>,
}

/// Create a connected requester/server pair.
#[must_use]
pub fn icon_channel() -> (IconRequester, IconServer) {
    let (request_tx, request_rx) = mpsc::channel();
    let (response_tx, response_rx) = mpsc::channel();
    (
        IconRequester {
            requests: request_tx,
            responses: response_rx,
        },
        IconServer {
            requests: request_rx,
            responses: response_tx,
        },
    )
}

impl IconRequester {
    /// Enqueue a request. Never blocks.
    pub fn request(&self, item: ItemId, app: AppRef) -> Result<(), IconChannelClosed> {
        self.requests
            .send(IconRequest { item, app })
            .map_err(|_| IconChannelClosed)
    }

    /// Every response that has arrived so far. Never blocks.
    pub fn drain(&self) -> Vec<IconResponse> {
        let mut out = Vec::new();
        loop {
            match self.responses.try_recv() {
                Ok(response) => out.push(response),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

impl IconServer {
    /// Block until the next request, or `None` once the requester is gone.
    pub fn next_request(&self) -> Option<IconRequest> {
        self.requests.recv().ok()
    }

    pub fn respond(&self, response: IconResponse) -> Result<(), IconChannelClosed> {
        self.responses.send(response).map_err(|_| IconChannelClosed)
    }

    /// Answer every queued request with `load` without blocking. Returns
    /// how many were answered.
    pub fn serve_pending(
        &self,
        mut load: impl FnMut(&AppRef) -> Option<Vec<u8>>,
    ) -> Result<usize, IconChannelClosed> {
        let mut served = 0;
        while let Ok(request) = self.requests.try_recv() {
            let icon = load(&request.app);
            self.respond(IconResponse {
                item: request.item,
                app: request.app,
                icon,
            })?;
            served += 1;
        }
        Ok(served)
    }
}

/// Failures reported by a [`WidgetHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    AllocationFailed { reason: String },
    BindRejected { widget_id: i32, reason: String },
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { reason } => {
                write!(f, "widget id allocation failed: {reason}")
            }
            Self::BindRejected { widget_id, reason } => {
                write!(f, "widget {widget_id} bind rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for WidgetError {}

/// Hosts widget instances on behalf of the home screen.
pub trait WidgetHost {
    fn allocate_id(&mut self) -> Result<i32, WidgetError>;

    /// Bind an allocated id to a provider component.
    fn bind(&mut self, widget_id: i32, provider: &AppRef) -> Result<(), WidgetError>;

    /// Give an id back. Called when binding fails or the widget item is removed.
    fn release(&mut self, widget_id: i32);
}

/// Pixel size bounds handed to a widget for a given span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetSizeHints {
    pub min: Size,
    pub max: Size,
}

impl WidgetSizeHints {
    /// Minimum covers the whole cells of the span, maximum the rounded-up
    /// span. Both are at least one cell.
    #[must_use]
    pub fn for_span(span_x: f32, span_y: f32, metrics: CellMetrics) -> Self {
        let whole = |span: f32| if span.is_finite() { span.floor().max(1.0) } else { 1.0 };
        let rounded_up = |span: f32| if span.is_finite() { span.ceil().max(1.0) } else { 1.0 };
        Self {
            min: metrics.span_size(whole(span_x), whole(span_y)),
            max: metrics.span_size(rounded_up(span_x), rounded_up(span_y)),
        }
    }
}
