#![forbid(unsafe_code)]

//! Interaction layer for homegrid.
//!
//! - [`scheduler`]: cooperative, session-tagged timers driven by `tick(now)`.
//! - [`drag`]: the press / long-press / drag / edge-hold / drop machine.
//! - [`engine`]: [`HomeScreen`], which applies drops to the item store.
//! - [`config`]: [`HomeConfig`] and its loaders.
//! - [`collab`]: app source, icon channel and widget host interfaces.
//!
//! ```
//! use homegrid_runtime::{HomeConfig, HomeScreen};
//! use homegrid_layout::{AppRef, ItemContent};
//!
//! let mut home = HomeScreen::new(HomeConfig::default()).expect("default config is valid");
//! let id = home
//!     .spawn(ItemContent::App(AppRef::new("org.example.mail", "Inbox")), 1, 1)
//!     .expect("empty page has room");
//! assert_eq!(home.store().get(id).map(|item| item.page()), Some(0));
//! ```

pub mod collab;
pub mod config;
pub mod drag;
pub mod engine;
pub mod scheduler;

pub use collab::{
    AppSource, IconChannelClosed, IconRequest, IconRequester, IconResponse, IconServer,
    WidgetError, WidgetHost, WidgetSizeHints, icon_channel,
};
pub use config::{ArrangementPolicy, ConfigError, HomeConfig, InteractionPolicyConfig, UnresolvedPolicy};
pub use drag::{
    CancelReason, DragController, DragControllerError, DragEffect, DragNoopReason, DragPhase,
    DragState, DragTransition, EdgeSide, InteractionConfig, SwipeIntent,
};
pub use engine::{EngineError, HomeEvent, HomeScreen, RevertReason, SettleOutcome};
pub use scheduler::{FiredTimer, SessionId, TimerKind, TimerQueue};
