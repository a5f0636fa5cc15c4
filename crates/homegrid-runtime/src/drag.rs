#![forbid(unsafe_code)]

//! Interaction state machine: press, long press, drag, edge hold, drop.
//!
//! [`DragController`] turns [`PointerEvent`]s and timer ticks into
//! [`DragTransition`]s. It makes no spatial decisions: hit testing, page
//! turns and drop reconciliation belong to the caller, which reacts to the
//! [`DragEffect`]s in each transition.
//!
//! # States
//!
//! ```text
//! Idle --down--> PressPending --timer, item hit--> Dragging --up--> Settled
//!                     |   \--timer, nothing hit--> Idle (context menu)
//!                     |   \--move beyond slop----> Idle (swipe)
//!                     \--up----------------------> Idle (tap)
//! any active state --cancel / second pointer-----> Cancelled
//! ```
//!
//! `Settled` and `Cancelled` are resting states; the next pointer-down
//! starts a new session from them exactly as from `Idle`.
//!
//! # Invariants
//!
//! 1. At most one gesture is active.
//! 2. The timer queue is empty whenever the machine is not `PressPending`
//!    or `Dragging`. Every transition out of those states cancels timers.
//! 3. Timers carry the session that scheduled them; a timer from another
//!    session never changes state.

use std::fmt;

use homegrid_core::event::{PointerEvent, PointerEventKind, SwipeDirection};
use homegrid_core::geometry::{Point, Size};
use homegrid_layout::ItemId;
use web_time::{Duration, Instant};

use crate::scheduler::{FiredTimer, SessionId, TimerKind, TimerQueue};

/// Default press duration before a long press fires.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(400);
/// Default movement (pixels) tolerated before a press becomes a swipe.
pub const DEFAULT_TOUCH_SLOP: f32 = 8.0;
/// Default width of each horizontal edge band, as a fraction of the viewport.
pub const DEFAULT_EDGE_BAND_FRACTION: f32 = 0.10;
pub const DEFAULT_EDGE_HOLD_DELAY: Duration = Duration::from_millis(350);
pub const DEFAULT_PAGE_TURN_COOLDOWN: Duration = Duration::from_millis(700);
pub const DEFAULT_NEW_PAGE_HOLD_DELAY: Duration = Duration::from_millis(1200);
/// Default central fraction of a target item that counts as "onto" it.
pub const DEFAULT_FOLDER_ZONE_FRACTION: f32 = 0.5;

/// Thresholds and delays for the interaction machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    pub long_press: Duration,
    pub touch_slop: f32,
    pub edge_band_fraction: f32,
    pub edge_hold_delay: Duration,
    /// Minimum time between successive page turns while held at an edge.
    pub page_turn_cooldown: Duration,
    pub new_page_hold_delay: Duration,
    pub folder_zone_fraction: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            long_press: DEFAULT_LONG_PRESS,
            touch_slop: DEFAULT_TOUCH_SLOP,
            edge_band_fraction: DEFAULT_EDGE_BAND_FRACTION,
            edge_hold_delay: DEFAULT_EDGE_HOLD_DELAY,
            page_turn_cooldown: DEFAULT_PAGE_TURN_COOLDOWN,
            new_page_hold_delay: DEFAULT_NEW_PAGE_HOLD_DELAY,
            folder_zone_fraction: DEFAULT_FOLDER_ZONE_FRACTION,
        }
    }
}

impl InteractionConfig {
    /// Reject configurations the machine cannot run with.
    pub fn check(&self) -> Result<(), DragControllerError> {
        if !(self.touch_slop.is_finite() && self.touch_slop >= 0.0) {
            return Err(DragControllerError::InvalidTouchSlop {
                slop: self.touch_slop,
            });
        }
        if !(self.edge_band_fraction > 0.0 && self.edge_band_fraction < 0.5) {
            return Err(DragControllerError::InvalidEdgeBand {
                fraction: self.edge_band_fraction,
            });
        }
        if !(self.folder_zone_fraction > 0.0 && self.folder_zone_fraction <= 1.0) {
            return Err(DragControllerError::InvalidFolderZone {
                fraction: self.folder_zone_fraction,
            });
        }
        for (name, delay) in [
            ("long_press", self.long_press),
            ("edge_hold_delay", self.edge_hold_delay),
            ("page_turn_cooldown", self.page_turn_cooldown),
            ("new_page_hold_delay", self.new_page_hold_delay),
        ] {
            if delay.is_zero() {
                return Err(DragControllerError::ZeroDelay { name });
            }
        }
        Ok(())
    }
}

/// Invalid [`InteractionConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragControllerError {
    InvalidTouchSlop { slop: f32 },
    InvalidEdgeBand { fraction: f32 },
    InvalidFolderZone { fraction: f32 },
    ZeroDelay { name: &'static str },
}

impl fmt::Display for DragControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTouchSlop { slop } => {
                write!(f, "touch slop must be finite and >= 0 (got {slop})")
            }
            Self::InvalidEdgeBand { fraction } => {
                write!(f, "edge band fraction must be in (0, 0.5) (got {fraction})")
            }
            Self::InvalidFolderZone { fraction } => {
                write!(f, "folder zone fraction must be in (0, 1] (got {fraction})")
            }
            Self::ZeroDelay { name } => write!(f, "{name} must be > 0"),
        }
    }
}

impl std::error::Error for DragControllerError {}

/// Horizontal edge of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSide {
    Left,
    Right,
}

/// What a swipe asks the home screen to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeIntent {
    NextPage,
    PreviousPage,
    OpenDrawer,
    OpenNotifications,
}

impl SwipeIntent {
    #[must_use]
    pub const fn from_direction(direction: SwipeDirection) -> Self {
        match direction {
            SwipeDirection::Left => Self::NextPage,
            SwipeDirection::Right => Self::PreviousPage,
            SwipeDirection::Up => Self::OpenDrawer,
            SwipeDirection::Down => Self::OpenNotifications,
        }
    }
}

/// Why a gesture was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// A second pointer went down.
    MultiTouch,
    /// The host delivered a cancel event.
    System,
    /// [`DragController::force_cancel`].
    Programmatic,
}

/// Coarse state, for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragPhase {
    Idle,
    PressPending,
    Dragging,
    Settled,
    Cancelled,
}

/// Full machine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    PressPending {
        session: SessionId,
        pointer_id: u32,
        /// Item under the press, if any.
        target: Option<ItemId>,
        origin: Point,
        current: Point,
    },
    Dragging {
        session: SessionId,
        pointer_id: u32,
        item: ItemId,
        origin: Point,
        current: Point,
        edge: Option<EdgeSide>,
    },
    Settled {
        item: ItemId,
    },
    Cancelled {
        item: Option<ItemId>,
        reason: CancelReason,
    },
}

impl DragState {
    #[must_use]
    pub const fn phase(&self) -> DragPhase {
        match self {
            Self::Idle => DragPhase::Idle,
            Self::PressPending { .. } => DragPhase::PressPending,
            Self::Dragging { .. } => DragPhase::Dragging,
            Self::Settled { .. } => DragPhase::Settled,
            Self::Cancelled { .. } => DragPhase::Cancelled,
        }
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::PressPending { .. } | Self::Dragging { .. })
    }

    const fn pointer_id(&self) -> Option<u32> {
        match self {
            Self::PressPending { pointer_id, .. } | Self::Dragging { pointer_id, .. } => {
                Some(*pointer_id)
            }
            _ => None,
        }
    }
}

/// Inputs that were safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragNoopReason {
    IdleWithoutActiveGesture,
    ActiveGestureInProgress,
    PointerMismatch,
    WithinSlop,
    StaleTimer,
}

/// Observable consequence of one transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEffect {
    Pressed { target: Option<ItemId>, at: Point },
    Tap { target: Option<ItemId>, at: Point },
    ContextMenu { at: Point },
    Swipe {
        direction: SwipeDirection,
        intent: SwipeIntent,
    },
    DragStarted { item: ItemId, origin: Point },
    /// The item follows the pointer by its total displacement.
    DragMoved {
        item: ItemId,
        position: Point,
        total_dx: f32,
        total_dy: f32,
    },
    EdgeEntered { side: EdgeSide },
    EdgeLeft { side: EdgeSide },
    PageTurnRequested { side: EdgeSide },
    NewPageRequested { side: EdgeSide },
    Dropped {
        item: ItemId,
        position: Point,
        total_dx: f32,
        total_dy: f32,
    },
    Cancelled {
        item: Option<ItemId>,
        reason: CancelReason,
    },
    Noop { reason: DragNoopReason },
}

/// One step of the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effects: Vec<DragEffect>,
}

impl DragTransition {
    /// True when every effect is a no-op.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.effects
            .iter()
            .all(|effect| matches!(effect, DragEffect::Noop { .. }))
    }
}

/// The interaction state machine. Single-threaded; owned by the event loop.
#[derive(Debug, Clone)]
pub struct DragController {
    config: InteractionConfig,
    viewport: Size,
    state: DragState,
    timers: TimerQueue,
    session: SessionId,
    transition_counter: u64,
}

impl DragController {
    pub fn new(config: InteractionConfig) -> Result<Self, DragControllerError> {
        config.check()?;
        Ok(Self {
            config,
            viewport: Size::default(),
            state: DragState::Idle,
            timers: TimerQueue::new(),
            session: SessionId::default(),
            transition_counter: 0,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &InteractionConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Pending timers, read-only.
    #[must_use]
    pub const fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// When the host should next call [`tick`](Self::tick).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Viewport size used to locate the edge bands.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Feed one pointer event. `hit` is the item under the pointer; it is
    /// only consulted on pointer-down.
    pub fn apply_event(&mut self, event: &PointerEvent, hit: Option<ItemId>) -> DragTransition {
        let from = self.state;
        let now = event.timestamp;
        let position = event.position;
        let mut effects = Vec::with_capacity(2);

        match (from, event.kind) {
            (_, PointerEventKind::Down) if !from.is_active() => {
                self.session = self.session.next();
                self.state = DragState::PressPending {
                    session: self.session,
                    pointer_id: event.pointer_id,
                    target: hit,
                    origin: position,
                    current: position,
                };
                self.timers
                    .schedule(TimerKind::LongPress, self.session, now + self.config.long_press);
                effects.push(DragEffect::Pressed { target: hit, at: position });
            }
            (_, PointerEventKind::Down) => {
                if from.pointer_id() == Some(event.pointer_id) {
                    effects.push(DragEffect::Noop {
                        reason: DragNoopReason::ActiveGestureInProgress,
                    });
                } else {
                    effects.push(self.cancel(CancelReason::MultiTouch));
                }
            }
            (_, PointerEventKind::Cancel) if from.is_active() => {
                effects.push(self.cancel(CancelReason::System));
            }
            (_, _) if !from.is_active() => effects.push(DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveGesture,
            }),
            (_, _) if from.pointer_id() != Some(event.pointer_id) => {
                effects.push(DragEffect::Noop {
                    reason: DragNoopReason::PointerMismatch,
                });
            }
            (
                DragState::PressPending {
                    session,
                    pointer_id,
                    target,
                    origin,
                    ..
                },
                PointerEventKind::Move,
            ) => {
                let (dx, dy) = origin.delta_to(position);
                if origin.distance(position) > self.config.touch_slop
                    && let Some(direction) = SwipeDirection::from_delta(dx, dy)
                {
                    self.finish(DragState::Idle);
                    effects.push(DragEffect::Swipe {
                        direction,
                        intent: SwipeIntent::from_direction(direction),
                    });
                } else {
                    self.state = DragState::PressPending {
                        session,
                        pointer_id,
                        target,
                        origin,
                        current: position,
                    };
                    effects.push(DragEffect::Noop {
                        reason: DragNoopReason::WithinSlop,
                    });
                }
            }
            (DragState::PressPending { target, .. }, PointerEventKind::Up) => {
                self.finish(DragState::Idle);
                effects.push(DragEffect::Tap { target, at: position });
            }
            (
                DragState::Dragging {
                    session,
                    pointer_id,
                    item,
                    origin,
                    edge,
                    ..
                },
                PointerEventKind::Move,
            ) => {
                let (total_dx, total_dy) = origin.delta_to(position);
                effects.push(DragEffect::DragMoved {
                    item,
                    position,
                    total_dx,
                    total_dy,
                });
                let next_edge = self.edge_at(position);
                self.update_edge(edge, next_edge, now, &mut effects);
                self.state = DragState::Dragging {
                    session,
                    pointer_id,
                    item,
                    origin,
                    current: position,
                    edge: next_edge,
                };
            }
            (DragState::Dragging { item, origin, .. }, PointerEventKind::Up) => {
                let (total_dx, total_dy) = origin.delta_to(position);
                self.finish(DragState::Settled { item });
                effects.push(DragEffect::Dropped {
                    item,
                    position,
                    total_dx,
                    total_dy,
                });
            }
            (_, _) => effects.push(DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveGesture,
            }),
        }

        self.record(from, effects)
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<DragTransition> {
        self.timers
            .pop_due(now)
            .into_iter()
            .map(|fired| self.fire(fired, now))
            .collect()
    }

    /// Cancel the active gesture, if any, without an input event.
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        if !self.state.is_active() {
            return None;
        }
        let from = self.state;
        let effect = self.cancel(CancelReason::Programmatic);
        Some(self.record(from, vec![effect]))
    }

    fn fire(&mut self, fired: FiredTimer, now: Instant) -> DragTransition {
        let from = self.state;
        let mut effects = Vec::with_capacity(1);
        let current_session = match from {
            DragState::PressPending { session, .. } | DragState::Dragging { session, .. } => {
                Some(session)
            }
            _ => None,
        };

        if current_session != Some(fired.session) {
            tracing::debug!(
                target: "homegrid.drag",
                timer = ?fired.kind,
                session = fired.session.get(),
                "ignoring timer from a finished session"
            );
            effects.push(DragEffect::Noop {
                reason: DragNoopReason::StaleTimer,
            });
            return self.record(from, effects);
        }

        match (from, fired.kind) {
            (
                DragState::PressPending {
                    session,
                    pointer_id,
                    target: Some(item),
                    origin,
                    current,
                },
                TimerKind::LongPress,
            ) => {
                self.state = DragState::Dragging {
                    session,
                    pointer_id,
                    item,
                    origin,
                    current,
                    edge: None,
                };
                effects.push(DragEffect::DragStarted { item, origin });
                let edge = self.edge_at(current);
                self.update_edge(None, edge, now, &mut effects);
                if let DragState::Dragging { edge: slot, .. } = &mut self.state {
                    *slot = edge;
                }
            }
            (DragState::PressPending { target: None, origin, .. }, TimerKind::LongPress) => {
                self.finish(DragState::Idle);
                effects.push(DragEffect::ContextMenu { at: origin });
            }
            (
                DragState::Dragging {
                    session,
                    edge: Some(side),
                    ..
                },
                TimerKind::EdgeHold,
            ) => {
                self.timers
                    .schedule(TimerKind::EdgeHold, session, now + self.config.page_turn_cooldown);
                effects.push(DragEffect::PageTurnRequested { side });
            }
            (
                DragState::Dragging {
                    session,
                    edge: Some(side),
                    ..
                },
                TimerKind::NewPageHold,
            ) => {
                self.timers.schedule(
                    TimerKind::NewPageHold,
                    session,
                    now + self.config.new_page_hold_delay,
                );
                self.timers
                    .schedule(TimerKind::EdgeHold, session, now + self.config.page_turn_cooldown);
                effects.push(DragEffect::NewPageRequested { side });
            }
            _ => effects.push(DragEffect::Noop {
                reason: DragNoopReason::StaleTimer,
            }),
        }
        self.record(from, effects)
    }

    fn edge_at(&self, position: Point) -> Option<EdgeSide> {
        if self.viewport.is_degenerate() {
            return None;
        }
        let band = self.viewport.width * self.config.edge_band_fraction;
        if position.x <= band {
            Some(EdgeSide::Left)
        } else if position.x >= self.viewport.width - band {
            Some(EdgeSide::Right)
        } else {
            None
        }
    }

    fn update_edge(
        &mut self,
        previous: Option<EdgeSide>,
        next: Option<EdgeSide>,
        now: Instant,
        effects: &mut Vec<DragEffect>,
    ) {
        if previous == next {
            return;
        }
        if let Some(side) = previous {
            self.timers.cancel(TimerKind::EdgeHold);
            self.timers.cancel(TimerKind::NewPageHold);
            effects.push(DragEffect::EdgeLeft { side });
        }
        if let Some(side) = next {
            self.timers
                .schedule(TimerKind::EdgeHold, self.session, now + self.config.edge_hold_delay);
            self.timers.schedule(
                TimerKind::NewPageHold,
                self.session,
                now + self.config.new_page_hold_delay,
            );
            effects.push(DragEffect::EdgeEntered { side });
        }
    }

    fn cancel(&mut self, reason: CancelReason) -> DragEffect {
        let item = match self.state {
            DragState::Dragging { item, .. } => Some(item),
            _ => None,
        };
        self.finish(DragState::Cancelled { item, reason });
        DragEffect::Cancelled { item, reason }
    }

    /// Leave the active states. Every pending timer dies here.
    fn finish(&mut self, to: DragState) {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            tracing::trace!(target: "homegrid.drag", cancelled, "timers cancelled");
        }
        self.state = to;
    }

    fn record(&mut self, from: DragState, effects: Vec<DragEffect>) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        let transition = DragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state,
            effects,
        };
        if from.phase() != transition.to.phase() {
            tracing::debug!(
                target: "homegrid.drag",
                transition_id = transition.transition_id,
                from = ?from.phase(),
                to = ?transition.to.phase(),
                "drag state changed"
            );
        }
        transition
    }
}
