//! Cooperative timers for one drag session.
//!
//! The host owns the clock: it calls `tick(now)` from its event loop and
//! the queue hands back whatever is due. Nothing here spawns threads or
//! sleeps. Every timer is tagged with the session that scheduled it, so a
//! timer that outlives its session is recognisable as stale even if a
//! caller forgets to cancel it.

use web_time::Instant;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Press held long enough to start a drag or open the context menu.
    LongPress,
    /// Pointer held in an edge band long enough to turn the page.
    EdgeHold,
    /// Pointer held in an edge band long enough to create a page.
    NewPageHold,
}

/// Identifies one press-to-release interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub kind: TimerKind,
    pub session: SessionId,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    kind: TimerKind,
    session: SessionId,
    deadline: Instant,
}

/// At most one pending timer per [`TimerKind`], with absolute deadlines.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    entries: Vec<Entry>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind`, replacing any pending timer of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, session: SessionId, deadline: Instant) {
        self.cancel(kind);
        self.entries.push(Entry {
            kind,
            session,
            deadline,
        });
    }

    /// Cancel a pending timer. Returns whether one was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.kind != kind);
        self.entries.len() != before
    }

    /// Cancel everything. Returns how many timers were pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    #[must_use]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    #[must_use]
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.deadline)
    }

    /// Earliest pending deadline, for hosts that sleep until the next tick.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return every timer due at `now`, earliest first. Timers
    /// due at the same instant come out in [`TimerKind`] order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<FiredTimer> {
        let mut due: Vec<FiredTimer> = self
            .entries
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| FiredTimer {
                kind: entry.kind,
                session: entry.session,
                deadline: entry.deadline,
            })
            .collect();
        self.entries.retain(|entry| entry.deadline > now);
        due.sort_by_key(|fired| (fired.deadline, fired.kind));
        due
    }
}
