#![forbid(unsafe_code)]

//! Abstract pointer input.
//!
//! Hosts translate their platform touch/mouse events into [`PointerEvent`]
//! values. The drag state machine consumes nothing else.

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::geometry::Point;

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    /// System interruption or any other reason the host abandons the gesture.
    Cancel,
}

/// One pointer event with its position and timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    /// Host-assigned pointer identity. A second pointer going down while a
    /// gesture is active is treated as multi-touch.
    pub pointer_id: u32,
    pub position: Point,
    pub timestamp: Instant,
}

impl PointerEvent {
    #[must_use]
    pub const fn new(
        kind: PointerEventKind,
        pointer_id: u32,
        position: Point,
        timestamp: Instant,
    ) -> Self {
        Self {
            kind,
            pointer_id,
            position,
            timestamp,
        }
    }

    #[must_use]
    pub const fn down(pointer_id: u32, position: Point, timestamp: Instant) -> Self {
        Self::new(PointerEventKind::Down, pointer_id, position, timestamp)
    }

    #[must_use]
    pub const fn moved(pointer_id: u32, position: Point, timestamp: Instant) -> Self {
        Self::new(PointerEventKind::Move, pointer_id, position, timestamp)
    }

    #[must_use]
    pub const fn up(pointer_id: u32, position: Point, timestamp: Instant) -> Self {
        Self::new(PointerEventKind::Up, pointer_id, position, timestamp)
    }

    #[must_use]
    pub const fn cancel(pointer_id: u32, position: Point, timestamp: Instant) -> Self {
        Self::new(PointerEventKind::Cancel, pointer_id, position, timestamp)
    }
}

/// Direction of a displacement, decided by its dominant axis and sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    /// Classify a displacement. Ties go to the horizontal axis; a zero
    /// displacement has no direction.
    #[must_use]
    pub fn from_delta(dx: f32, dy: f32) -> Option<Self> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx < 0.0 { Self::Left } else { Self::Right })
        } else {
            Some(if dy < 0.0 { Self::Up } else { Self::Down })
        }
    }

    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_axis_decides_direction() {
        assert_eq!(SwipeDirection::from_delta(-30.0, 5.0), Some(SwipeDirection::Left));
        assert_eq!(SwipeDirection::from_delta(30.0, -5.0), Some(SwipeDirection::Right));
        assert_eq!(SwipeDirection::from_delta(3.0, -40.0), Some(SwipeDirection::Up));
        assert_eq!(SwipeDirection::from_delta(-3.0, 40.0), Some(SwipeDirection::Down));
    }

    #[test]
    fn ties_prefer_horizontal() {
        assert_eq!(SwipeDirection::from_delta(10.0, 10.0), Some(SwipeDirection::Right));
        assert!(SwipeDirection::Right.is_horizontal());
        assert!(!SwipeDirection::Down.is_horizontal());
    }

    #[test]
    fn zero_delta_has_no_direction() {
        assert_eq!(SwipeDirection::from_delta(0.0, 0.0), None);
    }

    #[test]
    fn constructors_set_kind() {
        let t = Instant::now();
        let p = Point::new(1.0, 2.0);
        assert_eq!(PointerEvent::down(1, p, t).kind, PointerEventKind::Down);
        assert_eq!(PointerEvent::moved(1, p, t).kind, PointerEventKind::Move);
        assert_eq!(PointerEvent::up(1, p, t).kind, PointerEventKind::Up);
        assert_eq!(PointerEvent::cancel(1, p, t).kind, PointerEventKind::Cancel);
    }
}
