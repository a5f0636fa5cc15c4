#![forbid(unsafe_code)]

//! Core: cell geometry and abstract pointer input.
//!
//! # Role in homegrid
//! `homegrid-core` is the vocabulary shared by the arrangement engine
//! (`homegrid-layout`) and the interaction layer (`homegrid-runtime`). It
//! carries no engine state.
//!
//! # Primary responsibilities
//! - **Cell geometry**: [`geometry::Cell`], [`geometry::CellRect`] and the
//!   pixel/cell mapping in [`geometry::CellMetrics`].
//! - **Pointer input**: [`event::PointerEvent`], the only input type that
//!   crosses into the drag state machine. No platform event types appear here.

pub mod event;
pub mod geometry;

pub use event::{PointerEvent, PointerEventKind, SwipeDirection};
pub use geometry::{Cell, CellMetrics, CellRect, Point, Size};
