//! Random pointer/tick sequences never leave timers behind an inactive
//! controller, and never run two gestures at once.

use homegrid_core::event::PointerEvent;
use homegrid_core::geometry::{Point, Size};
use homegrid_layout::ItemId;
use homegrid_runtime::{DragController, DragEffect, DragPhase, InteractionConfig};
use proptest::prelude::*;
use web_time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Step {
    Down { pointer: u32, x: f32, y: f32, on_item: bool },
    Move { pointer: u32, x: f32, y: f32 },
    Up { pointer: u32 },
    Cancel { pointer: u32 },
    Wait { millis: u64 },
    ForceCancel,
}

fn step() -> impl Strategy<Value = Step> {
    let coord = 0.0f32..400.0;
    prop_oneof![
        (1u32..3, coord.clone(), coord.clone(), any::<bool>())
            .prop_map(|(pointer, x, y, on_item)| Step::Down { pointer, x, y, on_item }),
        (1u32..3, coord.clone(), coord).prop_map(|(pointer, x, y)| Step::Move { pointer, x, y }),
        (1u32..3).prop_map(|pointer| Step::Up { pointer }),
        (1u32..3).prop_map(|pointer| Step::Cancel { pointer }),
        (0u64..1_500).prop_map(|millis| Step::Wait { millis }),
        Just(Step::ForceCancel),
    ]
}

proptest! {
    #[test]
    fn timers_only_live_while_a_gesture_is_active(steps in prop::collection::vec(step(), 1..60)) {
        let mut drag = DragController::new(InteractionConfig::default()).expect("default config");
        drag.set_viewport(Size::new(400.0, 400.0));
        let item = ItemId::new(1).expect("non-zero id");
        let mut now = Instant::now();
        let mut last = Point::default();

        for step in steps {
            now += Duration::from_millis(5);
            let transitions = match step {
                Step::Down { pointer, x, y, on_item } => {
                    last = Point::new(x, y);
                    vec![drag.apply_event(&PointerEvent::down(pointer, last, now), on_item.then_some(item))]
                }
                Step::Move { pointer, x, y } => {
                    last = Point::new(x, y);
                    vec![drag.apply_event(&PointerEvent::moved(pointer, last, now), None)]
                }
                Step::Up { pointer } => vec![drag.apply_event(&PointerEvent::up(pointer, last, now), None)],
                Step::Cancel { pointer } => {
                    vec![drag.apply_event(&PointerEvent::cancel(pointer, last, now), None)]
                }
                Step::Wait { millis } => {
                    now += Duration::from_millis(millis);
                    drag.tick(now)
                }
                Step::ForceCancel => drag.force_cancel().into_iter().collect(),
            };

            for transition in &transitions {
                let turned = transition.effects.iter().any(|effect| {
                    matches!(effect, DragEffect::PageTurnRequested { .. } | DragEffect::NewPageRequested { .. })
                });
                if turned {
                    prop_assert_eq!(transition.to.phase(), DragPhase::Dragging);
                }
            }
            if !drag.is_active() {
                prop_assert!(drag.timers().is_empty(), "timers left in {:?}", drag.state());
                prop_assert!(drag.next_deadline().is_none());
            }
        }
    }
}
