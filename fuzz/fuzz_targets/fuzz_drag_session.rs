#![no_main]

use arbitrary::Arbitrary;
use homegrid_core::event::PointerEvent;
use homegrid_core::geometry::{Point, Size};
use homegrid_layout::{AppRef, ItemContent};
use homegrid_runtime::{HomeConfig, HomeScreen};
use libfuzzer_sys::fuzz_target;
use web_time::{Duration, Instant};

#[derive(Debug, Arbitrary)]
enum Step {
    Down { pointer: u8, x: u16, y: u16 },
    Move { pointer: u8, x: u16, y: u16 },
    Up { pointer: u8 },
    Cancel { pointer: u8 },
    Wait { millis: u16 },
    Spawn { span_x: u8, span_y: u8 },
    ForceCancel,
}

#[derive(Debug, Arbitrary)]
struct Session {
    seed_items: u8,
    steps: Vec<Step>,
}

fuzz_target!(|session: Session| {
    let Ok(mut home) = HomeScreen::new(HomeConfig::default()) else {
        return;
    };
    home.set_viewport(Size::new(400.0, 600.0));
    for n in 0..(session.seed_items % 30) {
        let _ = home.spawn(ItemContent::App(AppRef::new(format!("app{n}"), "Main")), 1, 1);
    }

    let mut now = Instant::now();
    let mut last = Point::default();
    for step in session.steps.into_iter().take(256) {
        now += Duration::from_millis(5);
        match step {
            Step::Down { pointer, x, y } => {
                last = Point::new(f32::from(x % 400), f32::from(y % 600));
                home.handle_pointer(PointerEvent::down(u32::from(pointer % 3), last, now));
            }
            Step::Move { pointer, x, y } => {
                last = Point::new(f32::from(x % 400), f32::from(y % 600));
                home.handle_pointer(PointerEvent::moved(u32::from(pointer % 3), last, now));
            }
            Step::Up { pointer } => {
                home.handle_pointer(PointerEvent::up(u32::from(pointer % 3), last, now));
            }
            Step::Cancel { pointer } => {
                home.handle_pointer(PointerEvent::cancel(u32::from(pointer % 3), last, now));
            }
            Step::Wait { millis } => {
                now += Duration::from_millis(u64::from(millis % 2_000));
                home.tick(now);
            }
            Step::Spawn { span_x, span_y } => {
                let _ = home.spawn(ItemContent::Clock, i32::from(span_x % 5), i32::from(span_y % 7));
            }
            Step::ForceCancel => {
                home.cancel_gesture();
            }
        }

        // Structural invariants hold after every step.
        assert!(home.store().validate().is_empty(), "{:?}", home.store().validate());
        assert!(home.current_page() < home.store().page_count());
        if !home.drag_state().is_active() {
            assert!(home.next_deadline().is_none(), "timer outlived gesture");
        }
    }
});
