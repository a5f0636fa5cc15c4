//! Full drag sessions through `HomeScreen`: press, hold, move, edge hold,
//! drop and cancel, checked against the resulting item store.

use homegrid_core::event::PointerEvent;
use homegrid_core::geometry::{Cell, Point, Size};
use homegrid_layout::{
    AppRef, FolderChange, FolderRenderError, GridConfig, ItemContent, ItemId, ItemStore,
    LayoutMode, MemoryBackend, Placement,
};
use homegrid_runtime::{
    CancelReason, HomeConfig, HomeEvent, HomeScreen, RevertReason, SettleOutcome, SwipeIntent,
    UnresolvedPolicy,
};
use web_time::{Duration, Instant};

/// 4x6 grid on a 400x600 viewport: 100px cells, 40px edge bands.
fn home() -> HomeScreen {
    home_with(HomeConfig::default())
}

fn home_with(config: HomeConfig) -> HomeScreen {
    let mut home = HomeScreen::new(config).expect("valid config");
    home.set_viewport(Size::new(400.0, 600.0));
    home
}

fn app(name: &str) -> ItemContent {
    ItemContent::App(AppRef::new(name, "Main"))
}

fn at(t0: Instant, millis: u64) -> Instant {
    t0 + Duration::from_millis(millis)
}

fn pt(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

fn origin_of(home: &HomeScreen, id: ItemId) -> Cell {
    home.store().get(id).expect("item present").cell_rect().origin()
}

/// Press at `point` and hold past the long-press delay.
fn pick_up(home: &mut HomeScreen, t0: Instant, point: Point) -> Vec<HomeEvent> {
    let mut events = home.handle_pointer(PointerEvent::down(1, point, t0));
    events.extend(home.tick(at(t0, 400)));
    events
}

fn settled(events: &[HomeEvent]) -> Option<&SettleOutcome> {
    events.iter().find_map(|event| match event {
        HomeEvent::Settled { outcome, .. } => Some(outcome),
        _ => None,
    })
}

#[test]
fn tap_on_app_launches_it() {
    let t0 = Instant::now();
    let mut home = home();
    let id = home.spawn(app("mail"), 1, 1).expect("spawn");
    assert_eq!(origin_of(&home, id), Cell::new(1, 2));

    home.handle_pointer(PointerEvent::down(1, pt(150.0, 250.0), t0));
    let events = home.handle_pointer(PointerEvent::up(1, pt(151.0, 252.0), at(t0, 120)));
    assert_eq!(
        events,
        vec![HomeEvent::Launch {
            item: id,
            app: AppRef::new("mail", "Main")
        }]
    );
    assert!(home.next_deadline().is_none());
}

#[test]
fn long_press_on_empty_space_opens_context_menu() {
    let t0 = Instant::now();
    let mut home = home();
    let events = pick_up(&mut home, t0, pt(50.0, 50.0));
    assert_eq!(events, vec![HomeEvent::ContextMenu { at: pt(50.0, 50.0) }]);
    assert!(home.next_deadline().is_none());
}

#[test]
fn horizontal_swipe_turns_page() {
    let t0 = Instant::now();
    let mut home = home();
    home.add_page();

    home.handle_pointer(PointerEvent::down(1, pt(300.0, 300.0), t0));
    let events = home.handle_pointer(PointerEvent::moved(1, pt(200.0, 310.0), at(t0, 80)));
    assert_eq!(
        events,
        vec![
            HomeEvent::Swipe(SwipeIntent::NextPage),
            HomeEvent::PageChanged { page: 1 }
        ]
    );
    assert_eq!(home.current_page(), 1);

    home.handle_pointer(PointerEvent::down(1, pt(200.0, 300.0), at(t0, 500)));
    let events = home.handle_pointer(PointerEvent::moved(1, pt(205.0, 200.0), at(t0, 540)));
    assert_eq!(events, vec![HomeEvent::Swipe(SwipeIntent::OpenDrawer)]);
}

#[test]
fn dropping_app_onto_app_merges_into_folder_at_target() {
    let t0 = Instant::now();
    let mut home = home();
    let target = home.spawn(app("a"), 1, 1).expect("spawn");
    let dragged = home.spawn(app("b"), 1, 1).expect("spawn");
    assert_eq!(origin_of(&home, dragged), Cell::new(2, 2));

    let started = pick_up(&mut home, t0, pt(250.0, 250.0));
    assert!(started.contains(&HomeEvent::DragStarted { item: dragged }));
    let moved = home.handle_pointer(PointerEvent::moved(1, pt(150.0, 250.0), at(t0, 450)));
    assert_eq!(
        moved,
        vec![HomeEvent::DragMoved {
            item: dragged,
            top_left: pt(100.0, 200.0)
        }]
    );
    let events = home.handle_pointer(PointerEvent::up(1, pt(150.0, 250.0), at(t0, 500)));

    let Some(SettleOutcome::MergedIntoFolder { folder }) = settled(&events) else {
        panic!("expected a merge, got {events:?}");
    };
    assert_eq!(home.store().len(), 1);
    let folder_item = home.store().get(*folder).expect("folder stored");
    assert_eq!(folder_item.cell_rect().origin(), Cell::new(1, 2));
    let children: Vec<ItemId> = folder_item
        .folder()
        .expect("is a folder")
        .children()
        .iter()
        .map(|child| child.id())
        .collect();
    assert_eq!(children, vec![target, dragged]);
    assert!(home.store().validate().is_empty());
}

#[test]
fn equal_area_drop_outside_folder_zone_swaps() {
    let t0 = Instant::now();
    let mut home = home();
    let a = home.spawn(app("a"), 1, 1).expect("spawn");
    let b = home.spawn(app("b"), 1, 1).expect("spawn");

    pick_up(&mut home, t0, pt(250.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(120.0, 250.0), at(t0, 450)));
    let events = home.handle_pointer(PointerEvent::up(1, pt(120.0, 250.0), at(t0, 500)));

    assert_eq!(settled(&events), Some(&SettleOutcome::Swapped { other: a }));
    assert_eq!(origin_of(&home, b), Cell::new(1, 2));
    assert_eq!(origin_of(&home, a), Cell::new(2, 2));
    let spans: Vec<_> = home.store().items().map(|item| item.cell_rect().area()).collect();
    assert_eq!(spans, vec![1, 1]);
}

#[test]
fn failed_folder_render_reverts_drop() {
    let t0 = Instant::now();
    let mut home = home();
    home.spawn(app("a"), 1, 1).expect("spawn");
    let dragged = home.spawn(app("b"), 1, 1).expect("spawn");
    home.set_folder_observer(Box::new(
        |_: &FolderChange<'_>| -> Result<(), FolderRenderError> {
            Err(FolderRenderError::new("surface lost"))
        },
    ));
    let before = home.store().state_hash();

    pick_up(&mut home, t0, pt(250.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(150.0, 250.0), at(t0, 450)));
    let events = home.handle_pointer(PointerEvent::up(1, pt(150.0, 250.0), at(t0, 500)));

    assert_eq!(
        settled(&events),
        Some(&SettleOutcome::Reverted {
            reason: RevertReason::FolderRejected
        })
    );
    assert_eq!(home.store().state_hash(), before);
    assert_eq!(origin_of(&home, dragged), Cell::new(2, 2));
}

#[test]
fn edge_hold_turns_pages_with_cooldown_and_drop_lands_on_new_page() {
    let t0 = Instant::now();
    let mut home = home();
    let item = home.spawn(app("a"), 1, 1).expect("spawn");
    home.add_page();
    home.add_page();

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(390.0, 250.0), at(t0, 450)));

    assert!(home.tick(at(t0, 799)).is_empty());
    assert_eq!(home.tick(at(t0, 800)), vec![HomeEvent::PageChanged { page: 1 }]);
    assert!(home.tick(at(t0, 1499)).is_empty());
    assert_eq!(home.tick(at(t0, 1500)), vec![HomeEvent::PageChanged { page: 2 }]);

    let events = home.handle_pointer(PointerEvent::up(1, pt(390.0, 250.0), at(t0, 1600)));
    assert_eq!(
        settled(&events),
        Some(&SettleOutcome::Moved {
            to: Cell::new(3, 2),
            page: 2
        })
    );
    assert_eq!(home.store().get(item).map(|found| found.page()), Some(2));
}

#[test]
fn no_page_turns_after_drop() {
    let t0 = Instant::now();
    let mut home = home();
    home.spawn(app("a"), 1, 1).expect("spawn");
    home.add_page();

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(395.0, 250.0), at(t0, 450)));
    home.handle_pointer(PointerEvent::up(1, pt(395.0, 250.0), at(t0, 600)));

    assert!(home.next_deadline().is_none());
    for millis in [800, 1_500, 2_000, 10_000] {
        assert!(home.tick(at(t0, millis)).is_empty(), "timer fired at {millis}ms");
    }
    assert_eq!(home.current_page(), 0);
}

#[test]
fn no_page_turns_after_cancel() {
    let t0 = Instant::now();
    let mut home = home();
    let item = home.spawn(app("a"), 1, 1).expect("spawn");
    home.add_page();

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(395.0, 250.0), at(t0, 450)));
    let events = home.cancel_gesture();
    assert_eq!(
        events,
        vec![HomeEvent::DragCancelled {
            item: Some(item),
            reason: CancelReason::Programmatic
        }]
    );

    assert!(home.next_deadline().is_none());
    assert!(home.tick(at(t0, 5_000)).is_empty());
    assert_eq!(home.current_page(), 0);
    assert_eq!(origin_of(&home, item), Cell::new(1, 2));
}

#[test]
fn holding_at_last_page_creates_page_and_cancel_removes_it() {
    let t0 = Instant::now();
    let mut home = home();
    let dragged = home.spawn(app("a"), 1, 1).expect("spawn");
    home.spawn(app("b"), 1, 1).expect("spawn");
    assert_eq!(home.store().page_count(), 1);

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(395.0, 250.0), at(t0, 450)));
    let events = home.tick(at(t0, 1_650));
    assert_eq!(
        events,
        vec![
            HomeEvent::PageCreated { page: 1 },
            HomeEvent::PageChanged { page: 1 }
        ]
    );
    assert_eq!(home.store().page_count(), 2);

    let events = home.handle_pointer(PointerEvent::cancel(1, pt(395.0, 250.0), at(t0, 1_700)));
    assert_eq!(
        events,
        vec![
            HomeEvent::PageChanged { page: 0 },
            HomeEvent::DragCancelled {
                item: Some(dragged),
                reason: CancelReason::System
            }
        ]
    );
    assert_eq!(home.store().page_count(), 1);
    assert_eq!(home.current_page(), 0);
    assert_eq!(origin_of(&home, dragged), Cell::new(1, 2));
}

#[test]
fn second_pointer_cancels_drag_without_resolution() {
    let t0 = Instant::now();
    let mut home = home();
    let a = home.spawn(app("a"), 1, 1).expect("spawn");
    let b = home.spawn(app("b"), 1, 1).expect("spawn");
    let before = home.store().state_hash();

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(250.0, 250.0), at(t0, 450)));
    let events = home.handle_pointer(PointerEvent::down(2, pt(20.0, 20.0), at(t0, 500)));
    assert_eq!(
        events,
        vec![HomeEvent::DragCancelled {
            item: Some(a),
            reason: CancelReason::MultiTouch
        }]
    );
    assert_eq!(home.store().state_hash(), before);
    assert_eq!(origin_of(&home, b), Cell::new(2, 2));
    assert!(home.next_deadline().is_none());
}

#[test]
fn freeform_drop_keeps_fractional_position() {
    let t0 = Instant::now();
    let mut config = HomeConfig::default();
    config.grid.layout_mode = LayoutMode::Freeform;
    let mut home = home_with(config);
    let item = home.spawn(ItemContent::Clock, 1, 1).expect("spawn");

    pick_up(&mut home, t0, pt(150.0, 250.0));
    home.handle_pointer(PointerEvent::moved(1, pt(187.0, 262.0), at(t0, 450)));
    home.handle_pointer(PointerEvent::up(1, pt(187.0, 262.0), at(t0, 500)));

    let placement = home.store().get(item).expect("item").placement;
    assert!((placement.col - 1.37).abs() < 1e-4, "col {}", placement.col);
    assert!((placement.row - 2.12).abs() < 1e-4, "row {}", placement.row);
}

/// Drag from `from` to `to` and release, returning the settle outcome.
fn drag_and_drop(home: &mut HomeScreen, t0: Instant, from: Point, to: Point) -> Option<SettleOutcome> {
    pick_up(home, t0, from);
    home.handle_pointer(PointerEvent::moved(1, to, at(t0, 450)));
    let events = home.handle_pointer(PointerEvent::up(1, to, at(t0, 500)));
    settled(&events).cloned()
}

#[test]
fn smaller_item_dropped_on_larger_one_relocates_itself() {
    let t0 = Instant::now();
    let mut store = ItemStore::new();
    let widget = store
        .insert(ItemContent::Widget { widget_id: 1 }, Placement::new(0.0, 0.0, 2.0, 2.0, 0))
        .expect("widget");
    let mover = store.insert(app("a"), Placement::cell(3, 5, 0)).expect("app");
    let mut home = HomeScreen::with_store(HomeConfig::default(), store).expect("valid config");
    home.set_viewport(Size::new(400.0, 600.0));

    let outcome = drag_and_drop(&mut home, t0, pt(350.0, 550.0), pt(150.0, 150.0));
    assert_eq!(outcome, Some(SettleOutcome::Relocated { to: Cell::new(1, 2) }));
    assert_eq!(origin_of(&home, mover), Cell::new(1, 2));
    assert_eq!(origin_of(&home, widget), Cell::new(0, 0));
}

#[test]
fn oversized_persisted_span_is_fitted_and_drop_onto_it_reverts() {
    let t0 = Instant::now();
    let mut backend = MemoryBackend::with_document(
        r#"[{"type":"CLOCK","spanX":70000,"spanY":70000},{"type":"CLOCK","col":3,"row":5}]"#,
    );
    let (mut home, report) = HomeScreen::load(HomeConfig::default(), &mut backend).expect("loads");
    home.set_viewport(Size::new(400.0, 600.0));
    assert_eq!(report.loaded, 2);
    assert_eq!(report.fitted_spans, 1);

    let ids: Vec<ItemId> = home.store().ids().to_vec();
    let big = home.store().get(ids[0]).expect("big").cell_rect();
    assert_eq!((big.span_x, big.span_y), (4, 6));

    let outcome = drag_and_drop(&mut home, t0, pt(350.0, 550.0), pt(50.0, 50.0));
    assert_eq!(
        outcome,
        Some(SettleOutcome::Reverted {
            reason: RevertReason::NoFreeCell
        })
    );
    assert_eq!(origin_of(&home, ids[1]), Cell::new(3, 5));
}

/// 2x2 grid: a 2x2 widget alone on page 0, page 1 full of 1x1 clocks.
fn full_page_setup(unresolved: UnresolvedPolicy) -> (HomeScreen, ItemId, Vec<ItemId>) {
    let mut config = HomeConfig {
        grid: GridConfig::new(2, 2),
        ..HomeConfig::default()
    };
    config.arrangement.unresolved = unresolved;
    let mut store = ItemStore::with_pages(2);
    let widget = store
        .insert(ItemContent::Widget { widget_id: 1 }, Placement::new(0.0, 0.0, 2.0, 2.0, 0))
        .expect("widget");
    let clocks: Vec<ItemId> = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .map(|(col, row)| {
            store
                .insert(ItemContent::Clock, Placement::cell(col, row, 1))
                .expect("clock")
        })
        .collect();
    let mut home = HomeScreen::with_store(config, store).expect("valid config");
    home.set_viewport(Size::new(400.0, 600.0));
    (home, widget, clocks)
}

/// Carry the widget to page 1 with an edge hold and drop it there.
fn drop_widget_on_full_page(home: &mut HomeScreen, t0: Instant) -> Option<SettleOutcome> {
    pick_up(home, t0, pt(200.0, 300.0));
    home.handle_pointer(PointerEvent::moved(1, pt(390.0, 300.0), at(t0, 450)));
    assert_eq!(home.tick(at(t0, 800)), vec![HomeEvent::PageChanged { page: 1 }]);
    let events = home.handle_pointer(PointerEvent::up(1, pt(390.0, 300.0), at(t0, 850)));
    settled(&events).cloned()
}

#[test]
fn unresolved_items_move_to_another_page_by_default() {
    let t0 = Instant::now();
    let (mut home, widget, clocks) = full_page_setup(UnresolvedPolicy::RelocateToOtherPage);

    let outcome = drop_widget_on_full_page(&mut home, t0);
    assert_eq!(
        outcome,
        Some(SettleOutcome::Displaced {
            moved: Vec::new(),
            relocated_elsewhere: clocks.clone(),
            left_overlapping: Vec::new(),
        })
    );
    assert_eq!(home.store().get(widget).map(|item| item.page()), Some(1));
    for clock in &clocks {
        assert_eq!(home.store().get(*clock).map(|item| item.page()), Some(0));
    }
    let page0 = home.store().page_items(0);
    for (i, a) in page0.iter().enumerate() {
        for b in &page0[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a.id(), b.id());
        }
    }
    assert_eq!(home.store().page_count(), 2);
}

#[test]
fn leave_in_place_keeps_unresolved_items_where_they_were() {
    let t0 = Instant::now();
    let (mut home, widget, clocks) = full_page_setup(UnresolvedPolicy::LeaveInPlace);

    let outcome = drop_widget_on_full_page(&mut home, t0);
    assert_eq!(
        outcome,
        Some(SettleOutcome::Displaced {
            moved: Vec::new(),
            relocated_elsewhere: Vec::new(),
            left_overlapping: clocks.clone(),
        })
    );
    assert_eq!(home.store().get(widget).map(|item| item.page()), Some(1));
    for clock in &clocks {
        assert_eq!(home.store().get(*clock).map(|item| item.page()), Some(1));
    }
    assert_eq!(origin_of(&home, clocks[3]), Cell::new(1, 1));
}

fn trailing_pages_setup(trim: bool) -> (HomeScreen, ItemId) {
    let mut config = HomeConfig::default();
    config.arrangement.trim_empty_pages_after_settle = trim;
    let mut store = ItemStore::with_pages(3);
    let item = store.insert(app("a"), Placement::cell(1, 2, 0)).expect("app");
    let mut home = HomeScreen::with_store(config, store).expect("valid config");
    home.set_viewport(Size::new(400.0, 600.0));
    (home, item)
}

#[test]
fn trailing_empty_pages_are_trimmed_after_settle_when_enabled() {
    let t0 = Instant::now();
    let (mut home, item) = trailing_pages_setup(true);
    let outcome = drag_and_drop(&mut home, t0, pt(150.0, 250.0), pt(250.0, 250.0));
    assert_eq!(
        outcome,
        Some(SettleOutcome::Moved {
            to: Cell::new(2, 2),
            page: 0
        })
    );
    assert_eq!(home.store().page_count(), 1);
    assert_eq!(origin_of(&home, item), Cell::new(2, 2));
}

#[test]
fn empty_pages_survive_settle_by_default() {
    let t0 = Instant::now();
    let (mut home, _) = trailing_pages_setup(false);
    drag_and_drop(&mut home, t0, pt(150.0, 250.0), pt(250.0, 250.0));
    assert_eq!(home.store().page_count(), 3);
}
