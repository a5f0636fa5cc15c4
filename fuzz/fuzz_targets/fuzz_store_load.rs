#![no_main]

use homegrid_layout::{GridConfig, ItemStore, OverlapResolver, decode_records};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(document) = std::str::from_utf8(data) else {
        return;
    };
    // Anything that is not a JSON array is rejected up front.
    let Ok(decoded) = decode_records(document) else {
        return;
    };
    let (mut store, report) = ItemStore::from_records(&decoded.records);

    // Loading repairs instead of failing; the result always validates.
    assert!(store.validate().is_empty(), "loaded store has issues: {:?}", store.validate());
    assert_eq!(store.len(), report.loaded);
    assert!(store.page_count() >= 1);

    // Any span is safe to resolve against, and fitting keeps it valid.
    let grid = GridConfig::default();
    let resolver = OverlapResolver::new(grid);
    if let Some(first) = store.items().next() {
        let page_items = store.page_items(first.page());
        let _ = resolver.resolve_drop(first, first.placement, &page_items);
    }
    store.fit_spans_to(&grid);
    assert!(store.validate().is_empty());

    // Saving and reloading what was loaded loses nothing.
    let (reloaded, again) = ItemStore::from_records(&store.to_records());
    assert_eq!(again.dropped, 0);
    assert_eq!(reloaded.len(), store.len());
    assert_eq!(reloaded.page_count(), store.page_count());
});
