//! Scenario tests for the page controllers, driven by explicit timestamps.

use core::time::Duration;

use folio_core::geometry::Viewport;
use folio_core::menu::{MenuConfig, MenuController, MenuFlags};
use folio_core::rate_limit::{debounce, throttle};
use folio_core::scroll::{ScrollCoordinator, ScrollSnapshot, Section};
use folio_core::typewriter::{Typewriter, TypewriterConfig, TypingPhase};

const fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn throttle_sixteen_ms_window() {
    let mut calls = Vec::new();
    let mut handler = throttle(|t: u64| calls.push(t), ms(16));
    for t in [0, 5, 10, 20] {
        handler.call_at(ms(t), t);
    }
    drop(handler);
    assert_eq!(calls, vec![0, 20]);
}

#[test]
fn debounce_quarter_second() {
    let mut handler = debounce(|(t, w): (u64, u32)| (t, w), ms(250));
    handler.call_at(ms(0), (0, 800));
    handler.call_at(ms(50), (50, 900));
    handler.call_at(ms(100), (100, 1000));

    let mut fired = Vec::new();
    for t in 0..=1000 {
        if let Some(args) = handler.poll_at(ms(t)) {
            fired.push((t, args));
        }
    }
    assert_eq!(fired, vec![(350, (100, 1000))]);
}

#[test]
fn typewriter_cloud_technologies_timeline() {
    let text = "Cloud Technologies";
    let mut tw = Typewriter::new(
        [text, "Intelligent Web Applications"],
        TypewriterConfig::default(),
    )
    .unwrap();
    tw.start_at(ms(0));

    // 19 tick slots, 100ms apart.
    for tick in 0..19 {
        tw.tick_at(ms(tick * 100));
    }
    assert_eq!(tw.display(), text);
    assert_eq!(tw.phase(), TypingPhase::PausedAtFull);

    // Full string reached on the 18th tick (t=1700); held for 2000ms.
    for t in (1700..3700).step_by(10) {
        tw.tick_at(ms(t));
        assert_eq!(tw.display(), text, "changed early at {t}ms");
    }

    tw.tick_at(ms(3700));
    assert_eq!(tw.display(), &text[..text.len() - 1]);
    tw.tick_at(ms(3749));
    assert_eq!(tw.display().len(), text.len() - 1);
    tw.tick_at(ms(3750));
    assert_eq!(tw.display().len(), text.len() - 2);
    tw.tick_at(ms(3800));
    assert_eq!(tw.display().len(), text.len() - 3);
    assert_eq!(tw.phase(), TypingPhase::Deleting);
}

#[test]
fn reveal_fallback_threshold() {
    let vh = 900.0;
    let mut coord = ScrollCoordinator::default();
    let update = coord.apply(&ScrollSnapshot {
        viewport: Viewport::new(0.0, 1440.0, vh),
        pending_reveals: vec![("near", vh - 100.0), ("far", vh - 200.0)],
        sections: vec![],
    });
    assert_eq!(update.revealed, vec!["far"]);
}

#[test]
fn menu_round_trip_restores_flags() {
    let mut menu = MenuController::new(MenuConfig::default(), true);
    let closed = menu.flags();
    menu.toggle(true, ms(0));
    assert!(menu.flags().contains(MenuFlags::SCROLL_LOCK | MenuFlags::OVERLAY_ACTIVE));
    menu.toggle(false, ms(1));
    assert_eq!(menu.flags(), closed);
    assert!(menu.flags().is_empty());
}

#[test]
fn active_section_b() {
    let mut coord = ScrollCoordinator::default();
    // offsetTop - 100 gives ranges [0, 400) and [400, 900).
    let sections = vec![Section::new("a", 100.0, 400.0), Section::new("b", 500.0, 500.0)];
    assert_eq!(coord.refresh_sections(450.0, &sections).as_deref(), Some("b"));
    assert_eq!(coord.active_section(), Some("b"));
}
