pub mod test_utils;

use transit_viewer_core::canvas::RecordingCanvas;
use transit_viewer_core::color::{ColorAllocator, DEFAULT_PALETTE};
use transit_viewer_core::error::ViewerError;
use transit_viewer_core::overlay::{DisplayState, OverlayEntity, OverlayKind, OverlayRegistry};
use transit_viewer_core::render::{ArrowPattern, RenderContext};
use transit_viewer_core::table::RowId;
use transit_viewer_core::utils::TIME_FORMAT;

use crate::test_utils::*;

fn registry() -> OverlayRegistry<RecordingCanvas> {
    OverlayRegistry::new(
        RecordingCanvas::new(),
        ColorAllocator::default(),
        ArrowPattern::default(),
    )
}

#[test]
fn toggle_parity() {
    let stops = stop_table();
    let ctx = RenderContext::new(Some(&stops), TIME_FORMAT);
    let trip = trip(5, Some(0), Some(4));
    let mut registry = registry();

    for n in 1..=7 {
        let state = registry
            .toggle(RowId(0), OverlayEntity::Trip(&trip), &ctx)
            .unwrap();
        let expected = if n % 2 == 1 {
            DisplayState::Shown
        } else {
            DisplayState::Hidden
        };
        assert_eq!(state, expected);
        assert_eq!(registry.state(RowId(0), OverlayKind::Trip), expected);
        let features = if n % 2 == 1 { 11 } else { 0 };
        assert_eq!(registry.canvas().feature_count(), features);
    }
    assert_eq!(registry.canvas().operations(), (4, 3));
}

#[test]
fn color_survives_hide_and_show() {
    let ctx = RenderContext::new(None, TIME_FORMAT);
    let a = segment(3, "WP-1", true);
    let b = segment(4, "WP-2", false);
    let mut registry = registry();

    registry.toggle(RowId(5), OverlayEntity::Segment(&a), &ctx).unwrap();
    registry.toggle(RowId(2), OverlayEntity::Segment(&b), &ctx).unwrap();
    assert_eq!(
        registry.shown_color(RowId(5), OverlayKind::Segment),
        Some(DEFAULT_PALETTE[0])
    );
    assert_eq!(
        registry.shown_color(RowId(2), OverlayKind::Segment),
        Some(DEFAULT_PALETTE[1])
    );

    registry.toggle(RowId(5), OverlayEntity::Segment(&a), &ctx).unwrap();
    assert_eq!(registry.shown_color(RowId(5), OverlayKind::Segment), None);
    registry.toggle(RowId(5), OverlayEntity::Segment(&a), &ctx).unwrap();
    assert_eq!(
        registry.shown_color(RowId(5), OverlayKind::Segment),
        Some(DEFAULT_PALETTE[0])
    );
}

#[test]
fn kinds_are_independent() {
    let stops = stop_table();
    let ctx = RenderContext::new(Some(&stops), TIME_FORMAT);
    let trip = trip(5, Some(0), Some(4));
    let journey = journey(&[ORIGIN_CODE, MIDDLE_CODE, DESTINATION_CODE]);
    let mut registry = registry();

    registry.toggle(RowId(0), OverlayEntity::Journey(&journey), &ctx).unwrap();
    registry.toggle(RowId(0), OverlayEntity::Trip(&trip), &ctx).unwrap();
    assert_eq!(registry.canvas().layer_count(), 2);
    assert_eq!(
        registry.shown_color(RowId(0), OverlayKind::Journey),
        registry.shown_color(RowId(0), OverlayKind::Trip)
    );

    registry.toggle(RowId(0), OverlayEntity::Journey(&journey), &ctx).unwrap();
    assert_eq!(registry.state(RowId(0), OverlayKind::Journey), DisplayState::Hidden);
    assert_eq!(registry.state(RowId(0), OverlayKind::Trip), DisplayState::Shown);
    assert_eq!(registry.shown(), vec![(RowId(0), OverlayKind::Trip)]);
}

#[test]
fn failed_render_changes_nothing() {
    let stops = stop_table();
    let ctx = RenderContext::new(Some(&stops), TIME_FORMAT);
    let good = trip(5, Some(0), Some(4));
    let broken = trip(2, Some(0), Some(9));
    let mut registry = registry();

    registry.toggle(RowId(0), OverlayEntity::Trip(&good), &ctx).unwrap();
    let before = registry.canvas().feature_count();

    match registry.toggle(RowId(1), OverlayEntity::Trip(&broken), &ctx) {
        Err(ViewerError::SampleIndexOutOfRange { index: 9, len: 2 }) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(registry.state(RowId(1), OverlayKind::Trip), DisplayState::Hidden);
    assert_eq!(registry.state(RowId(0), OverlayKind::Trip), DisplayState::Shown);
    assert_eq!(registry.canvas().feature_count(), before);
    assert_eq!(registry.canvas().layer_count(), 1);
}

#[test]
fn hide_all_and_clear() {
    let ctx = RenderContext::new(None, TIME_FORMAT);
    let segments: Vec<_> = (0..4).map(|i| segment(2 + i, "WP", true)).collect();
    let mut registry = registry();
    for (i, segment) in segments.iter().enumerate() {
        registry
            .toggle(RowId(i), OverlayEntity::Segment(segment), &ctx)
            .unwrap();
    }
    assert_eq!(registry.canvas().layer_count(), 4);

    let hidden = registry.hide_all();
    assert_eq!(hidden.len(), 4);
    assert_eq!(registry.canvas().layer_count(), 0);
    assert!(registry.shown().is_empty());
    // colors kept until cleared
    assert_eq!(registry.colors().assigned_count(), 4);
    assert!(registry.hide_all().is_empty());

    registry.toggle(RowId(3), OverlayEntity::Segment(&segments[3]), &ctx).unwrap();
    assert_eq!(
        registry.shown_color(RowId(3), OverlayKind::Segment),
        Some(DEFAULT_PALETTE[3])
    );
    let cleared = registry.clear();
    assert_eq!(cleared, vec![(RowId(3), OverlayKind::Segment)]);
    assert_eq!(registry.canvas().feature_count(), 0);
    assert_eq!(registry.colors().assigned_count(), 0);

    registry.toggle(RowId(3), OverlayEntity::Segment(&segments[3]), &ctx).unwrap();
    assert_eq!(
        registry.shown_color(RowId(3), OverlayKind::Segment),
        Some(DEFAULT_PALETTE[0])
    );
}

#[test]
fn hide_unknown_is_noop() {
    let mut registry = registry();
    assert!(!registry.hide(RowId(3), OverlayKind::Journey));
    assert_eq!(registry.canvas().operations(), (0, 0));
}
