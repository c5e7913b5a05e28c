use dualstream::ui::{DualPanels, LinePanel, PanelLine, PanelSide, ScrollAction, ScrollTarget};

fn filled_pair(left_rows: usize, right_rows: usize) -> DualPanels {
    let mut panels = DualPanels::new("Direct", "Traced (wrapper)");
    for side in PanelSide::BOTH {
        panels.set_viewport(side, 32, 6);
    }
    for i in 0..left_rows {
        panels.append(PanelSide::Left, PanelLine::plain(format!("left {i}")));
    }
    for i in 0..right_rows {
        panels.append(PanelSide::Right, PanelLine::plain(format!("right {i}")));
    }
    panels
}

#[test]
fn test_content_is_every_append_in_order() {
    for count in [0usize, 1, 7, 64] {
        let mut panel = LinePanel::new("p");
        let expected: Vec<String> = (0..count).map(|i| format!("line {i}")).collect();
        for text in &expected {
            let changed = panel.append(PanelLine::plain(text.clone()));
            assert_eq!(changed.percent, 100.0);
            assert_eq!(panel.scroll_percent(), 100.0);
        }
        let actual: Vec<String> = panel.lines().iter().map(|l| l.text.clone()).collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_bottom_always_reveals_last_append() {
    let mut panel = LinePanel::new("p");
    panel.set_viewport(12, 3);
    for i in 0..50 {
        let _ = panel.scroll_to_top();
        let _ = panel.append(PanelLine::plain(format!("entry number {i}")));
        let last_visible = panel.visible_rows().last().expect("visible rows");
        assert_eq!(last_visible, panel.rows().last().expect("rows"));
        assert!(last_visible.text.ends_with(&i.to_string()));
    }
}

#[test]
fn test_any_percentage_set_on_one_side_is_read_back_on_the_other() {
    let mut panels = filled_pair(13, 90);
    for step in 0..=40 {
        let percent = step as f64 * 2.5;
        let source = if step % 2 == 0 {
            PanelSide::Left
        } else {
            PanelSide::Right
        };
        panels.set_scroll_percent(source, percent);
        assert_eq!(panels.panel(PanelSide::Left).scroll_percent(), percent);
        assert_eq!(panels.panel(PanelSide::Right).scroll_percent(), percent);
        assert!(!panels.synchronizer().is_syncing());
    }
}

#[test]
fn test_every_propagation_suppresses_exactly_its_echo() {
    let mut panels = DualPanels::new("a", "b");
    let actions = [
        (ScrollTarget::Focused, ScrollAction::LineDown),
        (ScrollTarget::Primary, ScrollAction::Top),
        (ScrollTarget::Focused, ScrollAction::LineUp),
        (ScrollTarget::Primary, ScrollAction::PageDown),
        (ScrollTarget::Primary, ScrollAction::Bottom),
        (ScrollTarget::Primary, ScrollAction::PageUp),
    ];
    for (i, (target, action)) in actions.iter().cycle().take(30).enumerate() {
        if i % 4 == 0 {
            panels.toggle_focus();
        }
        panels.append(PanelSide::BOTH[i % 2], PanelLine::plain(format!("{i}")));
        panels.scroll(*target, *action);
    }

    let sync = panels.synchronizer();
    assert_eq!(sync.propagations(), 60);
    assert_eq!(sync.suppressed(), sync.propagations());
    assert_eq!(
        panels.panel(PanelSide::Left).scroll_percent(),
        panels.panel(PanelSide::Right).scroll_percent()
    );
}

#[test]
fn test_double_toggle_restores_focus() {
    let mut panels = DualPanels::new("a", "b");
    for _ in 0..3 {
        let before = panels.focus();
        panels.toggle_focus();
        assert_ne!(panels.focus(), before);
        panels.toggle_focus();
        assert_eq!(panels.focus(), before);
    }
}

#[test]
fn test_global_keys_move_both_panels_by_percentage() {
    let mut panels = filled_pair(20, 200);
    panels.toggle_focus();
    panels.scroll(ScrollTarget::Primary, ScrollAction::Top);
    panels.scroll(ScrollTarget::Primary, ScrollAction::PageDown);

    let left = panels.panel(PanelSide::Left);
    let right = panels.panel(PanelSide::Right);
    assert_eq!(left.scroll_offset(), 6);
    assert_eq!(right.scroll_percent(), left.scroll_percent());
    assert_ne!(right.scroll_offset(), left.scroll_offset());
}
