use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which panel a scroll key acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Whichever panel holds focus.
    Focused,
    /// Always the left panel; the right one follows through the scroll mirror.
    Primary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ToggleFocus,
    Scroll {
        target: ScrollTarget,
        action: ScrollAction,
    },
    Quit,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InputRouter;

impl InputRouter {
    pub fn route(&self, key: KeyEvent) -> Option<Action> {
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return None;
        }

        let scroll = |target, action| Some(Action::Scroll { target, action });
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleFocus),
            KeyCode::Up | KeyCode::Char('k') => scroll(ScrollTarget::Focused, ScrollAction::LineUp),
            KeyCode::Down | KeyCode::Char('j') => {
                scroll(ScrollTarget::Focused, ScrollAction::LineDown)
            }
            KeyCode::PageUp => scroll(ScrollTarget::Primary, ScrollAction::PageUp),
            KeyCode::PageDown => scroll(ScrollTarget::Primary, ScrollAction::PageDown),
            KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::SHIFT) => {
                scroll(ScrollTarget::Primary, ScrollAction::Bottom)
            }
            KeyCode::Home | KeyCode::Char('g') => scroll(ScrollTarget::Primary, ScrollAction::Top),
            KeyCode::End | KeyCode::Char('G') => {
                scroll(ScrollTarget::Primary, ScrollAction::Bottom)
            }
            _ => None,
        }
    }
}

/// Key hints for the status row.
pub const KEY_HINTS: &str = "tab focus  j/k line  pgup/pgdn page  g/G top/bottom  q quit";

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys() {
        let router = InputRouter;
        assert_eq!(router.route(press(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(router.route(press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            router.route(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(router.route(press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn line_keys_target_focus_and_global_keys_target_primary() {
        let router = InputRouter;
        assert_eq!(
            router.route(press(KeyCode::Char('j'))),
            Some(Action::Scroll {
                target: ScrollTarget::Focused,
                action: ScrollAction::LineDown
            })
        );
        assert_eq!(
            router.route(press(KeyCode::Up)),
            Some(Action::Scroll {
                target: ScrollTarget::Focused,
                action: ScrollAction::LineUp
            })
        );
        for (code, action) in [
            (KeyCode::PageUp, ScrollAction::PageUp),
            (KeyCode::PageDown, ScrollAction::PageDown),
            (KeyCode::Home, ScrollAction::Top),
            (KeyCode::Char('g'), ScrollAction::Top),
            (KeyCode::End, ScrollAction::Bottom),
            (KeyCode::Char('G'), ScrollAction::Bottom),
        ] {
            assert_eq!(
                router.route(press(code)),
                Some(Action::Scroll {
                    target: ScrollTarget::Primary,
                    action
                })
            );
        }
    }

    #[test]
    fn shifted_g_jumps_to_bottom() {
        let key = KeyEvent::new(KeyCode::Char('g'), KeyModifiers::SHIFT);
        assert_eq!(
            InputRouter.route(key),
            Some(Action::Scroll {
                target: ScrollTarget::Primary,
                action: ScrollAction::Bottom
            })
        );
    }

    #[test]
    fn releases_and_unknown_keys_are_ignored() {
        let mut release = press(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        assert_eq!(InputRouter.route(release), None);
        assert_eq!(InputRouter.route(press(KeyCode::Char('x'))), None);
        assert_eq!(InputRouter.route(press(KeyCode::Tab)), Some(Action::ToggleFocus));
    }
}
