//! The keys that control the animation.

use termwiz::input::{InputEvent, KeyCode, KeyEvent, Modifiers};

/// All the possible actions a user can trigger.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub(crate) enum KeybindingAction {
    /// Switch between the dark and light themes.
    ToggleTheme,
    /// Pause or resume the animation, like hiding and showing a web page.
    TogglePause,
    /// Exit Synapse.
    Quit,
}

impl KeybindingAction {
    /// The action bound to a parsed input event, if any.
    pub fn from_event(event: &InputEvent) -> Option<Self> {
        let InputEvent::Key(KeyEvent { key, modifiers }) = event else {
            return None;
        };

        if modifiers.contains(Modifiers::CTRL) {
            return matches!(key, KeyCode::Char('c' | 'C')).then_some(Self::Quit);
        }

        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "Only a handful of keys are bound"
        )]
        match key {
            KeyCode::Char('t' | 'T') => Some(Self::ToggleTheme),
            KeyCode::Char(' ' | 'p' | 'P') => Some(Self::TogglePause),
            KeyCode::Char('q' | 'Q') | KeyCode::Escape => Some(Self::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(key: KeyCode, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key(KeyEvent { key, modifiers })
    }

    #[test]
    fn bound_keys() {
        let cases = [
            (KeyCode::Char('t'), Some(KeybindingAction::ToggleTheme)),
            (KeyCode::Char(' '), Some(KeybindingAction::TogglePause)),
            (KeyCode::Char('p'), Some(KeybindingAction::TogglePause)),
            (KeyCode::Char('q'), Some(KeybindingAction::Quit)),
            (KeyCode::Escape, Some(KeybindingAction::Quit)),
            (KeyCode::Char('x'), None),
            (KeyCode::Enter, None),
        ];
        for (code, action) in cases {
            assert_eq!(
                KeybindingAction::from_event(&key(code, Modifiers::NONE)),
                action
            );
        }
    }

    #[test]
    fn ctrl_c_quits_but_ctrl_t_does_nothing() {
        assert_eq!(
            KeybindingAction::from_event(&key(KeyCode::Char('c'), Modifiers::CTRL)),
            Some(KeybindingAction::Quit)
        );
        assert_eq!(
            KeybindingAction::from_event(&key(KeyCode::Char('t'), Modifiers::CTRL)),
            None
        );
    }

    #[test]
    fn non_key_events_are_ignored() {
        let event = InputEvent::Resized { cols: 10, rows: 10 };
        assert_eq!(KeybindingAction::from_event(&event), None);
    }
}
