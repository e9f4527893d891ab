//! Global keyboard shortcuts for the active track.

use super::TransportCommand;

/// A keydown as the page delivers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress<'a> {
    /// `KeyboardEvent.code`, e.g. `"Space"` or `"KeyM"`.
    pub code: &'a str,
    pub ctrl: bool,
    /// Focus is in an input, textarea or contenteditable element.
    pub in_text_input: bool,
}

impl<'a> KeyPress<'a> {
    pub fn new(code: &'a str) -> Self {
        Self {
            code,
            ctrl: false,
            in_text_input: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.in_text_input = true;
        self
    }
}

/// Map a key press to a transport command.
///
/// A `Some` result means the page should also suppress the key's default
/// action.
pub fn command_for_key(key: KeyPress<'_>) -> Option<TransportCommand> {
    match key.code {
        "Space" if !key.in_text_input => Some(TransportCommand::Toggle),
        "KeyM" if !key.in_text_input => Some(TransportCommand::ToggleMute),
        "ArrowRight" if key.ctrl => Some(TransportCommand::Next),
        "ArrowLeft" if key.ctrl => Some(TransportCommand::Previous),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts() {
        assert_eq!(command_for_key(KeyPress::new("Space")), Some(TransportCommand::Toggle));
        assert_eq!(command_for_key(KeyPress::new("KeyM")), Some(TransportCommand::ToggleMute));
        assert_eq!(
            command_for_key(KeyPress::new("ArrowRight").with_ctrl()),
            Some(TransportCommand::Next)
        );
        assert_eq!(
            command_for_key(KeyPress::new("ArrowLeft").with_ctrl()),
            Some(TransportCommand::Previous)
        );
        assert_eq!(command_for_key(KeyPress::new("ArrowLeft")), None);
    }

    #[test]
    fn test_typing_is_left_alone() {
        assert_eq!(command_for_key(KeyPress::new("Space").in_text_input()), None);
        assert_eq!(command_for_key(KeyPress::new("KeyM").in_text_input()), None);
        assert_eq!(
            command_for_key(KeyPress::new("ArrowRight").with_ctrl().in_text_input()),
            Some(TransportCommand::Next)
        );
    }
}
