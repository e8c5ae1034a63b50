//! Keyboard shortcuts for the player.
//!
//! | Key            | Command                         |
//! |----------------|---------------------------------|
//! | Space          | play / pause                    |
//! | → / ←          | skip ±15 s (±30 s with Shift)   |
//! | ↑ / ↓          | volume ±0.1                     |
//! | M              | mute toggle                     |
//! | L              | loop toggle                     |
//! | Shift+N        | next in queue                   |
//! | Shift+P        | previous in queue               |
//!
//! Presses whose focus is a text-input control are never translated, so
//! typing in a search box does not drive the player.

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

/// A key as reported by the host, normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    /// Any other printable key, lowercased.
    Char(char),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value (`" "`, `"ArrowRight"`, `"m"`).
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            " " | "space" | "spacebar" => Some(Key::Space),
            "arrowleft" => Some(Key::ArrowLeft),
            "arrowright" => Some(Key::ArrowRight),
            "arrowup" => Some(Key::ArrowUp),
            "arrowdown" => Some(Key::ArrowDown),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

/// Where keyboard focus was when the key went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusTarget {
    #[default]
    Document,
    /// `<input>`, `<textarea>` or an equivalent editable control.
    TextInput,
}

/// A key-down event from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub focus: FocusTarget,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            focus: FocusTarget::Document,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.focus = FocusTarget::TextInput;
        self
    }
}

/// Player command bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum KeyCommand {
    TogglePlayPause,
    SkipForward { secs: f64 },
    SkipBackward { secs: f64 },
    VolumeUp { step: f64 },
    VolumeDown { step: f64 },
    ToggleMute,
    ToggleLoop,
    PlayNext,
    PlayPrevious,
}

impl KeyCommand {
    /// Translate a key press, or `None` when the press is not a shortcut.
    ///
    /// A `Some` result means the host should suppress the key's default
    /// action (page scroll on Space and arrows).
    pub fn from_key_press(press: &KeyPress, config: &PlayerConfig) -> Option<Self> {
        if press.focus == FocusTarget::TextInput {
            return None;
        }

        let skip = if press.shift {
            config.long_skip_secs
        } else {
            config.skip_secs
        };

        match press.key {
            Key::Space => Some(KeyCommand::TogglePlayPause),
            Key::ArrowRight => Some(KeyCommand::SkipForward { secs: skip }),
            Key::ArrowLeft => Some(KeyCommand::SkipBackward { secs: skip }),
            Key::ArrowUp => Some(KeyCommand::VolumeUp {
                step: config.volume_step,
            }),
            Key::ArrowDown => Some(KeyCommand::VolumeDown {
                step: config.volume_step,
            }),
            Key::Char(c) => match c.to_ascii_lowercase() {
                'm' => Some(KeyCommand::ToggleMute),
                'l' => Some(KeyCommand::ToggleLoop),
                'n' if press.shift => Some(KeyCommand::PlayNext),
                'p' if press.shift => Some(KeyCommand::PlayPrevious),
                _ => None,
            },
        }
    }
}
