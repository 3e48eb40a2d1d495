//! Global hotkey description parsing.
//!
//! Only the text format lives here; registering the combination with the OS
//! is left to the shell that hosts the engine.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("No key in hotkey: {0}")]
    MissingKey(String),

    #[error("More than one key in hotkey: {0}")]
    TooManyKeys(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
    Function(u8),
    /// Any other key, by its canonical name
    Named(&'static str),
}

/// Canonical key names with the aliases accepted for them
const NAMED_KEYS: &[(&str, &[&str])] = &[
    ("Enter", &["enter", "return"]),
    ("Tab", &["tab"]),
    ("Escape", &["escape", "esc"]),
    ("Back", &["back", "backspace"]),
    ("Delete", &["delete", "del"]),
    ("Insert", &["insert", "ins"]),
    ("Home", &["home"]),
    ("End", &["end"]),
    ("PageUp", &["pageup", "prior"]),
    ("PageDown", &["pagedown", "next"]),
    ("Up", &["up"]),
    ("Down", &["down"]),
    ("Left", &["left"]),
    ("Right", &["right"]),
    ("Pause", &["pause"]),
    ("PrintScreen", &["printscreen", "snapshot"]),
    ("OemTilde", &["oemtilde", "oem3"]),
    ("OemMinus", &["oemminus"]),
    ("OemPlus", &["oemplus"]),
    ("OemComma", &["oemcomma"]),
    ("OemPeriod", &["oemperiod"]),
    ("OemQuestion", &["oemquestion", "oem2"]),
    ("OemSemicolon", &["oemsemicolon", "oem1"]),
    ("OemQuotes", &["oemquotes", "oem7"]),
    ("OemOpenBrackets", &["oemopenbrackets", "oem4"]),
    ("OemCloseBrackets", &["oemclosebrackets", "oem6"]),
    ("OemPipe", &["oempipe", "oem5"]),
];

impl Key {
    fn parse(part: &str) -> Option<Self> {
        let lower = part.to_ascii_lowercase();
        if lower == "space" {
            return Some(Key::Space);
        }
        if let Some((name, _)) = NAMED_KEYS.iter().find(|(_, aliases)| aliases.contains(&lower.as_str())) {
            return Some(Key::Named(*name));
        }

        let mut chars = lower.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Some(Key::Char(c.to_ascii_uppercase()));
            }
        }

        lower
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=24).contains(n))
            .map(Key::Function)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Space => write!(f, "Space"),
            Key::Char(c) => write!(f, "{}", c),
            Key::Function(n) => write!(f, "F{}", n),
            Key::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A modifier set plus one key, e.g. `Ctrl+Alt+Space`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            modifiers: Modifiers {
                ctrl: true,
                alt: true,
                ..Modifiers::default()
            },
            key: Key::Space,
        }
    }
}

impl Hotkey {
    /// Parse a `+` separated combination. Blank text gives the default.
    pub fn parse(text: &str) -> Result<Self, HotkeyError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in text.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "win" | "windows" => modifiers.win = true,
                _ => {
                    let parsed = Key::parse(part).ok_or_else(|| HotkeyError::UnknownKey(part.to_string()))?;
                    if key.replace(parsed).is_some() {
                        return Err(HotkeyError::TooManyKeys(text.to_string()));
                    }
                }
            }
        }

        let key = key.ok_or_else(|| HotkeyError::MissingKey(text.to_string()))?;
        Ok(Self { modifiers, key })
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.modifiers;
        for (on, name) in [(m.ctrl, "Ctrl"), (m.alt, "Alt"), (m.shift, "Shift"), (m.win, "Win")] {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}
