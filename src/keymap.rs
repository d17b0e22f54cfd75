//! Key event normalization.
//!
//! Input sources name keys differently. Sound packs are authored against a
//! scan-code style numbering (`16` is Q, `57` is Space), so every raw code is
//! mapped into that space before lookup. Codes with no table entry are kept
//! as-is, which lets sources that already emit scan codes pass straight through.

use std::fmt;

/// Suffix that marks the release variant of a key in sprite maps.
pub const RELEASE_SUFFIX: &str = "-up";

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPhase {
    Press,
    Release,
}

/// Platform-independent, phase-qualified key identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKeyCode {
    base: String,
    phase: KeyPhase,
}

impl CanonicalKeyCode {
    pub fn new(base: impl Into<String>, phase: KeyPhase) -> Self {
        Self {
            base: base.into(),
            phase,
        }
    }

    /// Parses the textual form used in sound pack descriptors (`"16"`, `"16-up"`).
    pub fn parse(text: &str) -> Self {
        match text.strip_suffix(RELEASE_SUFFIX) {
            Some(base) => Self::new(base, KeyPhase::Release),
            None => Self::new(text, KeyPhase::Press),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn phase(&self) -> KeyPhase {
        self.phase
    }
}

impl fmt::Display for CanonicalKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            KeyPhase::Press => f.write_str(&self.base),
            KeyPhase::Release => write!(f, "{}{}", self.base, RELEASE_SUFFIX),
        }
    }
}

/// Maps a raw key code and phase to its canonical identifier.
pub fn normalize(raw_code: &str, phase: KeyPhase) -> CanonicalKeyCode {
    let base = canonical_base(raw_code).unwrap_or(raw_code);
    CanonicalKeyCode::new(base, phase)
}

/// Scan code for a `KeyboardEvent.code` style name.
pub fn canonical_base(raw_code: &str) -> Option<&'static str> {
    let code = match raw_code {
        "Escape" => "1",
        "F1" => "59",
        "F2" => "60",
        "F3" => "61",
        "F4" => "62",
        "F5" => "63",
        "F6" => "64",
        "F7" => "65",
        "F8" => "66",
        "F9" => "67",
        "F10" => "68",
        "F11" => "87",
        "F12" => "88",
        "Backquote" => "41",
        "Digit1" => "2",
        "Digit2" => "3",
        "Digit3" => "4",
        "Digit4" => "5",
        "Digit5" => "6",
        "Digit6" => "7",
        "Digit7" => "8",
        "Digit8" => "9",
        "Digit9" => "10",
        "Digit0" => "11",
        "Minus" => "12",
        "Equal" => "13",
        "Backspace" => "14",
        "Tab" => "15",
        "KeyQ" => "16",
        "KeyW" => "17",
        "KeyE" => "18",
        "KeyR" => "19",
        "KeyT" => "20",
        "KeyY" => "21",
        "KeyU" => "22",
        "KeyI" => "23",
        "KeyO" => "24",
        "KeyP" => "25",
        "BracketLeft" => "26",
        "BracketRight" => "27",
        "Enter" => "28",
        "ControlLeft" => "29",
        "KeyA" => "30",
        "KeyS" => "31",
        "KeyD" => "32",
        "KeyF" => "33",
        "KeyG" => "34",
        "KeyH" => "35",
        "KeyJ" => "36",
        "KeyK" => "37",
        "KeyL" => "38",
        "Semicolon" => "39",
        "Quote" => "40",
        "ShiftLeft" => "42",
        "Backslash" => "43",
        "KeyZ" => "44",
        "KeyX" => "45",
        "KeyC" => "46",
        "KeyV" => "47",
        "KeyB" => "48",
        "KeyN" => "49",
        "KeyM" => "50",
        "Comma" => "51",
        "Period" => "52",
        "Slash" => "53",
        "ShiftRight" => "54",
        "NumpadMultiply" => "55",
        "AltLeft" => "56",
        "Space" => "57",
        "CapsLock" => "58",
        "NumLock" => "69",
        "ScrollLock" => "70",
        "Numpad7" => "71",
        "Numpad8" => "72",
        "Numpad9" => "73",
        "NumpadSubtract" => "74",
        "Numpad4" => "75",
        "Numpad5" => "76",
        "Numpad6" => "77",
        "NumpadAdd" => "78",
        "Numpad1" => "79",
        "Numpad2" => "80",
        "Numpad3" => "81",
        "Numpad0" => "82",
        "NumpadDecimal" => "83",
        "NumpadEnter" => "3612",
        "ControlRight" => "3613",
        "NumpadDivide" => "3637",
        "PrintScreen" => "3639",
        "AltRight" => "3640",
        "Pause" => "3653",
        "Home" => "3655",
        "PageUp" => "3657",
        "End" => "3663",
        "PageDown" => "3665",
        "Insert" => "3666",
        "Delete" => "3667",
        "MetaLeft" => "3675",
        "MetaRight" => "3676",
        "ContextMenu" => "3677",
        "ArrowUp" => "57416",
        "ArrowLeft" => "57419",
        "ArrowRight" => "57421",
        "ArrowDown" => "57424",
        _ => return None,
    };
    Some(code)
}
