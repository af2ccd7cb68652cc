//! Module: config
//!
//! Purpose: keyer settings provider.
//!
//! Architecture:
//! - [`Settings`]: the interface the keyboard core reads and writes
//! - [`KeyerSettings`]: the keying parameters, also the unit stored in a preset
//! - [`store::MemorySettings`]: RAM implementation with message slots and presets
//! - `nvs::NvsSettings` (ESP-IDF only): write-through NVS persistence
//!
//! All setters are infallible. Out-of-range indices are logged and ignored.

use crate::keyer::{clamp_wpm, KeyingMode};
use crate::sender::clamp_frequency;
use crate::symbol::Symbol;

pub mod store;

#[cfg(target_os = "espidf")]
pub mod nvs;

pub use store::MemorySettings;

/// Number of stored messages.
pub const MEMORY_SLOTS: usize = 10;

/// Bytes per stored message.
pub const MEMORY_LEN: usize = 64;

/// Bytes in the stored callsign.
pub const CALLSIGN_LEN: usize = 16;

/// Number of keying presets.
pub const PRESET_COUNT: usize = 10;

/// Keying parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyerSettings {
    pub wpm: u8,
    pub keying_mode: KeyingMode,
    /// Symbol keyed by the left paddle.
    pub left_paddle: Symbol,
    /// Sidetone in Hz.
    pub frequency: u16,
}

impl Default for KeyerSettings {
    fn default() -> Self {
        Self {
            wpm: 20,
            keying_mode: KeyingMode::Bug,
            left_paddle: Symbol::Dit,
            frequency: 220,
        }
    }
}

impl KeyerSettings {
    /// Copy with speed and frequency pulled into range and a valid paddle.
    pub fn sanitized(self) -> Self {
        Self {
            wpm: clamp_wpm(self.wpm),
            keying_mode: self.keying_mode,
            left_paddle: if self.left_paddle.is_element() {
                self.left_paddle
            } else {
                Symbol::Dit
            },
            frequency: clamp_frequency(self.frequency),
        }
    }
}

/// Settings provider.
pub trait Settings {
    /// Current keying parameters.
    fn keyer(&self) -> KeyerSettings;

    fn set_wpm(&mut self, wpm: u8);
    fn set_frequency(&mut self, hz: u16);
    fn set_keying_mode(&mut self, mode: KeyingMode);
    fn set_left_paddle(&mut self, symbol: Symbol);

    fn callsign(&self) -> &str;
    /// Truncated to [`CALLSIGN_LEN`] bytes.
    fn set_callsign(&mut self, call: &str);

    /// Stored message, empty for an unused or invalid slot.
    fn memory(&self, slot: usize) -> &str;
    /// Truncated to [`MEMORY_LEN`] bytes.
    fn set_memory(&mut self, slot: usize, text: &str);

    /// Replay interval in minutes, 0 = never.
    fn memory_repeat(&self, slot: usize) -> u8;
    fn set_memory_repeat(&mut self, slot: usize, minutes: u8);

    /// Make preset `index` the current keying parameters.
    fn load_preset(&mut self, index: usize);
    /// Store the current keying parameters in preset `index`.
    fn save_preset(&mut self, index: usize);

    fn wpm(&self) -> u8 {
        self.keyer().wpm
    }

    fn frequency(&self) -> u16 {
        self.keyer().frequency
    }

    fn keying_mode(&self) -> KeyingMode {
        self.keyer().keying_mode
    }

    fn left_paddle(&self) -> Symbol {
        self.keyer().left_paddle
    }
}

/// Copy `text` into a bounded string, stopping at the first character that
/// does not fit.
pub(crate) fn truncate_into<const N: usize>(dst: &mut heapless::String<N>, text: &str) {
    dst.clear();
    for c in text.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = KeyerSettings::default();
        assert_eq!(s.wpm, 20);
        assert_eq!(s.keying_mode, KeyingMode::Bug);
        assert_eq!(s.left_paddle, Symbol::Dit);
        assert_eq!(s.frequency, 220);
    }

    #[test]
    fn test_sanitized() {
        let s = KeyerSettings {
            wpm: 0,
            keying_mode: KeyingMode::IambicA,
            left_paddle: Symbol::Space,
            frequency: 20_000,
        }
        .sanitized();
        assert_eq!(s.wpm, 13);
        assert_eq!(s.left_paddle, Symbol::Dit);
        assert_eq!(s.frequency, 220);
    }

    #[test]
    fn test_truncate_into() {
        let mut s: heapless::String<4> = heapless::String::new();
        truncate_into(&mut s, "n7ohxyz");
        assert_eq!(s.as_str(), "n7oh");
    }
}
