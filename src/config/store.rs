//! RAM settings store.

use heapless::String;

use super::{
    truncate_into, KeyerSettings, Settings, CALLSIGN_LEN, MEMORY_LEN, MEMORY_SLOTS, PRESET_COUNT,
};
use crate::keyer::{clamp_wpm, KeyingMode};
use crate::log_globals::MAIN_LOG_STREAM;
use crate::logging;
use crate::rt_warn;
use crate::sender::clamp_frequency;
use crate::symbol::Symbol;

/// Settings held in memory. Starts from factory defaults.
#[derive(Clone, Debug)]
pub struct MemorySettings {
    keyer: KeyerSettings,
    callsign: String<CALLSIGN_LEN>,
    memories: [String<MEMORY_LEN>; MEMORY_SLOTS],
    repeat: [u8; MEMORY_SLOTS],
    presets: [KeyerSettings; PRESET_COUNT],
    active_preset: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettings {
    pub fn new() -> Self {
        Self {
            keyer: KeyerSettings::default(),
            callsign: String::new(),
            memories: core::array::from_fn(|_| String::new()),
            repeat: [0; MEMORY_SLOTS],
            presets: [KeyerSettings::default(); PRESET_COUNT],
            active_preset: 0,
        }
    }

    /// Index of the preset last loaded or saved.
    pub fn active_preset(&self) -> usize {
        self.active_preset
    }

    /// Preset contents, `None` if out of range.
    pub fn preset(&self, index: usize) -> Option<&KeyerSettings> {
        self.presets.get(index)
    }

    /// Overwrite preset `index` without touching the current parameters.
    pub fn set_preset(&mut self, index: usize, settings: KeyerSettings) {
        match self.presets.get_mut(index) {
            Some(p) => *p = settings.sanitized(),
            None => warn_index("preset", index),
        }
    }

    /// Replace the current parameters wholesale.
    pub fn set_keyer(&mut self, settings: KeyerSettings) {
        self.keyer = settings.sanitized();
    }

    pub(crate) fn set_active_preset(&mut self, index: usize) {
        if index < PRESET_COUNT {
            self.active_preset = index;
        }
    }
}

fn warn_index(what: &str, index: usize) {
    rt_warn!(MAIN_LOG_STREAM, logging::clock(), "settings: {} {} out of range", what, index);
}

impl Settings for MemorySettings {
    fn keyer(&self) -> KeyerSettings {
        self.keyer
    }

    fn set_wpm(&mut self, wpm: u8) {
        self.keyer.wpm = clamp_wpm(wpm);
    }

    fn set_frequency(&mut self, hz: u16) {
        self.keyer.frequency = clamp_frequency(hz);
    }

    fn set_keying_mode(&mut self, mode: KeyingMode) {
        self.keyer.keying_mode = mode;
    }

    fn set_left_paddle(&mut self, symbol: Symbol) {
        if symbol.is_element() {
            self.keyer.left_paddle = symbol;
        }
    }

    fn callsign(&self) -> &str {
        &self.callsign
    }

    fn set_callsign(&mut self, call: &str) {
        truncate_into(&mut self.callsign, call);
    }

    fn memory(&self, slot: usize) -> &str {
        self.memories.get(slot).map(|m| m.as_str()).unwrap_or("")
    }

    fn set_memory(&mut self, slot: usize, text: &str) {
        match self.memories.get_mut(slot) {
            Some(m) => truncate_into(m, text),
            None => warn_index("memory slot", slot),
        }
    }

    fn memory_repeat(&self, slot: usize) -> u8 {
        self.repeat.get(slot).copied().unwrap_or(0)
    }

    fn set_memory_repeat(&mut self, slot: usize, minutes: u8) {
        match self.repeat.get_mut(slot) {
            Some(r) => *r = minutes,
            None => warn_index("memory slot", slot),
        }
    }

    fn load_preset(&mut self, index: usize) {
        match self.presets.get(index) {
            Some(p) => {
                self.keyer = *p;
                self.active_preset = index;
            }
            None => warn_index("preset", index),
        }
    }

    fn save_preset(&mut self, index: usize) {
        match self.presets.get_mut(index) {
            Some(p) => {
                *p = self.keyer;
                self.active_preset = index;
            }
            None => warn_index("preset", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_truncated_to_slot_size() {
        let mut s = MemorySettings::new();
        let long = "x".repeat(MEMORY_LEN + 10);
        s.set_memory(3, &long);
        assert_eq!(s.memory(3).len(), MEMORY_LEN);
    }

    #[test]
    fn test_out_of_range_slot_ignored() {
        let mut s = MemorySettings::new();
        s.set_memory(MEMORY_SLOTS, "cq");
        s.set_memory_repeat(MEMORY_SLOTS, 5);
        assert_eq!(s.memory(MEMORY_SLOTS), "");
        assert_eq!(s.memory_repeat(MEMORY_SLOTS), 0);
    }

    #[test]
    fn test_setters_clamp() {
        let mut s = MemorySettings::new();
        s.set_wpm(120);
        s.set_frequency(10);
        assert_eq!(s.wpm(), 13);
        assert_eq!(s.frequency(), 220);
    }
}
