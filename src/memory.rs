//! Memory message repeat timer.
//!
//! Driven by the once-a-minute `MemoryRepeat` scheduler slot. Each message
//! slot with a non-zero repeat interval counts down in whole minutes and is
//! reported due when its countdown reaches zero.

use heapless::Vec;

use crate::config::{Settings, MEMORY_SLOTS};

/// Period of the repeat slot.
pub const MINUTE_MS: u16 = 60_000;

/// Slots due for replay on one minute tick.
pub type DueSlots = Vec<usize, MEMORY_SLOTS>;

/// Per-slot minute countdown.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryRepeater {
    /// Minutes left; 0 = not armed.
    remaining: [u8; MEMORY_SLOTS],
}

impl MemoryRepeater {
    pub const fn new() -> Self {
        Self {
            remaining: [0; MEMORY_SLOTS],
        }
    }

    /// Restart the countdown of `slot` from its full interval on the next
    /// minute tick.
    pub fn rearm(&mut self, slot: usize) {
        if let Some(r) = self.remaining.get_mut(slot) {
            *r = 0;
        }
    }

    /// Minutes left before `slot` replays, 0 when it is not armed.
    pub fn remaining(&self, slot: usize) -> u8 {
        self.remaining.get(slot).copied().unwrap_or(0)
    }

    /// Count one minute down. Returns the slots whose interval elapsed and
    /// have a message to play.
    pub fn on_minute<S: Settings + ?Sized>(&mut self, settings: &S) -> DueSlots {
        let mut due = DueSlots::new();

        for (slot, remaining) in self.remaining.iter_mut().enumerate() {
            let every = settings.memory_repeat(slot);
            if every == 0 {
                *remaining = 0;
                continue;
            }
            if *remaining == 0 || *remaining > every {
                *remaining = every;
            }
            *remaining -= 1;
            if *remaining == 0 {
                *remaining = every;
                if !settings.memory(slot).is_empty() {
                    let _ = due.push(slot);
                }
            }
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;

    #[test]
    fn test_every_minute() {
        let mut settings = MemorySettings::new();
        settings.set_memory(0, "cq cq");
        settings.set_memory_repeat(0, 1);

        let mut rep = MemoryRepeater::new();
        assert_eq!(&rep.on_minute(&settings)[..], [0]);
        assert_eq!(&rep.on_minute(&settings)[..], [0]);
    }

    #[test]
    fn test_three_minute_interval() {
        let mut settings = MemorySettings::new();
        settings.set_memory(4, "qrl?");
        settings.set_memory_repeat(4, 3);

        let mut rep = MemoryRepeater::new();
        let fired: Vec<bool, 6> = (0..6).map(|_| !rep.on_minute(&settings).is_empty()).collect();
        assert_eq!(&fired[..], [false, false, true, false, false, true]);
    }

    #[test]
    fn test_empty_message_never_due() {
        let mut settings = MemorySettings::new();
        settings.set_memory_repeat(2, 1);

        let mut rep = MemoryRepeater::new();
        assert!(rep.on_minute(&settings).is_empty());
    }
}
