//! Decoded text to USB keyboard reports.
//!
//! The host transport polls [`HidReporter::next_report`] once per report
//! interval. Each report carries at most one key. A key identical to the
//! previous one is preceded by an empty report so the host sees a release
//! between the two presses.

use crate::ring::SharedRing;

/// Capacity of the keystroke queue.
pub const KEYSTROKE_QUEUE_LEN: usize = 8;

/// Decoded characters waiting to be typed.
pub type KeystrokeQueue = SharedRing<u8, KEYSTROKE_QUEUE_LEN>;

/// Left shift modifier bit.
pub const MODIFIER_LEFT_SHIFT: u8 = 0x02;

/// Shift flag in [`ASCII_TO_HID`] entries.
const SHIFT: u8 = 0x80;

/// ASCII to HID usage ID, `0x80` set when shift is needed. Zero means no key.
const ASCII_TO_HID: [u8; 128] = {
    let mut t = [0u8; 128];
    t[0x08] = 0x2a; // backspace
    t[b'\n' as usize] = 0x28;
    t[b' ' as usize] = 0x2c;
    t[b'!' as usize] = 0x1e | SHIFT;
    t[b'"' as usize] = 0x34 | SHIFT;
    t[b'$' as usize] = 0x21 | SHIFT;
    t[b'\'' as usize] = 0x34;
    t[b'(' as usize] = 0x26 | SHIFT;
    t[b')' as usize] = 0x27 | SHIFT;
    t[b'+' as usize] = 0x2e | SHIFT;
    t[b',' as usize] = 0x36;
    t[b'-' as usize] = 0x2d;
    t[b'.' as usize] = 0x37;
    t[b'/' as usize] = 0x38;
    t[b'0' as usize] = 0x27;
    let mut d = 1;
    while d <= 9 {
        t[(b'0' + d) as usize] = 0x1e + d - 1;
        d += 1;
    }
    t[b':' as usize] = 0x33 | SHIFT;
    t[b';' as usize] = 0x33;
    t[b'=' as usize] = 0x2e;
    t[b'?' as usize] = 0x38 | SHIFT;
    t[b'@' as usize] = 0x1f | SHIFT;
    t[b'_' as usize] = 0x2d | SHIFT;
    t[b'`' as usize] = 0x35;
    let mut i = 0;
    while i < 26 {
        t[(b'a' + i) as usize] = 0x04 + i;
        t[(b'A' + i) as usize] = (0x04 + i) | SHIFT;
        i += 1;
    }
    t
};

/// HID usage and modifier for `byte`, or `None` if it has no key.
pub fn hid_usage(byte: u8) -> Option<(u8, u8)> {
    match ASCII_TO_HID.get(byte as usize) {
        None | Some(0) => None,
        Some(&v) if v & SHIFT != 0 => Some((MODIFIER_LEFT_SHIFT, v & !SHIFT)),
        Some(&v) => Some((0, v)),
    }
}

/// Boot-protocol keyboard report, one key slot used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keycode: u8,
}

impl KeyboardReport {
    /// All keys released.
    pub const EMPTY: Self = Self {
        modifier: 0,
        keycode: 0,
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keycode == 0
    }

    /// 8-byte boot keyboard report.
    pub fn to_bytes(&self) -> [u8; 8] {
        [self.modifier, 0, self.keycode, 0, 0, 0, 0, 0]
    }
}

/// Report generator with one key of history.
#[derive(Clone, Copy, Debug, Default)]
pub struct HidReporter {
    last: Option<u8>,
}

impl HidReporter {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Build the next report from the queue head.
    ///
    /// Characters without a key are consumed and produce an empty report.
    pub fn next_report<const N: usize>(&mut self, queue: &SharedRing<u8, N>) -> KeyboardReport {
        match queue.peek() {
            Some(c) if self.last != Some(c) => {
                let _ = queue.pop();
                self.last = Some(c);
                match hid_usage(c) {
                    Some((modifier, keycode)) => KeyboardReport { modifier, keycode },
                    None => KeyboardReport::EMPTY,
                }
            }
            _ => {
                self.last = None;
                KeyboardReport::EMPTY
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_shift() {
        assert_eq!(hid_usage(b'a'), Some((0, 0x04)));
        assert_eq!(hid_usage(b'z'), Some((0, 0x1d)));
        assert_eq!(hid_usage(b'S'), Some((MODIFIER_LEFT_SHIFT, 0x16)));
        assert_eq!(hid_usage(b'?'), Some((MODIFIER_LEFT_SHIFT, 0x38)));
        assert_eq!(hid_usage(b'1'), Some((0, 0x1e)));
        assert_eq!(hid_usage(b'9'), Some((0, 0x26)));
        assert_eq!(hid_usage(0x08), Some((0, 0x2a)));
        assert_eq!(hid_usage(b'#'), None);
        assert_eq!(hid_usage(0x90), None);
    }

    #[test]
    fn test_repeated_key_gets_release() {
        let queue: KeystrokeQueue = SharedRing::new(0);
        let mut reporter = HidReporter::new();

        for &c in b"oo" {
            queue.push(c);
        }

        let first = reporter.next_report(&queue);
        assert_eq!(first.keycode, 0x12);
        assert!(reporter.next_report(&queue).is_empty());
        assert_eq!(reporter.next_report(&queue).keycode, 0x12);
        assert!(reporter.next_report(&queue).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_report_bytes() {
        let r = KeyboardReport {
            modifier: MODIFIER_LEFT_SHIFT,
            keycode: 0x04,
        };
        assert_eq!(r.to_bytes(), [0x02, 0, 0x04, 0, 0, 0, 0, 0]);
    }
}
