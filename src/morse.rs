//! Morse code tables.
//!
//! Patterns are stored start-bit encoded: leading zeros, a single `1` start
//! bit, then one bit per element, MSB first (`0` = dit, `1` = dah). For
//! example `0x14` = `0b0001_0100` = start bit + `0100` = `.-..` = L.
//!
//! The same encoding is what [`crate::decoder::MorseDecoder`] accumulates, so
//! a character's pattern indexes straight into the decode table.

use crate::symbol::Symbol;

/// ASCII to Morse pattern. Leading zeros, then a start bit, then one bit
/// per element (0 = dit, 1 = dah), MSB first. Zero means no code.
const ENCODE: [u8; 128] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x00
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x08
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x10
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x18
    0x01, 0x6b, 0x52, 0x00, 0x89, 0x00, 0x00, 0x5e, // 0x20
    0x36, 0x6d, 0x00, 0x2a, 0x73, 0x61, 0x55, 0x32, // 0x28
    0x3f, 0x2f, 0x27, 0x23, 0x21, 0x20, 0x30, 0x38, // 0x30
    0x3c, 0x3e, 0x78, 0x6a, 0x00, 0x31, 0x00, 0x4c, // 0x38
    0x00, 0x05, 0x18, 0x1a, 0x0c, 0x02, 0x12, 0x0e, // 0x40
    0x10, 0x04, 0x17, 0x0d, 0x14, 0x07, 0x06, 0x0f, // 0x48
    0x16, 0x1d, 0x0a, 0x08, 0x03, 0x09, 0x11, 0x0b, // 0x50
    0x19, 0x1b, 0x1c, 0x00, 0x00, 0x00, 0x00, 0x4d, // 0x58
    0x5e, 0x05, 0x18, 0x1a, 0x0c, 0x02, 0x12, 0x0e, // 0x60
    0x10, 0x04, 0x17, 0x0d, 0x14, 0x07, 0x06, 0x0f, // 0x68
    0x16, 0x1d, 0x0a, 0x08, 0x03, 0x09, 0x11, 0x0b, // 0x70
    0x19, 0x1b, 0x1c, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x78
];

/// Morse pattern (start bit included) to ASCII. Zero means unassigned.
const DECODE: [u8; 128] = [
    b' ', 0, b'e', b't', b'i', b'a', b'n', b'm', // 0x00
    b's', b'u', b'r', b'w', b'd', b'k', b'g', b'o', // 0x08
    b'h', b'v', b'f', 0, b'l', 0, b'p', b'j', // 0x10
    b'b', b'x', b'c', b'y', b'z', b'q', 0, 0, // 0x18
    b'5', b'4', 0, b'3', 0, 0, 0, b'2', // 0x20
    0, 0, b'+', 0, 0, 0, 0, b'1', // 0x28
    b'6', b'=', b'/', 0, 0, 0, b'(', 0, // 0x30
    b'7', 0, 0, 0, b'8', 0, b'9', b'0', // 0x38
    0, 0, 0, 0, 0, 0, 0, 0, // 0x40
    0, 0, 0, 0, b'?', b'_', 0, 0, // 0x48
    0, 0, b'"', 0, 0, b'.', 0, 0, // 0x50
    0, 0, 0, 0, 0, 0, b'\'', 0, // 0x58
    0, b'-', 0, 0, 0, 0, 0, 0, // 0x60
    0, 0, b';', b'!', 0, b')', 0, 0, // 0x68
    0, 0, 0, b',', 0, 0, 0, 0, // 0x70
    b':', 0, 0, 0, 0, 0, 0, 0, // 0x78
];

/// Highest pattern value resolved through the direct table.
pub const DIRECT_MAX: u16 = 0x7E;

/// Width in bits (start bit included) of the longest prosign.
pub const MAX_PATTERN_BITS: u32 = 10;

/// A procedural signal sent as one unbroken run of elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prosign {
    /// Start-bit encoded pattern.
    pub bits: u16,
    /// Text emitted on a match, 1 to 4 characters.
    pub text: &'static str,
}

impl Prosign {
    /// Backspace prosigns are emitted without the `/` marker.
    #[inline]
    pub fn is_backspace(&self) -> bool {
        self.text.as_bytes().first() == Some(&BACKSPACE)
    }
}

/// ASCII backspace.
pub const BACKSPACE: u8 = 0x08;

/// Prosign table, searched in order after the direct table misses.
pub const PROSIGNS: &[Prosign] = &[
    Prosign { bits: 0b0001_0101, text: "AA" },  // end of line
    Prosign { bits: 0b0010_1000, text: "AS" },  // stand by
    Prosign { bits: 0b0010_1010, text: "AR" },  // end of message
    Prosign { bits: 0b0011_0001, text: "BT" },  // break
    Prosign { bits: 0b0011_0010, text: "NR" },  // number
    Prosign { bits: 0b0100_0101, text: "SK" },  // end of contact
    Prosign { bits: 0b0101_1010, text: "AC" },  // @
    Prosign { bits: 0b1000_0000, text: "\x08" }, // 7 dits, short error
    Prosign { bits: 0b1000_1001, text: "$" },
    Prosign { bits: 0b1_0000_0000, text: "\x08" }, // 8 dits, error
    Prosign { bits: 0b10_0011_1000, text: "SOS" },
];

/// Pattern for an ASCII byte, or `None` when the byte has no code.
///
/// Space maps to the bare start bit (`0x01`); callers treat it as a word gap.
#[inline]
pub fn pattern_for(byte: u8) -> Option<u8> {
    match ENCODE.get(byte as usize) {
        Some(&0) | None => None,
        Some(&pattern) => Some(pattern),
    }
}

/// Element sequence for an ASCII byte, without the trailing letter space.
pub fn symbols_for(byte: u8) -> Option<Symbols> {
    pattern_for(byte).map(Symbols::new)
}

/// Direct-table lookup for an accumulated pattern in `0x02..=0x7E`.
#[inline]
pub fn lookup(bits: u16) -> Option<u8> {
    if !(0x02..=DIRECT_MAX).contains(&bits) {
        return None;
    }
    match DECODE[bits as usize] {
        0 => None,
        c => Some(c),
    }
}

/// Exact prosign match, first entry wins.
pub fn prosign(bits: u16) -> Option<&'static Prosign> {
    PROSIGNS.iter().find(|p| p.bits == bits)
}

/// Iterator over the elements of a start-bit encoded pattern.
#[derive(Clone, Copy, Debug)]
pub struct Symbols {
    pattern: u8,
    /// Elements left to yield; the next one is bit `remaining - 1`.
    remaining: u8,
}

impl Symbols {
    /// Strip leading zeros and the start bit.
    pub fn new(pattern: u8) -> Self {
        let remaining = if pattern == 0 {
            0
        } else {
            7 - pattern.leading_zeros() as u8
        };
        Self { pattern, remaining }
    }
}

impl Iterator for Symbols {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.pattern & (1 << self.remaining) != 0 {
            Some(Symbol::Dah)
        } else {
            Some(Symbol::Dit)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Symbols {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_l_expansion() {
        let symbols: Vec<Symbol> = symbols_for(b'L').unwrap().collect();
        assert_eq!(symbols, [Symbol::Dit, Symbol::Dah, Symbol::Dit, Symbol::Dit]);
    }

    #[test]
    fn test_dollar_uses_full_byte() {
        // 0x89: start bit in bit 7, seven elements
        let symbols: Vec<Symbol> = symbols_for(b'$').unwrap().collect();
        assert_eq!(symbols.len(), 7);
        assert_eq!(symbols[3], Symbol::Dah);
        assert_eq!(symbols[6], Symbol::Dah);
    }

    #[test]
    fn test_space_has_no_elements() {
        assert_eq!(pattern_for(b' '), Some(0x01));
        assert_eq!(symbols_for(b' ').unwrap().count(), 0);
    }

    #[test]
    fn test_unmapped_bytes() {
        assert_eq!(pattern_for(b'#'), None);
        assert_eq!(pattern_for(b'@'), None);
        assert_eq!(pattern_for(0x80), None);
        assert_eq!(pattern_for(0xFF), None);
    }

    #[test]
    fn test_lookup_range() {
        assert_eq!(lookup(0x01), None);
        assert_eq!(lookup(0x02), Some(b'e'));
        assert_eq!(lookup(0x7F), None);
        assert_eq!(lookup(0x89), None);
    }

    #[test]
    fn test_prosign_widths_fit() {
        for p in PROSIGNS {
            assert!(16 - p.bits.leading_zeros() <= MAX_PATTERN_BITS);
            assert!((1..=4).contains(&p.text.len()));
        }
    }
}
