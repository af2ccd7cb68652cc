//! Morse symbols exchanged through the shared symbol queue.

use core::fmt;

use crate::ring::SharedRing;

/// Capacity of the symbol queue between the keyer/encoder and the player.
pub const SYMBOL_QUEUE_LEN: usize = 16;

/// Queue of symbols waiting to be keyed and decoded.
pub type SymbolQueue = SharedRing<Symbol, SYMBOL_QUEUE_LEN>;

/// One keyed element, or a letter boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Symbol {
    Dit = 0,
    Dah = 1,
    /// Letter boundary. Two in a row decode as a word space.
    #[default]
    Space = 2,
}

impl Symbol {
    /// Get the opposite element. `Space` has no opposite and maps to itself.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Symbol::Dit => Symbol::Dah,
            Symbol::Dah => Symbol::Dit,
            Symbol::Space => Symbol::Space,
        }
    }

    /// Index into per-symbol tables (`[T; 3]`).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// True for `Dit` and `Dah`.
    #[inline]
    pub fn is_element(self) -> bool {
        self != Symbol::Space
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Dit => "DIT",
            Symbol::Dah => "DAH",
            Symbol::Space => "SPACE",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(Symbol::Dit.opposite(), Symbol::Dah);
        assert_eq!(Symbol::Dah.opposite(), Symbol::Dit);
        assert_eq!(Symbol::Space.opposite(), Symbol::Space);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(format!("{}", Symbol::Dah), "DAH");
        assert_eq!(Symbol::Space.name(), "SPACE");
    }
}
