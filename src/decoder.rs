//! Morse symbol decoder.
//!
//! Accumulates dits and dahs into a start-bit encoded pattern and resolves it
//! to ASCII when a letter space arrives. Resolution order:
//!
//! 1. Bare seed (two spaces in a row) → `' '`
//! 2. Direct table, patterns `0x02..=0x7E`
//! 3. Prosign table, exact match, emitted with a leading `/` unless the
//!    prosign is a backspace
//!
//! Anything else decodes to nothing.

use crate::morse::{self, MAX_PATTERN_BITS};
use crate::ring::SharedRing;
use crate::symbol::Symbol;

/// Receiver of decoded ASCII, one call per byte.
pub trait ByteSink {
    fn consume(&mut self, byte: u8);
}

impl<const N: usize> ByteSink for &SharedRing<u8, N> {
    #[inline]
    fn consume(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    /// Bytes past capacity are dropped.
    #[inline]
    fn consume(&mut self, byte: u8) {
        let _ = self.push(byte);
    }
}

/// Seed value of the accumulator: start bit only.
const SEED: u16 = 0x0001;

/// Highest seed position before the accumulator overflows.
const LIMIT: u16 = 1 << (MAX_PATTERN_BITS - 1);

/// Didah bit accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MorseDecoder {
    bits: u16,
    /// Set once the run is longer than any known pattern.
    overflow: bool,
}

impl Default for MorseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MorseDecoder {
    pub const fn new() -> Self {
        Self {
            bits: SEED,
            overflow: false,
        }
    }

    /// Current accumulated pattern.
    #[inline]
    pub fn bits(&self) -> u16 {
        self.bits
    }

    /// True if nothing has been accumulated since the last space.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.bits == SEED && !self.overflow
    }

    /// Drop any partial letter.
    #[inline]
    pub fn reset(&mut self) {
        self.bits = SEED;
        self.overflow = false;
    }

    /// Feed one dequeued symbol, emitting decoded bytes into `sink`.
    pub fn feed<S: ByteSink + ?Sized>(&mut self, symbol: Symbol, sink: &mut S) {
        match symbol {
            Symbol::Dit | Symbol::Dah => self.push_element(symbol),
            Symbol::Space => {
                if !self.overflow {
                    Self::resolve(self.bits, sink);
                }
                self.reset();
            }
        }
    }

    fn push_element(&mut self, symbol: Symbol) {
        if self.overflow {
            return;
        }
        if self.bits >= LIMIT {
            self.overflow = true;
            return;
        }
        self.bits <<= 1;
        if symbol == Symbol::Dah {
            self.bits |= 1;
        }
    }

    fn resolve<S: ByteSink + ?Sized>(bits: u16, sink: &mut S) {
        if bits == SEED {
            sink.consume(b' ');
            return;
        }

        if let Some(c) = morse::lookup(bits) {
            sink.consume(c);
            return;
        }

        if let Some(prosign) = morse::prosign(bits) {
            if !prosign.is_backspace() {
                sink.consume(b'/');
            }
            for &c in prosign.text.as_bytes() {
                sink.consume(c);
            }
        }
    }
}
