//! CW output encoder.
//!
//! Drains the character queue, expands each byte into Morse symbols on the
//! symbol queue, then keys every queued symbol (typed or paddled) for its
//! full duration. Called once per `CwAdvance` scheduler slot; one call is one
//! unit of time at the normal rate.
//!
//! | State      | Duration | Next                 |
//! |------------|----------|----------------------|
//! | `SendBit`  | 1 unit   | `BitSp`, `Dah`, `CharSp` or `Hyper` |
//! | `Dah`      | 1 unit   | `Dah2`               |
//! | `Dah2`     | 1 unit   | `BitSp`              |
//! | `BitSp`    | 1 unit   | `SendBit` (key up)   |
//! | `CharSp`   | 1 unit   | `Hyper`              |
//! | `WordSp*`  | 3 units  | `Hyper`              |
//! | `Hyper`    | 1 ms     | `Idle` at 1 ms polling |
//! | `Idle`     | 1 ms     | polls both queues    |
//!
//! Every symbol taken off the queue is also fed to the [`MorseDecoder`].

use core::fmt;

use crate::decoder::{ByteSink, MorseDecoder};
use crate::morse;
use crate::ring::SharedRing;
use crate::symbol::{Symbol, SymbolQueue};

/// Capacity of the outgoing character queue.
pub const CHAR_QUEUE_LEN: usize = 128;

/// Characters waiting to be played.
pub type CharQueue = SharedRing<u8, CHAR_QUEUE_LEN>;

/// Lowest accepted sidetone frequency.
pub const MIN_FREQUENCY: u16 = 80;
/// Highest accepted sidetone frequency.
pub const MAX_FREQUENCY: u16 = 8000;
/// Sidetone used when the requested one is out of range.
pub const DEFAULT_FREQUENCY: u16 = 220;

/// Map out-of-range frequencies to 220 Hz.
#[inline]
pub fn clamp_frequency(hz: u16) -> u16 {
    if (MIN_FREQUENCY..=MAX_FREQUENCY).contains(&hz) {
        hz
    } else {
        DEFAULT_FREQUENCY
    }
}

/// Key indicator and sidetone device.
pub trait KeyingOutput {
    /// Close the key: indicator on, tone on.
    fn key_down(&mut self);

    /// Open the key: indicator off, tone off.
    fn key_up(&mut self);

    /// Change the sidetone pitch. Already clamped.
    fn set_tone(&mut self, hz: u16);

    /// Every symbol taken off the queue, before it is keyed.
    fn on_symbol(&mut self, _symbol: Symbol) {}
}

/// Advance rate requested from the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickRate {
    /// One unit (dit length).
    Normal,
    /// 1 ms polling while idle.
    Hyper,
}

/// Encoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CwState {
    Hyper,
    #[default]
    Idle,
    SendBit,
    Dah,
    Dah2,
    BitSp,
    CharSp,
    WordSp,
    WordSp2,
    WordSp3,
}

impl CwState {
    pub fn name(self) -> &'static str {
        match self {
            CwState::Hyper => "hyper",
            CwState::Idle => "idle",
            CwState::SendBit => "send-bit",
            CwState::Dah => "dah",
            CwState::Dah2 => "dah2",
            CwState::BitSp => "bit-sp",
            CwState::CharSp => "char-sp",
            CwState::WordSp => "word-sp",
            CwState::WordSp2 => "word-sp2",
            CwState::WordSp3 => "word-sp3",
        }
    }
}

impl fmt::Display for CwState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output state machine plus the decoder it feeds.
#[derive(Clone, Debug, Default)]
pub struct CwSender {
    state: CwState,
    decoder: MorseDecoder,
}

impl CwSender {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> CwState {
        self.state
    }

    pub fn decoder(&self) -> &MorseDecoder {
        &self.decoder
    }

    /// Drop any partially decoded letter.
    pub fn reset_decoder(&mut self) {
        self.decoder.reset();
    }

    /// Run one step. Returns the rate the caller must reschedule at, if it
    /// changed.
    pub fn advance<K, S>(
        &mut self,
        chars: &CharQueue,
        symbols: &SymbolQueue,
        out: &mut K,
        sink: &mut S,
    ) -> Option<TickRate>
    where
        K: KeyingOutput + ?Sized,
        S: ByteSink + ?Sized,
    {
        let mut rate = None;

        loop {
            match self.state {
                CwState::Hyper => {
                    self.state = CwState::Idle;
                    return Some(TickRate::Hyper);
                }
                CwState::Idle => {
                    if !symbols.is_empty() {
                        rate = Some(TickRate::Normal);
                        self.state = CwState::SendBit;
                        continue;
                    }
                    let Some(byte) = chars.pop() else {
                        return rate;
                    };
                    if byte == b' ' {
                        symbols.push(Symbol::Space);
                        self.state = CwState::WordSp;
                        return Some(TickRate::Normal);
                    }
                    let Some(elements) = morse::symbols_for(byte) else {
                        // unmapped or > 127
                        return rate;
                    };
                    for symbol in elements {
                        symbols.push(symbol);
                    }
                    symbols.push(Symbol::Space);
                    rate = Some(TickRate::Normal);
                    self.state = CwState::SendBit;
                }
                CwState::SendBit => {
                    let Some(symbol) = symbols.pop() else {
                        self.state = CwState::Hyper;
                        continue;
                    };
                    out.on_symbol(symbol);
                    self.decoder.feed(symbol, sink);
                    self.state = match symbol {
                        Symbol::Dit => {
                            out.key_down();
                            CwState::BitSp
                        }
                        Symbol::Dah => {
                            out.key_down();
                            CwState::Dah
                        }
                        Symbol::Space => CwState::CharSp,
                    };
                    return rate;
                }
                CwState::Dah => {
                    self.state = CwState::Dah2;
                    return rate;
                }
                CwState::Dah2 => {
                    self.state = CwState::BitSp;
                    return rate;
                }
                CwState::BitSp => {
                    out.key_up();
                    self.state = CwState::SendBit;
                    return rate;
                }
                CwState::CharSp | CwState::WordSp3 => {
                    self.state = CwState::Hyper;
                    return rate;
                }
                CwState::WordSp => {
                    self.state = CwState::WordSp2;
                    return rate;
                }
                CwState::WordSp2 => {
                    self.state = CwState::WordSp3;
                    return rate;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        keyed: Vec<bool>,
        symbols: Vec<Symbol>,
    }

    impl KeyingOutput for Recorder {
        fn key_down(&mut self) {
            self.keyed.push(true);
        }
        fn key_up(&mut self) {
            self.keyed.push(false);
        }
        fn set_tone(&mut self, _hz: u16) {}
        fn on_symbol(&mut self, symbol: Symbol) {
            self.symbols.push(symbol);
        }
    }

    #[test]
    fn test_clamp_frequency() {
        assert_eq!(clamp_frequency(79), 220);
        assert_eq!(clamp_frequency(80), 80);
        assert_eq!(clamp_frequency(8000), 8000);
        assert_eq!(clamp_frequency(8001), 220);
    }

    #[test]
    fn test_letter_e_key_pattern() {
        let chars = CharQueue::new(0);
        let symbols = SymbolQueue::new(Symbol::Space);
        let mut sender = CwSender::new();
        let mut out = Recorder::default();
        let mut decoded: heapless::Vec<u8, 8> = heapless::Vec::new();

        chars.push(b'e');
        assert_eq!(
            sender.advance(&chars, &symbols, &mut out, &mut decoded),
            Some(TickRate::Normal)
        );
        assert_eq!(sender.state(), CwState::BitSp);
        assert_eq!(out.keyed, [true]);

        sender.advance(&chars, &symbols, &mut out, &mut decoded); // key up
        sender.advance(&chars, &symbols, &mut out, &mut decoded); // space
        assert_eq!(sender.state(), CwState::CharSp);
        assert_eq!(&decoded[..], b"e");

        sender.advance(&chars, &symbols, &mut out, &mut decoded);
        assert_eq!(sender.state(), CwState::Hyper);
        assert_eq!(
            sender.advance(&chars, &symbols, &mut out, &mut decoded),
            Some(TickRate::Hyper)
        );
        assert_eq!(sender.state(), CwState::Idle);
        assert_eq!(out.keyed, [true, false]);
        assert_eq!(out.symbols, [Symbol::Dit, Symbol::Space]);
    }

    #[test]
    fn test_dah_holds_three_units() {
        let chars = CharQueue::new(0);
        let symbols = SymbolQueue::new(Symbol::Space);
        let mut sender = CwSender::new();
        let mut out = Recorder::default();
        let mut decoded: heapless::Vec<u8, 8> = heapless::Vec::new();

        chars.push(b't');
        let mut states = Vec::new();
        for _ in 0..4 {
            sender.advance(&chars, &symbols, &mut out, &mut decoded);
            states.push(sender.state());
        }
        assert_eq!(
            states,
            [CwState::Dah, CwState::Dah2, CwState::BitSp, CwState::SendBit]
        );
        assert_eq!(out.keyed, [true, false]);
    }

    #[test]
    fn test_unmapped_and_high_bytes_dropped() {
        let chars = CharQueue::new(0);
        let symbols = SymbolQueue::new(Symbol::Space);
        let mut sender = CwSender::new();
        let mut out = Recorder::default();
        let mut decoded: heapless::Vec<u8, 8> = heapless::Vec::new();

        chars.push(b'#');
        chars.push(0xC8);
        assert_eq!(sender.advance(&chars, &symbols, &mut out, &mut decoded), None);
        assert_eq!(sender.advance(&chars, &symbols, &mut out, &mut decoded), None);
        assert!(symbols.is_empty());
        assert_eq!(sender.state(), CwState::Idle);
    }

    #[test]
    fn test_space_is_word_gap_at_normal_rate() {
        let chars = CharQueue::new(0);
        let symbols = SymbolQueue::new(Symbol::Space);
        let mut sender = CwSender::new();
        let mut out = Recorder::default();
        let mut decoded: heapless::Vec<u8, 8> = heapless::Vec::new();

        chars.push(b' ');
        assert_eq!(
            sender.advance(&chars, &symbols, &mut out, &mut decoded),
            Some(TickRate::Normal)
        );
        assert_eq!(sender.state(), CwState::WordSp);
        assert_eq!(symbols.len(), 1);
    }
}
