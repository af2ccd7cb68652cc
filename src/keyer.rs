//! Paddle keying input decoder.
//!
//! Turns paddle edges and 1 ms ticks into dit, dah and letter-space symbols
//! on the shared [`SymbolQueue`]. Pure logic, no hardware dependencies.
//!
//! # States
//!
//! ```text
//!            press L                 press R
//!   Idle ────────────▶ LeftHeld ────────────▶ BothHeld
//!    ▲                    │  ▲                  │
//!    └──── release L ─────┘  └──── release R ───┘
//! ```
//! (and the mirror image for the right paddle).
//!
//! # Modes
//!
//! - **Iambic A**: squeeze alternates; releasing stops after the current
//!   element.
//! - **Iambic B**: as A, plus one trailing alternate element if the squeeze
//!   was released with an element still due.
//! - **Ultimatic**, straight, bug and paddle: no squeeze alternation; the most
//!   recently pressed paddle repeats and release adds nothing.

use core::fmt;

use crate::log_globals::ISR_LOG_STREAM;
use crate::rt_warn;
use crate::symbol::{Symbol, SymbolQueue};

/// Lowest accepted speed.
pub const MIN_WPM: u8 = 3;
/// Highest accepted speed.
pub const MAX_WPM: u8 = 99;
/// Speed used when the requested one is out of range.
pub const FALLBACK_WPM: u8 = 13;

/// Keying mode. Discriminants are the persisted values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KeyingMode {
    Straight = 0x01,
    Ultimatic = 0x02,
    #[default]
    Bug = 0x05,
    Paddle = 0x06,
    IambicA = 0x11,
    IambicB = 0x12,
}

impl KeyingMode {
    pub const ALL: [KeyingMode; 6] = [
        KeyingMode::Straight,
        KeyingMode::Ultimatic,
        KeyingMode::Bug,
        KeyingMode::Paddle,
        KeyingMode::IambicA,
        KeyingMode::IambicB,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| *m as u8 == value)
    }

    #[inline]
    pub fn is_iambic(self) -> bool {
        matches!(self, KeyingMode::IambicA | KeyingMode::IambicB)
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyingMode::Straight => "straight",
            KeyingMode::Ultimatic => "ultimatic",
            KeyingMode::Bug => "bug",
            KeyingMode::Paddle => "paddle",
            KeyingMode::IambicA => "iambic-a",
            KeyingMode::IambicB => "iambic-b",
        }
    }
}

impl fmt::Display for KeyingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clamp a requested speed, mapping out-of-range values to 13 wpm.
#[inline]
pub fn clamp_wpm(wpm: u8) -> u8 {
    if (MIN_WPM..=MAX_WPM).contains(&wpm) {
        wpm
    } else {
        FALLBACK_WPM
    }
}

/// Element timing derived from a speed (PARIS: dit = 1200 / wpm ms).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    wpm: u8,
    dit_ms: u16,
}

impl Timing {
    /// Out-of-range speeds fall back to 13 wpm.
    pub fn from_wpm(wpm: u8) -> Self {
        let wpm = clamp_wpm(wpm);
        Self {
            wpm,
            dit_ms: 1200 / wpm as u16,
        }
    }

    #[inline]
    pub fn wpm(&self) -> u8 {
        self.wpm
    }

    /// One unit.
    #[inline]
    pub fn dit_ms(&self) -> u16 {
        self.dit_ms
    }

    /// Three units.
    #[inline]
    pub fn dah_ms(&self) -> u16 {
        self.dit_ms * 3
    }

    /// Element plus one unit of gap: 2 units for a dit, 4 for a dah.
    /// `Space` uses the dit period as its idle threshold.
    #[inline]
    pub fn period(&self, symbol: Symbol) -> u16 {
        match symbol {
            Symbol::Dah => self.dit_ms * 4,
            Symbol::Dit | Symbol::Space => self.dit_ms * 2,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_wpm(20)
    }
}

/// Physical paddle contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paddle {
    Left,
    Right,
}

impl Paddle {
    pub fn name(self) -> &'static str {
        match self {
            Paddle::Left => "left",
            Paddle::Right => "right",
        }
    }
}

/// Paddle edge, as delivered by the edge interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaddleEvent {
    Press(Paddle),
    Release(Paddle),
}

impl PaddleEvent {
    #[inline]
    pub fn paddle(self) -> Paddle {
        match self {
            PaddleEvent::Press(p) | PaddleEvent::Release(p) => p,
        }
    }
}

impl fmt::Display for PaddleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaddleEvent::Press(p) => write!(f, "{} press", p.name()),
            PaddleEvent::Release(p) => write!(f, "{} release", p.name()),
        }
    }
}

/// Keyer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeyerState {
    #[default]
    Idle,
    LeftHeld,
    RightHeld,
    BothHeld,
}

impl KeyerState {
    pub fn name(self) -> &'static str {
        match self {
            KeyerState::Idle => "idle",
            KeyerState::LeftHeld => "left-held",
            KeyerState::RightHeld => "right-held",
            KeyerState::BothHeld => "both-held",
        }
    }
}

impl fmt::Display for KeyerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keying input state machine.
///
/// # Example
///
/// ```
/// use rust_cw_keyboard::keyer::{Keyer, Paddle, PaddleEvent};
/// use rust_cw_keyboard::symbol::{Symbol, SymbolQueue};
///
/// let symbols = SymbolQueue::new(Symbol::Space);
/// let mut keyer = Keyer::new();
///
/// keyer.paddle(PaddleEvent::Press(Paddle::Left), 0, &symbols);
/// keyer.tick(&symbols);
/// assert_eq!(symbols.pop(), Some(Symbol::Dit));
/// ```
#[derive(Clone, Debug)]
pub struct Keyer {
    state: KeyerState,
    mode: KeyingMode,
    timing: Timing,
    /// Symbol keyed by the left paddle; the right paddle keys the other one.
    left: Symbol,
    /// Ticks since the last emission, per symbol.
    elapsed: [u16; 3],
    /// Next squeeze element not yet emitted.
    pending: Option<Symbol>,
    /// Letter space already queued for this idle period.
    space_queued: bool,
}

impl Default for Keyer {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyer {
    pub fn new() -> Self {
        Self {
            state: KeyerState::Idle,
            mode: KeyingMode::default(),
            timing: Timing::default(),
            left: Symbol::Dit,
            elapsed: [0; 3],
            pending: None,
            space_queued: true,
        }
    }

    #[inline]
    pub fn state(&self) -> KeyerState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> KeyingMode {
        self.mode
    }

    #[inline]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    #[inline]
    pub fn left(&self) -> Symbol {
        self.left
    }

    /// Takes effect on the next emitted element.
    pub fn set_mode(&mut self, mode: KeyingMode) {
        self.mode = mode;
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Assign the left paddle. `Space` is ignored.
    pub fn set_left(&mut self, symbol: Symbol) {
        if symbol.is_element() {
            self.left = symbol;
        }
    }

    /// Symbol keyed by `paddle`.
    #[inline]
    pub fn symbol_for(&self, paddle: Paddle) -> Symbol {
        match paddle {
            Paddle::Left => self.left,
            Paddle::Right => self.left.opposite(),
        }
    }

    /// Advance one millisecond.
    pub fn tick(&mut self, symbols: &SymbolQueue) {
        match self.state {
            KeyerState::Idle => self.tick_idle(symbols),
            KeyerState::LeftHeld => self.tick_held(self.left, symbols),
            KeyerState::RightHeld => self.tick_held(self.left.opposite(), symbols),
            KeyerState::BothHeld => self.tick_squeeze(symbols),
        }
    }

    /// Apply a paddle edge. Edges impossible in the current state are
    /// logged and ignored.
    pub fn paddle(&mut self, event: PaddleEvent, now: u16, symbols: &SymbolQueue) {
        use KeyerState::*;
        use Paddle::*;
        use PaddleEvent::*;

        match (self.state, event) {
            (Idle, Press(p)) => {
                self.state = if p == Left { LeftHeld } else { RightHeld };
                self.arm(self.symbol_for(p));
            }
            (LeftHeld, Press(Right)) | (RightHeld, Press(Left)) => {
                let p = event.paddle();
                let symbol = self.symbol_for(p);
                self.arm(symbol);
                self.pending = Some(symbol);
                self.state = BothHeld;
            }
            (LeftHeld, Release(Left)) | (RightHeld, Release(Right)) => {
                self.state = Idle;
                self.space_queued = false;
                self.elapsed[Symbol::Space.index()] = 0;
                if let Some(trailing) = self.pending.take() {
                    if self.mode == KeyingMode::IambicB {
                        symbols.push(trailing);
                    }
                }
            }
            (BothHeld, Release(p)) => {
                let (remaining, next) = match p {
                    Left => (Right, RightHeld),
                    Right => (Left, LeftHeld),
                };
                let symbol = self.symbol_for(remaining);
                self.elapsed[symbol.index()] = self
                    .timing
                    .period(symbol)
                    .saturating_sub(self.timing.period(Symbol::Dit));
                self.state = next;
            }
            _ => {
                rt_warn!(ISR_LOG_STREAM, now, "keyer: {} in {}", event, self.state);
            }
        }
    }

    /// Make `symbol` due on the next tick.
    fn arm(&mut self, symbol: Symbol) {
        self.elapsed[symbol.index()] = self.timing.period(symbol);
    }

    fn tick_idle(&mut self, symbols: &SymbolQueue) {
        if self.space_queued {
            return;
        }
        let space = Symbol::Space.index();
        if self.elapsed[space] >= self.timing.period(Symbol::Space) {
            symbols.push(Symbol::Space);
            self.space_queued = true;
            self.elapsed[space] = 0;
        } else {
            self.elapsed[space] += 1;
        }
    }

    fn tick_held(&mut self, symbol: Symbol, symbols: &SymbolQueue) {
        let i = symbol.index();
        if self.elapsed[i] >= self.timing.period(symbol) {
            symbols.push(symbol);
            self.elapsed[i] = 0;
            self.pending = None;
        }
        self.elapsed[i] = self.elapsed[i].saturating_add(1);
    }

    fn tick_squeeze(&mut self, symbols: &SymbolQueue) {
        let current = self.pending.unwrap_or(self.left);
        let mut next = current;

        if self.elapsed[current.index()] >= self.timing.period(current) {
            symbols.push(current);
            if self.mode.is_iambic() {
                next = current.opposite();
            }
            self.elapsed[next.index()] = 0;
        }

        self.pending = Some(next);
        let i = next.index();
        self.elapsed[i] = self.elapsed[i].saturating_add(1);
    }
}
