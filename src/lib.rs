//! # RustCwKeyboard
//!
//! Morse paddle to keyboard converter with CW memory playback.
//!
//! ## Architecture
//!
//! Everything runs off a 1 kHz [`tick::TickScheduler`]. Components talk only
//! through bounded queues ([`ring::SharedRing`]):
//! - Paddle edges go through [`keyer::Keyer`], which produces symbols
//! - [`sender::CwSender`] expands text into symbols and keys every symbol
//! - Every keyed symbol passes through [`decoder::MorseDecoder`], whose ASCII
//!   becomes HID keystrokes ([`keystroke`]) or menu input
//!
//! [`keyboard::CwKeyboard`] wires them together. Hardware sits behind the
//! [`tick::TimeBase`] and [`sender::KeyingOutput`] traits; settings behind
//! [`config::Settings`].

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod fault;
pub mod keyboard;
pub mod keyer;
pub mod keystroke;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod memory;
pub mod morse;
pub mod ring;
pub mod sender;
pub mod symbol;
pub mod tick;

pub use config::{KeyerSettings, MemorySettings, Settings};
pub use decoder::{ByteSink, MorseDecoder};
pub use error::KeyerError;
pub use fault::{FaultCode, FaultState};
pub use keyboard::{CwKeyboard, DecodeTarget, Queues};
pub use keyer::{Keyer, KeyingMode, Paddle, PaddleEvent, Timing};
pub use keystroke::{HidReporter, KeyboardReport};
pub use ring::{RingBuffer, SharedRing};
pub use sender::{CwSender, CwState, KeyingOutput};
pub use symbol::Symbol;
pub use tick::{TickScheduler, TickSlot, TimeBase};

/// Typed when the keyboard starts.
pub const GREETING: &str = "    hi.";

/// Played after the tick loop falls behind.
pub const OVERRUN_NOTICE: &str = "eeek!";
