//! Global log stream instances.
//!
//! One producer context per stream, one consumer (the log drain).

use crate::logging::LogStream;

/// Log stream for the tick and paddle-edge interrupt context.
pub static ISR_LOG_STREAM: LogStream = LogStream::new();

/// Log stream for the main loop (settings, playback, reports).
pub static MAIN_LOG_STREAM: LogStream = LogStream::new();
