//! RT-safe logging.
//!
//! ```text
//! tick / edge ISR          LogStream             main loop
//! ───────────────          ─────────             ─────────
//!
//! rt_warn!() ──────────▶ [L0][L1][L2] ──────▶ log_drain → UART / stderr
//! formats on the stack    fixed slots           may block
//! ```
//!
//! Producers format into a [`Line`] on the stack and copy it into a slot; no
//! allocation and no locks. A full stream rejects the record and counts it as
//! lost. Each stream has exactly one producer context: interrupt code uses
//! [`crate::log_globals::ISR_LOG_STREAM`], the main loop
//! [`crate::log_globals::MAIN_LOG_STREAM`].

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// Longest message kept; the rest is cut off.
pub const MAX_MSG_LEN: usize = 120;

/// Slots per global stream.
pub const LOG_BUFFER_SIZE: usize = 64;

/// Severity, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
    const LABELS: [&'static str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

    pub fn as_str(self) -> &'static str {
        Self::LABELS[self as usize]
    }

    fn saturating_from(raw: u8) -> Self {
        Self::ALL[(raw as usize).min(Self::ALL.len() - 1)]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static CLOCK_MS: AtomicU16 = AtomicU16::new(0);

/// Most verbose level still recorded. Errors always pass.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::saturating_from(MAX_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level <= max_level()
}

/// Publish the scheduler clock for producers that have no timestamp at hand.
#[inline]
pub fn set_clock(ms: u16) {
    CLOCK_MS.store(ms, Ordering::Relaxed);
}

#[inline]
pub fn clock() -> u16 {
    CLOCK_MS.load(Ordering::Relaxed)
}

/// Stack buffer that accepts formatted text until full, then silently cuts
/// it off at a character boundary.
pub struct Line {
    bytes: [u8; MAX_MSG_LEN],
    used: usize,
}

impl Line {
    pub const fn new() -> Self {
        Self { bytes: [0; MAX_MSG_LEN], used: 0 }
    }

    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut line = Self::new();
        // Only overflow can fail and that is handled by truncation.
        let _ = fmt::write(&mut line, args);
        line
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.used]
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for Line {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = MAX_MSG_LEN - self.used;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.bytes[self.used..self.used + take].copy_from_slice(&s.as_bytes()[..take]);
        self.used += take;
        Ok(())
    }
}

/// One queued record.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Scheduler clock in ms; wraps every 65.5 s.
    pub timestamp_ms: u16,
    pub level: LogLevel,
    pub len: u8,
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    pub const EMPTY: Self = Self {
        timestamp_ms: 0,
        level: LogLevel::Trace,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    #[inline]
    pub fn message(&self) -> &[u8] {
        &self.msg[..self.len as usize]
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Single-producer single-consumer queue of [`LogEntry`] records.
///
/// `head` counts records ever pushed, `tail` records ever drained. Both run
/// freely and wrap; the slot for a count is `count % N`, so `N` need not be a
/// power of two.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [UnsafeCell<LogEntry>; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    lost: AtomicU32,
}

// SAFETY: the producer only writes the slot at `head`, and only while it is
// outside `tail..head`; the consumer only reads slots inside it. `head` is
// published with Release after the write and `tail` after the read.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "log stream needs at least one slot");
        Self {
            slots: [const { UnsafeCell::new(LogEntry::EMPTY) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            lost: AtomicU32::new(0),
        }
    }

    /// Queue a record without blocking. Returns `false` if the level is
    /// filtered out or the stream is full; only the latter counts as lost.
    pub fn push(&self, timestamp_ms: u16, level: LogLevel, msg: &[u8]) -> bool {
        if !enabled(level) {
            return false;
        }

        let head = self.head.load(Ordering::Relaxed);
        if head.wrapping_sub(self.tail.load(Ordering::Acquire)) >= N {
            self.lost.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let len = msg.len().min(MAX_MSG_LEN);
        // SAFETY: slot `head % N` is free, see the Sync impl.
        let slot = unsafe { &mut *self.slots[head % N].get() };
        slot.timestamp_ms = timestamp_ms;
        slot.level = level;
        slot.len = len as u8;
        slot.msg[..len].copy_from_slice(&msg[..len]);

        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Oldest queued record, if any.
    pub fn drain(&self) -> Option<LogEntry> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: slot `tail % N` was published by the producer.
        let entry = unsafe { *self.slots[tail % N].get() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Records rejected because the stream was full.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.lost.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset_dropped(&self) {
        self.lost.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn has_entries(&self) -> bool {
        self.pending() > 0
    }

    pub fn pending(&self) -> u32 {
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(self.tail.load(Ordering::Relaxed)) as u32
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format `args` and queue the result. Used by the `rt_*!` macros after the
/// level check so disabled levels cost no formatting.
pub fn record<const N: usize>(
    stream: &LogStream<N>,
    timestamp_ms: u16,
    level: LogLevel,
    args: fmt::Arguments<'_>,
) -> bool {
    stream.push(timestamp_ms, level, Line::format(args).as_bytes())
}

/// Log at an explicit level: `rt_log!(Warn, STREAM, now, "fmt", args..)`.
#[macro_export]
macro_rules! rt_log {
    ($level:ident, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let level = $crate::logging::LogLevel::$level;
        if $crate::logging::enabled(level) {
            $crate::logging::record(&$stream, $timestamp, level, format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! rt_error {
    ($($arg:tt)*) => { $crate::rt_log!(Error, $($arg)*) };
}

#[macro_export]
macro_rules! rt_warn {
    ($($arg:tt)*) => { $crate::rt_log!(Warn, $($arg)*) };
}

#[macro_export]
macro_rules! rt_info {
    ($($arg:tt)*) => { $crate::rt_log!(Info, $($arg)*) };
}

#[macro_export]
macro_rules! rt_debug {
    ($($arg:tt)*) => { $crate::rt_log!(Debug, $($arg)*) };
}

/// Per-tick detail; off unless the filter is raised to `Trace`.
#[macro_export]
macro_rules! rt_trace {
    ($($arg:tt)*) => { $crate::rt_log!(Trace, $($arg)*) };
}
