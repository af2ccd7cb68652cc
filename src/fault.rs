//! Timing faults.
//!
//! CW sent with broken timing is worse than CW not sent at all, so the core
//! records whenever the 1 kHz tick cannot be trusted. The main loop polls
//! [`FaultState::take_new`] and announces the fault over the air.
//!
//! The latest fault lives in one `AtomicU32` so that code and data are always
//! read as a pair:
//!
//! ```text
//!   31   30    24 23                0
//! ┌────┬────────┬───────────────────┐
//! │ on │  code  │  data (saturated) │
//! └────┴────────┴───────────────────┘
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

const CODE_SHIFT: u32 = 24;
const CODE_MASK: u32 = 0x7f;
const DATA_MAX: u32 = (1 << CODE_SHIFT) - 1;
const ACTIVE_BIT: u32 = 1 << 31;

/// Why CW timing is suspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FaultCode {
    #[default]
    None = 0,
    /// `init` found the tick time base already claimed; nothing is scheduled.
    TimeBaseInUse = 1,
    /// Several ticks were replayed at once. Data is how many were late.
    TickOverrun = 2,
}

impl FaultCode {
    /// Unknown values read back as `None`.
    pub fn from_u8(value: u8) -> Self {
        [Self::None, Self::TimeBaseInUse, Self::TickOverrun]
            .get(value as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::TimeBaseInUse => "TIME_BASE_IN_USE",
            Self::TickOverrun => "TICK_OVERRUN",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Latest fault plus counters, shareable between the tick driver and the
/// main loop.
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// keyboard.catch_up(pending);   // may raise TickOverrun
/// if FAULT.take_new() {
///     keyboard.send_str(OVERRUN_NOTICE);
/// }
/// ```
pub struct FaultState {
    latest: AtomicU32,
    raised: AtomicU32,
    acknowledged: AtomicU32,
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            latest: AtomicU32::new(0),
            raised: AtomicU32::new(0),
            acknowledged: AtomicU32::new(0),
        }
    }

    /// Record a fault. Replaces any earlier code and data; data saturates at
    /// 24 bits.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        let word = ACTIVE_BIT | (code as u32) << CODE_SHIFT | data.min(DATA_MAX);
        self.latest.store(word, Ordering::Release);
        self.raised.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.latest.load(Ordering::Acquire) & ACTIVE_BIT != 0
    }

    /// Code of the latest fault, kept after [`clear`](Self::clear).
    #[inline]
    pub fn code(&self) -> FaultCode {
        unpack_code(self.latest.load(Ordering::Acquire))
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.latest.load(Ordering::Acquire) & DATA_MAX
    }

    /// Faults raised since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.raised.load(Ordering::Acquire)
    }

    /// True once for every batch of faults raised since the previous call.
    pub fn take_new(&self) -> bool {
        let raised = self.count();
        self.acknowledged.swap(raised, Ordering::AcqRel) != raised
    }

    /// Drop the active flag. The count is kept.
    #[inline]
    pub fn clear(&self) {
        self.latest.fetch_and(!ACTIVE_BIT, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> FaultSnapshot {
        let word = self.latest.load(Ordering::Acquire);
        FaultSnapshot {
            active: word & ACTIVE_BIT != 0,
            code: unpack_code(word),
            data: word & DATA_MAX,
            count: self.count(),
        }
    }
}

fn unpack_code(word: u32) -> FaultCode {
    FaultCode::from_u8((word >> CODE_SHIFT & CODE_MASK) as u8)
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Consistent copy of a [`FaultState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_and_clear() {
        let fault = FaultState::new();
        assert_eq!(
            fault.snapshot(),
            FaultSnapshot { active: false, code: FaultCode::None, data: 0, count: 0 }
        );

        fault.set(FaultCode::TickOverrun, u32::MAX);
        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::TickOverrun);
        assert_eq!(fault.data(), DATA_MAX, "data saturates instead of spilling into the code");

        fault.clear();
        let snap = fault.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.code, FaultCode::TickOverrun);
        assert_eq!(snap.count, 1);
    }

    #[test]
    fn later_fault_replaces_earlier() {
        let fault = FaultState::new();
        fault.set(FaultCode::TimeBaseInUse, 0);
        fault.set(FaultCode::TickOverrun, 7);
        assert_eq!((fault.code(), fault.data(), fault.count()), (FaultCode::TickOverrun, 7, 2));
    }

    #[test]
    fn take_new_fires_once_per_batch() {
        let fault = FaultState::new();
        assert!(!fault.take_new());

        fault.set(FaultCode::TickOverrun, 2);
        fault.set(FaultCode::TickOverrun, 5);
        assert!(fault.take_new());
        assert!(!fault.take_new());

        fault.set(FaultCode::TimeBaseInUse, 0);
        assert!(fault.take_new());
    }

    #[test]
    fn unknown_codes_read_as_none() {
        assert_eq!(FaultCode::from_u8(2), FaultCode::TickOverrun);
        assert_eq!(FaultCode::from_u8(200), FaultCode::None);
        assert_eq!(FaultCode::TimeBaseInUse.to_string(), "TIME_BASE_IN_USE");
    }
}
