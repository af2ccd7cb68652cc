//! Millisecond tick scheduler.
//!
//! A 1 kHz time base calls [`TickScheduler::tick`]. Each call advances the
//! 16-bit millisecond clock by one and reports every registered slot whose
//! `next_fire` equals the new clock value. Slots fire in [`TickSlot`] order.
//!
//! # Timing
//!
//! - Registration at time `t` with period `P` fires at `t+P`, `t+2P`, ...
//! - `next_fire` advances by the period, so lateness never accumulates drift.
//! - The clock wraps at 65536 ms; compare timestamps with [`delta_millis`].
//!
//! The time base runs exactly when at least one slot is registered.

use core::fmt;

use crate::error::KeyerError;

/// Task identities, in dispatch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TickSlot {
    /// Paddle input debounce.
    Debounce = 0,
    /// Keying input decoder tick.
    CwParse = 1,
    /// CW output encoder advance.
    CwAdvance = 2,
    /// Host transport polling.
    UsbWork = 3,
    /// Status LED blink.
    StatusLed = 4,
    /// Memory repeat countdown, once a minute.
    MemoryRepeat = 5,
    /// Software watchdog.
    Watchdog = 6,
}

/// Number of scheduler slots.
pub const SLOT_COUNT: usize = 7;

impl TickSlot {
    pub const ALL: [TickSlot; SLOT_COUNT] = [
        TickSlot::Debounce,
        TickSlot::CwParse,
        TickSlot::CwAdvance,
        TickSlot::UsbWork,
        TickSlot::StatusLed,
        TickSlot::MemoryRepeat,
        TickSlot::Watchdog,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TickSlot::Debounce => "debounce",
            TickSlot::CwParse => "cw_parse",
            TickSlot::CwAdvance => "cw_advance",
            TickSlot::UsbWork => "usb_work",
            TickSlot::StatusLed => "status_led",
            TickSlot::MemoryRepeat => "memory_repeat",
            TickSlot::Watchdog => "watchdog",
        }
    }
}

impl fmt::Display for TickSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hardware (or host) source of the 1 kHz tick.
pub trait TimeBase {
    /// Claim the underlying timer. Returns `false` if another user owns it.
    fn acquire(&mut self) -> bool {
        true
    }

    /// Start delivering ticks.
    fn start(&mut self);

    /// Stop delivering ticks.
    fn stop(&mut self);
}

/// Time base driven by software: the owner polls [`is_running`] and calls
/// `tick` itself. Used by the hosted binary and tests.
///
/// [`is_running`]: SoftTimeBase::is_running
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftTimeBase {
    running: bool,
    /// Set when the timer is already claimed elsewhere.
    busy: bool,
    starts: u32,
    stops: u32,
}

impl SoftTimeBase {
    pub const fn new() -> Self {
        Self {
            running: false,
            busy: false,
            starts: 0,
            stops: 0,
        }
    }

    /// A time base whose `acquire` always fails.
    pub const fn busy() -> Self {
        Self {
            running: false,
            busy: true,
            starts: 0,
            stops: 0,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of start calls so far.
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Number of stop calls so far.
    pub fn stops(&self) -> u32 {
        self.stops
    }
}

impl TimeBase for SoftTimeBase {
    fn acquire(&mut self) -> bool {
        !self.busy
    }

    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }
}

/// One periodic task registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickEvent {
    /// Period in milliseconds, at least 1.
    pub period: u16,
    /// Absolute clock value of the next firing.
    pub next_fire: u16,
}

/// Set of slots fired by one tick, iterated in dispatch order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FiredSlots(u8);

impl FiredSlots {
    pub const NONE: Self = Self(0);

    #[inline]
    pub fn contains(self, slot: TickSlot) -> bool {
        self.0 & (1 << slot.index()) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn insert(&mut self, slot: TickSlot) {
        self.0 |= 1 << slot.index();
    }

    #[inline]
    pub fn remove(&mut self, slot: TickSlot) {
        self.0 &= !(1 << slot.index());
    }
}

impl Iterator for FiredSlots {
    type Item = TickSlot;

    fn next(&mut self) -> Option<TickSlot> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        TickSlot::ALL.get(idx).copied()
    }
}

/// Signed difference `latter - former` across clock wraparound.
///
/// Valid while the true distance is under 2^15 ms (about 32 s).
#[inline]
pub fn delta_millis(latter: u16, former: u16) -> i16 {
    latter.wrapping_sub(former) as i16
}

/// Fixed-slot periodic scheduler.
pub struct TickScheduler<T: TimeBase> {
    time_base: T,
    millis: u16,
    slots: [Option<TickEvent>; SLOT_COUNT],
}

impl<T: TimeBase> TickScheduler<T> {
    /// Create a stopped scheduler with the clock at zero.
    pub fn new(time_base: T) -> Self {
        Self {
            time_base,
            millis: 0,
            slots: [None; SLOT_COUNT],
        }
    }

    /// Claim the time base.
    pub fn acquire(&mut self) -> Result<(), KeyerError> {
        if self.time_base.acquire() {
            Ok(())
        } else {
            Err(KeyerError::TimeBaseInUse)
        }
    }

    /// Current millisecond clock.
    #[inline]
    pub fn now(&self) -> u16 {
        self.millis
    }

    pub fn time_base(&self) -> &T {
        &self.time_base
    }

    pub fn time_base_mut(&mut self) -> &mut T {
        &mut self.time_base
    }

    #[inline]
    pub fn is_registered(&self, slot: TickSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// Registration of `slot`, if any.
    pub fn event(&self, slot: TickSlot) -> Option<TickEvent> {
        self.slots[slot.index()]
    }

    /// True while any slot is registered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Install or replace the periodic task in `slot`.
    ///
    /// A zero period is treated as 1 ms.
    pub fn register(&mut self, slot: TickSlot, period: u16) {
        let was_active = self.is_active();
        let period = period.max(1);

        self.slots[slot.index()] = Some(TickEvent {
            period,
            next_fire: self.millis.wrapping_add(period),
        });

        if !was_active {
            self.time_base.start();
        }
    }

    /// Remove the task in `slot`. Stops the time base when nothing is left.
    pub fn unregister(&mut self, slot: TickSlot) {
        if self.slots[slot.index()].take().is_none() {
            return;
        }
        if !self.is_active() {
            self.time_base.stop();
        }
    }

    /// Advance the clock one millisecond and collect due slots.
    pub fn tick(&mut self) -> FiredSlots {
        self.millis = self.millis.wrapping_add(1);

        let mut fired = FiredSlots::NONE;
        for slot in TickSlot::ALL {
            if let Some(event) = &mut self.slots[slot.index()] {
                if event.next_fire == self.millis {
                    event.next_fire = event.next_fire.wrapping_add(event.period);
                    fired.insert(slot);
                }
            }
        }
        fired
    }

    /// Milliseconds until the earliest registered slot fires.
    pub fn until_next_fire(&self) -> Option<u16> {
        self.slots
            .iter()
            .flatten()
            .map(|event| event.next_fire.wrapping_sub(self.millis))
            .min()
    }
}
