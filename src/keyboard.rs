//! CW keyboard core.
//!
//! Owns the scheduler and both state machines, and routes decoded text.
//!
//! ```text
//! paddle ISR ──▶ paddles ──┐
//!                          ▼
//!                        Keyer ──▶ symbols ◀── CwSender ◀── chars ◀── send_str / play_memory
//!                                     │           │
//!                                     └──────────▶│──▶ key / tone
//!                                                 ▼
//!                                           MorseDecoder ──▶ keystrokes | menu
//! ```
//!
//! The driver calls [`CwKeyboard::tick`] once per millisecond while the time
//! base runs. Slots the core does not handle are handed back to the caller.

use crate::config::{KeyerSettings, Settings, MEMORY_SLOTS, PRESET_COUNT};
use crate::error::KeyerError;
use crate::fault::{FaultCode, FaultState};
use crate::keyer::{Keyer, KeyingMode, Paddle, PaddleEvent, Timing};
use crate::keystroke::KeystrokeQueue;
use crate::log_globals::MAIN_LOG_STREAM;
use crate::logging;
use crate::memory::{MemoryRepeater, MINUTE_MS};
use crate::ring::SharedRing;
use crate::sender::{clamp_frequency, CharQueue, CwSender, CwState, KeyingOutput, TickRate};
use crate::symbol::{Symbol, SymbolQueue};
use crate::tick::{FiredSlots, TickScheduler, TickSlot, TimeBase};
use crate::{rt_error, rt_info, rt_warn};

/// Capacity of the paddle edge queue.
pub const PADDLE_QUEUE_LEN: usize = 16;

/// Capacity of the configuration menu queue.
pub const MENU_QUEUE_LEN: usize = 16;

/// Paddle edges from the edge interrupt.
pub type PaddleQueue = SharedRing<PaddleEvent, PADDLE_QUEUE_LEN>;

/// Decoded text while in configuration mode.
pub type MenuQueue = SharedRing<u8, MENU_QUEUE_LEN>;

/// Every queue shared between interrupt and main contexts.
pub struct Queues {
    pub paddles: PaddleQueue,
    pub symbols: SymbolQueue,
    pub chars: CharQueue,
    pub keystrokes: KeystrokeQueue,
    pub menu: MenuQueue,
}

impl Queues {
    pub const fn new() -> Self {
        Self {
            paddles: SharedRing::new(PaddleEvent::Release(Paddle::Left)),
            symbols: SharedRing::new(Symbol::Space),
            chars: SharedRing::new(0),
            keystrokes: SharedRing::new(0),
            menu: SharedRing::new(0),
        }
    }
}

impl Default for Queues {
    fn default() -> Self {
        Self::new()
    }
}

/// Where decoded ASCII goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DecodeTarget {
    /// Normal operation: typed to the host.
    #[default]
    Keystrokes,
    /// Configuration mode: fed to the on-device menu.
    Menu,
}

/// The keyboard core.
pub struct CwKeyboard<'q, S: Settings, K: KeyingOutput, T: TimeBase> {
    queues: &'q Queues,
    fault: &'q FaultState,
    settings: S,
    output: K,
    scheduler: TickScheduler<T>,
    keyer: Keyer,
    sender: CwSender,
    repeater: MemoryRepeater,
    target: DecodeTarget,
    /// Keying parameters as last read from `settings`.
    cached: KeyerSettings,
}

impl<'q, S: Settings, K: KeyingOutput, T: TimeBase> CwKeyboard<'q, S, K, T> {
    /// Build a stopped core. Call [`init`](Self::init) to start the scheduler.
    pub fn new(
        queues: &'q Queues,
        fault: &'q FaultState,
        settings: S,
        output: K,
        time_base: T,
    ) -> Self {
        let mut this = Self {
            queues,
            fault,
            settings,
            output,
            scheduler: TickScheduler::new(time_base),
            keyer: Keyer::new(),
            sender: CwSender::new(),
            repeater: MemoryRepeater::new(),
            target: DecodeTarget::Keystrokes,
            cached: KeyerSettings::default(),
        };
        this.refresh();
        this
    }

    /// Claim the time base and register the core's periodic tasks.
    ///
    /// Fails (and records a fault) if the time base is owned elsewhere.
    pub fn init(&mut self) -> Result<(), KeyerError> {
        if let Err(e) = self.scheduler.acquire() {
            self.fault.set(FaultCode::TimeBaseInUse, 0);
            rt_error!(MAIN_LOG_STREAM, logging::clock(), "keyboard: {}", e);
            return Err(e);
        }

        self.output.set_tone(self.cached.frequency);
        self.scheduler.register(TickSlot::CwParse, 1);
        self.scheduler.register(TickSlot::CwAdvance, self.timing().dit_ms());
        self.scheduler.register(TickSlot::MemoryRepeat, MINUTE_MS);

        rt_info!(
            MAIN_LOG_STREAM,
            logging::clock(),
            "keyboard: {} wpm, {}, {} Hz",
            self.cached.wpm,
            self.cached.keying_mode,
            self.cached.frequency
        );
        Ok(())
    }

    /// Re-read keying parameters from the settings provider.
    pub fn refresh(&mut self) {
        let k = self.settings.keyer().sanitized();
        self.cached = k;
        self.keyer.set_timing(Timing::from_wpm(k.wpm));
        self.keyer.set_mode(k.keying_mode);
        self.keyer.set_left(k.left_paddle);
        self.output.set_tone(k.frequency);
        if self.scheduler.is_registered(TickSlot::CwAdvance) {
            self.scheduler.register(TickSlot::CwAdvance, self.timing().dit_ms());
        }
    }

    /// Run one millisecond. Returns the fired slots the core did not handle.
    pub fn tick(&mut self) -> FiredSlots {
        let q = self.queues;

        let now = self.scheduler.now();
        while let Some(event) = q.paddles.pop() {
            self.keyer.paddle(event, now, &q.symbols);
        }

        let mut fired = self.scheduler.tick();
        logging::set_clock(self.scheduler.now());

        for slot in fired {
            match slot {
                TickSlot::CwParse => self.keyer.tick(&q.symbols),
                TickSlot::CwAdvance => self.advance_output(),
                TickSlot::MemoryRepeat => self.replay_due(),
                _ => continue,
            }
            fired.remove(slot);
        }

        fired
    }

    /// Run `ticks` elapsed milliseconds at once. More than one means the
    /// driver fell behind; that is recorded as a tick overrun.
    pub fn catch_up(&mut self, ticks: u32) -> FiredSlots {
        if ticks > 1 {
            self.fault.set(FaultCode::TickOverrun, ticks - 1);
            rt_warn!(MAIN_LOG_STREAM, logging::clock(), "tick: {} ticks behind", ticks - 1);
        }

        let mut fired = FiredSlots::NONE;
        for _ in 0..ticks {
            for slot in self.tick() {
                fired.insert(slot);
            }
        }
        fired
    }

    /// Play "eeek!" once for every batch of overruns since the last call.
    pub fn announce_faults(&mut self) {
        if self.fault.take_new() && self.fault.code() == FaultCode::TickOverrun {
            self.send_str(crate::OVERRUN_NOTICE);
        }
    }

    /// Apply a paddle edge immediately.
    pub fn paddle(&mut self, event: PaddleEvent) {
        let now = self.scheduler.now();
        self.keyer.paddle(event, now, &self.queues.symbols);
    }

    /// Queue one character for playback.
    pub fn send_char(&mut self, c: u8) {
        self.queues.chars.push(c);
    }

    /// Queue a string for playback.
    pub fn send_str(&mut self, s: &str) {
        for c in s.bytes() {
            self.queues.chars.push(c);
        }
    }

    /// Queue a stored message.
    pub fn play_memory(&mut self, slot: usize) -> Result<(), KeyerError> {
        if slot >= MEMORY_SLOTS {
            return Err(KeyerError::SlotOutOfRange);
        }
        for c in self.settings.memory(slot).bytes() {
            self.queues.chars.push(c);
        }
        Ok(())
    }

    /// Queue the stored callsign.
    pub fn send_callsign(&mut self) {
        for c in self.settings.callsign().bytes() {
            self.queues.chars.push(c);
        }
    }

    pub fn set_memory(&mut self, slot: usize, text: &str) -> Result<(), KeyerError> {
        if slot >= MEMORY_SLOTS {
            return Err(KeyerError::SlotOutOfRange);
        }
        self.settings.set_memory(slot, text);
        Ok(())
    }

    /// Replay `slot` every `minutes` minutes, 0 to stop. The countdown
    /// restarts on the next minute tick.
    pub fn set_memory_repeat(&mut self, slot: usize, minutes: u8) -> Result<(), KeyerError> {
        if slot >= MEMORY_SLOTS {
            return Err(KeyerError::SlotOutOfRange);
        }
        self.settings.set_memory_repeat(slot, minutes);
        self.repeater.rearm(slot);
        Ok(())
    }

    pub fn set_callsign(&mut self, call: &str) {
        self.settings.set_callsign(call);
    }

    /// Out-of-range speeds fall back to 13 wpm.
    pub fn set_speed(&mut self, wpm: u8) {
        self.settings.set_wpm(wpm);
        self.refresh();
    }

    /// Out-of-range frequencies fall back to 220 Hz.
    pub fn set_frequency(&mut self, hz: u16) {
        self.settings.set_frequency(clamp_frequency(hz));
        self.refresh();
    }

    pub fn set_keying_mode(&mut self, mode: KeyingMode) {
        self.settings.set_keying_mode(mode);
        self.refresh();
    }

    /// Assign the left paddle (`Dit` or `Dah`).
    pub fn set_left_paddle(&mut self, symbol: Symbol) {
        self.settings.set_left_paddle(symbol);
        self.refresh();
    }

    /// Exchange the dit and dah paddles.
    pub fn swap_paddles(&mut self) {
        let left = self.cached.left_paddle.opposite();
        self.set_left_paddle(left);
    }

    pub fn load_preset(&mut self, index: usize) -> Result<(), KeyerError> {
        if index >= PRESET_COUNT {
            return Err(KeyerError::PresetOutOfRange);
        }
        self.settings.load_preset(index);
        self.refresh();
        Ok(())
    }

    pub fn save_preset(&mut self, index: usize) -> Result<(), KeyerError> {
        if index >= PRESET_COUNT {
            return Err(KeyerError::PresetOutOfRange);
        }
        self.settings.save_preset(index);
        Ok(())
    }

    /// Enter or leave configuration mode.
    ///
    /// Pending symbols and characters are discarded, the partial letter is
    /// dropped and decoded text is rerouted.
    pub fn set_command_mode(&mut self, enabled: bool) {
        self.queues.symbols.clear();
        self.queues.chars.clear();
        self.sender.reset_decoder();
        self.target = if enabled {
            DecodeTarget::Menu
        } else {
            DecodeTarget::Keystrokes
        };
        rt_info!(MAIN_LOG_STREAM, logging::clock(), "keyboard: command mode {}", enabled);
    }

    #[inline]
    pub fn command_mode(&self) -> bool {
        self.target == DecodeTarget::Menu
    }

    #[inline]
    pub fn target(&self) -> DecodeTarget {
        self.target
    }

    /// Current element timing.
    #[inline]
    pub fn timing(&self) -> Timing {
        self.keyer.timing()
    }

    pub fn keyer(&self) -> &Keyer {
        &self.keyer
    }

    pub fn sender_state(&self) -> CwState {
        self.sender.state()
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Direct settings access. Call [`refresh`](Self::refresh) after
    /// changing keying parameters.
    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    pub fn output(&self) -> &K {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut K {
        &mut self.output
    }

    pub fn scheduler(&self) -> &TickScheduler<T> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TickScheduler<T> {
        &mut self.scheduler
    }

    pub fn queues(&self) -> &'q Queues {
        self.queues
    }

    fn advance_output(&mut self) {
        let q = self.queues;
        let rate = match self.target {
            DecodeTarget::Keystrokes => {
                let mut sink = &q.keystrokes;
                self.sender.advance(&q.chars, &q.symbols, &mut self.output, &mut sink)
            }
            DecodeTarget::Menu => {
                let mut sink = &q.menu;
                self.sender.advance(&q.chars, &q.symbols, &mut self.output, &mut sink)
            }
        };

        match rate {
            Some(TickRate::Normal) => {
                let dit = self.timing().dit_ms();
                self.scheduler.register(TickSlot::CwAdvance, dit);
            }
            Some(TickRate::Hyper) => self.scheduler.register(TickSlot::CwAdvance, 1),
            None => {}
        }
    }

    /// Beacon text must not reach the menu, so repeats falling due in
    /// command mode are skipped rather than deferred.
    fn replay_due(&mut self) {
        let due = self.repeater.on_minute(&self.settings);
        if self.command_mode() {
            if !due.is_empty() {
                let n = due.len();
                rt_info!(MAIN_LOG_STREAM, logging::clock(), "memory: {} repeat(s) skipped", n);
            }
            return;
        }
        for slot in due {
            rt_info!(MAIN_LOG_STREAM, logging::clock(), "memory: repeating slot {}", slot);
            if let Err(e) = self.play_memory(slot) {
                rt_warn!(MAIN_LOG_STREAM, logging::clock(), "memory: slot {}: {}", slot, e);
            }
        }
    }
}
