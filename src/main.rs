//! RustCwKeyboard - Main entry point
//!
//! On ESP-IDF:
//! 1. Open NVS settings and the UART log sink
//! 2. Start a 1 ms task timer that wakes the main task
//! 3. Sample paddles, run the keyboard core, drain logs
//!
//! On a host the time base is paced by the wall clock. Lines read from stdin
//! are sent as CW; lines starting with `\` are commands (`\help`).

use rust_cw_keyboard::fault::FaultState;
use rust_cw_keyboard::keyboard::Queues;

static QUEUES: Queues = Queues::new();
static FAULT: FaultState = FaultState::new();

/// HID report poll interval.
const USB_POLL_MS: u16 = 10;

#[cfg(target_os = "espidf")]
fn main() {
    if let Err(e) = firmware::run() {
        panic!("keyboard failed to start: {}", e);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    host::run();
}

#[cfg(target_os = "espidf")]
mod firmware {
    use core::num::NonZeroU32;
    use core::sync::atomic::{AtomicU32, Ordering};
    use core::time::Duration;

    use esp_idf_svc::hal::delay::BLOCK;
    use esp_idf_svc::hal::gpio::{
        AnyIOPin, AnyOutputPin, IOPin, Input, Output, OutputPin, PinDriver, Pull,
    };
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::task::notification::Notification;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};

    use rust_cw_keyboard::config::nvs::NvsSettings;
    use rust_cw_keyboard::keyboard::{CwKeyboard, PaddleQueue};
    use rust_cw_keyboard::keyer::{Paddle, PaddleEvent};
    use rust_cw_keyboard::keystroke::HidReporter;
    use rust_cw_keyboard::log_drain::{drain_all, init_uart_logger, UartLoggerConfig, UartSink};
    use rust_cw_keyboard::log_globals::{ISR_LOG_STREAM, MAIN_LOG_STREAM};
    use rust_cw_keyboard::logging;
    use rust_cw_keyboard::sender::KeyingOutput;
    use rust_cw_keyboard::tick::{TickSlot, TimeBase};
    use rust_cw_keyboard::{rt_debug, rt_error, rt_info, GREETING};

    use super::{FAULT, QUEUES, USB_POLL_MS};

    /// Paddle sampling interval. Edges shorter than this are ignored.
    const DEBOUNCE_MS: u16 = 5;

    /// Milliseconds elapsed since the main task last ran the core.
    static PENDING: AtomicU32 = AtomicU32::new(0);

    /// 1 ms periodic task timer.
    struct TaskTimerBase {
        timer: EspTimer<'static>,
    }

    impl TimeBase for TaskTimerBase {
        fn start(&mut self) {
            if let Err(e) = self.timer.every(Duration::from_millis(1)) {
                rt_error!(MAIN_LOG_STREAM, logging::clock(), "timer: start failed: {}", e);
            }
        }

        fn stop(&mut self) {
            if let Err(e) = self.timer.cancel() {
                rt_error!(MAIN_LOG_STREAM, logging::clock(), "timer: stop failed: {}", e);
            }
        }
    }

    /// Key line driven high while the key is down.
    struct KeyLine<'d> {
        pin: PinDriver<'d, AnyOutputPin, Output>,
    }

    impl KeyingOutput for KeyLine<'_> {
        fn key_down(&mut self) {
            let _ = self.pin.set_high();
        }

        fn key_up(&mut self) {
            let _ = self.pin.set_low();
        }

        fn set_tone(&mut self, hz: u16) {
            rt_info!(MAIN_LOG_STREAM, logging::clock(), "sidetone: {} Hz", hz);
        }
    }

    /// Active-low paddle contacts.
    struct Paddles<'d> {
        left: PinDriver<'d, AnyIOPin, Input>,
        right: PinDriver<'d, AnyIOPin, Input>,
        held: [bool; 2],
    }

    impl Paddles<'_> {
        /// Queue an edge for every contact that changed since the last sample.
        fn poll(&mut self, queue: &PaddleQueue) {
            let now = [self.left.is_low(), self.right.is_low()];
            for (i, paddle) in [Paddle::Left, Paddle::Right].into_iter().enumerate() {
                if now[i] == self.held[i] {
                    continue;
                }
                self.held[i] = now[i];
                let event = if now[i] {
                    PaddleEvent::Press(paddle)
                } else {
                    PaddleEvent::Release(paddle)
                };
                rt_debug!(ISR_LOG_STREAM, logging::clock(), "paddle: {}", event);
                queue.push(event);
            }
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        esp_idf_svc::sys::link_patches();

        let p = Peripherals::take()?;
        let mut uart = init_uart_logger(p.uart1, p.pins.gpio43, &UartLoggerConfig::default())?;
        rt_info!(MAIN_LOG_STREAM, 0, "{}", env!("VERSION_STRING"));

        let (settings, _) = NvsSettings::open(EspDefaultNvsPartition::take()?)?;

        let key = KeyLine {
            pin: PinDriver::output(p.pins.gpio6.downgrade_output())?,
        };

        let mut left = PinDriver::input(p.pins.gpio4.downgrade())?;
        left.set_pull(Pull::Up)?;
        let mut right = PinDriver::input(p.pins.gpio5.downgrade())?;
        right.set_pull(Pull::Up)?;
        let mut paddles = Paddles {
            left,
            right,
            held: [false; 2],
        };

        let notification = Notification::new();
        let notifier = notification.notifier();
        let timer_service = EspTaskTimerService::new()?;
        let timer = timer_service.timer(move || {
            PENDING.fetch_add(1, Ordering::AcqRel);
            // SAFETY: called from the timer service task, not an ISR.
            unsafe {
                notifier.notify_and_yield(NonZeroU32::MIN);
            }
        })?;

        let mut keyboard = CwKeyboard::new(&QUEUES, &FAULT, settings, key, TaskTimerBase { timer });
        keyboard.init()?;
        keyboard.scheduler_mut().register(TickSlot::Debounce, DEBOUNCE_MS);
        keyboard.scheduler_mut().register(TickSlot::UsbWork, USB_POLL_MS);
        keyboard.send_str(GREETING);

        let mut reporter = HidReporter::new();

        loop {
            notification.wait(BLOCK);
            let pending = PENDING.swap(0, Ordering::AcqRel);
            if pending == 0 {
                continue;
            }

            let fired = keyboard.catch_up(pending);
            if fired.contains(TickSlot::Debounce) {
                paddles.poll(&QUEUES.paddles);
            }
            if fired.contains(TickSlot::UsbWork) {
                let report = reporter.next_report(&QUEUES.keystrokes);
                if !report.is_empty() {
                    rt_debug!(MAIN_LOG_STREAM, logging::clock(), "hid: {:02x?}", report.to_bytes());
                }
            }
            while let Some(b) = QUEUES.menu.pop() {
                rt_info!(MAIN_LOG_STREAM, logging::clock(), "menu: {:?}", b as char);
            }

            keyboard.announce_faults();
            drain_all(&mut UartSink(&mut uart));
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::io::{self, BufRead, Write};
    use std::sync::mpsc::{self, TryRecvError};
    use std::thread;
    use std::time::{Duration, Instant};

    use rust_cw_keyboard::config::{MemorySettings, Settings};
    use rust_cw_keyboard::keyboard::CwKeyboard;
    use rust_cw_keyboard::keyer::{KeyingMode, Paddle, PaddleEvent};
    use rust_cw_keyboard::keystroke::HidReporter;
    use rust_cw_keyboard::log_drain::drain_all;
    use rust_cw_keyboard::morse::BACKSPACE;
    use rust_cw_keyboard::sender::{CwState, KeyingOutput};
    use rust_cw_keyboard::symbol::Symbol;
    use rust_cw_keyboard::tick::{SoftTimeBase, TickSlot};
    use rust_cw_keyboard::GREETING;

    use super::{FAULT, QUEUES, USB_POLL_MS};

    type Keyboard = CwKeyboard<'static, MemorySettings, Console, SoftTimeBase>;

    const HELP: &str = "\
commands:
  \\wpm N          speed
  \\hz N           sidetone
  \\mode NAME      straight ultimatic bug paddle iambic-a iambic-b
  \\swap           swap paddles
  \\call TEXT      set callsign      \\de   send callsign
  \\mem N TEXT     store message     \\play N   send message
  \\rep N MIN      repeat message every MIN minutes
  \\load N         load preset       \\save N   save preset
  \\press l|r      paddle down       \\release l|r
  \\menu on|off    configuration mode
  \\quit";

    /// Prints keyed symbols as `.`, `-` and blanks.
    #[derive(Default)]
    pub struct Console;

    impl KeyingOutput for Console {
        fn key_down(&mut self) {}

        fn key_up(&mut self) {}

        fn set_tone(&mut self, _hz: u16) {}

        fn on_symbol(&mut self, symbol: Symbol) {
            let c = match symbol {
                Symbol::Dit => '.',
                Symbol::Dah => '-',
                Symbol::Space => ' ',
            };
            print!("{}", c);
            let _ = io::stdout().flush();
        }
    }

    pub fn run() {
        eprintln!("{}", env!("VERSION_STRING"));

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut keyboard: Keyboard =
            CwKeyboard::new(&QUEUES, &FAULT, MemorySettings::new(), Console, SoftTimeBase::new());
        if let Err(e) = keyboard.init() {
            eprintln!("keyboard: {}", e);
            return;
        }
        keyboard.scheduler_mut().register(TickSlot::UsbWork, USB_POLL_MS);
        keyboard.send_str(GREETING);

        let mut reporter = HidReporter::new();
        let mut typed = String::new();
        let mut log = String::new();
        let mut input_open = true;

        let start = Instant::now();
        let mut done: u128 = 0;

        loop {
            match rx.try_recv() {
                Ok(line) => {
                    if !handle_line(&mut keyboard, &line) {
                        break;
                    }
                }
                Err(TryRecvError::Disconnected) => input_open = false,
                Err(TryRecvError::Empty) => {}
            }

            // No real-time guarantee on a host: catch up silently.
            let elapsed = start.elapsed().as_millis();
            while done < elapsed {
                done += 1;
                let fired = keyboard.tick();
                if fired.contains(TickSlot::UsbWork) {
                    let head = QUEUES.keystrokes.peek();
                    let report = reporter.next_report(&QUEUES.keystrokes);
                    match head {
                        Some(BACKSPACE) if !report.is_empty() => {
                            typed.pop();
                        }
                        Some(c) if !report.is_empty() => typed.push(char::from(c)),
                        _ => {}
                    }
                }
            }

            while let Some(b) = QUEUES.menu.pop() {
                println!("\nmenu: {:?}", b as char);
            }

            log.clear();
            drain_all(&mut log);
            eprint!("{}", log);

            let idle = QUEUES.chars.is_empty()
                && QUEUES.symbols.is_empty()
                && QUEUES.keystrokes.is_empty()
                && keyboard.sender_state() == CwState::Idle;
            if idle && !typed.is_empty() {
                println!("\ntyped: {:?}", typed);
                typed.clear();
            }
            if idle && !input_open {
                break;
            }

            let wait = keyboard.scheduler().until_next_fire().unwrap_or(1).max(1);
            thread::sleep(Duration::from_millis(u64::from(wait)));
        }
    }

    /// Apply one input line. Returns `false` on `\quit`.
    fn handle_line(keyboard: &mut Keyboard, line: &str) -> bool {
        let Some(command) = line.strip_prefix('\\') else {
            keyboard.send_str(line);
            keyboard.send_char(b' ');
            return true;
        };

        let mut words = command.splitn(2, ' ');
        let name = words.next().unwrap_or("");
        let arg = words.next().unwrap_or("").trim();
        let number = || arg.split(' ').next().and_then(|n| n.parse::<usize>().ok());

        let result = match name {
            "quit" => return false,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "wpm" => {
                keyboard.set_speed(arg.parse().unwrap_or(0));
                println!("{} wpm", keyboard.timing().wpm());
                Ok(())
            }
            "hz" => {
                keyboard.set_frequency(arg.parse().unwrap_or(0));
                println!("{} Hz", keyboard.settings().frequency());
                Ok(())
            }
            "mode" => {
                match KeyingMode::ALL.iter().find(|m| m.name() == arg) {
                    Some(&mode) => keyboard.set_keying_mode(mode),
                    None => println!("unknown mode {:?}", arg),
                }
                Ok(())
            }
            "swap" => {
                keyboard.swap_paddles();
                println!("left paddle: {}", keyboard.keyer().left());
                Ok(())
            }
            "call" => {
                keyboard.set_callsign(arg);
                Ok(())
            }
            "de" => {
                keyboard.send_callsign();
                Ok(())
            }
            "mem" => {
                let text = arg.split_once(' ').map(|(_, t)| t).unwrap_or("");
                keyboard.set_memory(number().unwrap_or(usize::MAX), text)
            }
            "rep" => {
                let minutes = arg
                    .split_once(' ')
                    .and_then(|(_, m)| m.trim().parse().ok())
                    .unwrap_or(0);
                keyboard.set_memory_repeat(number().unwrap_or(usize::MAX), minutes)
            }
            "play" => keyboard.play_memory(number().unwrap_or(usize::MAX)),
            "load" => keyboard.load_preset(number().unwrap_or(usize::MAX)),
            "save" => keyboard.save_preset(number().unwrap_or(usize::MAX)),
            "press" | "release" => {
                let paddle = if arg.starts_with('r') {
                    Paddle::Right
                } else {
                    Paddle::Left
                };
                keyboard.paddle(if name == "press" {
                    PaddleEvent::Press(paddle)
                } else {
                    PaddleEvent::Release(paddle)
                });
                Ok(())
            }
            "menu" => {
                keyboard.set_command_mode(arg == "on");
                Ok(())
            }
            _ => {
                println!("unknown command {:?}, try \\help", name);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("{}", e);
        }
        true
    }
}
