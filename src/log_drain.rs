//! Log stream consumer.
//!
//! Formats queued [`LogEntry`] records as `[ms] LEVEL: message` lines into
//! any `core::fmt::Write` sink. The hosted binary drains into stderr, the
//! firmware into a TX-only UART.
//!
//! ```text
//! ESP32 GPIO43 (TX) ──────▶ USB-UART RX
//!                            └─▶ PC Serial Monitor
//! ```

use core::fmt::{self, Write};

use crate::log_globals::{ISR_LOG_STREAM, MAIN_LOG_STREAM};
use crate::logging::{LogEntry, LogStream};

/// Format one entry, newline terminated.
pub fn format_entry<W: Write + ?Sized>(w: &mut W, entry: &LogEntry) -> fmt::Result {
    let msg = core::str::from_utf8(entry.message()).unwrap_or("<invalid utf8>");
    writeln!(w, "[{:5}] {}: {}", entry.timestamp_ms, entry.level.as_str(), msg)
}

/// Drain every pending entry of one stream. Returns the number written.
pub fn drain_stream<W: Write + ?Sized, const N: usize>(
    stream: &LogStream<N>,
    w: &mut W,
) -> usize {
    let mut n = 0;
    while let Some(entry) = stream.drain() {
        if format_entry(w, &entry).is_err() {
            break;
        }
        n += 1;
    }
    n
}

/// Drain both global streams, interrupt stream first, then report and reset
/// the dropped counters if anything was lost.
pub fn drain_all<W: Write + ?Sized>(w: &mut W) -> usize {
    let mut n = drain_stream(&ISR_LOG_STREAM, w);
    n += drain_stream(&MAIN_LOG_STREAM, w);

    let isr_dropped = ISR_LOG_STREAM.dropped();
    let main_dropped = MAIN_LOG_STREAM.dropped();
    if isr_dropped > 0 || main_dropped > 0 {
        let _ = writeln!(w, "[WARN] Dropped: ISR={}, MAIN={}", isr_dropped, main_dropped);
        ISR_LOG_STREAM.reset_dropped();
        MAIN_LOG_STREAM.reset_dropped();
    }

    n
}

#[cfg(target_os = "espidf")]
pub use uart::*;

#[cfg(target_os = "espidf")]
mod uart {
    use core::fmt;

    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::uart::{self, UartTxDriver};

    /// UART configuration for logging.
    pub struct UartLoggerConfig {
        pub baud_rate: u32,
    }

    impl Default for UartLoggerConfig {
        fn default() -> Self {
            Self { baud_rate: 115_200 }
        }
    }

    /// Initialize a TX-only UART for log output.
    pub fn init_uart_logger<'d>(
        uart: impl Peripheral<P = impl uart::Uart> + 'd,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
        config: &UartLoggerConfig,
    ) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
        let uart_config = uart::config::Config::default()
            .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

        UartTxDriver::new(
            uart,
            tx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )
    }

    /// `fmt::Write` adapter over a UART transmitter.
    pub struct UartSink<'a, 'd>(pub &'a mut UartTxDriver<'d>);

    impl fmt::Write for UartSink<'_, '_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.write(s.as_bytes()).map(|_| ()).map_err(|_| fmt::Error)
        }
    }
}
