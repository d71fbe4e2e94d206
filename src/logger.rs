// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Diagnostic output which may be used from several cores at once.
//!
//! Every line is prefixed with the low 16 bits of the MPIDR of the core which printed it, e.g.
//! `[cpu 0x0100] `, and a whole line is written while holding the console lock, so lines from
//! different cores never interleave. The order of lines from different cores is unspecified.

use crate::spinlock::SpinLocked;
use arm_sysregs::read_mpidr_el1;
#[cfg(all(not(test), target_os = "none"))]
use core::panic::PanicInfo;
use core::fmt::{Arguments, Write};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

/// The bits of the MPIDR which are shown in the header of each line.
const MPIDR_HEADER_MASK: u64 = 0xffff;

type Console = LockedWriter<&'static mut (dyn Write + Send)>;

static LOGGER: Once<MpLogger<Console>> = Once::new();

/// Something to which logs can be sent.
///
/// Note that unlike `core::fmt::Write`, the `write_fmt` method on this trait takes `&self` rather
/// than `&mut self`. This means that the implementation is responsible for handling locking if
/// necessary, or can be made lock-free.
pub trait LogSink {
    /// Writes the given format arguments to the log sink.
    fn write_fmt(&self, args: Arguments);
}

/// An implementation of `LogSink` that wraps around any implementation of `core::fmt::Write`.
///
/// This wraps the given writer in a spinlock, to allow a single instance of it to be used safely
/// from multiple cores. Each call to `write_fmt` is a single critical section.
pub struct LockedWriter<W: Write> {
    writer: SpinLocked<W>,
}

impl<W: Write> LockedWriter<W> {
    /// Creates a new `LockedWriter` wrapping the given [`Write`] implementation.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: SpinLocked::new(writer),
        }
    }

    /// Writes the given format arguments only if the lock is free right now.
    ///
    /// Returns false, having written nothing, if somebody else holds the lock. This is for paths
    /// such as a panic where the caller might itself be the holder.
    pub fn try_write_fmt(&self, args: Arguments) -> bool {
        match self.writer.try_lock() {
            Some(mut writer) => {
                // Ignore errors.
                let _ = writer.write_fmt(args);
                true
            }
            None => false,
        }
    }
}

impl<W: Write> LogSink for LockedWriter<W> {
    fn write_fmt(&self, args: Arguments) {
        // Ignore errors.
        let _ = self.writer.lock().write_fmt(args);
    }
}

/// A logger which prefixes everything it prints with the identity of the calling core.
pub struct MpLogger<S: LogSink> {
    sink: S,
}

impl<S: LogSink> MpLogger<S> {
    /// Creates a new logger writing to the given sink.
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Prints the MPID header of the calling core followed by the given message.
    ///
    /// Nothing is added after the message; see [`mp_println!`](crate::mp_println) for whole lines.
    pub fn print(&self, args: Arguments) {
        self.print_for(read_mpidr_el1().bits(), args);
    }

    fn print_for(&self, mpidr: u64, args: Arguments) {
        // One call, so the header can't be separated from the message.
        self.sink
            .write_fmt(format_args!("[cpu {:#06x}] {}", mpidr & MPIDR_HEADER_MASK, args));
    }
}

impl<S: LogSink + Send + Sync> Log for MpLogger<S> {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.print(format_args!("{}: {}\n", record.level(), record.args()));
    }

    fn flush(&self) {}
}

/// Initialises the global logger, and registers it with the `log` crate.
///
/// Returns an error if a logger was already registered, in which case `console` is not used.
pub fn init(console: &'static mut (dyn Write + Send)) -> Result<(), SetLoggerError> {
    let logger = LOGGER.call_once(|| MpLogger::new(LockedWriter::new(console)));
    log::set_logger(logger)?;
    log::set_max_level(build_time_log_level());
    Ok(())
}

/// Prints the MPID header of the calling core followed by the given message to the global logger.
///
/// Does nothing if [`init`] hasn't been called yet.
pub fn mp_print(args: Arguments) {
    if let Some(logger) = LOGGER.get() {
        logger.print(args);
    }
}

/// Prints a line to the global logger, prefixed with the MPID of the calling core.
///
/// The whole line is written at once, so it won't be interleaved with output from other cores.
#[macro_export]
macro_rules! mp_println {
    () => {
        $crate::logger::mp_print(format_args!("\n"))
    };
    ($($arg:tt)*) => {
        $crate::logger::mp_print(format_args!("{}\n", format_args!($($arg)*)))
    };
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    // The panic may have happened while this core held the console lock, so don't wait for it.
    if let Some(logger) = LOGGER.get() {
        logger.sink.try_write_fmt(format_args!(
            "[cpu {:#06x}] {}\n",
            read_mpidr_el1().bits() & MPIDR_HEADER_MASK,
            info
        ));
    }
    loop {}
}

/// Returns the logging [`LevelFilter`] set by the build-time environment variable `STF_LOG_LEVEL`.
/// `STF_LOG_LEVEL` can have the lower-case string values "off", "error", "warn", "info", "debug", or
/// "trace", corresponding to the named values of [`LevelFilter`]. If `STF_LOG_LEVEL` is absent or has
/// some other value, this function returns `LevelFilter::Debug`.
pub const fn build_time_log_level() -> LevelFilter {
    let level = match option_env!("STF_LOG_LEVEL") {
        Some(level) => level,
        None => "",
    };
    parse_log_level(level)
}

const fn parse_log_level(level: &str) -> LevelFilter {
    match level.as_bytes() {
        b"off" => LevelFilter::Off,
        b"error" => LevelFilter::Error,
        b"warn" => LevelFilter::Warn,
        b"info" => LevelFilter::Info,
        b"debug" => LevelFilter::Debug,
        b"trace" => LevelFilter::Trace,
        _ => LevelFilter::Debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Platform, test::TestPlatform};
    use log::Level;
    use std::thread;

    const HEADER_LEN: usize = "[cpu 0x0000] ".len();

    /// A console which gives other threads a chance to run between every character.
    #[derive(Default)]
    struct SlowConsole(String);

    impl Write for SlowConsole {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for c in s.chars() {
                self.0.push(c);
                thread::yield_now();
            }
            Ok(())
        }
    }

    fn output(logger: &MpLogger<LockedWriter<SlowConsole>>) -> String {
        logger.sink.writer.lock().0.clone()
    }

    #[test]
    fn header_format() {
        let logger = MpLogger::new(LockedWriter::new(SlowConsole::default()));
        logger.print_for(0x8100_0102, format_args!("hello {}\n", 42));
        logger.print_for(0x0, format_args!("world"));
        assert_eq!(output(&logger), "[cpu 0x0102] hello 42\n[cpu 0x0000] world");
    }

    #[test]
    fn concurrent_lines_not_interleaved() {
        const LINES: usize = 20;
        let logger = MpLogger::new(LockedWriter::new(SlowConsole::default()));

        thread::scope(|s| {
            for c in ['a', 'b'] {
                let logger = &logger;
                s.spawn(move || {
                    let line = c.to_string().repeat(100);
                    for _ in 0..LINES {
                        logger.print(format_args!("{line}\n"));
                    }
                });
            }
        });

        let output = output(&logger);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2 * LINES);
        for line in &lines {
            assert!(line.starts_with("[cpu 0x"), "{line}");
            assert_eq!(line.len(), HEADER_LEN + 100, "{line}");
            let body = &line[HEADER_LEN..];
            let first = body.chars().next().unwrap();
            assert!(body.chars().all(|c| c == first), "interleaved line {line}");
        }
        assert_eq!(lines.iter().filter(|line| line.ends_with('a')).count(), LINES);
    }

    #[test]
    fn log_record_format() {
        let logger = MpLogger::new(LockedWriter::new(SlowConsole::default()));
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("careful"))
                .build(),
        );
        let output = output(&logger);
        assert!(output.starts_with("[cpu 0x"), "{output}");
        assert_eq!(&output[HEADER_LEN..], "WARN: careful\n");
    }

    #[test]
    fn try_write_while_locked() {
        let writer = LockedWriter::new(SlowConsole::default());
        {
            let _guard = writer.writer.lock();
            assert!(!writer.try_write_fmt(format_args!("dropped")));
        }
        assert!(writer.try_write_fmt(format_args!("kept")));
        assert_eq!(writer.writer.lock().0, "kept");
    }

    /// Everything written to the global logger, which other tests may also write to.
    static CONSOLE: SpinLocked<String> = SpinLocked::new(String::new());

    struct SharedConsole;

    impl Write for SharedConsole {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            CONSOLE.lock().push_str(s);
            Ok(())
        }
    }

    #[test]
    fn init_only_once() {
        mp_print(format_args!("before init\n"));
        assert!(init(Box::leak(Box::new(SharedConsole))).is_ok());
        assert!(init(TestPlatform::make_log_sink()).is_err());
        crate::mp_println!("core {} ready", 0);
        crate::mp_println!();

        let output = CONSOLE.lock().clone();
        assert!(!output.contains("before init"), "{output}");
        let lines: Vec<&str> = output.lines().collect();
        let ready = lines
            .iter()
            .position(|line| {
                line.starts_with("[cpu 0x") && line.get(HEADER_LEN..) == Some("core 0 ready")
            })
            .unwrap_or_else(|| panic!("no ready line in {output:?}"));
        assert!(
            lines[ready + 1..]
                .iter()
                .any(|line| line.len() == HEADER_LEN && line.starts_with("[cpu 0x")),
            "no empty line in {output:?}"
        );
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("off"), LevelFilter::Off);
        assert_eq!(parse_log_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_log_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_log_level(""), LevelFilter::Debug);
        assert_eq!(parse_log_level("INFO"), LevelFilter::Debug);
    }
}
