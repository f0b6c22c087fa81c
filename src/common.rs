// Licensed under the Apache-2.0 license

//! Diagnostic output shared by the bus drivers.
//!
//! Drivers are generic over a [`Logger`]. The default [`NoOpLogger`] discards
//! everything and compiles to nothing, so timing-sensitive paths are unaffected
//! when diagnostics are off. [`UartLogger`] writes one line per message to any
//! `embedded_io::Write` sink, typically the USART.

use core::fmt::{self, Write as _};

/// Maximum length of a single formatted log line, excluding the level prefix.
pub const LOG_LINE_CAPACITY: usize = 96;

/// Sink for driver diagnostics.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

/// Logger that drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline(always)]
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}

    #[inline(always)]
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Logger writing `[D] ...` / `[E] ...` lines to a byte sink.
///
/// Lines longer than [`LOG_LINE_CAPACITY`] are truncated. Write errors from
/// the sink are ignored: diagnostics must never change driver behaviour.
pub struct UartLogger<W: embedded_io::Write> {
    sink: W,
}

impl<W: embedded_io::Write> UartLogger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Give back the underlying sink.
    pub fn release(self) -> W {
        self.sink
    }

    fn emit(&mut self, prefix: &str, args: fmt::Arguments<'_>) {
        let mut line: heapless::String<LOG_LINE_CAPACITY> = heapless::String::new();
        // Overflow leaves the text formatted so far in place.
        let _ = line.write_fmt(args);
        let _ = self.sink.write_all(prefix.as_bytes());
        let _ = self.sink.write_all(line.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for UartLogger<W> {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.emit("[D] ", args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.emit("[E] ", args);
    }
}
