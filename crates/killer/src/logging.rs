//! Logging setup for killer.
//!
//! Device events and registration state transitions are logged through
//! `tracing` to stderr; messages meant for the operator go through
//! [`crate::operator::Operator::notify`] instead.
//!
//! The registration commands keep the terminal in raw mode, where a bare
//! `\n` moves down a line without returning to the first column. Log lines
//! are therefore written through [`CrlfWriter`], which ends every line with
//! `\r\n`. Outside raw mode the extra `\r` is invisible.

use std::io::{self, Write};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Registration progress (info and above).
    #[default]
    Normal,
    /// Camera and decoder details (debug and above).
    Verbose,
    /// Every frame (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Wraps a writer and turns every `\n` not preceded by `\r` into `\r\n`.
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
    after_cr: bool,
}

impl<W: Write> CrlfWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            after_cr: false,
        }
    }

    /// The wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() + 4);
        for &byte in buf {
            if byte == b'\n' && !self.after_cr {
                out.push(b'\r');
            }
            out.push(byte);
            self.after_cr = byte == b'\r';
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`MakeWriter`] for stderr with raw-mode safe line endings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStderr;

impl<'a> MakeWriter<'a> for TerminalStderr {
    type Writer = CrlfWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        CrlfWriter::new(io::stderr())
    }
}

/// Initialize the logging system.
///
/// The logging level can be controlled via:
/// 1. The `verbosity` parameter
/// 2. The `RUST_LOG` environment variable (takes precedence)
///
/// # Examples
///
/// ```no_run
/// use killer::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("killer={}", verbosity.to_level_filter());

    // Allow RUST_LOG to override
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(TerminalStderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Install the subscriber (ignore error if already set)
    let _ = subscriber.try_init();
}

/// Initialize logging for tests (warnings and errors only).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
