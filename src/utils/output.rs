//! Redacted output streams
//!
//! Nothing in the crate writes to stdout/stderr directly. Everything goes
//! through a [`Terminal`], which hands out writers wrapped in the redaction
//! filter. Tests swap the process streams for in-memory buffers.

use crate::utils::redact::{RedactWriter, Redactor};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Where a stream ends up
#[derive(Clone, Debug)]
pub enum Sink {
    Stdout,
    Stderr,
    Memory(Arc<Mutex<Vec<u8>>>),
}

impl Sink {
    /// An in-memory sink, returned along with the buffer it fills
    pub fn memory() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (Sink::Memory(buffer.clone()), buffer)
    }

    pub fn writer(&self) -> SinkWriter {
        match self {
            Sink::Stdout => SinkWriter::Stdout(io::stdout()),
            Sink::Stderr => SinkWriter::Stderr(io::stderr()),
            Sink::Memory(buffer) => SinkWriter::Memory(buffer.clone()),
        }
    }
}

/// Raw, unredacted writer for a [`Sink`]
pub enum SinkWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    Memory(Arc<Mutex<Vec<u8>>>),
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SinkWriter::Stdout(out) => out.write(buf),
            SinkWriter::Stderr(err) => err.write(buf),
            SinkWriter::Memory(buffer) => {
                buffer.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SinkWriter::Stdout(out) => out.flush(),
            SinkWriter::Stderr(err) => err.flush(),
            SinkWriter::Memory(_) => Ok(()),
        }
    }
}

/// The orchestrator's view of its own stdout and stderr
#[derive(Clone, Debug)]
pub struct Terminal {
    redactor: Redactor,
    stdout: Sink,
    stderr: Sink,
}

impl Terminal {
    /// Process stdout/stderr, redacted with `redactor`
    pub fn new(redactor: Redactor) -> Self {
        Self::with_sinks(redactor, Sink::Stdout, Sink::Stderr)
    }

    pub fn with_sinks(redactor: Redactor, stdout: Sink, stderr: Sink) -> Self {
        Self {
            redactor,
            stdout,
            stderr,
        }
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Fresh redacted writer on stdout. Drop or finish it once the logical
    /// stream is over so held-back bytes get written.
    pub fn stdout(&self) -> RedactWriter<SinkWriter> {
        self.redactor.writer(self.stdout.writer())
    }

    /// Fresh redacted writer on stderr
    pub fn stderr(&self) -> RedactWriter<SinkWriter> {
        self.redactor.writer(self.stderr.writer())
    }
}
