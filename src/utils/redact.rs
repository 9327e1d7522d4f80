//! Streaming secret redaction
//!
//! Every byte the orchestrator writes (its own logs, and the stdout/stderr of
//! every hook and backend it spawns) goes through a [`RedactWriter`]. The
//! writer replaces each configured secret with [`REPLACEMENT`] and holds back
//! any trailing bytes that could still turn into a secret once the next write
//! arrives, so a secret split across two writes never leaks.

use parking_lot::RwLock;
use std::io::{self, Write};
use std::sync::Arc;

/// Placeholder emitted in place of a secret
pub const REPLACEMENT: &[u8] = b"***";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RedactError {
    #[error("bad secret at index {0}: secret is empty")]
    EmptySecret(usize),
}

/// Shared set of secrets to scrub from output
///
/// Cloning is cheap and every clone sees the same secret set. Secrets are
/// meant to be registered once at startup, before output starts flowing.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Arc<RwLock<Vec<Vec<u8>>>>,
}

/// Result of one redaction pass over a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted {
    /// Bytes that are safe to emit
    pub output: Vec<u8>,
    /// How many input bytes `output` accounts for. Anything past this offset
    /// may be the start of a secret and must be presented again with more data.
    pub consumed: usize,
}

impl Redactor {
    /// Create a redactor for the given secrets
    pub fn new<I, S>(secrets: I) -> Result<Self, RedactError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let redactor = Self::default();
        redactor.add_secrets(secrets)?;
        Ok(redactor)
    }

    /// Register more secrets. Nothing is added if any of them is empty.
    pub fn add_secrets<I, S>(&self, secrets: I) -> Result<(), RedactError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut converted = Vec::new();
        for (index, secret) in secrets.into_iter().enumerate() {
            let secret = secret.as_ref();
            if secret.is_empty() {
                return Err(RedactError::EmptySecret(index));
            }
            converted.push(secret.to_vec());
        }

        self.secrets.write().extend(converted);
        Ok(())
    }

    /// Number of registered secrets
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }

    /// Redact `src`.
    ///
    /// When `at_eof` is false, the longest suffix of `src` that is a proper
    /// prefix of some secret is left unconsumed.
    pub fn redact(&self, src: &[u8], at_eof: bool) -> Redacted {
        let secrets = self.secrets.read();

        if secrets.is_empty() {
            return Redacted {
                output: src.to_vec(),
                consumed: src.len(),
            };
        }

        let mut output = Vec::with_capacity(src.len());
        let mut consumed = 0;

        // Replace the closest secret until none is left
        while let Some((offset, len)) = closest_secret(&secrets, &src[consumed..]) {
            output.extend_from_slice(&src[consumed..consumed + offset]);
            output.extend_from_slice(REPLACEMENT);
            consumed += offset + len;
        }

        if at_eof {
            output.extend_from_slice(&src[consumed..]);
            return Redacted {
                output,
                consumed: src.len(),
            };
        }

        let held = pending_prefix_len(&secrets, &src[consumed..]);
        let safe_end = src.len() - held;
        output.extend_from_slice(&src[consumed..safe_end]);

        Redacted {
            output,
            consumed: safe_end,
        }
    }

    /// Redact a complete string in one go
    pub fn redact_str(&self, value: &str) -> String {
        let redacted = self.redact(value.as_bytes(), true);
        String::from_utf8_lossy(&redacted.output).into_owned()
    }

    /// Wrap a writer so everything written through it is redacted
    pub fn writer<W: Write>(&self, inner: W) -> RedactWriter<W> {
        RedactWriter::new(inner, self.clone())
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.len())
            .finish()
    }
}

/// Offset and length of the secret starting earliest in `haystack`
fn closest_secret(secrets: &[Vec<u8>], haystack: &[u8]) -> Option<(usize, usize)> {
    let mut closest: Option<(usize, usize)> = None;

    for secret in secrets {
        if let Some(offset) = find(haystack, secret) {
            match closest {
                Some((best, _)) if best <= offset => {}
                _ => closest = Some((offset, secret.len())),
            }
        }
    }

    closest
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Length of the longest suffix of `tail` equal to a proper prefix of a secret
fn pending_prefix_len(secrets: &[Vec<u8>], tail: &[u8]) -> usize {
    let mut overlap = 0;

    for secret in secrets {
        // Full matches were already replaced
        let start = (secret.len() - 1).min(tail.len());
        for n in (overlap + 1..=start).rev() {
            if tail[tail.len() - n..] == secret[..n] {
                overlap = n;
                break;
            }
        }
    }

    overlap
}

/// Writer adapter that redacts secrets, including across write boundaries
///
/// Bytes that might be the beginning of a secret are buffered until the next
/// write settles the question. `flush` never releases them; call
/// [`RedactWriter::finish`] (or drop the writer) once the stream is complete.
pub struct RedactWriter<W: Write> {
    inner: Option<W>,
    redactor: Redactor,
    pending: Vec<u8>,
}

impl<W: Write> RedactWriter<W> {
    pub fn new(inner: W, redactor: Redactor) -> Self {
        Self {
            inner: Some(inner),
            redactor,
            pending: Vec::new(),
        }
    }

    /// Bytes currently held back waiting for more input
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Flush held-back bytes verbatim and mark the stream as ended
    pub fn finish(&mut self) -> io::Result<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };

        let redacted = self.redactor.redact(&self.pending, true);
        self.pending.clear();
        inner.write_all(&redacted.output)?;
        inner.flush()
    }

    /// Finish the stream and hand back the wrapped writer
    pub fn into_inner(mut self) -> io::Result<W> {
        let redacted = self.redactor.redact(&self.pending, true);
        self.pending.clear();
        let mut inner = self.inner.take().ok_or_else(finished_error)?;
        inner.write_all(&redacted.output)?;
        inner.flush()?;
        Ok(inner)
    }
}

fn finished_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        "write after redacted stream was finished",
    )
}

impl<W: Write> Write for RedactWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(finished_error)?;

        self.pending.extend_from_slice(buf);
        let redacted = self.redactor.redact(&self.pending, false);
        inner.write_all(&redacted.output)?;
        self.pending.drain(..redacted.consumed);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for RedactWriter<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
