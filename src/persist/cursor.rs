//! Random-access byte cursor over an in-memory snapshot buffer.

use super::error::{PersistError, Result};

/// Lookahead window for [`Cursor::read_line`]. A line that does not
/// terminate within this many bytes is treated as corrupt input; the bound
/// keeps malformed, terminator-less buffers from triggering unbounded scans.
pub const LINE_LOOKAHEAD: usize = 1024;

/// Read-only cursor over the snapshot buffer.
///
/// Behaves like a seekable file handle: reads advance the position, `seek`
/// moves it absolutely. The position never leaves `0..=len` and reads never
/// run past the end of the buffer.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Number of bytes between the position and the end of the buffer.
    pub fn remaining(&self) -> u64 {
        (self.buf.len() - self.pos) as u64
    }

    /// Set the position absolutely, clamped to the buffer length.
    pub fn seek(&mut self, pos: u64) {
        self.pos = (pos as usize).min(self.buf.len());
    }

    /// Read up to `n` bytes, advancing by however many were actually
    /// available.
    pub fn read(&mut self, n: usize) -> &'a [u8] {
        let end = self.pos.saturating_add(n).min(self.buf.len());
        let out = &self.buf[self.pos..end];
        self.pos = end;
        out
    }

    /// Read everything from the position to the end of the buffer.
    pub fn read_all(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    /// Read exactly `n` bytes, or fail with a truncated-input error naming
    /// the field that could not be read.
    pub fn read_exact(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n as u64 {
            return Err(PersistError::Truncated {
                offset: self.tell(),
                what: format!("need {} bytes for {}, {} remain", n, what, self.remaining()),
            });
        }
        Ok(self.read(n))
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.read_exact(1, what)?[0])
    }

    /// Read bytes up to and including the next `\n`, which must appear
    /// within the [`LINE_LOOKAHEAD`] window.
    pub fn read_line(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let end = start.saturating_add(LINE_LOOKAHEAD).min(self.buf.len());
        let window = &self.buf[start..end];
        match window.iter().position(|&b| b == b'\n') {
            Some(i) => {
                self.pos = start + i + 1;
                Ok(&self.buf[start..self.pos])
            }
            None => Err(PersistError::Truncated {
                offset: start as u64,
                what: format!("no line terminator within {} bytes", LINE_LOOKAHEAD),
            }),
        }
    }

    /// Non-advancing view of up to `n` bytes starting at `pos`. Used for
    /// diagnostic previews of raw record bytes.
    pub fn peek_at(&self, pos: u64, n: usize) -> &'a [u8] {
        let start = (pos as usize).min(self.buf.len());
        let end = start.saturating_add(n).min(self.buf.len());
        &self.buf[start..end]
    }
}
