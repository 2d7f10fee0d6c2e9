//! The sliding-window ring buffer that owns a parser's byte history.
//!
//! Bytes accumulate in `data[0..len]`; `w` splits already-parsed bytes
//! (`data[0..w]`) from buffered-but-unparsed bytes (`data[w..len]`); `off` is
//! the absolute stream offset of `data[0]`. `prune` discards the oldest
//! parsed bytes to keep `data` bounded, returning the discarded length so
//! the caller (the `Matcher`, which also owns the index) can shift its index
//! positions by the same amount.

use log::debug;

/// 8 bytes of look-ahead margin are always readable past `data[..len]`, so
/// every in-bounds window position admits an unaligned 8-byte load without a
/// bounds check. One byte more than the hash/prefix utilities strictly need,
/// matching the slack the margin invariant reserves.
const READ_MARGIN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// No space remains and `prune` could not free enough.
    FullBuffer,
    /// The requested absolute offset falls outside `[off, off + len)`.
    OutOfBuffer,
    /// Fewer than the requested number of bytes remain at that offset.
    EndOfBuffer,
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            BufferError::FullBuffer => "ring buffer is full",
            BufferError::OutOfBuffer => "offset outside retained window",
            BufferError::EndOfBuffer => "fewer bytes remain than requested",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BufferError {}

/// Sliding-window byte history. See the module docs for the invariants this
/// type maintains between `w`, `off`, and `data.len()`.
///
/// `data` always physically holds `len + READ_MARGIN` bytes: the trailing
/// `READ_MARGIN` bytes are real, zero-initialized storage past the logical
/// end, kept there purely so an unaligned 8-byte load at `data[len - 1]`
/// reads initialized memory instead of running off the end of the
/// allocation. `len` (tracked separately from `data.len()`, which always
/// equals `len + READ_MARGIN`) is the logical content length.
pub struct RingBuffer {
    data: Vec<u8>,
    /// Logical content length; `data.len() == len + READ_MARGIN`.
    len: usize,
    /// Window head: split between parsed (`< w`) and buffered (`>= w`) bytes.
    w: usize,
    /// Absolute stream offset of `data[0]`.
    off: u64,
    window_size: u32,
    shrink_size: u32,
    buffer_size: u32,
}

impl RingBuffer {
    /// `shrink_size` must be `< buffer_size`; `buffer_size` must be `>=
    /// window_size`. Panics on violation — this is a construction-time
    /// contract, not a steady-state error.
    pub fn new(window_size: u32, shrink_size: u32, buffer_size: u32) -> Self {
        assert!(shrink_size < buffer_size, "shrink_size must be < buffer_size");
        assert!(buffer_size >= window_size, "buffer_size must be >= window_size");
        RingBuffer {
            data: vec![0u8; READ_MARGIN],
            len: 0,
            w: 0,
            off: 0,
            window_size,
            shrink_size,
            buffer_size,
        }
    }

    #[inline]
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index into `data` splitting parsed from buffered bytes.
    #[inline]
    pub fn w(&self) -> usize {
        self.w
    }

    /// Absolute stream offset of `data[0]`.
    #[inline]
    pub fn off(&self) -> u64 {
        self.off
    }

    /// Absolute stream offset of the window head.
    #[inline]
    pub fn head_offset(&self) -> u64 {
        self.off + self.w as u64
    }

    /// Bytes buffered but not yet parsed: `data[w..len]`.
    #[inline]
    pub fn unparsed(&self) -> &[u8] {
        &self.data[self.w..self.len]
    }

    /// Whole retained window, `data[0..len]`.
    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Slice starting at `data[i]` extended by the read margin, so an
    /// unaligned 8-byte load at `i` is always in bounds even when `i == len
    /// - 1`. Safe: the margin bytes are real zero-initialized storage, never
    /// spare/uninitialized capacity.
    ///
    /// # Panics
    /// Panics if `i > self.len()`.
    pub fn margin_slice(&self, i: usize) -> &[u8] {
        assert!(i <= self.len);
        &self.data[i..self.len + READ_MARGIN]
    }

    /// Append `bytes` to the tail, pruning first if needed. Returns the
    /// number of bytes actually written and, if a prune happened, the delta
    /// the caller must `shift` its index by.
    ///
    /// Errs with `FullBuffer` (after pruning what it could) when zero bytes
    /// of a non-empty request could be written.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(usize, Option<u32>), BufferError> {
        let mut shifted = None;
        if self.len + bytes.len() > self.buffer_size as usize && self.w > self.shrink_size as usize
        {
            shifted = Some(self.prune());
        }
        let space = self.buffer_size as usize - self.len;
        let n = bytes.len().min(space);
        self.append_zeroed(n);
        self.data[self.len - n..self.len].copy_from_slice(&bytes[..n]);
        if n == 0 && !bytes.is_empty() {
            return Err(BufferError::FullBuffer);
        }
        Ok((n, shifted))
    }

    /// Read from `reader` into the tail, pruning first if needed. Mirrors
    /// `write` but sources bytes from a `std::io::Read` collaborator.
    pub fn read_from(
        &mut self,
        reader: &mut impl std::io::Read,
        max: usize,
    ) -> std::io::Result<(usize, Option<u32>)> {
        let mut shifted = None;
        if self.len + max > self.buffer_size as usize && self.w > self.shrink_size as usize {
            shifted = Some(self.prune());
        }
        let space = self.buffer_size as usize - self.len;
        let want = max.min(space);
        self.append_zeroed(want);
        let start = self.len - want;
        let mut total = 0;
        while total < want {
            let n = reader.read(&mut self.data[start + total..start + want])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        // Shrink back to exactly what was actually read.
        self.truncate_logical(start + total);
        Ok((total, shifted))
    }

    /// Discard bytes behind `w - shrink_size`, sliding the retained window
    /// to the front of `data`. Requires `w > shrink_size`. Returns the
    /// discarded length (the delta every index structure must `shift` by).
    pub fn prune(&mut self) -> u32 {
        assert!(self.w > self.shrink_size as usize, "prune requires w > shrink_size");
        let delta = self.w - self.shrink_size as usize;
        self.data.copy_within(delta..self.len + READ_MARGIN, 0);
        self.len -= delta;
        self.w -= delta;
        self.off += delta as u64;
        debug!("pruned ring buffer: delta={delta} new_off={}", self.off);
        delta as u32
    }

    /// Grow `data` so `len` increases by `n`, keeping the trailing
    /// `READ_MARGIN` bytes zeroed past the new logical end.
    fn append_zeroed(&mut self, n: usize) {
        self.len += n;
        self.data.resize(self.len + READ_MARGIN, 0);
        // Re-zero the margin: `resize` only zeroes genuinely new elements,
        // but a prior `truncate_logical` may have left stale bytes just past
        // the old `len` that are now inside the margin window again.
        let margin_start = self.len;
        for b in &mut self.data[margin_start..margin_start + READ_MARGIN] {
            *b = 0;
        }
    }

    fn truncate_logical(&mut self, new_len: usize) {
        self.len = new_len;
        self.data.truncate(self.len + READ_MARGIN);
        let margin_start = self.len;
        for b in &mut self.data[margin_start..margin_start + READ_MARGIN] {
            *b = 0;
        }
    }

    /// Advance `w` by `n` (bytes `[old_w, old_w+n)` move from buffered to
    /// parsed). Caller (the `Matcher`) is responsible for keeping `w <=
    /// data.len()`.
    pub(crate) fn advance_w(&mut self, n: usize) {
        self.w += n;
        debug_assert!(self.w <= self.data.len());
    }

    pub(crate) fn rewind_w(&mut self, n: usize) {
        debug_assert!(n <= self.w);
        self.w -= n;
    }

    /// `n` bytes starting at absolute offset `abs_off`.
    pub fn peek_at(&self, n: usize, abs_off: u64) -> Result<&[u8], BufferError> {
        if abs_off < self.off || abs_off >= self.off + self.data.len() as u64 {
            return Err(BufferError::OutOfBuffer);
        }
        let start = (abs_off - self.off) as usize;
        if start + n > self.data.len() {
            return Err(BufferError::EndOfBuffer);
        }
        Ok(&self.data[start..start + n])
    }

    pub fn byte_at(&self, abs_off: u64) -> Result<u8, BufferError> {
        Ok(self.peek_at(1, abs_off)?[0])
    }

    pub fn read_at(&self, dst: &mut [u8], abs_off: u64) -> Result<(), BufferError> {
        let src = self.peek_at(dst.len(), abs_off)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Relative position within `data` for an absolute offset already known
    /// to lie in `[off, off + len]`.
    #[inline]
    pub(crate) fn rel(&self, abs_off: u64) -> usize {
        (abs_off - self.off) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrip() {
        let mut buf = RingBuffer::new(64, 16, 64);
        let (n, shifted) = buf.write(b"hello world").unwrap();
        assert_eq!(n, 11);
        assert!(shifted.is_none());
        assert_eq!(buf.peek_at(5, 0).unwrap(), b"hello");
        assert_eq!(buf.byte_at(6).unwrap(), b'w');
    }

    #[test]
    fn out_of_buffer_and_end_of_buffer_errors() {
        let mut buf = RingBuffer::new(64, 16, 64);
        buf.write(b"abc").unwrap();
        assert_eq!(buf.peek_at(1, 10), Err(BufferError::OutOfBuffer));
        assert_eq!(buf.peek_at(10, 0), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn prune_soundness_shifts_offsets_by_delta() {
        let mut buf = RingBuffer::new(8, 4, 16);
        buf.write(b"0123456789abcdef").unwrap();
        buf.advance_w(12); // parsed up through '9' + "ab" -> w=12
        let before = buf.peek_at(3, 10).unwrap().to_vec(); // bytes at abs offset 10
        let delta = buf.prune();
        assert_eq!(delta, 8); // w(12) - shrink_size(4)
        // The same logical bytes are now at abs offset 10 still (off advanced
        // by delta, data slid left by delta) -- prune preserves absolute
        // addressing, only data's local indices move.
        let after = buf.peek_at(3, 10).unwrap().to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn write_triggers_prune_when_buffer_would_overflow() {
        let mut buf = RingBuffer::new(8, 2, 10);
        buf.write(b"0123456789").unwrap();
        buf.advance_w(8);
        let (n, shifted) = buf.write(b"AB").unwrap();
        assert_eq!(n, 2);
        assert!(shifted.is_some());
    }

    #[test]
    fn full_buffer_when_prune_cannot_make_room() {
        let mut buf = RingBuffer::new(8, 2, 10);
        buf.write(b"0123456789").unwrap();
        // w is still 0: cannot prune (w=0 <= shrink_size=2), so buffer is
        // genuinely full and no progress can be made.
        assert_eq!(buf.write(b"X"), Err(BufferError::FullBuffer));
    }
}
