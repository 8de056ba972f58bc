use bytes::{Buf, BytesMut};

/// Fixed-capacity byte buffer shared by every line of the body.
///
/// The buffer is split by `mark` into a confirmed region, whose bytes are
/// known to belong to the open part and may be flushed, and a tentative
/// region holding the line still being read (possibly preceded by a
/// deferred CRLF) which might yet turn out to be a boundary line.
#[derive(Debug)]
pub(crate) struct ByteBuffer {
    buf: BytesMut,
    capacity: usize,
    mark: usize,
}

impl ByteBuffer {
    pub fn new(capacity: usize) -> Self {
        ByteBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            mark: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    /// Appends as many bytes of `data` as fit and returns how many were taken.
    pub fn fill(&mut self, data: &[u8]) -> usize {
        let n = std::cmp::min(self.remaining(), data.len());
        self.buf.extend_from_slice(&data[..n]);
        n
    }

    /// The line being read, skipping the deferred CRLF that precedes it.
    pub fn line(&self, deferred_crlf: bool) -> &[u8] {
        let start = if deferred_crlf { self.mark + 2 } else { self.mark };
        &self.buf[std::cmp::min(start, self.buf.len())..]
    }

    #[cfg(test)]
    pub fn tentative_len(&self) -> usize {
        self.buf.len() - self.mark
    }

    pub fn confirmed(&self) -> &[u8] {
        &self.buf[..self.mark]
    }

    /// Promotes the whole tentative region to content.
    pub fn confirm_all(&mut self) {
        self.mark = self.buf.len();
    }

    /// Drops the tentative region, e.g. a boundary line and the CRLF before it.
    pub fn discard_tentative(&mut self) {
        self.buf.truncate(self.mark);
    }

    /// Releases the confirmed region after it was flushed, moving the
    /// tentative region to the front.
    pub fn consume_confirmed(&mut self) {
        if self.mark == self.buf.len() {
            self.buf.clear();
        } else {
            self.buf.advance(self.mark);
        }
        self.mark = 0;
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.mark = 0;
    }
}
