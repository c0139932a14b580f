//! Fixed-capacity text buffers.
//!
//! Every rendering path in the tracer writes into one of these instead of a
//! heap `String`: output is truncated at a UTF-8 boundary once the capacity
//! is reached, and the truncation is remembered so it can be counted.

use std::fmt;

/// Capacity of one rendered trace line, newline included.
pub const LINE_CAPACITY: usize = 512;

/// Capacity of one rendered written value.
pub const VALUE_CAPACITY: usize = 256;

/// A stack buffer that accepts `fmt::Write` output up to `N` bytes and
/// silently drops the rest.
pub struct BoundedBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
    truncated: bool,
}

impl<const N: usize> BoundedBuf<N> {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
            truncated: false,
        }
    }

    /// The rendered text so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only whole characters are ever copied in.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    /// Number of bytes written.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Whether any output was dropped.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Append a trailing newline, evicting the last character if the buffer
    /// is full so the line is always terminated.
    pub fn terminate_line(&mut self) {
        if N == 0 {
            self.truncated = true;
            return;
        }
        if self.len == N {
            let mut cut = N - 1;
            while cut > 0 && is_continuation(self.buf[cut]) {
                cut -= 1;
            }
            self.len = cut;
            self.truncated = true;
        }
        self.buf[self.len] = b'\n';
        self.len += 1;
    }

    /// Append `s` with backslash, newline, carriage return and tab escaped
    /// as `\\`, `\n`, `\r`, `\t`. An escape pair is written whole or not at
    /// all.
    pub fn write_escaped(&mut self, s: &str) {
        let mut rest = s;
        while let Some((pos, pair)) = rest
            .char_indices()
            .find_map(|(i, c)| escape_pair(c).map(|pair| (i, pair)))
        {
            let _ = fmt::Write::write_str(self, &rest[..pos]);
            self.write_whole(pair);
            // Every escaped character is one byte.
            rest = &rest[pos + 1..];
        }
        let _ = fmt::Write::write_str(self, rest);
    }

    fn write_whole(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        if s.len() > N - self.len {
            self.truncated = true;
            return;
        }
        self.buf[self.len..self.len + s.len()].copy_from_slice(s.as_bytes());
        self.len += s.len();
    }
}

/// `fmt::Write` adapter that routes everything through
/// [`BoundedBuf::write_escaped`].
pub struct Escaped<'a, const N: usize>(pub &'a mut BoundedBuf<N>);

impl<const N: usize> fmt::Write for Escaped<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_escaped(s);
        Ok(())
    }
}

const fn escape_pair(c: char) -> Option<&'static str> {
    match c {
        '\\' => Some("\\\\"),
        '\n' => Some("\\n"),
        '\r' => Some("\\r"),
        '\t' => Some("\\t"),
        _ => None,
    }
}

impl<const N: usize> Default for BoundedBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for BoundedBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let room = N - self.len;
        let take = if s.len() <= room {
            s.len()
        } else {
            self.truncated = true;
            let mut cut = room;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            cut
        };
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

impl<const N: usize> fmt::Debug for BoundedBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBuf")
            .field("text", &self.as_str())
            .field("capacity", &N)
            .field("truncated", &self.truncated)
            .finish()
    }
}

const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;

    #[test]
    fn fits_without_truncation() {
        let mut buf = BoundedBuf::<16>::new();
        write!(buf, "Tx: {}", 42).unwrap();
        assert_eq!(buf.as_str(), "Tx: 42");
        assert!(!buf.is_truncated());
    }

    #[test]
    fn truncates_at_capacity() {
        let mut buf = BoundedBuf::<4>::new();
        buf.write_str("abcdef").unwrap();
        assert_eq!(buf.as_str(), "abcd");
        assert!(buf.is_truncated());
        buf.write_str("gh").unwrap();
        assert_eq!(buf.as_str(), "abcd");
    }

    #[test]
    fn truncates_on_char_boundary() {
        // 'é' is two bytes; only one byte of room remains after "ab".
        let mut buf = BoundedBuf::<3>::new();
        buf.write_str("abé").unwrap();
        assert_eq!(buf.as_str(), "ab");
        assert!(buf.is_truncated());
    }

    #[test]
    fn stops_after_first_truncation() {
        // A later short write must not land after a gap.
        let mut buf = BoundedBuf::<4>::new();
        buf.write_str("aéé").unwrap();
        assert_eq!(buf.as_str(), "aé");
        buf.write_str("b").unwrap();
        assert_eq!(buf.as_str(), "aé");
        assert!(buf.is_truncated());
    }

    #[test]
    fn terminate_line_with_room() {
        let mut buf = BoundedBuf::<8>::new();
        buf.write_str("abc").unwrap();
        buf.terminate_line();
        assert_eq!(buf.as_str(), "abc\n");
        assert!(!buf.is_truncated());
    }

    #[test]
    fn terminate_line_when_full_evicts_last_char() {
        let mut buf = BoundedBuf::<4>::new();
        buf.write_str("abé").unwrap();
        assert_eq!(buf.len(), 4);
        buf.terminate_line();
        assert_eq!(buf.as_str(), "ab\n");
        assert!(buf.is_truncated());
    }

    #[test]
    fn escapes_line_breaking_characters() {
        let mut buf = BoundedBuf::<32>::new();
        buf.write_escaped("a\nb\tc\r\\d");
        assert_eq!(buf.as_str(), r"a\nb\tc\r\\d");
        assert!(!buf.is_truncated());
    }

    #[test]
    fn escape_pair_is_never_split() {
        let mut buf = BoundedBuf::<4>::new();
        buf.write_escaped("abc\n");
        assert_eq!(buf.as_str(), "abc");
        assert!(buf.is_truncated());
    }

    #[test]
    fn escaped_adapter_escapes_formatted_output() {
        let mut buf = BoundedBuf::<16>::new();
        write!(Escaped(&mut buf), "{}|{}", "x\ny", 7).unwrap();
        assert_eq!(buf.as_str(), r"x\ny|7");
    }

    #[test]
    fn zero_capacity_never_panics() {
        let mut buf = BoundedBuf::<0>::new();
        buf.write_str("x").unwrap();
        buf.terminate_line();
        assert!(buf.is_empty());
        assert!(buf.is_truncated());
    }
}
