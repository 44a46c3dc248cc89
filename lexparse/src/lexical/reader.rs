//! Buffered rune sources.
//!
//! The lexer only needs four operations from its input: read one rune, look
//! ahead without consuming, discard without copying, and a hint of how much is
//! already buffered. [`RuneReader`] provides them over any [`std::io::Read`].

use super::error::LexerError;
use crate::config::compile_time::reader::{COMPACT_THRESHOLD, READ_CHUNK_BYTES};
use std::io::{self, Cursor, Read};

/// Rune source consumed by the lexer.
///
/// Short peeks and discards at end of input must be reported as
/// [`LexerError::ShortPeek`] / [`LexerError::ShortRead`], never silently truncated.
pub trait BufferedRuneReader: Send {
    fn read_rune(&mut self) -> Result<char, LexerError>;

    /// Returns exactly `n` runes without consuming them.
    fn peek(&mut self, n: usize) -> Result<&[char], LexerError>;

    /// Consumes `n` runes, returning how many were dropped.
    fn discard(&mut self, n: usize) -> Result<usize, LexerError>;

    /// Number of runes that can be peeked without touching the byte source.
    fn buffered(&self) -> usize;
}

/// Decodes UTF-8 from a byte source into a lookahead buffer of runes.
///
/// Invalid byte sequences decode to U+FFFD, and sequences split across reads
/// are reassembled.
pub struct RuneReader<R> {
    inner: R,
    runes: Vec<char>,
    start: usize,
    pending: Vec<u8>,
    chunk_size: usize,
    eof: bool,
}

impl<R: Read> RuneReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, READ_CHUNK_BYTES)
    }

    /// Reads at most `chunk_size` bytes from `inner` per fill.
    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            runes: Vec::new(),
            start: 0,
            pending: Vec::new(),
            chunk_size: chunk_size.max(1),
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fills the buffer until `n` runes are available or the source is exhausted.
    fn fill(&mut self, n: usize) -> Result<(), LexerError> {
        if self.start >= COMPACT_THRESHOLD && self.start * 2 >= self.runes.len() {
            self.runes.drain(..self.start);
            self.start = 0;
        }

        let mut chunk = vec![0u8; self.chunk_size];
        while self.runes.len() - self.start < n && !self.eof {
            let read = match self.inner.read(&mut chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if read == 0 {
                self.eof = true;
                if !self.pending.is_empty() {
                    // Truncated sequence at end of input
                    self.pending.clear();
                    self.runes.push(char::REPLACEMENT_CHARACTER);
                }
            } else {
                self.pending.extend_from_slice(&chunk[..read]);
                self.decode_pending();
            }
        }
        Ok(())
    }

    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.runes.extend(text.chars());
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // The prefix was just validated.
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.runes.extend(text.chars());
                    }
                    match e.error_len() {
                        Some(bad) => {
                            self.runes.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence; wait for more bytes.
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn available(&self) -> usize {
        self.runes.len() - self.start
    }
}

impl RuneReader<Cursor<Vec<u8>>> {
    /// Reader over an in-memory string
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.into().into_bytes()))
    }
}

impl<R: Read + Send> BufferedRuneReader for RuneReader<R> {
    fn read_rune(&mut self) -> Result<char, LexerError> {
        self.fill(1)?;
        match self.runes.get(self.start) {
            Some(&rune) => {
                self.start += 1;
                Ok(rune)
            }
            None => Err(LexerError::EndOfInput),
        }
    }

    fn peek(&mut self, n: usize) -> Result<&[char], LexerError> {
        self.fill(n)?;
        let end = self.start + n.min(self.available());
        if end - self.start < n {
            return Err(LexerError::ShortPeek {
                runes: self.runes[self.start..end].to_vec(),
            });
        }
        Ok(&self.runes[self.start..end])
    }

    fn discard(&mut self, n: usize) -> Result<usize, LexerError> {
        self.fill(n)?;
        let dropped = n.min(self.available());
        self.start += dropped;
        if dropped < n {
            return Err(LexerError::ShortRead {
                consumed: dropped,
                requested: n,
            });
        }
        Ok(dropped)
    }

    fn buffered(&self) -> usize {
        self.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_read_rune_until_eof() {
        let mut reader = RuneReader::from_text("hé");
        assert_eq!(reader.read_rune().unwrap(), 'h');
        assert_eq!(reader.read_rune().unwrap(), 'é');
        assert_matches!(reader.read_rune(), Err(LexerError::EndOfInput));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = RuneReader::from_text("Hello");
        assert_eq!(reader.peek(3).unwrap(), &['H', 'e', 'l']);
        assert_eq!(reader.peek(3).unwrap(), &['H', 'e', 'l']);
        assert_eq!(reader.read_rune().unwrap(), 'H');
    }

    #[test]
    fn test_short_peek_reports_available_runes() {
        let mut reader = RuneReader::from_text("Hello\nWorld!");
        let err = reader.peek(16).unwrap_err();
        assert_matches!(err, LexerError::ShortPeek { ref runes } if runes.iter().collect::<String>() == "Hello\nWorld!");
    }

    #[test]
    fn test_short_discard() {
        let mut reader = RuneReader::from_text("abc");
        assert_eq!(reader.discard(2).unwrap(), 2);
        assert_matches!(
            reader.discard(5),
            Err(LexerError::ShortRead {
                consumed: 1,
                requested: 5
            })
        );
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "añb€c😀";
        for chunk in 1..=5 {
            let mut reader = RuneReader::with_chunk_size(text.as_bytes(), chunk);
            let mut decoded = String::new();
            while let Ok(rune) = reader.read_rune() {
                decoded.push(rune);
            }
            assert_eq!(decoded, text, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes: &[u8] = &[b'a', 0xff, b'b', 0xe2, 0x82];
        let mut reader = RuneReader::with_chunk_size(bytes, 2);
        let mut decoded = String::new();
        while let Ok(rune) = reader.read_rune() {
            decoded.push(rune);
        }
        assert_eq!(decoded, "a\u{FFFD}b\u{FFFD}");
    }

    #[test]
    fn test_buffered_hint_grows_after_peek() {
        let mut reader = RuneReader::with_chunk_size("abcdef".as_bytes(), 2);
        assert_eq!(reader.buffered(), 0);
        reader.peek(3).unwrap();
        assert!(reader.buffered() >= 3);
    }

    #[test]
    fn test_io_error_is_propagated() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let mut reader = RuneReader::new(Broken);
        assert_matches!(reader.read_rune(), Err(LexerError::Io(_)));
    }

    #[test]
    fn test_reads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Hello, file").unwrap();

        let mut reader = RuneReader::new(std::fs::File::open(file.path()).unwrap());
        assert_eq!(reader.peek(5).unwrap().iter().collect::<String>(), "Hello");
    }
}
