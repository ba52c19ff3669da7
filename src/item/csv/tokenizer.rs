use std::io::{self, BufRead, BufReader, ErrorKind, Read};

use crate::item::csv::csv_format::CsvFormat;

/// What the scanner decided to do with one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// Part of the field value.
    Append(char),
    /// A text qualifier; consumed, never part of the value.
    Qualifier,
    /// Column separator outside qualified text: the field is complete.
    EndOfField,
    /// Line separator character outside qualified text: field and line are complete.
    EndOfLine,
    /// The configured end-of-text marker: logical end of input.
    EndOfText,
}

/// Character classifier shared by the blocking and async readers.
///
/// Only the "inside qualified text" flag lives here; line counting and
/// stream exhaustion belong to the reader driving the scan.
#[derive(Debug, Default)]
pub(crate) struct FieldScanner {
    in_qualified_text: bool,
}

impl FieldScanner {
    pub(crate) fn classify(&mut self, c: char, format: &CsvFormat) -> Scan {
        if format.text_qualifier() == Some(c) {
            self.in_qualified_text = !self.in_qualified_text;
            Scan::Qualifier
        } else if self.in_qualified_text {
            Scan::Append(c)
        } else if c == format.column_separator() {
            Scan::EndOfField
        } else if format.is_line_separator(c) {
            Scan::EndOfLine
        } else if format.end_of_text_marker() == Some(c) {
            Scan::EndOfText
        } else {
            Scan::Append(c)
        }
    }

    /// Qualified text never spans fields.
    pub(crate) fn reset(&mut self) {
        self.in_qualified_text = false;
    }
}

/// One UTF-8 encoded character being assembled byte by byte.
pub(crate) struct Utf8Sequence {
    bytes: [u8; 4],
    width: usize,
    len: usize,
}

impl Utf8Sequence {
    pub(crate) fn start(first: u8) -> io::Result<Self> {
        let width = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(invalid_utf8()),
        };
        Ok(Self {
            bytes: [first, 0, 0, 0],
            width,
            len: 1,
        })
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.len == self.width
    }

    /// Appends a continuation byte; running out of input mid-sequence is an error.
    pub(crate) fn push(&mut self, byte: Option<u8>) -> io::Result<()> {
        self.bytes[self.len] = byte.ok_or_else(invalid_utf8)?;
        self.len += 1;
        Ok(())
    }

    pub(crate) fn decode(&self) -> io::Result<char> {
        std::str::from_utf8(&self.bytes[..self.len])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(invalid_utf8)
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

/// Forward-only UTF-8 character source with one character of lookahead.
pub(crate) struct CharSource<R> {
    inner: BufReader<R>,
    peeked: Option<char>,
}

impl<R: Read> CharSource<R> {
    pub(crate) fn new(input: R) -> Self {
        Self {
            inner: BufReader::new(input),
            peeked: None,
        }
    }

    pub(crate) fn is_exhausted(&mut self) -> io::Result<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        Ok(self.inner.fill_buf()?.is_empty())
    }

    pub(crate) fn peek_char(&mut self) -> io::Result<Option<char>> {
        if self.peeked.is_none() {
            self.peeked = self.decode_next()?;
        }
        Ok(self.peeked)
    }

    pub(crate) fn next_char(&mut self) -> io::Result<Option<char>> {
        match self.peeked.take() {
            Some(c) => Ok(Some(c)),
            None => self.decode_next(),
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.inner.fill_buf()?.first() {
            Some(byte) => *byte,
            None => return Ok(None),
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }

    fn decode_next(&mut self) -> io::Result<Option<char>> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let mut sequence = Utf8Sequence::start(first)?;
        while !sequence.is_complete() {
            sequence.push(self.next_byte()?)?;
        }
        sequence.decode().map(Some)
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Asynchronous [`CharSource`] over a tokio stream.
#[cfg(feature = "async")]
pub(crate) struct AsyncCharSource<R> {
    inner: tokio::io::BufReader<R>,
    peeked: Option<char>,
}

#[cfg(feature = "async")]
impl<R: tokio::io::AsyncRead + Unpin> AsyncCharSource<R> {
    pub(crate) fn new(input: R) -> Self {
        Self {
            inner: tokio::io::BufReader::new(input),
            peeked: None,
        }
    }

    pub(crate) async fn is_exhausted(&mut self) -> io::Result<bool> {
        use tokio::io::AsyncBufReadExt;

        if self.peeked.is_some() {
            return Ok(false);
        }
        Ok(self.inner.fill_buf().await?.is_empty())
    }

    pub(crate) async fn peek_char(&mut self) -> io::Result<Option<char>> {
        if self.peeked.is_none() {
            self.peeked = self.decode_next().await?;
        }
        Ok(self.peeked)
    }

    pub(crate) async fn next_char(&mut self) -> io::Result<Option<char>> {
        match self.peeked.take() {
            Some(c) => Ok(Some(c)),
            None => self.decode_next().await,
        }
    }

    async fn next_byte(&mut self) -> io::Result<Option<u8>> {
        use tokio::io::AsyncBufReadExt;

        let byte = match self.inner.fill_buf().await?.first() {
            Some(byte) => *byte,
            None => return Ok(None),
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }

    async fn decode_next(&mut self) -> io::Result<Option<char>> {
        let Some(first) = self.next_byte().await? else {
            return Ok(None);
        };
        let mut sequence = Utf8Sequence::start(first)?;
        while !sequence.is_complete() {
            sequence.push(self.next_byte().await?)?;
        }
        sequence.decode().map(Some)
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}
