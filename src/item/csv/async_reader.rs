use chrono::NaiveDateTime;
use log::debug;
use rust_decimal::Decimal;
use tokio::io::AsyncRead;

use crate::{
    error::BatchError,
    item::csv::{
        csv_format::CsvFormat,
        csv_reader::DocumentInfo,
        tokenizer::{AsyncCharSource, FieldScanner, Scan},
    },
};

/// Asynchronous counterpart of [`CsvReader`](super::csv_reader::CsvReader).
///
/// Scanning rules are identical; the reader only suspends while waiting
/// for the underlying stream, never in the middle of a field decision.
pub struct AsyncCsvReader<R> {
    format: CsvFormat,
    source: AsyncCharSource<R>,
    scanner: FieldScanner,
    line_position: usize,
    end_of_stream: bool,
    headers: Option<Vec<String>>,
}

impl<R: AsyncRead + Unpin> AsyncCsvReader<R> {
    pub async fn open(input: R, format: &CsvFormat) -> Result<(Self, DocumentInfo), BatchError> {
        let mut reader = AsyncCsvReader {
            format: format.clone(),
            source: AsyncCharSource::new(input),
            scanner: FieldScanner::default(),
            line_position: 0,
            end_of_stream: false,
            headers: None,
        };

        if format.has_headers() {
            let headers = reader.read_line().await?;
            debug!("Headers read: {:?}", headers);
            reader.headers = Some(headers);
        }

        let info = DocumentInfo {
            headers: reader.headers.clone(),
        };
        Ok((reader, info))
    }

    pub fn format(&self) -> &CsvFormat {
        &self.format
    }

    pub fn line_position(&self) -> usize {
        self.line_position
    }

    pub async fn is_end_of_stream(&mut self) -> Result<bool, BatchError> {
        if self.end_of_stream {
            return Ok(true);
        }
        if let Some(marker) = self.format.end_of_text_marker() {
            if self.source.peek_char().await? == Some(marker) {
                self.source.next_char().await?;
                self.end_of_stream = true;
                return Ok(true);
            }
        }
        Ok(self.source.is_exhausted().await?)
    }

    pub async fn read_field(&mut self) -> Result<Option<String>, BatchError> {
        if self.is_end_of_stream().await? {
            return Ok(None);
        }

        let mut field = String::new();
        let mut found_line_separator = false;
        self.scanner.reset();

        while let Some(c) = self.source.next_char().await? {
            match self.scanner.classify(c, &self.format) {
                Scan::Qualifier => {}
                Scan::EndOfField => break,
                Scan::EndOfLine => {
                    while let Some(next) = self.source.peek_char().await? {
                        if !self.format.is_line_separator(next) {
                            break;
                        }
                        self.source.next_char().await?;
                    }
                    self.line_position += 1;
                    found_line_separator = true;
                    break;
                }
                Scan::EndOfText => {
                    self.end_of_stream = true;
                    break;
                }
                Scan::Append(c) => field.push(c),
            }
        }

        self.scanner.reset();

        if !found_line_separator && self.is_end_of_stream().await? {
            self.line_position += 1;
        }

        Ok(Some(field))
    }

    pub async fn read_line(&mut self) -> Result<Vec<String>, BatchError> {
        let line_to_read = self.line_position;
        let mut fields = Vec::new();

        while self.line_position == line_to_read && !self.is_end_of_stream().await? {
            if let Some(field) = self.read_field().await? {
                fields.push(field);
            }
        }

        Ok(fields)
    }

    /// Lazily reads every remaining line, one per call to
    /// [`AsyncLines::next_line`]. The sequence is single pass.
    pub fn read_to_end(&mut self) -> AsyncLines<'_, R> {
        AsyncLines {
            reader: self,
            failed: false,
        }
    }

    pub async fn read_line_with<T, F>(&mut self, mapper: F) -> Result<T, BatchError>
    where
        F: FnOnce(Option<&[String]>, Vec<String>) -> T,
    {
        let fields = self.read_line().await?;
        Ok(mapper(self.headers.as_deref(), fields))
    }

    /// Lazily maps every remaining line with `mapper(headers, fields)`.
    pub fn read_to_end_with<T, F>(&mut self, mapper: F) -> AsyncMappedLines<'_, R, F>
    where
        F: FnMut(Option<&[String]>, Vec<String>) -> T,
    {
        AsyncMappedLines {
            headers: self.headers.clone(),
            lines: self.read_to_end(),
            mapper,
        }
    }

    pub async fn read_as_boolean(&mut self) -> Result<Option<bool>, BatchError> {
        let value = self.read_field().await?;
        Ok(value.and_then(|v| self.format.culture().parse_boolean(&v)))
    }

    pub async fn read_as_int32(&mut self) -> Result<Option<i32>, BatchError> {
        let value = self.read_field().await?;
        Ok(value.and_then(|v| self.format.culture().parse_int32(&v)))
    }

    pub async fn read_as_double(&mut self) -> Result<Option<f64>, BatchError> {
        let value = self.read_field().await?;
        Ok(value.and_then(|v| self.format.culture().parse_double(&v)))
    }

    pub async fn read_as_decimal(&mut self) -> Result<Option<Decimal>, BatchError> {
        let value = self.read_field().await?;
        Ok(value.and_then(|v| self.format.culture().parse_decimal(&v)))
    }

    pub async fn read_as_datetime(&mut self) -> Result<Option<NaiveDateTime>, BatchError> {
        let value = self.read_field().await?;
        Ok(value.and_then(|v| self.format.culture().parse_datetime(&v)))
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}

/// Lines of an [`AsyncCsvReader`], read on demand.
pub struct AsyncLines<'r, R> {
    reader: &'r mut AsyncCsvReader<R>,
    failed: bool,
}

impl<R: AsyncRead + Unpin> AsyncLines<'_, R> {
    /// Reads the next line, `Ok(None)` once the document is exhausted.
    /// After an error the sequence ends.
    pub async fn next_line(&mut self) -> Result<Option<Vec<String>>, BatchError> {
        if self.failed {
            return Ok(None);
        }
        let result = self.read_next().await;
        self.failed = result.is_err();
        result
    }

    async fn read_next(&mut self) -> Result<Option<Vec<String>>, BatchError> {
        if self.reader.is_end_of_stream().await? {
            return Ok(None);
        }
        self.reader.read_line().await.map(Some)
    }
}

/// Lines of an [`AsyncCsvReader`] mapped through a caller-supplied function.
pub struct AsyncMappedLines<'r, R, F> {
    headers: Option<Vec<String>>,
    lines: AsyncLines<'r, R>,
    mapper: F,
}

impl<R, F, T> AsyncMappedLines<'_, R, F>
where
    R: AsyncRead + Unpin,
    F: FnMut(Option<&[String]>, Vec<String>) -> T,
{
    pub async fn next_record(&mut self) -> Result<Option<T>, BatchError> {
        let Some(fields) = self.lines.next_line().await? else {
            return Ok(None);
        };
        Ok(Some((self.mapper)(self.headers.as_deref(), fields)))
    }
}
