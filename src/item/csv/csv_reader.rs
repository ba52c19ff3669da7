use std::io::Read;

use chrono::NaiveDateTime;
use log::debug;

use crate::{
    error::BatchError,
    item::csv::{
        csv_format::CsvFormat,
        culture::Decimal,
        tokenizer::{CharSource, FieldScanner, Scan},
    },
};

/// Facts discovered while opening a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// First record of the document when the format declares headers.
    pub headers: Option<Vec<String>>,
}

/// A forward-only, character-level reader for delimiter-separated documents.
///
/// The reader scans its input one character at a time. A text qualifier
/// toggles "qualified text", inside which separators are ordinary characters.
/// Any run of line separator characters ends the current line, so a
/// multi-character terminator such as `\r\n` is consumed as a whole and blank
/// lines made only of separator characters are skipped.
///
/// # Examples
///
/// ```
/// use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
/// use csv_batch_rs::item::csv::csv_reader::CsvReader;
///
/// let format = CsvFormatBuilder::new()
///     .line_separator("\n")
///     .has_headers(true)
///     .build()
///     .unwrap();
///
/// let (mut reader, info) = CsvReader::open("city;pop\nBoston;4628910".as_bytes(), &format).unwrap();
/// assert_eq!(info.headers, Some(vec!["city".to_string(), "pop".to_string()]));
///
/// let line = reader.read_line().unwrap();
/// assert_eq!(line, vec!["Boston", "4628910"]);
/// assert_eq!(reader.line_position(), 2);
/// ```
pub struct CsvReader<R> {
    format: CsvFormat,
    source: CharSource<R>,
    scanner: FieldScanner,
    line_position: usize,
    end_of_stream: bool,
    headers: Option<Vec<String>>,
}

impl<R: Read> CsvReader<R> {
    /// Opens a document. When the format declares headers, the first line is
    /// read here and returned in the [`DocumentInfo`].
    pub fn open(input: R, format: &CsvFormat) -> Result<(Self, DocumentInfo), BatchError> {
        let mut reader = CsvReader {
            format: format.clone(),
            source: CharSource::new(input),
            scanner: FieldScanner::default(),
            line_position: 0,
            end_of_stream: false,
            headers: None,
        };

        if format.has_headers() {
            let headers = reader.read_line()?;
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

    /// Zero-based number of lines completed so far, header line included.
    pub fn line_position(&self) -> usize {
        self.line_position
    }

    /// Returns true once the input is exhausted or the end-of-text marker
    /// has been reached.
    pub fn is_end_of_stream(&mut self) -> Result<bool, BatchError> {
        if self.end_of_stream {
            return Ok(true);
        }
        if let Some(marker) = self.format.end_of_text_marker() {
            if self.source.peek_char()? == Some(marker) {
                self.source.next_char()?;
                self.end_of_stream = true;
                return Ok(true);
            }
        }
        Ok(self.source.is_exhausted()?)
    }

    /// Reads the next field, without qualifiers or separators.
    ///
    /// Returns `Ok(None)` only when called at end of stream; an empty field
    /// is `Some("")`.
    pub fn read_field(&mut self) -> Result<Option<String>, BatchError> {
        if self.is_end_of_stream()? {
            return Ok(None);
        }

        let mut field = String::new();
        let mut found_line_separator = false;
        self.scanner.reset();

        while let Some(c) = self.source.next_char()? {
            match self.scanner.classify(c, &self.format) {
                Scan::Qualifier => {}
                Scan::EndOfField => break,
                Scan::EndOfLine => {
                    self.skip_line_separators()?;
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

        // an unterminated last line still counts as a line
        if !found_line_separator && self.is_end_of_stream()? {
            self.line_position += 1;
        }

        Ok(Some(field))
    }

    fn skip_line_separators(&mut self) -> Result<(), BatchError> {
        while let Some(c) = self.source.peek_char()? {
            if !self.format.is_line_separator(c) {
                break;
            }
            self.source.next_char()?;
        }
        Ok(())
    }

    /// Reads the fields of exactly one logical line.
    pub fn read_line(&mut self) -> Result<Vec<String>, BatchError> {
        let line_to_read = self.line_position;
        let mut fields = Vec::new();

        while self.line_position == line_to_read && !self.is_end_of_stream()? {
            if let Some(field) = self.read_field()? {
                fields.push(field);
            }
        }

        Ok(fields)
    }

    /// Lazily reads every remaining line. The sequence is single pass.
    pub fn read_to_end(&mut self) -> Lines<'_, R> {
        Lines {
            reader: self,
            failed: false,
        }
    }

    /// Reads one line and maps it with `mapper(headers, fields)`.
    ///
    /// ```
    /// use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
    /// use csv_batch_rs::item::csv::csv_reader::CsvReader;
    ///
    /// struct City { name: String, pop: Option<u32> }
    ///
    /// let format = CsvFormatBuilder::new().line_separator("\n").has_headers(true).build().unwrap();
    /// let (mut reader, _) = CsvReader::open("name;pop\nConcord;42695".as_bytes(), &format).unwrap();
    ///
    /// let city = reader
    ///     .read_line_with(|_headers, fields| City {
    ///         name: fields[0].clone(),
    ///         pop: fields.get(1).and_then(|p| p.parse().ok()),
    ///     })
    ///     .unwrap();
    /// assert_eq!(city.name, "Concord");
    /// assert_eq!(city.pop, Some(42695));
    /// ```
    pub fn read_line_with<T, F>(&mut self, mapper: F) -> Result<T, BatchError>
    where
        F: FnOnce(Option<&[String]>, Vec<String>) -> T,
    {
        let fields = self.read_line()?;
        Ok(mapper(self.headers.as_deref(), fields))
    }

    /// Lazily maps every remaining line with `mapper(headers, fields)`.
    pub fn read_to_end_with<T, F>(
        &mut self,
        mut mapper: F,
    ) -> impl Iterator<Item = Result<T, BatchError>>
    where
        F: FnMut(Option<&[String]>, Vec<String>) -> T,
    {
        let headers = self.headers.clone();
        self.read_to_end()
            .map(move |line| line.map(|fields| mapper(headers.as_deref(), fields)))
    }

    /// Reads the next field as a boolean, `None` if it is not one.
    pub fn read_as_boolean(&mut self) -> Result<Option<bool>, BatchError> {
        let value = self.read_field()?;
        Ok(value.and_then(|v| self.format.culture().parse_boolean(&v)))
    }

    /// Reads the next field as an `i32`, `None` if it is not one.
    pub fn read_as_int32(&mut self) -> Result<Option<i32>, BatchError> {
        let value = self.read_field()?;
        Ok(value.and_then(|v| self.format.culture().parse_int32(&v)))
    }

    /// Reads the next field as an `f64`, `None` if it is not one.
    pub fn read_as_double(&mut self) -> Result<Option<f64>, BatchError> {
        let value = self.read_field()?;
        Ok(value.and_then(|v| self.format.culture().parse_double(&v)))
    }

    /// Reads the next field as an exact decimal, `None` if it is not one.
    pub fn read_as_decimal(&mut self) -> Result<Option<Decimal>, BatchError> {
        let value = self.read_field()?;
        Ok(value.and_then(|v| self.format.culture().parse_decimal(&v)))
    }

    /// Reads the next field as a date and time, `None` if it is not one.
    pub fn read_as_datetime(&mut self) -> Result<Option<NaiveDateTime>, BatchError> {
        let value = self.read_field()?;
        Ok(value.and_then(|v| self.format.culture().parse_datetime(&v)))
    }

    /// Releases the underlying stream.
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}

/// Iterator over the remaining lines of a [`CsvReader`].
pub struct Lines<'r, R> {
    reader: &'r mut CsvReader<R>,
    failed: bool,
}

impl<R: Read> Iterator for Lines<'_, R> {
    type Item = Result<Vec<String>, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.is_end_of_stream() {
            Ok(true) => None,
            Ok(false) => {
                let line = self.reader.read_line();
                self.failed = line.is_err();
                Some(line)
            }
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use chrono::NaiveDate;

    use crate::item::csv::{
        csv_format::{CsvFormat, CsvFormatBuilder},
        culture::Decimal,
    };

    use super::CsvReader;

    fn semicolon_lf(has_headers: bool) -> CsvFormat {
        CsvFormatBuilder::new()
            .line_separator("\n")
            .has_headers(has_headers)
            .build()
            .unwrap()
    }

    #[test]
    fn read_line_splits_lines_and_counts_them() -> Result<(), Box<dyn Error>> {
        let (mut reader, info) = CsvReader::open("a;b\nc;d".as_bytes(), &semicolon_lf(false))?;
        assert_eq!(info.headers, None);

        assert_eq!(reader.read_line()?, vec!["a", "b"]);
        assert_eq!(reader.line_position(), 1);
        assert_eq!(reader.read_line()?, vec!["c", "d"]);
        assert_eq!(reader.line_position(), 2);
        assert!(reader.is_end_of_stream()?);
        assert!(reader.read_line()?.is_empty());

        Ok(())
    }

    #[test]
    fn qualified_text_keeps_separators() -> Result<(), Box<dyn Error>> {
        let input = "\"a;b\";\"line\nbreak\";plain\n";
        let (mut reader, _) = CsvReader::open(input.as_bytes(), &semicolon_lf(false))?;

        assert_eq!(reader.read_line()?, vec!["a;b", "line\nbreak", "plain"]);
        assert_eq!(reader.line_position(), 1);
        assert!(reader.is_end_of_stream()?);

        Ok(())
    }

    #[test]
    fn multi_character_line_separator_is_consumed_whole() -> Result<(), Box<dyn Error>> {
        let format = CsvFormatBuilder::new()
            .line_separator("\r\n")
            .build()
            .unwrap();
        let (mut reader, _) = CsvReader::open("1;2\r\n3;4\r\n".as_bytes(), &format)?;

        let lines = reader.read_to_end().collect::<Result<Vec<_>, _>>()?;
        assert_eq!(lines, vec![vec!["1", "2"], vec!["3", "4"]]);

        Ok(())
    }

    #[test]
    fn blank_lines_are_swallowed() -> Result<(), Box<dyn Error>> {
        let (mut reader, _) = CsvReader::open("a\n\n\nb".as_bytes(), &semicolon_lf(false))?;

        assert_eq!(reader.read_line()?, vec!["a"]);
        assert_eq!(reader.read_line()?, vec!["b"]);
        assert_eq!(reader.line_position(), 2);

        Ok(())
    }

    #[test]
    fn empty_fields_are_empty_strings() -> Result<(), Box<dyn Error>> {
        let (mut reader, _) = CsvReader::open(";x;\ny".as_bytes(), &semicolon_lf(false))?;

        assert_eq!(reader.read_line()?, vec!["", "x", ""]);
        assert_eq!(reader.read_line()?, vec!["y"]);

        Ok(())
    }

    #[test]
    fn read_field_at_end_of_stream_returns_none() -> Result<(), Box<dyn Error>> {
        let (mut reader, _) = CsvReader::open("".as_bytes(), &semicolon_lf(false))?;

        assert!(reader.read_field()?.is_none());
        assert_eq!(reader.line_position(), 0);

        Ok(())
    }

    #[test]
    fn open_extracts_headers() -> Result<(), Box<dyn Error>> {
        let format = CsvFormatBuilder::new()
            .line_separator("\r\n")
            .has_headers(true)
            .build()
            .unwrap();
        let (reader, info) = CsvReader::open("Header1;Header2;Header3\r\n".as_bytes(), &format)?;

        assert_eq!(
            info.headers,
            Some(vec![
                "Header1".to_string(),
                "Header2".to_string(),
                "Header3".to_string()
            ])
        );
        assert_eq!(reader.line_position(), 1);
        // the caller's format is left untouched
        assert!(format.headers().is_none());

        Ok(())
    }

    #[test]
    fn typed_reads_parse_or_return_none() -> Result<(), Box<dyn Error>> {
        let input = "1;2.222;3.333;2004-04-04 04:44:44;true;abc";
        let (mut reader, _) = CsvReader::open(input.as_bytes(), &semicolon_lf(false))?;

        assert_eq!(reader.read_as_int32()?, Some(1));
        assert_eq!(reader.read_as_double()?, Some(2.222));
        assert_eq!(reader.read_as_decimal()?, Some(Decimal::new(3333, 3)));
        assert_eq!(
            reader.read_as_datetime()?,
            NaiveDate::from_ymd_opt(2004, 4, 4).and_then(|d| d.and_hms_opt(4, 44, 44))
        );
        assert_eq!(reader.read_as_boolean()?, Some(true));
        assert_eq!(reader.read_as_int32()?, None);
        assert_eq!(reader.read_as_int32()?, None);

        Ok(())
    }

    #[test]
    fn end_of_text_marker_stops_reading() -> Result<(), Box<dyn Error>> {
        let format = CsvFormatBuilder::new()
            .line_separator("\n")
            .end_of_text_marker(Some('\u{3}'))
            .build()
            .unwrap();
        let input = "OneOne;OneTwo\nTwoOne;TwoTwo\u{3}garbage";
        let (mut reader, _) = CsvReader::open(input.as_bytes(), &format)?;

        let lines = reader.read_to_end().collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            lines,
            vec![vec!["OneOne", "OneTwo"], vec!["TwoOne", "TwoTwo"]]
        );
        assert_eq!(reader.line_position(), 2);

        Ok(())
    }

    #[test]
    fn end_of_text_marker_after_line_separator_adds_no_line() -> Result<(), Box<dyn Error>> {
        let format = CsvFormatBuilder::new()
            .line_separator("\n")
            .end_of_text_marker(Some('\u{3}'))
            .build()
            .unwrap();
        let (mut reader, _) = CsvReader::open("1;2;3;4\n1;2;3;4\n\u{3}".as_bytes(), &format)?;

        assert_eq!(reader.read_to_end().count(), 2);
        assert_eq!(reader.line_position(), 2);

        Ok(())
    }

    #[test]
    fn read_to_end_with_maps_through_headers() -> Result<(), Box<dyn Error>> {
        let input = "id;name\n1;Alice\n2;Bob";
        let (mut reader, _) = CsvReader::open(input.as_bytes(), &semicolon_lf(true))?;

        let names = reader
            .read_to_end_with(|headers, fields| {
                let column = headers
                    .and_then(|h| h.iter().position(|name| name == "name"))
                    .unwrap_or(0);
                fields[column].clone()
            })
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(names, vec!["Alice", "Bob"]);

        Ok(())
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let input: &[u8] = &[b'a', b';', 0xFF, b'\n'];
        let (mut reader, _) = CsvReader::open(input, &semicolon_lf(false)).unwrap();

        assert!(reader.read_line().is_err());
    }
}
