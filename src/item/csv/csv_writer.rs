use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{BatchError, item::csv::csv_format::CsvFormat};

/// Forward-only writer producing a delimiter-separated document.
///
/// Fields are escaped with [`CsvFormat`]'s qualification policy. Qualifier
/// characters inside values are stripped (replaced by `'\0'`), not escaped.
///
/// # Examples
///
/// ```
/// use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
/// use csv_batch_rs::item::csv::csv_writer::CsvWriter;
///
/// let format = CsvFormatBuilder::new()
///     .column_separator(',')
///     .line_separator("\n")
///     .has_headers(true)
///     .headers(["city", "pop"])
///     .build()
///     .unwrap();
///
/// let mut writer = CsvWriter::new(vec![], &format).unwrap();
/// writer.write_line(&["Boston, MA", "4628910\n"]).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "\"city\",\"pop\"\n\"Boston, MA\",4628910\n\n");
/// ```
pub struct CsvWriter<W: Write> {
    format: CsvFormat,
    stream: BufWriter<W>,
}

impl<W: Write> CsvWriter<W> {
    /// Creates a writer. When the format declares headers, they are written
    /// immediately and must have been provided on the format.
    pub fn new(target: W, format: &CsvFormat) -> Result<Self, BatchError> {
        let mut writer = CsvWriter {
            format: format.clone(),
            stream: BufWriter::new(target),
        };

        if format.has_headers() {
            let headers = format.headers().ok_or(BatchError::MissingHeaders)?;
            writer.write_line(headers)?;
        }

        Ok(writer)
    }

    pub fn format(&self) -> &CsvFormat {
        &self.format
    }

    /// Writes one field. A missing value is written as an empty field.
    pub fn write_field(&mut self, value: Option<&str>) -> Result<(), BatchError> {
        let Some(value) = value else {
            return Ok(());
        };
        let escaped = self.format.escape(value);
        self.stream.write_all(escaped.as_bytes())?;
        Ok(())
    }

    pub fn write_column_separator(&mut self) -> Result<(), BatchError> {
        let mut buffer = [0; 4];
        let separator = self.format.column_separator().encode_utf8(&mut buffer);
        self.stream.write_all(separator.as_bytes())?;
        Ok(())
    }

    pub fn write_line_separator(&mut self) -> Result<(), BatchError> {
        self.stream
            .write_all(self.format.line_separator().as_bytes())?;
        Ok(())
    }

    /// Writes the fields separated by the column separator, then a line separator.
    pub fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), BatchError> {
        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                self.write_column_separator()?;
            }
            self.write_field(Some(field.as_ref()))?;
        }
        self.write_line_separator()
    }

    /// Like [`write_line`](Self::write_line), for records with missing values.
    pub fn write_optional_line(&mut self, fields: &[Option<String>]) -> Result<(), BatchError> {
        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                self.write_column_separator()?;
            }
            self.write_field(field.as_deref())?;
        }
        self.write_line_separator()
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// Note that this also flushes the underlying writer.
    pub fn flush(&mut self) -> Result<(), BatchError> {
        self.stream.flush()?;
        Ok(())
    }

    /// Flushes and releases the underlying writer.
    pub fn into_inner(self) -> Result<W, BatchError> {
        self.stream
            .into_inner()
            .map_err(|error| BatchError::Io(error.into_error()))
    }
}

impl CsvWriter<File> {
    /// Creates (or truncates) the file at `path` and writes to it.
    pub fn from_path<P: AsRef<Path>>(path: P, format: &CsvFormat) -> Result<Self, BatchError> {
        let file = File::create(path)?;
        CsvWriter::new(file, format)
    }
}
