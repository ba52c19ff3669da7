//! Delimiter-separated text support for reading and writing tabular data.
//!
//! This module provides a character-level reader and its mirror-image
//! writer, both driven by a [`CsvFormat`](csv_format::CsvFormat) describing
//! the column separator, the (possibly multi-character) line separator, the
//! optional text qualifier and when it is applied.
//!
//! # Module Architecture
//!
//! 1. **CsvFormat**: immutable description of a document's formatting, with
//!    presets for semicolon, comma and tab separated documents.
//!
//! 2. **CsvReader**: forward-only tokenizer producing records as vectors of
//!    field strings, plus typed reads that parse-or-return-`None`.
//!
//! 3. **CsvWriter**: serializer applying the qualification policy to each field.
//!
//! With the `async` feature, `AsyncCsvReader` and `AsyncCsvWriter` provide
//! the same behaviour over tokio streams.
//!
//! # Examples
//!
//! ## Reading
//!
//! ```
//! use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
//! use csv_batch_rs::item::csv::csv_reader::CsvReader;
//!
//! let format = CsvFormatBuilder::new()
//!     .column_separator(',')
//!     .line_separator("\n")
//!     .has_headers(true)
//!     .build()
//!     .unwrap();
//!
//! let data = "\
//! city,country,pop
//! Boston,\"United States, MA\",4628910
//! Concord,United States,42695
//! ";
//!
//! let (mut reader, info) = CsvReader::open(data.as_bytes(), &format).unwrap();
//! assert_eq!(info.headers.unwrap(), vec!["city", "country", "pop"]);
//!
//! let records = reader.read_to_end().collect::<Result<Vec<_>, _>>().unwrap();
//! assert_eq!(records[0], vec!["Boston", "United States, MA", "4628910"]);
//! assert_eq!(records[1][2], "42695");
//! ```
//!
//! ## Writing
//!
//! ```
//! use csv_batch_rs::item::csv::csv_format::{CsvFormatBuilder, TextQualification};
//! use csv_batch_rs::item::csv::csv_writer::CsvWriter;
//!
//! let format = CsvFormatBuilder::new()
//!     .column_separator(',')
//!     .line_separator("\n")
//!     .text_qualification(TextQualification::ForTextFields)
//!     .build()
//!     .unwrap();
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = CsvWriter::new(&mut buffer, &format).unwrap();
//!     writer.write_line(&["Alice\n", "28\n"]).unwrap();
//!     writer.flush().unwrap();
//! }
//!
//! assert_eq!(String::from_utf8(buffer).unwrap(), "\"Alice\n\",28\n\n");
//! ```

/// Formatting rules of a document.
pub mod csv_format;

/// Numeric and date conventions for typed reads.
pub mod culture;

/// A module providing facilities for reading records.
pub mod csv_reader;

/// A module providing facilities for writing records.
pub mod csv_writer;

pub(crate) mod tokenizer;

#[cfg(feature = "async")]
/// Asynchronous reader over tokio streams.
pub mod async_reader;

#[cfg(feature = "async")]
/// Asynchronous writer over tokio streams.
pub mod async_writer;
