#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # CSV Batch for Rust

 **CSV Batch for Rust** is a toolkit for reading, writing and processing delimiter-separated
 documents record by record. Formats are fully configurable: any column separator, a
 possibly multi-character line separator, an optional text qualifier and the policy deciding
 when it is written.

 ## Core Concepts

Understanding these core components will help you get started:

- **CsvFormat:** An immutable description of a document: separators, text qualifier, qualification policy, headers and culture.
- **CsvReader:** A forward-only tokenizer turning a character stream into records, with typed reads for booleans, integers, doubles, decimals and dates.
- **CsvWriter:** The mirror image of the reader, qualifying fields according to the format.
- **Handler:** Business logic receiving the document lifecycle, and either one record at a time (`RecordHandler`) or sets of records (`SetHandler`).
- **CsvProcessor:** Drives a whole document through a handler, logging failures to an optional output log and reporting the number of rows processed.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| logger        | Enables a logger handler, useful for dry runs (default)       |
| async         | Enables tokio based reader, writer and `AsyncCsvProcessor`    |
| full          | Enables all available features                                |

 ## Getting Started

```rust
use csv_batch_rs::{
    core::{
        handler::{CsvHandler, HandlerResult, RecordHandler, RecordOutcome},
        processor::CsvProcessor,
    },
    error::BatchError,
    item::csv::csv_format::CsvFormatBuilder,
};

#[derive(Default)]
struct AgeChecker {
    headers: Vec<String>,
}

impl CsvHandler for AgeChecker {
    fn begin_processing(&mut self, _document_name: &str, headers: Option<&[String]>) {
        self.headers = headers.map(<[String]>::to_vec).unwrap_or_default();
    }

    fn end_processing(&mut self) {}
}

impl RecordHandler for AgeChecker {
    fn process_record(&mut self, _record_number: usize, fields: &[String]) -> HandlerResult<RecordOutcome> {
        let age: u32 = fields[1].parse()?;
        if age < 150 {
            Ok(RecordOutcome::success())
        } else {
            Ok(RecordOutcome::failure(format!("{} is too old", fields[0])))
        }
    }
}

fn main() -> Result<(), BatchError> {
    let csv = "name,age
Alice,28
Bob,twelve
Methuselah,969";

    let format = CsvFormatBuilder::new()
        .column_separator(',')
        .line_separator("\n")
        .has_headers(true)
        .build()?;

    let mut handler = AgeChecker::default();
    let result = CsvProcessor::record_wise(&mut handler).process_csv("people", csv, &format, 0, 0)?;

    assert_eq!(result.rows_processed, 4);
    assert_eq!(handler.headers, vec!["name", "age"]);

    let log: Vec<&str> = result.output.lines().collect();
    assert_eq!(log[0], "3: Error: invalid digit found in string");
    assert!(log[1].starts_with("4: Methuselah is too old."));
    assert!(log[2].starts_with("Finished processing people, did 4 records in"));

    Ok(())
}
```

## Examples
+ [Process a CSV string with the logger handler](demos/process_csv_string.rs)

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 */

/// Core module: handlers, record sets and the document processor
pub mod core;

/// Error types for reading, writing and processing
pub mod error;

#[doc(inline)]
pub use error::*;

/// Readers, writers and handlers for delimiter-separated documents
pub mod item;
