use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::{BatchError, item::csv::csv_format::CsvFormat};

/// Asynchronous counterpart of [`CsvWriter`](super::csv_writer::CsvWriter).
pub struct AsyncCsvWriter<W> {
    format: CsvFormat,
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> AsyncCsvWriter<W> {
    /// Creates a writer, writing the header row first when the format
    /// declares headers.
    pub async fn new(target: W, format: &CsvFormat) -> Result<Self, BatchError> {
        let mut writer = AsyncCsvWriter {
            format: format.clone(),
            stream: BufWriter::new(target),
        };

        if format.has_headers() {
            let headers = format.headers().ok_or(BatchError::MissingHeaders)?;
            writer.write_line(headers).await?;
        }

        Ok(writer)
    }

    pub async fn write_field(&mut self, value: Option<&str>) -> Result<(), BatchError> {
        let Some(value) = value else {
            return Ok(());
        };
        let escaped = self.format.escape(value);
        self.stream.write_all(escaped.as_bytes()).await?;
        Ok(())
    }

    pub async fn write_column_separator(&mut self) -> Result<(), BatchError> {
        let mut buffer = [0; 4];
        let separator = self.format.column_separator().encode_utf8(&mut buffer);
        self.stream.write_all(separator.as_bytes()).await?;
        Ok(())
    }

    pub async fn write_line_separator(&mut self) -> Result<(), BatchError> {
        self.stream
            .write_all(self.format.line_separator().as_bytes())
            .await?;
        Ok(())
    }

    pub async fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), BatchError> {
        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                self.write_column_separator().await?;
            }
            self.write_field(Some(field.as_ref())).await?;
        }
        self.write_line_separator().await
    }

    pub async fn flush(&mut self) -> Result<(), BatchError> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Flushes, shuts the stream down and releases it.
    pub async fn close(mut self) -> Result<W, BatchError> {
        self.stream.shutdown().await?;
        Ok(self.stream.into_inner())
    }
}
