use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{BatchError, item::csv::culture::Culture};

/// Line separator of the running platform.
#[cfg(windows)]
pub const PLATFORM_NEWLINE: &str = "\r\n";
/// Line separator of the running platform.
#[cfg(not(windows))]
pub const PLATFORM_NEWLINE: &str = "\n";

/// Indicates when the text qualifier is applied when writing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextQualification {
    /// Text qualifiers are applied when the field contains separators.
    #[default]
    OnlyWhenNecessary,
    /// Text qualifiers are applied when the field contains text or separators.
    ForTextFields,
    /// Text qualifiers are applied to every field.
    ForAllFields,
}

/// Describes the formatting rules of a delimiter-separated document.
///
/// A format is immutable once built. Headers discovered while reading a
/// document are returned by the reader in a [`DocumentInfo`](super::csv_reader::DocumentInfo)
/// and never written back into the format; `headers` only carries the
/// header row a writer must emit.
///
/// # Examples
///
/// ```
/// use csv_batch_rs::item::csv::csv_format::{CsvFormat, CsvFormatBuilder, TextQualification};
///
/// let tsv = CsvFormat::tsv(true);
/// assert_eq!(tsv.column_separator(), '\t');
///
/// let pipes = CsvFormatBuilder::new()
///     .column_separator('|')
///     .line_separator("\r\n")
///     .text_qualification(TextQualification::ForAllFields)
///     .build()
///     .unwrap();
/// assert!(pipes.contains_separators("a|b"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFormat {
    column_separator: char,
    line_separator: String,
    #[serde(default)]
    text_qualifier: Option<char>,
    #[serde(default)]
    text_qualification: TextQualification,
    #[serde(default)]
    has_headers: bool,
    #[serde(default)]
    headers: Option<Vec<String>>,
    #[serde(default)]
    culture: Culture,
    #[serde(default)]
    end_of_text_marker: Option<char>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self::default_format(true)
    }
}

impl CsvFormat {
    fn preset(column_separator: char, has_headers: bool) -> Self {
        Self {
            column_separator,
            line_separator: PLATFORM_NEWLINE.to_string(),
            text_qualifier: Some('"'),
            text_qualification: TextQualification::OnlyWhenNecessary,
            has_headers,
            headers: None,
            culture: Culture::invariant(),
            end_of_text_marker: None,
        }
    }

    /// Semicolon separated values, platform newline, `"` qualifier.
    pub fn default_format(has_headers: bool) -> Self {
        Self::preset(';', has_headers)
    }

    /// Comma separated values, platform newline, `"` qualifier.
    pub fn csv(has_headers: bool) -> Self {
        Self::preset(',', has_headers)
    }

    /// Tab separated values, platform newline, `"` qualifier.
    pub fn tsv(has_headers: bool) -> Self {
        Self::preset('\t', has_headers)
    }

    /// Loads and validates a format from its JSON description.
    ///
    /// ```
    /// use csv_batch_rs::item::csv::csv_format::CsvFormat;
    ///
    /// let format = CsvFormat::from_json(r#"{"column_separator": ",", "line_separator": "\n"}"#).unwrap();
    /// assert_eq!(format.column_separator(), ',');
    /// assert_eq!(format.text_qualifier(), None);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        let format: CsvFormat = serde_json::from_str(json)?;
        format.validate()?;
        Ok(format)
    }

    pub fn column_separator(&self) -> char {
        self.column_separator
    }

    pub fn line_separator(&self) -> &str {
        &self.line_separator
    }

    pub fn text_qualifier(&self) -> Option<char> {
        self.text_qualifier
    }

    pub fn text_qualification(&self) -> TextQualification {
        self.text_qualification
    }

    pub fn has_headers(&self) -> bool {
        self.has_headers
    }

    /// Header row a writer emits when `has_headers` is set.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn end_of_text_marker(&self) -> Option<char> {
        self.end_of_text_marker
    }

    /// Returns a copy of this format carrying the given header row.
    pub fn with_headers<I, S>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: Some(headers.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    pub(crate) fn is_line_separator(&self, c: char) -> bool {
        self.line_separator.contains(c)
    }

    /// Returns true if `input` contains the column separator, or contains
    /// none of the line separator characters.
    ///
    /// The second condition over-approximates: a value that does not
    /// visibly carry a line separator character is still reported, so the
    /// `OnlyWhenNecessary` policy qualifies it. Empty input is never reported.
    pub fn contains_separators(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }
        input.contains(self.column_separator) || !input.chars().any(|c| self.is_line_separator(c))
    }

    /// Returns true if the trimmed `input` contains a letter or whitespace.
    pub fn contains_text(input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return false;
        }
        trimmed
            .chars()
            .any(|c| c.is_alphabetic() || c.is_whitespace())
    }

    /// Applies the qualification policy to a raw field value.
    ///
    /// Qualifier characters inside the value are replaced by `'\0'`: they are
    /// removed, not escaped, so such values do not round-trip.
    pub(crate) fn escape<'v>(&self, value: &'v str) -> Cow<'v, str> {
        let Some(qualifier) = self.text_qualifier else {
            return Cow::Borrowed(value);
        };

        let stripped: Cow<'v, str> = if value.contains(qualifier) {
            Cow::Owned(value.replace(qualifier, "\0"))
        } else {
            Cow::Borrowed(value)
        };

        let qualify = match self.text_qualification {
            TextQualification::ForAllFields => true,
            TextQualification::OnlyWhenNecessary => self.contains_separators(&stripped),
            TextQualification::ForTextFields => {
                Self::contains_text(&stripped) || self.contains_separators(&stripped)
            }
        };

        if qualify {
            Cow::Owned(format!("{qualifier}{stripped}{qualifier}"))
        } else {
            stripped
        }
    }

    fn validate(&self) -> Result<(), BatchError> {
        if self.line_separator.is_empty() {
            return Err(BatchError::InvalidFormat(
                "line separator must contain at least one character".to_string(),
            ));
        }
        if self.is_line_separator(self.column_separator) {
            return Err(BatchError::InvalidFormat(format!(
                "column separator {:?} is also a line separator character",
                self.column_separator
            )));
        }
        if let Some(qualifier) = self.text_qualifier {
            if qualifier == self.column_separator || self.is_line_separator(qualifier) {
                return Err(BatchError::InvalidFormat(format!(
                    "text qualifier {:?} collides with a separator",
                    qualifier
                )));
            }
        }
        if let Some(marker) = self.end_of_text_marker {
            if marker == self.column_separator
                || self.is_line_separator(marker)
                || Some(marker) == self.text_qualifier
            {
                return Err(BatchError::InvalidFormat(format!(
                    "end-of-text marker {:?} collides with a separator or the qualifier",
                    marker
                )));
            }
        }
        Ok(())
    }
}

/// Fluent builder for a [`CsvFormat`], starting from the semicolon preset
/// without headers.
#[derive(Debug, Clone)]
pub struct CsvFormatBuilder {
    format: CsvFormat,
}

impl Default for CsvFormatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatBuilder {
    pub fn new() -> Self {
        Self {
            format: CsvFormat::default_format(false),
        }
    }

    /// Starts from an existing format.
    pub fn from_format(format: &CsvFormat) -> Self {
        Self {
            format: format.clone(),
        }
    }

    pub fn column_separator(mut self, column_separator: char) -> Self {
        self.format.column_separator = column_separator;
        self
    }

    pub fn line_separator(mut self, line_separator: impl Into<String>) -> Self {
        self.format.line_separator = line_separator.into();
        self
    }

    pub fn text_qualifier(mut self, text_qualifier: Option<char>) -> Self {
        self.format.text_qualifier = text_qualifier;
        self
    }

    pub fn text_qualification(mut self, text_qualification: TextQualification) -> Self {
        self.format.text_qualification = text_qualification;
        self
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.format.has_headers = yes;
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    pub fn culture(mut self, culture: Culture) -> Self {
        self.format.culture = culture;
        self
    }

    /// Character announcing logical end of input for bounded sources.
    /// It is only honoured outside qualified text and never appears in a field.
    pub fn end_of_text_marker(mut self, marker: Option<char>) -> Self {
        self.format.end_of_text_marker = marker;
        self
    }

    pub fn build(self) -> Result<CsvFormat, BatchError> {
        self.format.validate()?;
        Ok(self.format)
    }
}

#[cfg(test)]
mod tests {
    use crate::BatchError;

    use super::{CsvFormat, CsvFormatBuilder, TextQualification};

    fn comma_crlf() -> CsvFormat {
        CsvFormatBuilder::new()
            .column_separator(',')
            .line_separator("\r\n")
            .build()
            .unwrap()
    }

    #[test]
    fn contains_separators_matches_reference_table() {
        let format = comma_crlf();

        assert!(format.contains_separators("a\r\nb"));
        assert!(format.contains_separators("a,b"));
        assert!(format.contains_separators("a,b\r\na,b"));
        assert!(!format.contains_separators("a\nb"));
        assert!(!format.contains_separators(""));
    }

    #[test]
    fn contains_separators_reports_values_without_line_separator() {
        let format = comma_crlf();

        // no column separator and no line separator character: still reported
        assert!(format.contains_separators("ab"));
    }

    #[test]
    fn contains_text_detects_letters_and_inner_whitespace() {
        assert!(CsvFormat::contains_text("a"));
        assert!(!CsvFormat::contains_text(""));
        assert!(!CsvFormat::contains_text("0"));
        assert!(!CsvFormat::contains_text(" 0 "));
        assert!(CsvFormat::contains_text(" 0 1 "));
    }

    #[test]
    fn presets_use_expected_separators() {
        assert_eq!(CsvFormat::csv(true).column_separator(), ',');
        assert!(CsvFormat::csv(true).has_headers());
        assert!(!CsvFormat::csv(false).has_headers());
        assert_eq!(CsvFormat::tsv(false).column_separator(), '\t');
        assert!(CsvFormat::tsv(true).has_headers());

        let default = CsvFormat::default();
        assert_eq!(default.column_separator(), ';');
        assert_eq!(default.text_qualifier(), Some('"'));
        assert_eq!(
            default.text_qualification(),
            TextQualification::OnlyWhenNecessary
        );
        assert!(default.has_headers());
    }

    #[test]
    fn build_rejects_column_separator_inside_line_separator() {
        let result = CsvFormatBuilder::new()
            .column_separator('\n')
            .line_separator("\r\n")
            .build();

        assert!(matches!(result, Err(BatchError::InvalidFormat(_))));
    }

    #[test]
    fn build_rejects_end_of_text_marker_colliding_with_structure() {
        for marker in [';', '\n', '\r', '"'] {
            let result = CsvFormatBuilder::new()
                .line_separator("\r\n")
                .end_of_text_marker(Some(marker))
                .build();

            assert!(
                matches!(result, Err(BatchError::InvalidFormat(_))),
                "marker {:?} accepted",
                marker
            );
        }

        let result = CsvFormatBuilder::new()
            .line_separator("\n")
            .end_of_text_marker(Some('\u{3}'))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn build_rejects_empty_line_separator() {
        let result = CsvFormatBuilder::new().line_separator("").build();

        assert!(matches!(result, Err(BatchError::InvalidFormat(_))));
    }

    #[test]
    fn escape_applies_each_policy() {
        let base = CsvFormatBuilder::new().line_separator("\n");

        let necessary = base.clone().build().unwrap();
        assert_eq!(necessary.escape("a;b"), "\"a;b\"");
        assert_eq!(necessary.escape("a\nb"), "a\nb");

        let text = base
            .clone()
            .text_qualification(TextQualification::ForTextFields)
            .build()
            .unwrap();
        assert_eq!(text.escape("x\n"), "\"x\n\"");
        assert_eq!(text.escape("12\n"), "12\n");

        let all = base
            .clone()
            .text_qualification(TextQualification::ForAllFields)
            .build()
            .unwrap();
        assert_eq!(all.escape("1\n"), "\"1\n\"");

        let unqualified = base.text_qualifier(None).build().unwrap();
        assert_eq!(unqualified.escape("a;b"), "a;b");
    }

    #[test]
    fn escape_strips_qualifier_characters() {
        let format = CsvFormat::csv(false);

        assert_eq!(format.escape("say \"hi\""), "\"say \0hi\0\"");
    }

    #[test]
    fn from_json_validates_and_fills_defaults() {
        let format = CsvFormat::from_json(
            r#"{"column_separator": "|", "line_separator": "\n", "text_qualifier": "'", "has_headers": true}"#,
        )
        .unwrap();

        assert_eq!(format.column_separator(), '|');
        assert_eq!(format.text_qualifier(), Some('\''));
        assert_eq!(format.culture().decimal_separator, '.');
        assert!(format.has_headers());

        let invalid = CsvFormat::from_json(r#"{"column_separator": "\n", "line_separator": "\n"}"#);
        assert!(matches!(invalid, Err(BatchError::InvalidFormat(_))));

        let malformed = CsvFormat::from_json("{");
        assert!(matches!(malformed, Err(BatchError::Configuration(_))));
    }
}
