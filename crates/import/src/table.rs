use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

use crate::error::ParseError;

/// Text encodings tried, in order, when decoding a statement file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "cp1252")]
    Windows1252,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
}

impl TextEncoding {
    pub const DEFAULT_ORDER: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
        TextEncoding::Iso8859_1,
    ];

    /// Strict decode: `None` on any malformed sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = match Encoding::for_bom(bytes) {
                    Some((enc, bom_len)) if enc == UTF_8 => &bytes[bom_len..],
                    _ => bytes,
                };
                UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(Cow::into_owned)
            }
            TextEncoding::Windows1252 => WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            // ISO-8859-1 maps every byte to the code point of the same value.
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Some(bytes.iter().map(|&b| char::from(b)).collect())
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Iso8859_1 => "iso-8859-1",
        }
    }
}

pub type Row = Vec<Option<String>>;

/// Untyped grid of a statement file. Blank cells are `None`; nothing is
/// coerced and no row is assumed to be a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Row>,
    encoding: TextEncoding,
}

impl RawTable {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            encoding: TextEncoding::Utf8,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Split into the rows before `index`, the row at `index`, and everything after.
    pub(crate) fn split_at_header(mut self, index: usize) -> Option<(Row, Vec<Row>)> {
        if index >= self.rows.len() {
            return None;
        }
        let body = self.rows.split_off(index + 1);
        let header = self.rows.pop()?;
        Some((header, body))
    }
}

/// Read a file and decode it with the first encoding that accepts every byte.
/// The file handle is released before parsing starts.
pub fn load(path: &Path, encodings: &[TextEncoding]) -> Result<RawTable, ParseError> {
    let data = std::fs::read(path).map_err(|e| ParseError::unreadable(path, e))?;
    from_bytes(&data, encodings, path)
}

pub fn from_bytes(
    data: &[u8],
    encodings: &[TextEncoding],
    origin: &Path,
) -> Result<RawTable, ParseError> {
    for &encoding in encodings {
        let Some(text) = encoding.decode(data) else {
            debug!("{} is not valid {}", origin.display(), encoding.name());
            continue;
        };
        let rows = parse_grid(&text).map_err(|e| ParseError::unreadable(origin, e))?;
        debug!(
            "Read {} rows from {} as {}",
            rows.len(),
            origin.display(),
            encoding.name()
        );
        return Ok(RawTable { rows, encoding });
    }

    Err(ParseError::unreadable(
        origin,
        "no configured text encoding could decode the file",
    ))
}

fn parse_grid(text: &str) -> Result<Vec<Row>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}
