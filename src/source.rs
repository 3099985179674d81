use std::path::Path;

use encoding_rs::Encoding;

use crate::error::{ImportError, Result};

/// Looks up a text encoding by its label, e.g. `ISO-8859-1` or `UTF-8`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ImportError::UnknownEncoding(label.to_owned()))
}

/// Reads the whole file and decodes it with the given encoding.
/// Byte sequences that are invalid in that encoding are an error, nothing is replaced.
pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|_| ImportError::InputFileRead(path.to_path_buf()))?;
    decode(path, &bytes, encoding)
}

pub fn decode(path: &Path, bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.trim_start_matches('\u{feff}').to_owned())
        .ok_or(ImportError::Encoding {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case(extension))
}

/// The header line of the semicolon separated exports: every column name is quoted.
pub fn quoted_header(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| format!("\"{}\"", field))
        .collect::<Vec<_>>()
        .join(";")
}

/// First field of a semicolon separated line without its quotes.
pub fn first_field(line: &str) -> String {
    line.split(';').next().unwrap_or("").replace('"', "")
}

pub fn semicolon_reader(text: &str, has_headers: bool) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(text.as_bytes())
}
