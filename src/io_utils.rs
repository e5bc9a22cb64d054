//! Input-side I/O utilities: delimiter and encoding resolution, CSV reader
//! construction, per-cell decoding.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` →
//!   comma, `.tsv` → tab) with manual override support.
//! - **Encoding**: cells are decoded from the file's byte-level encoding via
//!   `encoding_rs`, defaulting to UTF-8. One encoding per run, never per
//!   column.
//! - **stdin**: the `-` path convention routes through standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, quote: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    // The importer decides row-by-row what is header, comment, or data, so
    // the reader never consumes a header record itself.
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .quote(quote)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    quote: u8,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter, quote))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::SHIFT_JIS;

    #[test]
    fn delimiter_auto_detection_follows_extension() {
        assert_eq!(
            resolve_input_delimiter(Path::new("stations.tsv"), None),
            b'\t'
        );
        assert_eq!(
            resolve_input_delimiter(Path::new("stations.csv"), None),
            b','
        );
        assert_eq!(
            resolve_input_delimiter(Path::new("stations.tsv"), Some(b';')),
            b';'
        );
    }

    #[test]
    fn encoding_labels_resolve() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(resolve_encoding(Some("shift_jis")).unwrap(), SHIFT_JIS);
        assert!(resolve_encoding(Some("no-such-encoding")).is_err());
    }

    #[test]
    fn decode_record_transcodes_each_cell() {
        let (encoded, _, _) = SHIFT_JIS.encode("東京");
        let mut record = csv::ByteRecord::new();
        record.push_field(&encoded);
        record.push_field(b"1");
        let decoded = decode_record(&record, SHIFT_JIS).unwrap();
        assert_eq!(decoded, vec!["東京".to_string(), "1".to_string()]);
    }
}
