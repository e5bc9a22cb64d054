use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Railway reference data store and CSV bulk loader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load one or more CSV files into the record store
    Import(ImportArgs),
    /// List the entity types and fields the store can hold
    Catalog(CatalogArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Input CSV files, processed in order ('-' reads stdin)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Record store file (created when absent)
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Mapping specification file describing column rules
    #[arg(short = 'm', long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// Target entity type; required without a mapping file
    #[arg(short = 'e', long = "entity")]
    pub entity: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// CSV quotation character
    #[arg(long, value_parser = parse_quote, default_value = "\"")]
    pub quote: u8,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Report candidate records without writing to the store
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
    /// Continue with the next row when a row fails conversion
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_quote(value: &str) -> Result<u8, String> {
    let mut chars = value.chars();
    let first = chars
        .next()
        .ok_or_else(|| "Quote character cannot be empty".to_string())?;
    if chars.next().is_some() {
        return Err("Quote must be a single character".to_string());
    }
    if !first.is_ascii() {
        return Err("Quote must be ASCII".to_string());
    }
    Ok(first as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases_resolve() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn quote_must_be_one_ascii_character() {
        assert_eq!(parse_quote("'").unwrap(), b'\'');
        assert!(parse_quote("''").is_err());
    }
}
