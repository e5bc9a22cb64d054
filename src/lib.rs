pub mod binder;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod error;
pub mod expr;
pub mod importer;
pub mod io_utils;
pub mod mapping;
pub mod resolver;
pub mod store;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("railbase", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => importer::execute(&args),
        Commands::Catalog(args) => handle_catalog(&args),
    }
}

fn handle_catalog(_args: &cli::CatalogArgs) -> Result<()> {
    let catalog = catalog::Catalog::railway();
    let headers = vec![
        "entity".to_string(),
        "field".to_string(),
        "type".to_string(),
    ];
    let mut rows = Vec::new();
    for entity in catalog.iter() {
        for field in &entity.fields {
            rows.push(vec![
                entity.name.clone(),
                field.name.clone(),
                field.field_type.describe(),
            ]);
        }
    }
    table::print_table(&headers, &rows);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
