//! The row import engine and the `import` command entry point.
//!
//! One run loads one CSV file into one target entity type. The engine walks
//! the data rows, applies the bound column plan to build a candidate record,
//! and creates the record only when no existing record matches the candidate
//! exactly, so re-importing a file is a no-op. Each created row is its own
//! persistence unit; there is no cross-row transaction and no retry.

use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    binder::{ColumnPlan, Conversion},
    catalog::Catalog,
    cli::ImportArgs,
    data::{Value, parse_field_value},
    error::ImportError,
    expr, io_utils,
    mapping::MappingSpec,
    resolver::Resolver,
    store::{FieldValues, Store},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Report candidates without persisting anything.
    pub dry_run: bool,
    /// Skip rows that fail conversion instead of aborting the run.
    pub force: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub ignored: usize,
    pub failed: usize,
}

enum RowOutcome {
    Created(FieldValues),
    Ignored(FieldValues),
}

pub struct ImportEngine<'a> {
    catalog: &'a Catalog,
    plan: ColumnPlan,
    resolver: Resolver<'a>,
    options: ImportOptions,
}

impl<'a> ImportEngine<'a> {
    /// Binds the header row against the mapping and catalog. All
    /// configuration problems surface here, before any data row is read.
    pub fn bind(
        catalog: &'a Catalog,
        mapping: &MappingSpec,
        headers: &[String],
        options: ImportOptions,
    ) -> Result<Self, ImportError> {
        let plan = ColumnPlan::bind(headers, mapping, catalog)?;
        Ok(ImportEngine {
            catalog,
            plan,
            resolver: Resolver::new(catalog),
            options,
        })
    }

    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    /// Processes decoded data rows in order. `source` names the input in
    /// echo and diagnostic lines.
    pub fn run<I>(&mut self, store: &mut Store, rows: I, source: &str) -> Result<ImportSummary>
    where
        I: Iterator<Item = Result<Vec<String>>>,
    {
        let mut summary = ImportSummary::default();
        for (idx, row) in rows.enumerate() {
            // Row 1 was the header; read and decode failures are fatal even
            // under force since alignment with the plan is gone.
            let row_number = idx + 2;
            let row = row.with_context(|| format!("{source}: row {row_number}"))?;
            if is_comment_or_blank(&row) {
                debug!("{source}:{row_number}: comment or blank, skipped");
                continue;
            }
            match self.import_row(store, &row) {
                Ok(RowOutcome::Created(candidate)) => {
                    summary.created += 1;
                    info!(
                        "{source}:{row_number}: create {} {}",
                        self.plan.entity(),
                        format_candidate(&candidate)
                    );
                }
                Ok(RowOutcome::Ignored(candidate)) => {
                    summary.ignored += 1;
                    info!(
                        "{source}:{row_number}: ignore {} {}",
                        self.plan.entity(),
                        format_candidate(&candidate)
                    );
                }
                Err(err) if self.options.force && err.is_row_scoped() => {
                    summary.failed += 1;
                    warn!("{source}:{row_number}: row skipped: {err}");
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("{source}: row {row_number}"));
                }
            }
        }
        Ok(summary)
    }

    fn import_row(&mut self, store: &mut Store, row: &[String]) -> Result<RowOutcome, ImportError> {
        let candidate = self.build_candidate(store, row)?;
        if !store.find(self.plan.entity(), &candidate).is_empty() {
            return Ok(RowOutcome::Ignored(candidate));
        }
        if !self.options.dry_run {
            store.create(self.plan.entity(), candidate.clone());
        }
        Ok(RowOutcome::Created(candidate))
    }

    fn build_candidate(
        &mut self,
        store: &Store,
        row: &[String],
    ) -> Result<FieldValues, ImportError> {
        let descriptor = self.catalog.get_entity_type(self.plan.entity())?;
        let mut candidate = FieldValues::new();
        // Field borrows: the resolver mutates its cache while the plan is
        // walked immutably.
        let (plan, resolver) = (&self.plan, &mut self.resolver);
        for (planned, raw) in plan.columns().iter().zip(row) {
            let Some(field_name) = &planned.field else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let conversion_failed = |value: &str, err: &dyn std::fmt::Display| {
                ImportError::Conversion {
                    column: field_name.clone(),
                    value: value.to_string(),
                    reason: err.to_string(),
                }
            };
            let field_type = &descriptor.require_field(field_name)?.field_type;
            let value = match &planned.conversion {
                Conversion::Identity => parse_field_value(raw, field_type)
                    .map_err(|err| conversion_failed(raw, &err))?,
                Conversion::Refer { entity, lookup } => {
                    Some(Value::Reference(resolver.resolve(store, entity, lookup, raw)?))
                }
                Conversion::Transform { expression } => {
                    let text = expr::evaluate_transform(expression, raw)
                        .map_err(|err| conversion_failed(raw, &err))?;
                    parse_field_value(&text, field_type)
                        .map_err(|err| conversion_failed(&text, &err))?
                }
            };
            if let Some(value) = value {
                candidate.insert(field_name.clone(), value);
            }
        }
        Ok(candidate)
    }
}

fn is_comment_or_blank(row: &[String]) -> bool {
    match row.first() {
        None => true,
        Some(first) => first.is_empty() || first.starts_with('#'),
    }
}

fn format_candidate(candidate: &FieldValues) -> String {
    format!(
        "({})",
        candidate
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .join(", ")
    )
}

/// Entry point for `railbase import`.
pub fn execute(args: &ImportArgs) -> Result<()> {
    let catalog = Catalog::railway();
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mapping = match (&args.mapping, &args.entity) {
        (Some(path), entity) => {
            let spec = MappingSpec::load(path)?;
            if let Some(entity) = entity {
                if entity != spec.entity() {
                    bail!(
                        "--entity {entity} disagrees with mapping section [{}]",
                        spec.entity()
                    );
                }
            }
            spec
        }
        (None, Some(entity)) => MappingSpec::passthrough(entity),
        (None, None) => bail!("either --mapping or --entity is required"),
    };
    let options = ImportOptions {
        dry_run: args.dry_run,
        force: args.force,
    };
    if options.dry_run {
        info!("dry run: candidates are reported but nothing is persisted");
    }

    let mut store = Store::load_or_default(&args.store)?;
    let mut totals = ImportSummary::default();
    for input in &args.inputs {
        match import_file(&catalog, &mapping, &mut store, input, args, encoding, options) {
            Ok(summary) => {
                if !options.dry_run {
                    store
                        .save(&args.store)
                        .with_context(|| format!("Persisting store after {input:?}"))?;
                }
                info!(
                    "{}: {} created, {} ignored, {} failed",
                    input.display(),
                    summary.created,
                    summary.ignored,
                    summary.failed
                );
                totals.created += summary.created;
                totals.ignored += summary.ignored;
                totals.failed += summary.failed;
            }
            Err(err) => {
                // Rows created before the failure stay committed.
                if !options.dry_run {
                    if let Err(save_err) = store.save(&args.store) {
                        warn!("failed to persist store after error: {save_err:#}");
                    }
                }
                return Err(err);
            }
        }
    }
    if args.inputs.len() > 1 {
        info!(
            "total: {} created, {} ignored, {} failed",
            totals.created, totals.ignored, totals.failed
        );
    }
    Ok(())
}

fn import_file(
    catalog: &Catalog,
    mapping: &MappingSpec,
    store: &mut Store,
    path: &Path,
    args: &ImportArgs,
    encoding: &'static Encoding,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
    info!(
        "Importing '{}' into {} (delimiter '{}')",
        path.display(),
        mapping.entity(),
        crate::printable_delimiter(delimiter)
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, args.quote)?;
    let mut records = reader.byte_records();
    let headers = match records.next() {
        Some(record) => {
            let record = record.with_context(|| format!("Reading header row of {path:?}"))?;
            io_utils::decode_record(&record, encoding)?
        }
        None => {
            info!("{}: no rows", path.display());
            return Ok(ImportSummary::default());
        }
    };

    let mut engine = ImportEngine::bind(catalog, mapping, &headers, options)?;
    let source = path.display().to_string();
    let rows = records.map(|record| {
        let record = record.context("Reading CSV record")?;
        io_utils::decode_record(&record, encoding)
    });
    engine.run(store, rows, &source)
}
