use thiserror::Error;

/// Failures raised while binding a mapping or converting rows.
///
/// Configuration-class variants abort a run unconditionally; row-scoped
/// variants abort unless `--force` downgrades them to per-row skips.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid mapping rule for '{label}': '{rule}' ({reason})")]
    Configuration {
        label: String,
        rule: String,
        reason: String,
    },
    #[error("invalid mapping specification: {0}")]
    MappingFile(String),
    #[error("unknown entity type '{0}'")]
    UnknownEntity(String),
    #[error("entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },
    #[error("no {entity} record with {field} = '{value}'")]
    ReferenceNotFound {
        entity: String,
        field: String,
        value: String,
    },
    #[error("{count} {entity} records match {field} = '{value}'")]
    AmbiguousReference {
        entity: String,
        field: String,
        value: String,
        count: usize,
    },
    #[error("column '{column}': cannot convert '{value}': {reason}")]
    Conversion {
        column: String,
        value: String,
        reason: String,
    },
}

impl ImportError {
    /// Row-scoped errors may be skipped under `--force`; everything else is
    /// a configuration problem and fatal regardless.
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            ImportError::ReferenceNotFound { .. }
                | ImportError::AmbiguousReference { .. }
                | ImportError::Conversion { .. }
        )
    }
}
