//! Binds the actual CSV header row to a positional column plan.
//!
//! Header labels carry documentation annotations in the source files (a
//! leading `#` on the first column, trailing `*`/`[`/`]` markers); these are
//! stripped before the label is used as a mapping key. Binding validates the
//! whole plan against the catalog up front, so every misconfigured column
//! fails before the first data row is read.

use crate::{
    catalog::{Catalog, FieldType},
    error::ImportError,
    mapping::{MappingSpec, Rule},
};

/// Removes header decorations: one leading `#`, then any trailing `*`, `[`,
/// `]` characters.
pub fn strip_decorations(label: &str) -> String {
    let label = label.trim();
    let label = label.strip_prefix('#').unwrap_or(label);
    label.trim_end_matches(['*', '[', ']']).trim().to_string()
}

/// How one column's raw text becomes a field value. Dispatched uniformly by
/// the importer regardless of variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Raw text parsed straight into the target field's declared type.
    Identity,
    /// Raw text resolved to an existing record of `entity` by equality on
    /// `lookup`; the field receives the reference.
    Refer { entity: String, lookup: String },
    /// Raw text run through a transform expression, then parsed as Identity.
    Transform { expression: String },
}

#[derive(Debug, Clone)]
pub struct PlannedColumn {
    /// Target field name; `None` drops the column.
    pub field: Option<String>,
    pub conversion: Conversion,
}

#[derive(Debug, Clone)]
pub struct ColumnPlan {
    entity: String,
    columns: Vec<PlannedColumn>,
}

impl ColumnPlan {
    pub fn bind(
        headers: &[String],
        mapping: &MappingSpec,
        catalog: &Catalog,
    ) -> Result<Self, ImportError> {
        let descriptor = catalog.get_entity_type(mapping.entity())?;
        let mut columns = Vec::with_capacity(headers.len());
        for header in headers {
            let label = strip_decorations(header);
            let planned = match mapping.rule(&label) {
                Rule::Ignore => PlannedColumn {
                    field: None,
                    conversion: Conversion::Identity,
                },
                Rule::Field { name } => {
                    let field = descriptor.require_field(&name)?;
                    if let FieldType::Reference(target) = &field.field_type {
                        return Err(ImportError::Configuration {
                            label,
                            rule: format!("field[{name}]"),
                            reason: format!(
                                "'{name}' is a reference; use refer({target}.<field>)"
                            ),
                        });
                    }
                    PlannedColumn {
                        field: Some(name),
                        conversion: Conversion::Identity,
                    }
                }
                Rule::Refer {
                    name,
                    entity,
                    lookup,
                } => {
                    let field = descriptor.require_field(&name)?;
                    match &field.field_type {
                        FieldType::Reference(target) if *target == entity => {}
                        FieldType::Reference(target) => {
                            return Err(ImportError::Configuration {
                                label,
                                rule: format!("field[{name}]=refer({entity}.{lookup})"),
                                reason: format!("'{name}' references {target}, not {entity}"),
                            });
                        }
                        other => {
                            return Err(ImportError::Configuration {
                                label,
                                rule: format!("field[{name}]=refer({entity}.{lookup})"),
                                reason: format!(
                                    "'{name}' is {}, not a reference",
                                    other.describe()
                                ),
                            });
                        }
                    }
                    catalog.get_entity_type(&entity)?.require_field(&lookup)?;
                    PlannedColumn {
                        field: Some(name),
                        conversion: Conversion::Refer { entity, lookup },
                    }
                }
                Rule::Transform { name, expression } => {
                    let field = descriptor.require_field(&name)?;
                    if let FieldType::Reference(target) = &field.field_type {
                        return Err(ImportError::Configuration {
                            label,
                            rule: format!("field[{name}]=eval({expression})"),
                            reason: format!(
                                "'{name}' is a reference; use refer({target}.<field>)"
                            ),
                        });
                    }
                    PlannedColumn {
                        field: Some(name),
                        conversion: Conversion::Transform { expression },
                    }
                }
            };
            columns.push(planned);
        }
        Ok(ColumnPlan {
            entity: descriptor.name.clone(),
            columns,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }
}
