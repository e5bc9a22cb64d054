use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::FieldType;

/// A typed field value as stored in the record store.
///
/// `Reference` carries the id of a record in the referenced entity's table;
/// it is only ever produced by the lookup resolver, never parsed from text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Reference(u64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Reference(id) => format!("#{id}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("failed to parse '{value}' as date"))
}

/// Parses one raw cell into the declared field type. Empty input means the
/// field is absent from the row and yields `None`.
pub fn parse_field_value(value: &str, ty: &FieldType) -> Result<Option<Value>> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = match ty {
        FieldType::Text => Value::Text(value.to_string()),
        FieldType::Integer => {
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        FieldType::Decimal => {
            let parsed: Decimal = value
                .parse()
                .with_context(|| format!("failed to parse '{value}' as decimal"))?;
            Value::Decimal(parsed)
        }
        FieldType::Boolean => {
            let lowered = value.to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => bail!("failed to parse '{value}' as boolean"),
            };
            Value::Boolean(parsed)
        }
        FieldType::Date => {
            let parsed = parse_naive_date(value)?;
            Value::Date(parsed)
        }
        FieldType::Reference(entity) => {
            bail!("values for {entity} references are resolved via refer(...), not parsed")
        }
    };
    Ok(Some(parsed))
}
