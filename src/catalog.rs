//! The entity schema catalog: a closed registry of the railway reference
//! entities and their field structure.
//!
//! Import targets and `refer(...)` lookups are resolved against this catalog
//! by exact type name. The set is populated once at startup; nothing is
//! discovered by reflection at import time.

use std::collections::BTreeMap;

use crate::error::ImportError;

/// Semantic type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    /// Foreign key to the named entity type.
    Reference(String),
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            FieldType::Text => "text".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Decimal => "decimal".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Date => "date".to_string(),
            FieldType::Reference(entity) => format!("reference -> {entity}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl EntityDescriptor {
    fn new(name: &str, fields: &[(&str, FieldType)]) -> Self {
        EntityDescriptor {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(field, ty)| FieldDef {
                    name: (*field).to_string(),
                    field_type: ty.clone(),
                })
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`field()`](Self::field) but with the error the binder reports.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef, ImportError> {
        self.field(name).ok_or_else(|| ImportError::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<EntityDescriptor>) -> Self {
        let entities = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Catalog { entities }
    }

    pub fn get_entity_type(&self, name: &str) -> Result<&EntityDescriptor, ImportError> {
        self.entities
            .get(name)
            .ok_or_else(|| ImportError::UnknownEntity(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    /// The railway reference schema: countries down to station adjacency.
    pub fn railway() -> Self {
        use FieldType::*;
        let reference = |entity: &str| Reference(entity.to_string());
        Catalog::new(vec![
            EntityDescriptor::new(
                "Country",
                &[
                    ("code2", Text),
                    ("code3", Text),
                    ("english_name", Text),
                    ("local_name", Text),
                ],
            ),
            EntityDescriptor::new("Area", &[("name", Text), ("country", reference("Country"))]),
            EntityDescriptor::new(
                "Prefecture",
                &[("name", Text), ("area", reference("Area"))],
            ),
            EntityDescriptor::new("CompanyType", &[("name", Text)]),
            EntityDescriptor::new(
                "Company",
                &[("name", Text), ("company_type", reference("CompanyType"))],
            ),
            EntityDescriptor::new(
                "Line",
                &[
                    ("code", Integer),
                    ("sort", Integer),
                    ("name", Text),
                    ("company", reference("Company")),
                    ("enabled", Boolean),
                    ("defunct_date", Date),
                ],
            ),
            EntityDescriptor::new("StationType", &[("is_underground", Boolean)]),
            EntityDescriptor::new(
                "Station",
                &[
                    ("line", reference("Line")),
                    ("code", Integer),
                    ("sort", Integer),
                    ("group_code", Integer),
                    ("name", Text),
                    ("kilo", Decimal),
                    ("prefecture", reference("Prefecture")),
                    ("station_type", reference("StationType")),
                    ("longitude", Decimal),
                    ("latitude", Decimal),
                    ("enabled", Boolean),
                ],
            ),
            EntityDescriptor::new(
                "AdjacentStation",
                &[
                    ("station1", reference("Station")),
                    ("station2", reference("Station")),
                    ("kilo", Decimal),
                    ("inter_points", Text),
                ],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn railway_catalog_resolves_known_entities() {
        let catalog = Catalog::railway();
        let country = catalog.get_entity_type("Country").unwrap();
        assert_eq!(country.field("code2").unwrap().field_type, FieldType::Text);

        let station = catalog.get_entity_type("Station").unwrap();
        assert_eq!(
            station.field("line").unwrap().field_type,
            FieldType::Reference("Line".to_string())
        );
    }

    #[test]
    fn unknown_names_fail_loudly() {
        let catalog = Catalog::railway();
        let err = catalog.get_entity_type("Tram").unwrap_err();
        assert!(matches!(err, ImportError::UnknownEntity(name) if name == "Tram"));

        let line = catalog.get_entity_type("Line").unwrap();
        let err = line.require_field("colour").unwrap_err();
        assert!(matches!(err, ImportError::UnknownField { .. }));
    }

    #[test]
    fn every_reference_targets_a_registered_entity() {
        let catalog = Catalog::railway();
        for entity in catalog.iter() {
            for field in &entity.fields {
                if let FieldType::Reference(target) = &field.field_type {
                    assert!(
                        catalog.get_entity_type(target).is_ok(),
                        "{}.{} points at unregistered entity {target}",
                        entity.name,
                        field.name
                    );
                }
            }
        }
    }
}
