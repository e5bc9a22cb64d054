//! Resolves raw reference values to existing records.
//!
//! A `refer(Entity.field)` column calls into here once per cell. The same
//! reference value recurs across many rows of a bulk load (hundreds of
//! stations on one line), so resolutions are memoized per
//! `(entity, field, value)` for the lifetime of the run.

use std::collections::HashMap;

use crate::{
    catalog::Catalog,
    data::parse_field_value,
    error::ImportError,
    store::{FieldValues, Store},
};

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    cache: HashMap<(String, String, String), u64>,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Resolver {
            catalog,
            cache: HashMap::new(),
        }
    }

    /// Looks up exactly one `entity` record whose `field` equals `raw`.
    /// Zero matches and multiple matches are both errors; an ambiguous
    /// reference is never silently resolved to an arbitrary record.
    pub fn resolve(
        &mut self,
        store: &Store,
        entity: &str,
        field: &str,
        raw: &str,
    ) -> Result<u64, ImportError> {
        let key = (entity.to_string(), field.to_string(), raw.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(*id);
        }

        let not_found = || ImportError::ReferenceNotFound {
            entity: entity.to_string(),
            field: field.to_string(),
            value: raw.to_string(),
        };

        let descriptor = self.catalog.get_entity_type(entity)?;
        let field_def = descriptor.require_field(field)?;
        let value = parse_field_value(raw, &field_def.field_type)
            .map_err(|err| ImportError::Conversion {
                column: format!("{entity}.{field}"),
                value: raw.to_string(),
                reason: err.to_string(),
            })?
            .ok_or_else(not_found)?;

        let filters = FieldValues::from([(field.to_string(), value)]);
        let matches = store.find(entity, &filters);
        match matches.as_slice() {
            [] => Err(not_found()),
            [record] => {
                let id = record.id;
                self.cache.insert(key, id);
                Ok(id)
            }
            many => Err(ImportError::AmbiguousReference {
                entity: entity.to_string(),
                field: field.to_string(),
                value: raw.to_string(),
                count: many.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn seeded_store() -> Store {
        let mut store = Store::default();
        store.create(
            "Country",
            FieldValues::from([
                ("code2".to_string(), Value::Text("JP".to_string())),
                ("english_name".to_string(), Value::Text("Japan".to_string())),
            ]),
        );
        store.create(
            "Line",
            FieldValues::from([("code".to_string(), Value::Integer(11302))]),
        );
        store
    }

    #[test]
    fn resolves_a_unique_match_to_its_id() {
        let catalog = Catalog::railway();
        let store = seeded_store();
        let mut resolver = Resolver::new(&catalog);
        let id = resolver.resolve(&store, "Country", "code2", "JP").unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn lookup_values_are_parsed_to_the_field_type() {
        let catalog = Catalog::railway();
        let store = seeded_store();
        let mut resolver = Resolver::new(&catalog);
        assert_eq!(resolver.resolve(&store, "Line", "code", "11302").unwrap(), 1);

        let err = resolver
            .resolve(&store, "Line", "code", "not-a-number")
            .unwrap_err();
        assert!(matches!(err, ImportError::Conversion { .. }));
    }

    #[test]
    fn zero_matches_name_entity_field_and_value() {
        let catalog = Catalog::railway();
        let store = seeded_store();
        let mut resolver = Resolver::new(&catalog);
        let err = resolver
            .resolve(&store, "Country", "code2", "ZZ")
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::ReferenceNotFound { entity, field, value }
                if entity == "Country" && field == "code2" && value == "ZZ"
        ));
    }

    #[test]
    fn multiple_matches_are_a_fatal_ambiguity() {
        let catalog = Catalog::railway();
        let mut store = seeded_store();
        store.create(
            "Country",
            FieldValues::from([("code2".to_string(), Value::Text("JP".to_string()))]),
        );
        let mut resolver = Resolver::new(&catalog);
        let err = resolver
            .resolve(&store, "Country", "code2", "JP")
            .unwrap_err();
        assert!(matches!(err, ImportError::AmbiguousReference { count: 2, .. }));
    }

    #[test]
    fn resolutions_are_memoized_for_the_run() {
        let catalog = Catalog::railway();
        let mut store = seeded_store();
        let mut resolver = Resolver::new(&catalog);
        let first = resolver.resolve(&store, "Country", "code2", "JP").unwrap();

        // A second matching record would now make an uncached lookup
        // ambiguous; the memoized resolution still answers.
        store.create(
            "Country",
            FieldValues::from([("code2".to_string(), Value::Text("JP".to_string()))]),
        );
        let second = resolver.resolve(&store, "Country", "code2", "JP").unwrap();
        assert_eq!(first, second);
    }
}
