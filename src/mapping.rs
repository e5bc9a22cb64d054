//! Mapping specification files: which CSV column feeds which entity field.
//!
//! The file is INI-like with exactly one section, named after the target
//! entity type. Each entry maps a (possibly decorated) CSV header label to a
//! rule:
//!
//! ```ini
//! [Area]
//! #name* = field[name]=eval(trim(value))
//! country = field[country]=refer(Country.code2)
//! note = ignore
//! ```
//!
//! Rule grammar: `command[target]` optionally followed by
//! `=subcommand(argument)`, with `command` one of `ignore`/`field` and
//! `subcommand` one of `refer`/`eval`. Labels without an entry default to a
//! pass-through field of the same name, so a CSV whose headers already match
//! the entity's field names needs no mapping file at all.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};

use crate::{binder::strip_decorations, error::ImportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Column produces no field.
    Ignore,
    /// Column maps directly onto `name`, value passed through.
    Field { name: String },
    /// Column value is resolved to an existing `entity` record by equality
    /// on `lookup`; the field receives the reference.
    Refer {
        name: String,
        entity: String,
        lookup: String,
    },
    /// Column value runs through a restricted transform expression before
    /// the usual typed parse.
    Transform { name: String, expression: String },
}

#[derive(Debug, Clone)]
pub struct MappingSpec {
    entity: String,
    rules: HashMap<String, Rule>,
}

impl MappingSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let source =
            fs::read_to_string(path).with_context(|| format!("Reading mapping file {path:?}"))?;
        let spec = Self::parse(&source)
            .with_context(|| format!("Parsing mapping file {path:?}"))?;
        Ok(spec)
    }

    pub fn parse(source: &str) -> Result<Self, ImportError> {
        let mut entity: Option<String> = None;
        let mut rules: HashMap<String, Rule> = HashMap::new();

        for (idx, raw) in source.lines().enumerate() {
            let line = raw.trim();
            // ';' is the comment marker; '#' cannot be, since decorated
            // labels such as '#name*' start with it.
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let lineno = idx + 1;
            if let Some(section) = line.strip_prefix('[') {
                let Some(name) = section.strip_suffix(']').map(str::trim) else {
                    return Err(ImportError::MappingFile(format!(
                        "line {lineno}: malformed section header '{line}'"
                    )));
                };
                if name.is_empty() {
                    return Err(ImportError::MappingFile(format!(
                        "line {lineno}: empty section name"
                    )));
                }
                if let Some(previous) = &entity {
                    return Err(ImportError::MappingFile(format!(
                        "line {lineno}: second section '{name}' after '{previous}'; \
                         a mapping file covers exactly one target entity"
                    )));
                }
                entity = Some(name.to_string());
                continue;
            }
            if entity.is_none() {
                return Err(ImportError::MappingFile(format!(
                    "line {lineno}: entry '{line}' before any section header"
                )));
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ImportError::MappingFile(format!(
                    "line {lineno}: expected 'label = rule', got '{line}'"
                )));
            };
            let label = strip_decorations(key.trim());
            if label.is_empty() {
                return Err(ImportError::MappingFile(format!(
                    "line {lineno}: empty column label"
                )));
            }
            let rule = parse_rule(&label, value.trim())?;
            if rules.insert(label.clone(), rule).is_some() {
                return Err(ImportError::MappingFile(format!(
                    "line {lineno}: duplicate rule for column '{label}'"
                )));
            }
        }

        let Some(entity) = entity else {
            return Err(ImportError::MappingFile(
                "no section header found".to_string(),
            ));
        };
        Ok(MappingSpec { entity, rules })
    }

    /// A spec with no configured rules; every column falls back to the
    /// pass-through default. Used when importing with `--entity` alone.
    pub fn passthrough(entity: &str) -> Self {
        MappingSpec {
            entity: entity.to_string(),
            rules: HashMap::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The configured rule for a stripped header label, or the pass-through
    /// default mapping the label onto the field of the same name.
    pub fn rule(&self, label: &str) -> Rule {
        self.rules.get(label).cloned().unwrap_or(Rule::Field {
            name: label.to_string(),
        })
    }
}

fn parse_rule(label: &str, value: &str) -> Result<Rule, ImportError> {
    let fail = |reason: String| ImportError::Configuration {
        label: label.to_string(),
        rule: value.to_string(),
        reason,
    };

    let head_end = value.find(['[', '=']).unwrap_or(value.len());
    let command = value[..head_end].trim();
    let mut rest = &value[head_end..];

    let mut target: Option<&str> = None;
    if let Some(after_open) = rest.strip_prefix('[') {
        let Some(close) = after_open.find(']') else {
            return Err(fail("missing ']' after target name".to_string()));
        };
        let name = after_open[..close].trim();
        if name.is_empty() {
            return Err(fail("empty target name in brackets".to_string()));
        }
        target = Some(name);
        rest = after_open[close + 1..].trim_start();
    }

    let subcommand = if rest.is_empty() {
        None
    } else {
        let Some(call) = rest.strip_prefix('=') else {
            return Err(fail(format!("unexpected trailing text '{rest}'")));
        };
        let call = call.trim();
        let Some(open) = call.find('(') else {
            return Err(fail(format!("expected 'subcommand(argument)', got '{call}'")));
        };
        let Some(argument) = call[open + 1..].strip_suffix(')') else {
            return Err(fail("missing ')' after subcommand argument".to_string()));
        };
        Some((call[..open].trim(), argument.trim()))
    };

    match command {
        "ignore" => {
            if let Some((sub, _)) = subcommand {
                return Err(fail(format!("'ignore' takes no subcommand, got '{sub}'")));
            }
            Ok(Rule::Ignore)
        }
        "field" => {
            let name = target.unwrap_or(label).to_string();
            match subcommand {
                None => Ok(Rule::Field { name }),
                Some(("refer", argument)) => {
                    let Some((entity, lookup)) = argument.split_once('.') else {
                        return Err(fail(format!(
                            "refer argument must be 'Entity.field', got '{argument}'"
                        )));
                    };
                    let (entity, lookup) = (entity.trim(), lookup.trim());
                    if entity.is_empty() || lookup.is_empty() {
                        return Err(fail(format!(
                            "refer argument must be 'Entity.field', got '{argument}'"
                        )));
                    }
                    Ok(Rule::Refer {
                        name,
                        entity: entity.to_string(),
                        lookup: lookup.to_string(),
                    })
                }
                Some(("eval", argument)) => {
                    if argument.is_empty() {
                        return Err(fail("eval argument is empty".to_string()));
                    }
                    Ok(Rule::Transform {
                        name,
                        expression: argument.to_string(),
                    })
                }
                Some((other, _)) => Err(fail(format!("unknown subcommand '{other}'"))),
            }
        }
        other => Err(fail(format!("unknown command '{other}'"))),
    }
}
