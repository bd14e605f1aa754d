//! Descriptor validation: identifiers, referential integrity and route consistency.

use crate::config::FullConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Path segments that would collide with fixed routes.
const RESERVED_SEGMENTS: &[&str] = &["relcount", "rellist", "health", "ready", "version"];

const REFERENTIAL_ACTIONS: &[&str] = &["CASCADE", "RESTRICT", "NO ACTION", "SET NULL", "SET DEFAULT"];

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static regex"))
}

fn path_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("static regex"))
}

fn check_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(value) && value.len() <= 63 {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Normalized referential action (upper case), CASCADE when absent.
pub fn referential_action(action: Option<&str>) -> Result<String, ConfigError> {
    let action = action.unwrap_or("CASCADE").trim().to_uppercase();
    if REFERENTIAL_ACTIONS.contains(&action.as_str()) {
        Ok(action)
    } else {
        Err(ConfigError::Validation(format!("unsupported referential action: {}", action)))
    }
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("at least one entity required".into()));
    }

    let mut tables = HashSet::new();
    let mut path_segments = HashSet::new();
    let mut entity_tables: HashMap<&str, &str> = HashMap::new();

    for e in &config.entities {
        check_identifier("table", &e.table)?;
        if !tables.insert(e.table.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table: {}", e.table)));
        }
        if entity_tables.insert(e.id.as_str(), e.table.as_str()).is_some() {
            return Err(ConfigError::Validation(format!("duplicate entity id: {}", e.id)));
        }
        if !path_segment_re().is_match(&e.path_segment) || RESERVED_SEGMENTS.contains(&e.path_segment.as_str()) {
            return Err(ConfigError::InvalidIdentifier {
                kind: "path segment",
                value: e.path_segment.clone(),
            });
        }
        if !path_segments.insert(e.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(e.path_segment.clone()));
        }
        if e.columns.is_empty() {
            return Err(ConfigError::Validation(format!("entity {} has no columns", e.id)));
        }
        let mut columns = HashSet::new();
        for c in &e.columns {
            check_identifier("column", &c.name)?;
            if c.name == "id" {
                return Err(ConfigError::Validation(format!(
                    "entity {}: 'id' is implicit and must not be listed",
                    e.id
                )));
            }
            if !columns.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!("entity {}: duplicate column {}", e.id, c.name)));
            }
        }
        for (col, rule) in &e.validation {
            if !columns.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", e.id, col),
                });
            }
            if let Some(ref pattern) = rule.pattern {
                Regex::new(pattern)
                    .map_err(|err| ConfigError::Validation(format!("invalid pattern for {}.{}: {}", e.id, col, err)))?;
            }
        }
    }

    let mut linked = HashSet::new();
    for link in &config.links {
        check_identifier("link table", &link.table)?;
        if !tables.insert(link.table.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table: {}", link.table)));
        }
        let [a, b] = &link.entities;
        if a == b {
            return Err(ConfigError::Validation(format!(
                "link {} must connect two distinct entities",
                link.id
            )));
        }
        for entity_id in [a, b] {
            if !entity_tables.contains_key(entity_id.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "entity",
                    id: entity_id.clone(),
                });
            }
            if !linked.insert(entity_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "entity {} participates in more than one link",
                    entity_id
                )));
            }
        }
        referential_action(link.on_delete.as_deref())?;
        referential_action(link.on_update.as_deref())?;
    }

    Ok(())
}
