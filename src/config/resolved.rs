//! Resolved descriptor model: config validated and flattened for runtime use.

use crate::config::ValidationRule;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub max_length: Option<u32>,
    pub nullable: bool,
}

impl ColumnInfo {
    /// PostgreSQL type for DDL.
    pub fn pg_type(&self) -> String {
        match self.max_length {
            Some(n) => format!("VARCHAR({})", n),
            None => "TEXT".to_string(),
        }
    }
}

/// A column's validation rule with its pattern compiled once, at resolve time.
#[derive(Clone, Debug, Default)]
pub struct ColumnRule {
    pub required: bool,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub pattern: Option<Regex>,
}

impl ColumnRule {
    pub fn compile(column: &str, rule: &ValidationRule) -> Result<Self, ConfigError> {
        let pattern = rule
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", column, e)))?;
        Ok(ColumnRule {
            required: rule.required == Some(true),
            max_length: rule.max_length,
            min_length: rule.min_length,
            pattern,
        })
    }
}

/// This entity's side of its many-to-many link. Column names are fixed at resolve time.
#[derive(Clone, Debug)]
pub struct ResolvedRelation {
    pub link_table: String,
    /// Link column referencing this entity (e.g. `author_id`).
    pub self_fk: String,
    /// Link column referencing the other entity (e.g. `book_id`).
    pub other_fk: String,
    pub other_table: String,
    pub other_path_segment: String,
    pub other_columns: Vec<ColumnInfo>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub entity_id: String,
    pub table_name: String,
    pub path_segment: String,
    /// Data columns; `id` is implicit.
    pub columns: Vec<ColumnInfo>,
    pub validation: HashMap<String, ColumnRule>,
    pub relation: Option<ResolvedRelation>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Link table with both sides in declaration order; used for DDL and by stores that keep link rows.
#[derive(Clone, Debug)]
pub struct ResolvedLink {
    pub table: String,
    /// (referenced table, link column)
    pub left: (String, String),
    pub right: (String, String),
    pub on_delete: String,
    pub on_update: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<Arc<ResolvedEntity>>,
    pub links: Vec<ResolvedLink>,
    pub entity_by_path: HashMap<String, Arc<ResolvedEntity>>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&Arc<ResolvedEntity>> {
        self.entity_by_path.get(path)
    }

    pub fn entity_by_table(&self, table: &str) -> Option<&Arc<ResolvedEntity>> {
        self.entities.iter().find(|e| e.table_name == table)
    }
}
