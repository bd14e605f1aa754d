//! Load the descriptor from the built-in bookstore config or a JSON file, and resolve it.

use crate::config::resolved::{ColumnInfo, ColumnRule, ResolvedEntity, ResolvedLink, ResolvedModel, ResolvedRelation};
use crate::config::types::*;
use crate::config::{referential_action, validate};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const BOOKSTORE_SCHEMA: &str = include_str!("../../fixtures/schema.json");

impl FullConfig {
    /// Built-in descriptor: `author` and `book` joined by `author_book_rel`.
    pub fn bookstore() -> Result<Self, ConfigError> {
        serde_json::from_str(BOOKSTORE_SCHEMA).map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// Read a descriptor from a JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Link column name for an entity table.
pub fn foreign_key_column(table: &str) -> String {
    format!("{}_id", table)
}

fn column_infos(columns: &[ColumnConfig]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|c| ColumnInfo {
            name: c.name.clone(),
            max_length: c.max_length,
            nullable: c.nullable,
        })
        .collect()
}

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let entities_by_id: HashMap<_, _> = config.entities.iter().map(|e| (e.id.as_str(), e)).collect();
    let lookup = |id: &str| {
        entities_by_id
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: id.to_string(),
            })
    };

    let mut relations: HashMap<&str, ResolvedRelation> = HashMap::new();
    let mut links = Vec::with_capacity(config.links.len());
    for link in &config.links {
        let [a_id, b_id] = &link.entities;
        let a = lookup(a_id.as_str())?;
        let b = lookup(b_id.as_str())?;
        let a_fk = foreign_key_column(&a.table);
        let b_fk = foreign_key_column(&b.table);
        for (this, this_fk, other, other_fk) in [(a, &a_fk, b, &b_fk), (b, &b_fk, a, &a_fk)] {
            relations.insert(
                this.id.as_str(),
                ResolvedRelation {
                    link_table: link.table.clone(),
                    self_fk: this_fk.clone(),
                    other_fk: other_fk.clone(),
                    other_table: other.table.clone(),
                    other_path_segment: other.path_segment.clone(),
                    other_columns: column_infos(&other.columns),
                },
            );
        }
        links.push(ResolvedLink {
            table: link.table.clone(),
            left: (a.table.clone(), a_fk),
            right: (b.table.clone(), b_fk),
            on_delete: referential_action(link.on_delete.as_deref())?,
            on_update: referential_action(link.on_update.as_deref())?,
        });
    }

    let mut entities = Vec::with_capacity(config.entities.len());
    let mut entity_by_path = HashMap::new();
    for e in &config.entities {
        let entity = Arc::new(ResolvedEntity {
            entity_id: e.id.clone(),
            table_name: e.table.clone(),
            path_segment: e.path_segment.clone(),
            columns: column_infos(&e.columns),
            validation: e
                .validation
                .iter()
                .map(|(col, rule)| ColumnRule::compile(col, rule).map(|r| (col.clone(), r)))
                .collect::<Result<_, ConfigError>>()?,
            relation: relations.remove(e.id.as_str()),
        });
        entity_by_path.insert(e.path_segment.clone(), Arc::clone(&entity));
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        links,
        entity_by_path,
    })
}
