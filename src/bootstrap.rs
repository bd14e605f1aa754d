//! Reset the store to a known seed state: drop and recreate every table of the model and
//! load the seed fixture in one transaction, before the service accepts traffic.

use crate::config::{ResolvedLink, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::store::{Store, Values};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BOOKSTORE_SEED: &str = include_str!("../fixtures/seed.json");

/// Seed fixture: entity rows per table (ids assigned in file order) and link rows per link table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<Values>>,
    /// Each link row maps both link columns to ids, e.g. `{"author_id": 1, "book_id": 4}`.
    #[serde(default)]
    pub links: BTreeMap<String, Vec<BTreeMap<String, i64>>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub rows: usize,
    pub links: usize,
}

impl Seed {
    /// Built-in fixture: 12 authors, 10 books and their links.
    pub fn bookstore() -> Result<Self, ConfigError> {
        serde_json::from_str(BOOKSTORE_SEED).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
    }

    pub fn rows<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a Values> + 'a {
        self.entities.get(table).into_iter().flatten()
    }

    /// Link rows of `link` as (left id, right id) in declaration order.
    pub fn pairs(&self, link: &ResolvedLink) -> Result<Vec<(i64, i64)>, ConfigError> {
        let Some(rows) = self.links.get(&link.table) else {
            return Ok(Vec::new());
        };
        rows.iter()
            .map(|row| {
                let left = row.get(&link.left.1);
                let right = row.get(&link.right.1);
                match (left, right) {
                    (Some(l), Some(r)) if row.len() == 2 => Ok((*l, *r)),
                    _ => Err(ConfigError::Validation(format!(
                        "seed row for {} must have exactly {} and {}",
                        link.table, link.left.1, link.right.1
                    ))),
                }
            })
            .collect()
    }

    /// Every table named by the seed must exist in the model, and every entity row may only
    /// name that entity's columns.
    pub fn check(&self, model: &ResolvedModel) -> Result<(), ConfigError> {
        for (table, rows) in &self.entities {
            let entity = model.entity_by_table(table).ok_or_else(|| ConfigError::MissingReference {
                kind: "seed table",
                id: table.clone(),
            })?;
            for row in rows {
                if let Some(col) = row.keys().find(|k| entity.column(k).is_none()) {
                    return Err(ConfigError::MissingReference {
                        kind: "seed column",
                        id: format!("{}.{}", table, col),
                    });
                }
            }
        }
        for table in self.links.keys() {
            let link = model
                .links
                .iter()
                .find(|l| &l.table == table)
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "seed link table",
                    id: table.clone(),
                })?;
            self.pairs(link)?;
        }
        Ok(())
    }
}

/// Drop, recreate and seed. A failure leaves the previous tables untouched.
pub async fn bootstrap(store: &dyn Store, model: &ResolvedModel, seed: &Seed) -> Result<SeedReport, AppError> {
    seed.check(model)?;
    let report = store.reset(model, seed).await?;
    tracing::info!(rows = report.rows, links = report.links, "store reset to seed state");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FullConfig};

    #[test]
    fn bookstore_seed_matches_model() {
        let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
        let seed = Seed::bookstore().unwrap();
        seed.check(&model).unwrap();
        assert_eq!(seed.rows("author").count(), 12);
        assert_eq!(seed.rows("book").count(), 10);
        assert_eq!(seed.rows("missing").count(), 0);
        let pairs = seed.pairs(&model.links[0]).unwrap();
        assert!(pairs.contains(&(2, 7)));
    }

    #[test]
    fn rejects_unknown_seed_column() {
        let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
        let seed: Seed = serde_json::from_str(r#"{"entities": {"author": [{"nickname": "dmr"}]}}"#).unwrap();
        assert!(matches!(seed.check(&model), Err(ConfigError::MissingReference { kind: "seed column", .. })));
    }

    #[test]
    fn rejects_malformed_link_row() {
        let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
        let seed: Seed = serde_json::from_str(r#"{"links": {"author_book_rel": [{"author_id": 1}]}}"#).unwrap();
        assert!(seed.check(&model).is_err());
    }
}
