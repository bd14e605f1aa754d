//! Many-to-many relation engine for one entity's side of its link table.

use crate::config::{ResolvedEntity, ResolvedRelation};
use crate::error::AppError;
use crate::store::{Record, Store};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct RelationEngine {
    relation: Arc<ResolvedRelation>,
    store: Arc<dyn Store>,
}

impl RelationEngine {
    /// None when the entity is not part of any link.
    pub fn for_entity(entity: &ResolvedEntity, store: Arc<dyn Store>) -> Option<Self> {
        entity.relation.as_ref().map(|relation| RelationEngine {
            relation: Arc::new(relation.clone()),
            store,
        })
    }

    /// Body key naming the other side, e.g. `book_id` on authors.
    pub fn other_key(&self) -> &str {
        &self.relation.other_fk
    }

    /// Other-side id requested by an update body, if any. Must be an integer.
    pub fn requested_id(&self, body: &Map<String, Value>) -> Result<Option<i64>, AppError> {
        match body.get(self.other_key()) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("{} must be an integer", self.other_key()))),
        }
    }

    /// Idempotent upsert of (self_id, other_id). True when a new link row was stored.
    pub async fn link(&self, self_id: i64, other_id: i64) -> Result<bool, AppError> {
        let inserted = self.store.link(&self.relation, self_id, other_id).await?;
        tracing::debug!(
            link = %self.relation.link_table,
            self_id,
            other_id,
            inserted,
            "relation upsert"
        );
        Ok(inserted)
    }

    pub async fn count(&self, id: i64) -> Result<i64, AppError> {
        self.store.count_related(&self.relation, id).await
    }

    /// Other-side rows linked to `id`. Callers must not rely on ordering.
    pub async fn list(&self, id: i64) -> Result<Vec<Record>, AppError> {
        self.store.list_related(&self.relation, id).await
    }
}
