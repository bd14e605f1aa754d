//! Generic CRUD operation set, one instance per entity.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::service::{RelationEngine, RequestValidator};
use crate::store::{Record, RowChange, Store, UpdateOutcome};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of Read: one row when an id was given, all rows otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Fetched {
    One(Record),
    Many(Vec<Record>),
}

#[derive(Clone)]
pub struct CrudService {
    entity: Arc<ResolvedEntity>,
    store: Arc<dyn Store>,
    relations: Option<RelationEngine>,
}

impl CrudService {
    pub fn new(entity: Arc<ResolvedEntity>, store: Arc<dyn Store>) -> Self {
        let relations = RelationEngine::for_entity(&entity, Arc::clone(&store));
        CrudService {
            entity,
            store,
            relations,
        }
    }

    pub fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    pub fn relations(&self) -> Option<&RelationEngine> {
        self.relations.as_ref()
    }

    fn not_found(&self, id: i64) -> AppError {
        AppError::NotFound(format!("{} {}", self.entity.table_name, id))
    }

    /// Insert one row from a JSON object. Returns the store-assigned id.
    pub async fn create(&self, body: &Map<String, Value>) -> Result<i64, AppError> {
        let values = RequestValidator::column_values(&self.entity, body, false)?;
        RequestValidator::validate(&values, &self.entity.validation)?;
        let id = self.store.insert(&self.entity, &values).await?;
        tracing::info!(table = %self.entity.table_name, id, "created");
        Ok(id)
    }

    /// One row by id (NotFound when absent), or every row ordered by id.
    pub async fn read(&self, id: Option<i64>) -> Result<Fetched, AppError> {
        match id {
            Some(id) => self
                .store
                .fetch_one(&self.entity, id)
                .await?
                .map(Fetched::One)
                .ok_or_else(|| self.not_found(id)),
            None => Ok(Fetched::Many(self.store.fetch_all(&self.entity).await?)),
        }
    }

    /// Column update and/or relation upsert as one logical operation.
    pub async fn update(&self, id: i64, body: &Map<String, Value>) -> Result<UpdateOutcome, AppError> {
        let values = RequestValidator::column_values(&self.entity, body, true)?;
        RequestValidator::validate_partial(&values, &self.entity.validation)?;
        let link_to = match &self.relations {
            Some(relations) => relations.requested_id(body)?,
            None => None,
        };

        let outcome = if !values.is_empty() {
            self.store.update(&self.entity, id, &RowChange { values, link_to }).await?
        } else if let (Some(relations), Some(other_id)) = (&self.relations, link_to) {
            UpdateOutcome {
                updated: false,
                linked: Some(relations.link(id, other_id).await?),
            }
        } else {
            if self.store.fetch_one(&self.entity, id).await?.is_none() {
                return Err(self.not_found(id));
            }
            UpdateOutcome::default()
        };
        tracing::info!(
            table = %self.entity.table_name,
            id,
            updated = outcome.updated,
            linked = ?outcome.linked,
            "updated"
        );
        Ok(outcome)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete(&self.entity, id).await? {
            return Err(self.not_found(id));
        }
        tracing::info!(table = %self.entity.table_name, id, "deleted");
        Ok(())
    }

    fn require_relations(&self) -> Result<&RelationEngine, AppError> {
        self.relations
            .as_ref()
            .ok_or_else(|| AppError::NotFound(format!("{} has no relation", self.entity.table_name)))
    }

    /// Number of link rows referencing `id` on this entity's side.
    pub async fn count_related(&self, id: i64) -> Result<i64, AppError> {
        self.require_relations()?.count(id).await
    }

    /// Other-entity rows joined through the link table for `id`.
    pub async fn list_related(&self, id: i64) -> Result<Vec<Record>, AppError> {
        self.require_relations()?.list(id).await
    }
}
