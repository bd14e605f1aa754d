//! Shared application state for all routes.

use crate::config::ResolvedModel;
use crate::service::CrudService;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: ResolvedModel) -> Self {
        AppState {
            store,
            model: Arc::new(model),
        }
    }

    /// One operation set per entity, in descriptor order.
    pub fn services(&self) -> Vec<CrudService> {
        self.model
            .entities
            .iter()
            .map(|e| CrudService::new(Arc::clone(e), Arc::clone(&self.store)))
            .collect()
    }
}
