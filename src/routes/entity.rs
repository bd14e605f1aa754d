//! Entity routes bound per entity from the resolved model.
//! Each entity gets its own router with its `CrudService` as state; relation routes only exist
//! for entities that take part in a link.

use crate::handlers::entity::{
    count_related, create, delete as delete_handler, list, list_related, preflight, preflight_collection, read,
    update,
};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    state
        .services()
        .into_iter()
        .fold(Router::new(), |router, service| router.merge(entity_router(service)))
}

fn entity_router(service: CrudService) -> Router {
    let base = format!("/{}", service.entity().path_segment);
    let mut router = Router::new()
        .route(&base, get(list).post(create).options(preflight_collection))
        .route(
            &format!("{}/:id", base),
            get(read)
                .put(update)
                .patch(update)
                .delete(delete_handler)
                .options(preflight),
        );
    if service.relations().is_some() {
        router = router
            .route(&format!("{}/relcount/:id", base), get(count_related))
            .route(&format!("{}/rellist/:id", base), get(list_related));
    }
    tracing::debug!(path = %base, relations = service.relations().is_some(), "entity routes bound");
    router.with_state(service)
}
