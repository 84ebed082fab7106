use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use biblib_core::application::{PermissionListing, PermissionUpdate};

use crate::infra::{
    app_state::AppState, errors::AppResult, request_context::RequestContext,
};

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(library): Path<String>,
) -> AppResult<Json<Vec<PermissionListing>>> {
    let listing = state
        .services()
        .permissions
        .list(context.identity, &library)
        .await?;
    Ok(Json(listing))
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(library): Path<String>,
    Json(update): Json<PermissionUpdate>,
) -> AppResult<Json<PermissionListing>> {
    let listing = state
        .services()
        .permissions
        .update(context.identity, &library, update)
        .await?;
    Ok(Json(listing))
}
