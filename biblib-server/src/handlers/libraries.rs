use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use biblib_core::{
    application::{CreateLibraryRequest, LibrarySummary},
    paginate::PageParams,
    read_path::{LibraryReadResponse, ReadRequest},
};
use serde::Serialize;
use tracing::info;

use crate::infra::{
    app_state::AppState, errors::AppResult, request_context::RequestContext,
};

#[derive(Debug, Serialize)]
pub struct LibraryListResponse {
    pub libraries: Vec<LibrarySummary>,
}

/// Documents, index payload and metadata for one library.
pub async fn get_library_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(library): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<LibraryReadResponse>> {
    let request = ReadRequest {
        library,
        identity: context.identity,
        params,
        rate_limit_level: context.rate_limit_level,
        authorization: context.authorization,
    };
    let response = state.services().read_path.read(request).await?;
    Ok(Json(response))
}

pub async fn list_libraries_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> AppResult<Json<LibraryListResponse>> {
    let libraries = state
        .services()
        .libraries
        .list_user_libraries(context.identity)
        .await?;
    Ok(Json(LibraryListResponse { libraries }))
}

pub async fn create_library_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<CreateLibraryRequest>,
) -> AppResult<Json<LibrarySummary>> {
    info!(
        name = request.name.as_deref().unwrap_or_default(),
        "Create library requested"
    );
    let summary = state
        .services()
        .libraries
        .create_library(context.identity, request)
        .await?;
    Ok(Json(summary))
}
