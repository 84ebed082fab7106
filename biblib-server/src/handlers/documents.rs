use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use biblib_core::application::{DocumentsRequest, DocumentsResponse};

use crate::infra::{
    app_state::AppState, errors::AppResult, request_context::RequestContext,
};

pub async fn update_documents_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(library): Path<String>,
    Json(request): Json<DocumentsRequest>,
) -> AppResult<Json<DocumentsResponse>> {
    let response = state
        .services()
        .documents
        .update_documents(context.identity, &library, request)
        .await?;
    Ok(Json(response))
}
