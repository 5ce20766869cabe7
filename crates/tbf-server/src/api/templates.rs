use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tbf_core::{FilterTemplate, TemplateAction, TemplateInput};
use tbf_shopify::{SaveOutcome, TemplatePage};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub first: Option<u32>,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    pub action: TemplateAction,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkResult {
    action: TemplateAction,
    ids: Vec<String>,
}

pub(super) async fn list_templates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<TemplatePage>>, ApiError> {
    let page = state
        .client
        .list_templates(query.first.unwrap_or(50), query.after.as_deref())
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?;
    Ok(ApiResponse::json(page, req_id.0))
}

pub(super) async fn get_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FilterTemplate>>, ApiError> {
    let template = state
        .client
        .get_template(&id)
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "not_found", format!("template {id} not found"))
        })?;
    Ok(ApiResponse::json(template, req_id.0))
}

/// Saves a template (`id` = `0` creates one) and rebuilds the facet index
/// of every collection it targets.
pub(super) async fn save_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(input): Json<TemplateInput>,
) -> Result<Json<ApiResponse<SaveOutcome>>, ApiError> {
    let outcome = state
        .client
        .save_template_and_rebuild(&id, &input, &state.settings)
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?;
    Ok(ApiResponse::json(outcome, req_id.0))
}

pub(super) async fn bulk_action(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<ApiResponse<BulkResult>>, ApiError> {
    if request.ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ids must not be empty",
        ));
    }
    let ids = state
        .client
        .apply_template_action(&request.ids, request.action)
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?;
    tracing::info!(action = ?request.action, count = ids.len(), "bulk template action applied");
    Ok(ApiResponse::json(
        BulkResult {
            action: request.action,
            ids,
        },
        req_id.0,
    ))
}
