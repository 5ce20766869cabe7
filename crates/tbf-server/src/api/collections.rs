use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use tbf_core::Facet;
use tbf_engine::{filter_collection, FilterRequest, FilterResponse, LocaleContext};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Storefront page of a collection: native or filtered, with self-exclusion
/// facet values when `include_facets` is set.
pub(super) async fn filtered_collection(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<FilterResponse>>, ApiError> {
    let request = FilterRequest {
        collection_id: &collection_id,
        locale: LocaleContext::new(
            header_str(&headers, "x-country"),
            header_str(&headers, "x-language"),
        ),
        params: &params,
    };

    let stored = if request.wants_facets() {
        Some(
            state
                .client
                .read_facet_index(&collection_id)
                .await
                .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?,
        )
    } else {
        None
    };

    let storefront = state.client.storefront();
    let response = filter_collection(&storefront, &state.settings, &request, stored.as_deref())
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?;

    Ok(ApiResponse::json(response, req_id.0))
}

/// The facet index last written for a collection.
pub(super) async fn stored_facets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(collection_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Facet>>>, ApiError> {
    let facets = state
        .client
        .read_facet_index(&collection_id)
        .await
        .map_err(|e| ApiError::from_shopify(req_id.0.clone(), &e))?;
    Ok(ApiResponse::json(facets, req_id.0))
}
