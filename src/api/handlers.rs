use crate::api::error::ApiError;
use crate::api::AppState;
use crate::domain::model::{Lookup, RoutingKey, Selector};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CustomerResponse {
    pub id: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Selector>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub total: u64,
    pub backends: BTreeMap<String, BackendShare>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendShare {
    pub requests: u64,
    pub fraction: f64,
}

/// `GET /api/customer?id=<id>`
pub async fn get_customer(
    State(state): State<AppState>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> Result<Json<CustomerResponse>, ApiError> {
    // 查詢字串解析失敗（例如重複的 id）也要回 JSON 錯誤，而不是 axum 預設的純文字
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // 在進入 Router 之前先驗證 id
    let raw = query
        .id
        .ok_or_else(|| ApiError::BadRequest("query parameter 'id' is required".to_string()))?;
    let key = RoutingKey::parse(&raw)?;

    match state.router.route(&key).await? {
        Lookup::Found(customer) => Ok(Json(CustomerResponse {
            id: customer.id,
            name: customer.name,
            source: customer.source.filter(|_| state.expose_source),
        })),
        Lookup::NotFound => Err(ApiError::NotFound(format!("customer '{}' not found", key))),
    }
}

/// `GET /api/migration/progress`
pub async fn migration_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    let snapshot = state.progress.snapshot();
    let backends = snapshot
        .per_selector
        .iter()
        .map(|(selector, requests)| {
            (
                selector.to_string(),
                BackendShare {
                    requests: *requests,
                    fraction: snapshot.fraction(selector),
                },
            )
        })
        .collect();

    Json(ProgressResponse {
        total: snapshot.total,
        backends,
    })
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
