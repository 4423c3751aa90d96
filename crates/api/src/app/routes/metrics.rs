use axum::{Extension, Json, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use beacon_auth::AuthContext;

/// Placeholder resource guarded by `metric:read`.
pub async fn overview(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    Json(json!({
        "tenant_id": ctx.tenant_id(),
        "generated_at": Utc::now(),
        "metrics": [],
    }))
}
