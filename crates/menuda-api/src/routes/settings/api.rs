//! Settings API endpoints - JSON API

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::AppState;

/// Effective configuration as JSON
pub async fn api_settings(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::to_string(&state.config).unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], body)
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use menuda_core::memory::MemoryBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_settings_json() {
        let (_, headers, body) = send(state(Arc::new(MemoryBackend::new()), false), get("/api/settings")).await;
        assert_eq!(headers["content-type"], "application/json");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["retry"]["retries"], 3);
        assert_eq!(value["currency"]["symbol"], "$");
    }
}
