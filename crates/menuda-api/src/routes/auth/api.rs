//! Auth HTMX endpoints
//!
//! Endpoints:
//! - api_google_sign_in: Exchange a Google ID token for a backend user id
//! - api_logout: Forget the stored profile

use axum::extract::{Form, State};
use axum::response::Response;
use serde::Deserialize;

use menuda_core::auth;

use crate::{hx_redirect, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CredentialForm {
    #[serde(default)]
    pub credential: String,
}

/// Decode the credential, register the user and store the profile
pub async fn api_google_sign_in(
    State(state): State<AppState>,
    Form(form): Form<CredentialForm>,
) -> Result<Response, ApiError> {
    let profile = auth::login(state.backend.as_ref(), &state.session, &form.credential)
        .await
        .map_err(|e| ApiError::operation("Sign-in failed: ", e))?;
    log::info!("Signed in {} as {}", profile.email, profile.user_id);
    Ok(hx_redirect("/transactions"))
}

pub async fn api_logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    auth::logout(&state.session).map_err(|e| ApiError::operation("Logout failed: ", e))?;
    Ok(hx_redirect("/login"))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use menuda_core::memory::{Endpoint, MemoryBackend};
    use std::sync::Arc;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn token(claims: &str) -> String {
        format!("header.{}.signature", URL_SAFE_NO_PAD.encode(claims))
    }

    #[tokio::test]
    async fn test_sign_in_stores_profile() {
        let backend = Arc::new(MemoryBackend::new().with_user_id("user-42"));
        let state = state(backend.clone(), false);
        let body = format!(
            "credential={}",
            token(r#"{"email":"ana@example.com","name":"Ana López","picture":"https://img/a.png"}"#)
        );
        let (status, headers, _) = send(state.clone(), htmx_post("/auth/google", FORM, body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["HX-Redirect"], "/transactions");
        assert_eq!(backend.count(Endpoint::CheckUser), 1);
        let profile = state.session.profile().unwrap().unwrap();
        assert_eq!(profile.user_id, "user-42");
        assert_eq!(profile.first_name(), "Ana");
    }

    #[tokio::test]
    async fn test_bad_credential_shows_toast() {
        let backend = Arc::new(MemoryBackend::new());
        let state = state(backend.clone(), false);
        let (status, headers, body) =
            send(state.clone(), htmx_post("/auth/google", FORM, "credential=not-a-jwt")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["HX-Retarget"], "#toast");
        assert!(body.contains("Sign-in failed: "));
        assert_eq!(backend.count(Endpoint::CheckUser), 0);
        assert!(!state.session.is_signed_in());
    }

    #[tokio::test]
    async fn test_logout_clears_profile() {
        let state = state(Arc::new(MemoryBackend::new()), true);
        let (_, headers, _) = send(state.clone(), htmx_post("/logout", FORM, "")).await;
        assert_eq!(headers["HX-Redirect"], "/login");
        assert!(!state.session.is_signed_in());
    }
}
