//! Login page rendering

use axum::response::{Html, IntoResponse, Redirect, Response};

use menuda_utils::{escape_html, CacheBuster};

use crate::AppState;

/// Login page with the Google Identity Services button.
/// A signed-in visitor goes straight to the transaction list.
pub async fn page_login(state: axum::extract::State<AppState>) -> Response {
    if state.session.is_signed_in() {
        return Redirect::to("/transactions").into_response();
    }

    let client_id = &state.config.auth.google_client_id;
    let button = if client_id.trim().is_empty() {
        log::warn!("auth.google_client_id is not set, sign-in button disabled");
        "<p class='text-sm text-red-600'>Google sign-in is not configured.</p>".to_string()
    } else {
        format!(
            r#"<div id='g_id_onload' data-client_id='{}' data-callback='handleCredentialResponse' data-auto_prompt='false'></div>
            <div class='g_id_signin' data-type='standard' data-shape='pill' data-text='signin_with' data-size='large'></div>"#,
            escape_html(client_id)
        )
    };

    let content = format!(
        r#"<script src="https://accounts.google.com/gsi/client" async defer></script>
<div class='min-h-screen flex items-center justify-center'>
    <div class='bg-white rounded-xl shadow-sm p-8 w-full max-w-sm text-center'>
        <h1 class='text-3xl font-bold text-indigo-600 mb-2'>Menuda</h1>
        <p class='text-gray-500 mb-6'>Keep track of your everyday spending</p>
        <div class='flex justify-center'>{}</div>
    </div>
</div>"#,
        button
    );

    let assets = CacheBuster::new(state.asset_version());
    Html(crate::base_html("Sign in", &content, &assets, state.config.ui.toast_duration_ms)).into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use menuda_core::memory::MemoryBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_page_renders_button() {
        let mut state = state(Arc::new(MemoryBackend::new()), false);
        state.config.auth.google_client_id = "client-123.apps.googleusercontent.com".to_string();
        let (status, _, body) = send(state, get("/login")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("data-client_id='client-123.apps.googleusercontent.com'"));
        assert!(body.contains("handleCredentialResponse"));
    }

    #[tokio::test]
    async fn test_login_page_skipped_when_signed_in() {
        let (status, headers, _) = send(state(Arc::new(MemoryBackend::new()), true), get("/login")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers["location"], "/transactions");
    }
}
