//! HTTP front-end server with HTMX support
//!
//! Routes are organized into modules:
//! - routes::auth: Sign-in page, Google credential exchange, logout
//! - routes::transactions: Transaction list and detail form
//! - routes::invoices: Receipt scanning
//! - routes::settings: Configuration and profile display

pub mod error;
pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use menuda_config::Config;
use menuda_core::{BackendApi, MoneyFormat, Session, TransactionWorkflow, UserProfile};
use menuda_utils::{escape_html, CacheBuster};

pub use error::ApiError;

/// Largest accepted multipart body (receipt photos)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const APP_JS: &str = include_str!("../assets/app.js");
const APP_CSS: &str = include_str!("../assets/app.css");

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Session,
    pub backend: Arc<dyn BackendApi>,
    pub workflow: Arc<TransactionWorkflow>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn BackendApi>, session: Session) -> Self {
        let workflow = TransactionWorkflow::from_config(backend.clone(), session.clone(), &config);
        Self {
            config,
            session,
            backend,
            workflow: Arc::new(workflow),
        }
    }

    pub fn money(&self) -> MoneyFormat {
        MoneyFormat::from_config(&self.config.currency)
    }

    /// Current asset version, renewed once it is older than the configured age
    pub fn asset_version(&self) -> String {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let max_age_ms = (self.config.ui.cache_max_age_secs as i64).saturating_mul(1000);
        match self.session.refresh_cache_version(now_ms, max_age_ms) {
            Ok(refresh) => {
                log::trace!("Cache version check: {:?}", refresh);
                self.session
                    .cache_version()
                    .ok()
                    .flatten()
                    .unwrap_or(now_ms)
                    .to_string()
            }
            Err(e) => {
                log::warn!("Could not refresh cache version: {}", e);
                now_ms.to_string()
            }
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::auth::{api_google_sign_in, api_logout, page_login};
    use routes::invoices::htmx_process_invoice;
    use routes::settings::{api_settings, page_settings};
    use routes::transactions::{
        htmx_transaction_delete, htmx_transaction_save, htmx_transactions_list, page_transaction_detail,
        page_transactions,
    };

    Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/settings", get(api_settings))
        // Static assets
        .route("/assets/app.js", get(asset_js))
        .route("/assets/app.css", get(asset_css))
        // HTMX page routes
        .route("/", get(index_page))
        .route("/login", get(page_login))
        .route("/transactions", get(page_transactions))
        .route("/transactions/detail", get(page_transaction_detail))
        .route("/settings", get(page_settings))
        // HTMX partial and write routes
        .route("/auth/google", post(api_google_sign_in))
        .route("/logout", post(api_logout))
        .route("/transactions/list", get(htmx_transactions_list))
        .route("/transactions/save", post(htmx_transaction_save))
        .route("/transactions/:id/delete", post(htmx_transaction_delete))
        .route("/invoices/process", post(htmx_process_invoice))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn asset_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], APP_JS)
}

async fn asset_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], APP_CSS)
}

/// Landing route: list when signed in, login otherwise
async fn index_page(state: axum::extract::State<AppState>) -> Redirect {
    if state.session.is_signed_in() {
        Redirect::to("/transactions")
    } else {
        Redirect::to("/login")
    }
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str, assets: &CacheBuster, toast_duration_ms: u64) -> String {
    base_html_with_toasts(title, content, "", assets, toast_duration_ms)
}

/// Base HTML template with toasts already placed in `#toast`
pub fn base_html_with_toasts(
    title: &str,
    content: &str,
    toasts: &str,
    assets: &CacheBuster,
    toast_duration_ms: u64,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Menuda</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <link rel="stylesheet" href="{}">
    <script src="{}" defer></script>
</head>
<body class="bg-gray-50 text-gray-900" data-toast-duration="{}">
    {}
    <div id="toast" aria-live="polite">{}</div>
</body>
</html>"#,
        escape_html(title),
        assets.url("/assets/app.css"),
        assets.url("/assets/app.js"),
        toast_duration_ms,
        content,
        toasts
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let links = [
        ("/transactions", "Transactions", "📋"),
        ("/transactions/detail", "New transaction", "➕"),
        ("/settings", "Settings", "⚙️"),
    ];

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>Menuda</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, icon) in &links {
        let is_active = current_path == *path;
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Header with the first-name greeting and avatar
pub fn header_bar(profile: &UserProfile) -> String {
    let first_name = profile.first_name();
    let avatar = if profile.picture.trim().is_empty() {
        let initial = first_name.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_else(|| "?".to_string());
        format!("<span class='avatar avatar-default'>{}</span>", escape_html(&initial))
    } else {
        format!(
            "<img src='{}' alt='{}' class='avatar' referrerpolicy='no-referrer'>",
            escape_html(&profile.picture),
            escape_html(&profile.name)
        )
    };
    format!(
        r#"<header class='flex items-center justify-between bg-white border-b px-6 py-3'>
    <p class='text-lg font-medium'>Hi, {}</p>
    <div class='flex items-center gap-3'>
        {}
        <button hx-post='/logout' hx-target='#toast' hx-swap='beforeend' class='text-sm text-gray-500 hover:text-gray-800'>Log out</button>
    </div>
</header>"#,
        escape_html(if first_name.is_empty() { "there" } else { first_name }),
        avatar
    )
}

/// Floating quick-access menu: new transaction, receipt scan, list
pub fn quick_access() -> String {
    r#"<div id='quick-access' class='fixed bottom-6 right-6 z-50 flex flex-col items-end gap-2'>
    <div id='quick-access-menu' class='quick-access-menu hidden bg-white rounded-xl shadow-lg p-2 w-56'>
        <a href='/transactions/detail' class='block px-3 py-2 rounded-lg hover:bg-gray-50'>➕ New transaction</a>
        <button type='button' data-action='scan-receipt' class='w-full text-left px-3 py-2 rounded-lg hover:bg-gray-50'>📷 Scan receipt</button>
        <a href='/transactions' class='block px-3 py-2 rounded-lg hover:bg-gray-50'>📋 Transactions</a>
        <form hx-post='/invoices/process' hx-encoding='multipart/form-data' hx-trigger='change' hx-target='#toast' hx-swap='beforeend' class='hidden'>
            <input id='invoice-input' type='file' name='invoice' accept='image/*,application/pdf'>
        </form>
    </div>
    <button type='button' data-action='toggle-quick-access' class='w-14 h-14 rounded-full bg-indigo-600 text-white text-2xl shadow-lg hover:bg-indigo-700'>+</button>
</div>"#
        .to_string()
}

/// Toast notification fragment; the page script removes it after the
/// duration set on `<body data-toast-duration>`
pub fn toast_html(message: &str, is_error: bool) -> String {
    format!(
        "<div class='toast{}' role='status'>{}</div>",
        if is_error { " toast-error" } else { "" },
        escape_html(message)
    )
}

/// Check if request is from HTMX (partial page update)
pub fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(
    state: &AppState,
    headers: &HeaderMap,
    title: &str,
    current_path: &str,
    profile: Option<&UserProfile>,
    inner_content: &str,
) -> String {
    page_response_with_toasts(state, headers, title, current_path, profile, inner_content, "")
}

/// Like [`page_response`], also showing `toasts` (see [`toast_html`])
pub fn page_response_with_toasts(
    state: &AppState,
    headers: &HeaderMap,
    title: &str,
    current_path: &str,
    profile: Option<&UserProfile>,
    inner_content: &str,
    toasts: &str,
) -> String {
    if is_htmx_request(headers) {
        // HTMX partial - just the content area, toasts swapped out of band
        let oob = if toasts.is_empty() {
            String::new()
        } else {
            format!("<div hx-swap-oob='beforeend:#toast'>{}</div>", toasts)
        };
        format!("<main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>{}", inner_content, oob)
    } else {
        let header = profile.map(header_bar).unwrap_or_default();
        let quick = if profile.is_some() { quick_access() } else { String::new() };
        let assets = CacheBuster::new(state.asset_version());
        base_html_with_toasts(title, &format!(r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0 hidden md:block'>{}</aside>
        <div class='flex-1 flex flex-col overflow-hidden'>
            {}
            <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
        </div>
    </div>
</div>
{}"#,
            nav_sidebar(current_path), header, inner_content, quick), toasts, &assets, state.config.ui.toast_duration_ms)
    }
}

/// Navigate the browser: `HX-Redirect` for HTMX requests, 303 otherwise
pub fn redirect(headers: &HeaderMap, location: &str) -> Response {
    if is_htmx_request(headers) {
        hx_redirect(location)
    } else {
        Redirect::to(location).into_response()
    }
}

/// Empty response that makes HTMX load `location`
pub fn hx_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::OK.into_response();
            response.headers_mut().insert("HX-Redirect", value);
            response
        }
        Err(_) => {
            log::error!("Refusing to redirect to invalid location {:?}", location);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

/// Start the HTTP server
///
/// Creates the router, binds to the configured address and serves until the
/// listener fails or Ctrl-C is pressed.
pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let addr = state.config.listen_addr();
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting Menuda front-end on http://{}", addr);
    log::info!("Available routes:");
    log::info!("  - /login (Sign in)");
    log::info!("  - /transactions (Transaction list)");
    log::info!("  - /transactions/detail (Create or edit a transaction)");
    log::info!("  - /settings (Configuration)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped gracefully");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::test_support::get;
    use super::*;
    use menuda_core::memory::MemoryBackend;

    #[tokio::test]
    async fn test_health_check() {
        let (status, _, body) = send(state(Arc::new(MemoryBackend::new()), false), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_index_redirects_by_session() {
        let (status, headers, _) = send(state(Arc::new(MemoryBackend::new()), false), get("/")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers["location"], "/login");

        let (_, headers, _) = send(state(Arc::new(MemoryBackend::new()), true), get("/")).await;
        assert_eq!(headers["location"], "/transactions");
    }

    #[tokio::test]
    async fn test_assets_served() {
        let (status, headers, body) = send(state(Arc::new(MemoryBackend::new()), false), get("/assets/app.js")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers["content-type"].to_str().unwrap().starts_with("application/javascript"));
        assert!(body.contains("handleCredentialResponse"));
    }

    #[test]
    fn test_header_bar_greets_first_name() {
        let html = header_bar(&profile());
        assert!(html.contains("Hi, Ana"));
        assert!(html.contains("avatar-default"));

        let mut with_picture = profile();
        with_picture.picture = "https://img/a.png".to_string();
        assert!(header_bar(&with_picture).contains("<img src='https://img/a.png'"));
    }

    #[test]
    fn test_toast_escapes_message() {
        let html = toast_html("<b>oops</b>", true);
        assert!(html.contains("toast-error"));
        assert!(html.contains("&lt;b&gt;oops&lt;/b&gt;"));
    }

    #[test]
    fn test_asset_version_is_stable_within_max_age() {
        let state = state(Arc::new(MemoryBackend::new()), false);
        let first = state.asset_version();
        assert_eq!(state.asset_version(), first);
        let html = base_html("T", "", &CacheBuster::new(first.clone()), 3000);
        assert!(html.contains(&format!("/assets/app.js?v={}", first)));
        assert!(html.contains("data-toast-duration=\"3000\""));
    }
}
