//! Settings page rendering - Full page endpoints

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;

use menuda_utils::escape_html;

use crate::AppState;

fn item(label: &str, value: &str) -> String {
    format!(
        "<div><p class='text-sm text-gray-500'>{}</p><p class='font-medium break-all'>{}</p></div>",
        label,
        escape_html(value)
    )
}

fn card(title: &str, items: &[String]) -> String {
    format!(
        r#"<div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>{}</h3>
            <div class='grid grid-cols-2 gap-4'>{}</div>
        </div>"#,
        title,
        items.concat()
    )
}

pub async fn page_settings(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let config = &state.config;
    let profile = state.session.profile().ok().flatten();

    let account = match &profile {
        Some(profile) => card(
            "Account",
            &[
                item("Name", &profile.name),
                item("Email", &profile.email),
                item("User id", &profile.user_id),
            ],
        ),
        None => card("Account", &[item("Status", "Not signed in")]),
    };

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Settings</h2></div>
        {}{}{}{}"#,
        account,
        card(
            "Backend",
            &[
                item("API base URL", &config.backend.base_url),
                item("Request timeout", &format!("{} s", config.backend.request_timeout_secs)),
                item("Retries", &config.retry.retries.to_string()),
                item("Retry delay", &format!("{} ms", config.retry.delay_ms)),
                item("Edit load timeout", &format!("{} ms", config.load.timeout_ms)),
                item(
                    "Google sign-in",
                    if config.auth.google_client_id.trim().is_empty() { "Not configured" } else { "Configured" },
                ),
            ],
        ),
        card(
            "Session",
            &[
                item("Profile file", &config.session.path.display().to_string()),
                item("Asset cache age", &format!("{} s", config.ui.cache_max_age_secs)),
                item("Toast duration", &format!("{} ms", config.ui.toast_duration_ms)),
            ],
        ),
        card(
            "Currency",
            &[
                item("Symbol", &config.currency.symbol),
                item("Decimal places", &config.currency.decimal_places.to_string()),
                item("Example", &state.money().format(rust_decimal::Decimal::new(-123456, 2))),
            ],
        ),
    );

    Html(crate::page_response(
        &state,
        &headers,
        "Settings",
        "/settings",
        profile.as_ref(),
        &inner_content,
    ))
}
