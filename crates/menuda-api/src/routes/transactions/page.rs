//! Transactions page rendering - Full page endpoints
//!
//! Endpoints:
//! - page_transactions: Transaction list page, rows loaded via HTMX
//! - page_transaction_detail: Create/edit form
//!
//! Helper functions:
//! - render_form: Detail form markup
//! - render_select: Category/vendor select with its "new" input

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use menuda_core::form::{SelectField, NEW_OPTION};
use menuda_core::{CoreError, PrefillParams, TransactionForm};
use menuda_utils::escape_html;

use crate::{redirect, toast_html, AppState};

/// Outcome passed back to the list page after a write
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    #[serde(default)]
    pub notice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// `(message, is_error)` for a `?notice=` value
pub fn notice_message(notice: &str) -> Option<(&'static str, bool)> {
    match notice {
        "saved" => Some(("Transaction saved successfully", false)),
        "deleted" => Some(("Transaction deleted successfully", false)),
        "saved_without_attachment" => Some((
            "Transaction saved, but the attachment could not be uploaded",
            true,
        )),
        _ => None,
    }
}

/// Transactions page - list container filled by `/transactions/list`
pub async fn page_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let profile = match state.session.require_profile() {
        Ok(profile) => profile,
        Err(CoreError::Unauthorized) => return redirect(&headers, "/login"),
        Err(e) => {
            log::error!("Could not read session: {}", e);
            return redirect(&headers, "/login");
        }
    };

    let notice = query
        .notice
        .as_deref()
        .and_then(notice_message)
        .map(|(message, is_error)| toast_html(message, is_error))
        .unwrap_or_default();

    let inner_content = String::from(
        r#"<div class='flex items-center justify-between mb-4'>
            <h2 class='text-2xl font-bold'>Transactions</h2>
            <a href='/transactions/detail' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700 flex items-center gap-2'>
                <svg xmlns='http://www.w3.org/2000/svg' class='h-5 w-5' fill='none' viewBox='0 0 24 24' stroke='currentColor'>
                    <path stroke-linecap='round' stroke-linejoin='round' stroke-width='2' d='M12 4v16m8-8H4'/>
                </svg>
                New
            </a>
        </div>
        <div id='transactions-content' hx-get='/transactions/list' hx-trigger='load' class='bg-white rounded-xl shadow-sm p-6'>
            <p class='text-gray-500 text-center htmx-indicator'>Loading...</p>
        </div>"#
    );

    Html(crate::page_response_with_toasts(
        &state,
        &headers,
        "Transactions",
        "/transactions",
        Some(&profile),
        &inner_content,
        &notice,
    ))
    .into_response()
}

/// Create (no `id`) or edit (`?id=`) form, optionally prefilled from the query
pub async fn page_transaction_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(id): Query<IdQuery>,
    Query(prefill): Query<PrefillParams>,
) -> Response {
    let mode = menuda_core::FormMode::from_query_id(id.id.as_deref());
    let today = chrono::Utc::now().date_naive();

    let loaded = match state.workflow.load(mode, &prefill, today).await {
        Ok(loaded) => loaded,
        Err(CoreError::Unauthorized) => return redirect(&headers, "/login"),
        Err(e) => {
            log::error!("Could not load transaction form: {}", e);
            return redirect(&headers, "/login");
        }
    };

    let notices: String = loaded
        .notices
        .iter()
        .map(|notice| toast_html(notice, true))
        .collect();

    Html(crate::page_response_with_toasts(
        &state,
        &headers,
        loaded.form.mode.page_title(),
        "/transactions/detail",
        Some(&loaded.profile),
        &render_form(&loaded.form),
        &notices,
    ))
    .into_response()
}

/// Detail form posting multipart to `/transactions/save`
pub fn render_form(form: &TransactionForm) -> String {
    let transaction_id = form.mode.transaction_id().unwrap_or_default();
    let (attachment_url, attachment_type) = form
        .attachment
        .as_ref()
        .map(|a| (a.url.clone(), a.attachment_type.to_string()))
        .unwrap_or_default();

    let delete_button = if form.can_delete() {
        format!(
            r#"<button type='button' hx-post='/transactions/{}/delete' hx-confirm='Are you sure you want to delete this transaction?'
                    class='px-4 py-2 bg-red-50 text-red-700 rounded-lg hover:bg-red-100'>Delete</button>"#,
            urlencode_path(transaction_id)
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class='max-w-2xl mx-auto'>
    <div class='flex items-center gap-3 mb-6'>
        <button type='button' data-action='back' class='text-gray-500 hover:text-gray-800' aria-label='Back'>←</button>
        <h2 class='text-2xl font-bold'>{title}</h2>
    </div>
    <form id='transaction-form' hx-post='/transactions/save' hx-encoding='multipart/form-data'
          class='bg-white rounded-xl shadow-sm p-6 space-y-4'>
        <input type='hidden' name='transaction_id' value='{id}'>
        <input type='hidden' id='attachment-url' name='attachment_url' value='{attachment_url}'>
        <input type='hidden' id='attachment-type' name='attachment_type' value='{attachment_type}'>
        <input type='hidden' id='remove-attachment-flag' name='remove_attachment' value='false'>
        <div>
            <label for='title' class='block text-sm text-gray-600 mb-1'>Title</label>
            <input type='text' id='title' name='title' value='{form_title}' required class='w-full px-3 py-2 border rounded-lg'>
        </div>
        <div class='grid grid-cols-2 gap-4'>
            <div>
                <label for='amount' class='block text-sm text-gray-600 mb-1'>Amount</label>
                <input type='number' step='any' id='amount' name='amount' value='{amount}' required class='w-full px-3 py-2 border rounded-lg'>
            </div>
            <div>
                <label for='transaction_date' class='block text-sm text-gray-600 mb-1'>Date</label>
                <input type='date' id='transaction_date' name='transaction_date' value='{date}' required class='w-full px-3 py-2 border rounded-lg'>
            </div>
        </div>
        {category}
        {vendor}
        <div>
            <label for='attachment' class='block text-sm text-gray-600 mb-1'>Attachment</label>
            <input type='file' id='attachment' name='attachment' accept='image/*,application/pdf,audio/*' class='w-full text-sm'>
            {preview}
        </div>
        <div class='flex justify-between pt-2'>
            <div>{delete_button}</div>
            <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Save</button>
        </div>
    </form>
</div>"#,
        title = form.mode.page_title(),
        id = escape_html(transaction_id),
        attachment_url = escape_html(&attachment_url),
        attachment_type = escape_html(&attachment_type),
        form_title = escape_html(&form.title),
        amount = escape_html(&form.amount),
        date = escape_html(&form.date),
        category = render_select(&form.category),
        vendor = render_select(&form.vendor),
        preview = render_attachment_preview(form),
        delete_button = delete_button,
    )
}

/// Select with a trailing "create new" option and the hidden name input
pub fn render_select(field: &SelectField) -> String {
    let name = field.kind.field_name();
    let new_name = field.kind.new_field_name();
    let group_id = format!("{}-group", new_name.replace('_', "-"));

    let mut options = format!(
        "<option value=''{}>{}</option>",
        if field.is_selected("") { " selected" } else { "" },
        field.kind.placeholder()
    );
    for option in field.options() {
        let category_attr = option
            .category_id
            .as_deref()
            .map(|id| format!(" data-category-id='{}'", escape_html(id)))
            .unwrap_or_default();
        options.push_str(&format!(
            "<option value='{}'{}{}>{}</option>",
            escape_html(&option.value),
            category_attr,
            if field.is_selected(&option.value) { " selected" } else { "" },
            escape_html(&option.label)
        ));
    }
    options.push_str(&format!(
        "<option value='{}'{}>{}</option>",
        NEW_OPTION,
        if field.is_new() { " selected" } else { "" },
        field.kind.new_option_label()
    ));

    let label = match field.kind.field_name() {
        "category" => "Category",
        _ => "Vendor",
    };

    format!(
        r#"<div>
            <label for='{name}' class='block text-sm text-gray-600 mb-1'>{label}</label>
            <select id='{name}' name='{name}' data-new-group='{group_id}' required class='w-full px-3 py-2 border rounded-lg bg-white'>{options}</select>
            <div id='{group_id}' class='mt-2{hidden}'>
                <input type='text' name='{new_name}' value='{new_value}' placeholder='{label} name'{required} class='w-full px-3 py-2 border rounded-lg'>
            </div>
        </div>"#,
        name = name,
        label = label,
        group_id = group_id,
        options = options,
        hidden = if field.is_new() { "" } else { " hidden" },
        new_name = new_name,
        new_value = escape_html(&field.new_name),
        required = if field.is_new() { " required" } else { "" },
    )
}

fn render_attachment_preview(form: &TransactionForm) -> String {
    let (hidden, name, image) = match &form.attachment {
        Some(attachment) => {
            let image = if attachment.attachment_type.is_image() {
                format!(
                    "<img id='attachment-image' src='{}' alt='Attachment' class='mt-2 max-h-48 rounded-lg'>",
                    escape_html(&attachment.url)
                )
            } else {
                "<img id='attachment-image' src='' alt='Attachment' class='mt-2 max-h-48 rounded-lg hidden'>".to_string()
            };
            (
                "",
                format!(
                    "<a href='{}' target='_blank' rel='noopener' class='text-indigo-600 hover:underline'>{}</a>",
                    escape_html(&attachment.url),
                    escape_html(attachment.file_name())
                ),
                image,
            )
        }
        None => (
            " hidden",
            String::new(),
            "<img id='attachment-image' src='' alt='Attachment' class='mt-2 max-h-48 rounded-lg hidden'>".to_string(),
        ),
    };

    format!(
        r#"<div id='attachment-preview' class='mt-2 p-3 border rounded-lg bg-gray-50{}'>
                <div class='flex items-center justify-between'>
                    <span class='text-sm'>📎 <span id='attachment-name'>{}</span></span>
                    <button type='button' data-action='remove-attachment' class='text-sm text-red-600 hover:underline'>Remove</button>
                </div>
                {}
            </div>"#,
        hidden, name, image
    )
}

fn urlencode_path(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
