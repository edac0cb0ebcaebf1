//! Transactions HTMX endpoints
//!
//! Endpoints:
//! - htmx_transactions_list: Transaction list grouped by month (HTML fragment)
//! - htmx_transaction_save: Create or update from the detail form
//! - htmx_transaction_delete: Delete from the detail form

use axum::extract::{Multipart, Path, State};
use axum::response::{Html, IntoResponse, Response};

use menuda_core::{group_transactions, CoreError, TransactionGroup, TransactionSubmission};
use menuda_utils::escape_html;

use crate::routes::{read_text, read_upload};
use crate::{hx_redirect, ApiError, AppState};

/// HTMX: Transactions list - Partial page update
pub async fn htmx_transactions_list(State(state): State<AppState>) -> Response {
    match state.workflow.transactions().await {
        Ok(transactions) => {
            let groups = group_transactions(&transactions, &state.money());
            Html(render_groups(&groups)).into_response()
        }
        Err(CoreError::Unauthorized) => hx_redirect("/login"),
        Err(e) => Html(format!(
            "<p class='text-red-600 text-center'>Error loading transactions: {}</p>",
            escape_html(&e.user_message())
        ))
        .into_response(),
    }
}

fn render_groups(groups: &[TransactionGroup]) -> String {
    if groups.is_empty() {
        return r#"<div class='text-center py-8'>
            <p class='text-gray-500 mb-4'>No transactions yet</p>
            <a href='/transactions/detail' class='text-indigo-600 hover:underline'>Add your first transaction</a>
        </div>"#
            .to_string();
    }

    let mut html = String::new();
    for group in groups {
        html.push_str(&format!(
            r#"<section class='mb-6'>
            <div class='flex items-center justify-between border-b pb-2 mb-2'>
                <h3 class='font-semibold text-gray-700'>{}</h3>
                <span class='amount {} font-medium'>{}</span>
            </div>
            <ul class='divide-y'>"#,
            escape_html(&group.label),
            group.total_class,
            escape_html(&group.display_total)
        ));
        for row in &group.rows {
            html.push_str(&format!(
                r#"<li>
                <a href='/transactions/detail?id={}' class='flex items-center justify-between py-3 px-2 hover:bg-gray-50 rounded-lg'>
                    <div>
                        <p class='font-medium'>{}{}</p>
                        <p class='text-sm text-gray-500'>{} · {} · {}</p>
                    </div>
                    <span class='amount {} font-medium'>{}</span>
                </a>
            </li>"#,
                urlencoding::encode(&row.transaction_id),
                escape_html(&row.title),
                if row.has_attachment { " <span title='Has attachment'>📎</span>" } else { "" },
                escape_html(&row.display_date),
                escape_html(&row.vendor_name),
                escape_html(&row.category_name),
                row.amount_class,
                escape_html(&row.display_amount)
            ));
        }
        html.push_str("</ul></section>");
    }
    html
}

/// HTMX: Save the detail form, then go back to the list
pub async fn htmx_transaction_save(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let submission = read_submission(multipart).await?;
    let outcome = state
        .workflow
        .submit(&submission)
        .await
        .map_err(|e| ApiError::operation("Error: ", e))?;

    let notice = if outcome.attachment_dropped {
        "saved_without_attachment"
    } else {
        "saved"
    };
    Ok(hx_redirect(&format!("{}?notice={}", outcome.redirect, notice)))
}

/// HTMX: Delete, then go back to the list
pub async fn htmx_transaction_delete(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Response, ApiError> {
    let next = state
        .workflow
        .delete(&transaction_id)
        .await
        .map_err(|e| ApiError::operation("Error deleting transaction: ", e))?;
    Ok(hx_redirect(&format!("{}?notice=deleted", next)))
}

/// Collect the posted form fields; unknown fields are ignored
async fn read_submission(mut multipart: Multipart) -> Result<TransactionSubmission, ApiError> {
    let mut submission = TransactionSubmission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "attachment" => submission.file = read_upload(field).await?,
            "transaction_id" => {
                let id = read_text(field).await?;
                submission.transaction_id = if id.trim().is_empty() { None } else { Some(id) };
            }
            "title" => submission.title = read_text(field).await?,
            "amount" => submission.amount = read_text(field).await?,
            "transaction_date" => submission.transaction_date = read_text(field).await?,
            "category" => submission.category = read_text(field).await?,
            "new_category" => submission.new_category = read_text(field).await?,
            "vendor" => submission.vendor = read_text(field).await?,
            "new_vendor" => submission.new_vendor = read_text(field).await?,
            "attachment_url" => submission.attachment_url = read_text(field).await?,
            "attachment_type" => submission.attachment_type = read_text(field).await?,
            "remove_attachment" => {
                submission.remove_attachment = read_text(field).await?.trim() == "true";
            }
            other => log::debug!("Ignoring form field {:?}", other),
        }
    }
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use menuda_core::memory::{BackendCall, Endpoint, MemoryBackend};
    use menuda_core::{CoreError, Transaction};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn tx(id: &str, title: &str, amount: &str, date: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            title: title.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            transaction_date: date.to_string(),
            category_id: "c1".to_string(),
            category_name: "Groceries".to_string(),
            vendor_id: "v1".to_string(),
            vendor_name: "Mercadona".to_string(),
            attachment_url: None,
            attachment_type: None,
        }
    }

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new()
                .with_category("c1", "Groceries")
                .with_vendor("v1", "Mercadona", Some("c1"))
                .with_transaction(tx("t1", "Weekly shop", "-54.20", "2026-10-12"))
                .with_transaction(tx("t2", "Salary", "2500", "2026-09-30")),
        )
    }

    fn save_body(extra: &[(&str, &str)]) -> Vec<u8> {
        let mut fields = vec![
            ("transaction_id", ""),
            ("title", "Lunch"),
            ("amount", "-12.50"),
            ("transaction_date", "2026-10-18"),
            ("category", "c1"),
            ("new_category", ""),
            ("vendor", "v1"),
            ("new_vendor", ""),
            ("attachment_url", ""),
            ("attachment_type", ""),
            ("remove_attachment", "false"),
        ];
        for (name, value) in extra {
            match fields.iter_mut().find(|(n, _)| n == name) {
                Some(field) => field.1 = *value,
                None => fields.push((*name, *value)),
            }
        }
        multipart(&fields, &[])
    }

    #[tokio::test]
    async fn test_list_groups_by_month() {
        let (status, _, body) = send(state(backend(), true), get("/transactions/list")).await;
        assert_eq!(status, StatusCode::OK);
        let october = body.find("October 2026").unwrap();
        let september = body.find("September 2026").unwrap();
        assert!(october < september);
        assert!(body.contains("href='/transactions/detail?id=t1'"));
        assert!(body.contains("<span class='amount negative font-medium'>-$54.20</span>"));
        assert!(body.contains("<span class='amount positive font-medium'>$2,500.00</span>"));
    }

    #[tokio::test]
    async fn test_list_empty_state() {
        let (_, _, body) = send(state(Arc::new(MemoryBackend::new()), true), get("/transactions/list")).await;
        assert!(body.contains("No transactions yet"));
    }

    #[tokio::test]
    async fn test_list_without_profile_redirects() {
        let backend = backend();
        let (_, headers, _) = send(state(backend.clone(), false), get("/transactions/list")).await;
        assert_eq!(headers["HX-Redirect"], "/login");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_once_and_redirects() {
        let backend = backend();
        let (status, headers, _) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/save", &multipart_type(), save_body(&[])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["HX-Redirect"], "/transactions?notice=saved");
        let writes = backend.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            BackendCall::CreateTransaction(payload) => {
                assert_eq!(payload.title, "Lunch");
                assert_eq!(payload.amount, Decimal::from_str("-12.50").unwrap());
                assert_eq!(payload.category_id, "c1");
                assert_eq!(payload.user_id, "user-1");
            }
            other => panic!("unexpected write {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_edit_updates() {
        let backend = backend();
        let (_, headers, _) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/save", &multipart_type(), save_body(&[("transaction_id", "t1")])),
        )
        .await;
        assert_eq!(headers["HX-Redirect"], "/transactions?notice=saved");
        assert_eq!(backend.count(Endpoint::UpdateTransaction), 1);
        assert_eq!(backend.count(Endpoint::CreateTransaction), 0);
    }

    #[tokio::test]
    async fn test_save_validation_toast_without_writes() {
        let backend = backend();
        let (status, headers, body) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/save", &multipart_type(), save_body(&[("category", "new")])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["HX-Retarget"], "#toast");
        assert!(body.contains("Error: "));
        assert!(body.contains("toast-error"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_new_category_and_vendor() {
        let backend = backend();
        let body = save_body(&[
            ("category", "new"),
            ("new_category", "Restaurants"),
            ("vendor", "new"),
            ("new_vendor", "Casa Pepe"),
        ]);
        let (_, headers, _) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/save", &multipart_type(), body),
        )
        .await;

        assert_eq!(headers["HX-Redirect"], "/transactions?notice=saved");
        let writes = backend.writes();
        assert_eq!(writes.len(), 3);
        assert!(matches!(&writes[0], BackendCall::CreateCategory { name } if name == "Restaurants"));
        assert!(matches!(&writes[1], BackendCall::CreateVendor { name, .. } if name == "Casa Pepe"));
    }

    #[tokio::test]
    async fn test_upload_failure_still_saves() {
        let backend = backend();
        backend.fail(Endpoint::UploadAttachment, CoreError::Status { status: 500, message: String::new() });
        let fields = [
            ("title", "Lunch"),
            ("amount", "-12.50"),
            ("transaction_date", "2026-10-18"),
            ("category", "c1"),
            ("vendor", "v1"),
        ];
        let body = multipart(&fields, &[("attachment", "ticket.jpg", "image/jpeg", &b"jpeg-bytes"[..])]);
        let (_, headers, _) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/save", &multipart_type(), body),
        )
        .await;

        assert_eq!(headers["HX-Redirect"], "/transactions?notice=saved_without_attachment");
        assert_eq!(backend.count(Endpoint::CreateTransaction), 1);
    }

    #[tokio::test]
    async fn test_save_without_profile_redirects_to_login() {
        let backend = backend();
        let (_, headers, _) = send(
            state(backend.clone(), false),
            htmx_post("/transactions/save", &multipart_type(), save_body(&[])),
        )
        .await;
        assert_eq!(headers["HX-Redirect"], "/login");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_redirects_with_notice() {
        let backend = backend();
        let (_, headers, _) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/t1/delete", "application/x-www-form-urlencoded", ""),
        )
        .await;
        assert_eq!(headers["HX-Redirect"], "/transactions?notice=deleted");
        assert!(backend.transactions().iter().all(|t| t.transaction_id != "t1"));
    }

    #[tokio::test]
    async fn test_delete_failure_toast() {
        let backend = backend();
        let (_, headers, body) = send(
            state(backend.clone(), true),
            htmx_post("/transactions/missing/delete", "application/x-www-form-urlencoded", ""),
        )
        .await;
        assert_eq!(headers["HX-Retarget"], "#toast");
        assert!(body.contains("Error deleting transaction: Transaction not found"));
    }
}
