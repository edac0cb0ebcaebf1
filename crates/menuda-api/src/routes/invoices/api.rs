//! Invoice HTMX endpoints
//!
//! Endpoints:
//! - htmx_process_invoice: Extract a receipt and open the prefilled form

use axum::extract::{Multipart, State};
use axum::response::Response;

use menuda_core::Upload;

use crate::routes::read_upload;
use crate::{hx_redirect, ApiError, AppState};

/// HTMX: Scan the posted `invoice` file and redirect to the prefilled detail page
pub async fn htmx_process_invoice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid form data: {}", e)))?
    {
        if field.name() == Some("invoice") {
            upload = read_upload(field).await?;
        }
    }

    let upload = upload.unwrap_or_else(|| Upload::new("", "", Vec::new()));
    let location = state
        .workflow
        .process_invoice(&upload)
        .await
        .map_err(|e| ApiError::operation("Error processing invoice: ", e))?;
    log::info!("Receipt {} processed", upload.file_name);
    Ok(hx_redirect(&location))
}
