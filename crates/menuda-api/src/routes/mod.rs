//! Route modules for the front-end server
//!
//! - auth: Sign-in page, Google credential exchange, logout
//! - transactions: Transaction list and detail form
//! - invoices: Receipt scanning
//! - settings: Settings page
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API and HTMX endpoints
//! - page.rs: Full page rendering

pub mod auth;
pub mod invoices;
pub mod settings;
pub mod transactions;

use axum::extract::multipart::Field;

use menuda_core::Upload;

use crate::ApiError;

/// Read a file field; an empty file input yields `None`
pub(crate) async fn read_upload(field: Field<'_>) -> Result<Option<Upload>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Could not read upload: {}", e)))?;
    let upload = Upload::new(file_name, content_type, bytes);
    Ok(if upload.is_empty() { None } else { Some(upload) })
}

/// Read a text field
pub(crate) async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Could not read form field: {}", e)))
}
