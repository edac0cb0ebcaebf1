//! Menuda REST backend client
//!
//! Every endpoint answers with the `{status, data|message}` envelope. Reads are
//! wrapped in [`with_retry`]; writes are sent exactly once.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use menuda_config::Config;

use crate::error::{CoreError, CoreResult};
use crate::models::{
    ApiEnvelope, Attachment, Category, InvoiceExtraction, NewUser, Transaction, TransactionPayload,
    Upload, Vendor,
};
use crate::retry::{with_retry, RetryPolicy};
use crate::types::AttachmentType;

/// One method per backend endpoint used by the front-end
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `POST /users/check`; returns the user id, creating the user if needed
    async fn check_user(&self, user: &NewUser) -> CoreResult<String>;

    async fn list_categories(&self, user_id: &str) -> CoreResult<Vec<Category>>;
    async fn create_category(&self, user_id: &str, name: &str) -> CoreResult<Category>;

    async fn list_vendors(&self, user_id: &str) -> CoreResult<Vec<Vendor>>;
    async fn create_vendor(&self, user_id: &str, name: &str, category_id: &str) -> CoreResult<Vendor>;

    async fn list_transactions(&self, user_id: &str) -> CoreResult<Vec<Transaction>>;
    async fn get_transaction(&self, user_id: &str, transaction_id: &str) -> CoreResult<Transaction>;
    /// `POST /transactions`; returns the new transaction id
    async fn create_transaction(&self, payload: &TransactionPayload) -> CoreResult<String>;
    async fn update_transaction(&self, transaction_id: &str, payload: &TransactionPayload) -> CoreResult<()>;
    async fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> CoreResult<()>;

    /// `POST /attachments/upload` (multipart `file`, `user_id`)
    async fn upload_attachment(&self, user_id: &str, upload: &Upload) -> CoreResult<Attachment>;
    /// `POST /invoices/process` (multipart `invoice`, `user_id`)
    async fn process_invoice(&self, user_id: &str, upload: &Upload) -> CoreResult<InvoiceExtraction>;
}

/// Upload response body: `{url, type, filename}`
#[derive(Debug, Deserialize)]
struct UploadedFile {
    url: String,
    #[serde(rename = "type", default)]
    attachment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// [`BackendApi`] over HTTP with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> CoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn from_config(config: &Config) -> CoreResult<Self> {
        Self::new(
            config.api_base(),
            config.request_timeout(),
            RetryPolicy::from_config(config),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with retry
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> CoreResult<ApiEnvelope<T>> {
        let this = self;
        with_retry(self.retry, path, move || async move {
            let request = this.client.get(this.url(path)).query(query);
            this.send::<T>(Method::GET, path, request).await
        })
        .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> CoreResult<ApiEnvelope<T>> {
        log::debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_default();
            log::debug!("{} {} -> {} {}", method, path, status.as_u16(), message);
            return Err(CoreError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_json<T: DeserializeOwned>(&self, method: Method, path: &str, body: &Value) -> CoreResult<ApiEnvelope<T>> {
        let request = self.client.request(method.clone(), self.url(path)).json(body);
        self.send(method, path, request).await
    }

    fn file_part(upload: &Upload) -> CoreResult<Part> {
        let part = Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name.clone());
        let part = if upload.content_type.is_empty() {
            part
        } else {
            part.mime_str(&upload.content_type)?
        };
        Ok(part)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn check_user(&self, user: &NewUser) -> CoreResult<String> {
        let body = serde_json::to_value(user)?;
        let envelope = self
            .send_json::<Value>(Method::POST, "/users/check", &body)
            .await?
            .ensure_success("Unknown error occurred")?;
        envelope
            .user_id
            .or_else(|| {
                envelope
                    .data
                    .as_ref()
                    .and_then(|d| d.get("user_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| CoreError::Decode {
                message: "user check returned no user_id".to_string(),
            })
    }

    async fn list_categories(&self, user_id: &str) -> CoreResult<Vec<Category>> {
        self.get("/categories", &[("user_id", user_id)])
            .await?
            .into_data("Failed to load categories")
    }

    async fn create_category(&self, user_id: &str, name: &str) -> CoreResult<Category> {
        let body = json!({ "user_id": user_id, "category_name": name });
        self.send_json(Method::POST, "/categories", &body)
            .await?
            .into_data("Failed to create category")
    }

    async fn list_vendors(&self, user_id: &str) -> CoreResult<Vec<Vendor>> {
        self.get("/vendors", &[("user_id", user_id)])
            .await?
            .into_data("Failed to load vendors")
    }

    async fn create_vendor(&self, user_id: &str, name: &str, category_id: &str) -> CoreResult<Vendor> {
        let body = json!({ "user_id": user_id, "vendor_name": name, "category_id": category_id });
        self.send_json(Method::POST, "/vendors", &body)
            .await?
            .into_data("Failed to create vendor")
    }

    async fn list_transactions(&self, user_id: &str) -> CoreResult<Vec<Transaction>> {
        self.get("/transactions", &[("user_id", user_id)])
            .await?
            .into_data("Failed to load transactions")
    }

    async fn get_transaction(&self, user_id: &str, transaction_id: &str) -> CoreResult<Transaction> {
        let path = format!("/transactions/{}", urlencoding::encode(transaction_id));
        self.get(&path, &[("user_id", user_id)])
            .await?
            .into_data("Failed to load transaction")
    }

    async fn create_transaction(&self, payload: &TransactionPayload) -> CoreResult<String> {
        let body = serde_json::to_value(payload)?;
        let envelope = self
            .send_json::<Value>(Method::POST, "/transactions", &body)
            .await?
            .ensure_success("Failed to save transaction")?;
        envelope
            .transaction_id
            .or_else(|| {
                envelope
                    .data
                    .as_ref()
                    .and_then(|d| d.get("transaction_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| CoreError::Decode {
                message: "create returned no transaction_id".to_string(),
            })
    }

    async fn update_transaction(&self, transaction_id: &str, payload: &TransactionPayload) -> CoreResult<()> {
        let path = format!("/transactions/{}", urlencoding::encode(transaction_id));
        let body = serde_json::to_value(payload)?;
        self.send_json::<Value>(Method::PUT, &path, &body)
            .await?
            .ensure_success("Failed to save transaction")?;
        Ok(())
    }

    async fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> CoreResult<()> {
        let path = format!("/transactions/{}", urlencoding::encode(transaction_id));
        let request = self.client.delete(self.url(&path)).query(&[("user_id", user_id)]);
        self.send::<Value>(Method::DELETE, &path, request)
            .await?
            .ensure_success("Failed to delete transaction")?;
        Ok(())
    }

    async fn upload_attachment(&self, user_id: &str, upload: &Upload) -> CoreResult<Attachment> {
        let form = Form::new()
            .part("file", Self::file_part(upload)?)
            .text("user_id", user_id.to_string());
        let request = self.client.post(self.url("/attachments/upload")).multipart(form);
        let uploaded: UploadedFile = self
            .send(Method::POST, "/attachments/upload", request)
            .await?
            .into_data("Failed to upload file")?;
        let attachment_type = uploaded
            .attachment_type
            .and_then(|t| t.parse::<AttachmentType>().ok())
            .unwrap_or_else(|| upload.attachment_type());
        Ok(Attachment {
            url: uploaded.url,
            attachment_type,
        })
    }

    async fn process_invoice(&self, user_id: &str, upload: &Upload) -> CoreResult<InvoiceExtraction> {
        let form = Form::new()
            .part("invoice", Self::file_part(upload)?)
            .text("user_id", user_id.to_string());
        let request = self.client.post(self.url("/invoices/process")).multipart(form);
        self.send(Method::POST, "/invoices/process", request)
            .await?
            .into_data("Failed to process invoice")
    }
}
