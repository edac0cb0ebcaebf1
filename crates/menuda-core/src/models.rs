//! Core data models mirrored from the Menuda REST API

use bytes::Bytes;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::AttachmentType;

/// Locally cached identity record, created at login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: String,
    /// Opaque id assigned by the backend
    #[serde(default)]
    pub user_id: String,
}

impl UserProfile {
    /// First word of the display name, used in the header greeting
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    pub fn has_user_id(&self) -> bool {
        !self.user_id.trim().is_empty()
    }
}

/// Identity sent to `POST /users/check`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: String,
}

impl NewUser {
    pub fn into_profile(self, user_id: String) -> UserProfile {
        UserProfile {
            name: self.name,
            email: self.email,
            picture: self.picture,
            user_id,
        }
    }
}

/// Spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
}

/// Vendor, optionally tied to a default category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    pub vendor_name: String,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Transaction as returned by the backend (joined with category and vendor names)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub title: String,
    /// Signed amount: negative for expenses, positive for income
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    /// ISO date or datetime as sent by the server
    pub transaction_date: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub vendor_id: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    /// Whatever the client stored; unknown values fall back to the URL extension
    #[serde(default, deserialize_with = "deserialize_attachment_type")]
    pub attachment_type: Option<AttachmentType>,
}

impl Transaction {
    /// Calendar date of the transaction
    pub fn date(&self) -> Option<NaiveDate> {
        let head = self.transaction_date.get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    /// Attachment if the record carries one
    pub fn attachment(&self) -> Option<Attachment> {
        let url = self.attachment_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Attachment {
            url: url.to_string(),
            attachment_type: self
                .attachment_type
                .unwrap_or_else(|| AttachmentType::from_url(url)),
        })
    }
}

/// Stored attachment reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
}

impl Attachment {
    /// Last path segment of the URL, shown as the attachment name
    pub fn file_name(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').next().unwrap_or(path)
    }
}

/// A file picked in the form, ready for multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_name.is_empty() || self.bytes.is_empty()
    }

    /// Preview kind derived from the MIME type
    pub fn attachment_type(&self) -> AttachmentType {
        AttachmentType::from_mime(&self.content_type)
    }
}

/// Fields extracted from a receipt by `POST /invoices/process`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceExtraction {
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub amount: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub vendor: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub category: String,
}

/// Response wrapper used by every backend endpoint: `{status, data|message}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// `POST /users/check` returns the id at the top level
    #[serde(default)]
    pub user_id: Option<String>,
    /// `POST /transactions` returns the new id at the top level
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Fail unless the envelope reports success
    pub fn ensure_success(self, fallback: &str) -> CoreResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CoreError::Backend {
                message: self.message.unwrap_or_else(|| fallback.to_string()),
            })
        }
    }

    /// Successful payload, or a backend error carrying the server message
    pub fn into_data(self, fallback: &str) -> CoreResult<T> {
        let envelope = self.ensure_success(fallback)?;
        envelope.data.ok_or_else(|| CoreError::Decode {
            message: format!("{}: response has no data", fallback),
        })
    }
}

/// Body of `POST /transactions` and `PUT /transactions/:id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPayload {
    pub user_id: String,
    pub title: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    /// YYYY-MM-DD
    pub transaction_date: String,
    pub category_id: String,
    pub vendor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<AttachmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl TransactionPayload {
    /// Attach a stored file; the type is inferred from the URL when unknown
    pub fn with_attachment(mut self, url: String, attachment_type: Option<AttachmentType>) -> Self {
        let attachment_type = attachment_type.unwrap_or_else(|| AttachmentType::from_url(&url));
        self.attachment_url = Some(url);
        self.attachment_type = Some(attachment_type);
        self
    }
}

// ==================== Serde helpers ====================

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseValue {
    Text(String),
    Number(serde_json::Number),
    Null,
}

/// Amounts arrive as JSON numbers or as decimal strings depending on the column type
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match LooseValue::deserialize(deserializer)? {
        LooseValue::Text(s) => s,
        LooseValue::Number(n) => n.to_string(),
        LooseValue::Null => return Ok(Decimal::ZERO),
    };
    parse_decimal(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", text)))
}

fn deserialize_attachment_type<'de, D>(deserializer: D) -> Result<Option<AttachmentType>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match LooseValue::deserialize(deserializer)? {
        LooseValue::Text(s) => s,
        LooseValue::Number(_) | LooseValue::Null => return Ok(None),
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(match text.parse::<AttachmentType>() {
        Ok(kind) => Some(kind),
        // A raw MIME type such as "image/jpeg"
        Err(_) if text.contains('/') => Some(AttachmentType::from_mime(text)),
        Err(_) => {
            log::debug!("Unknown attachment type {:?}, inferring from URL", text);
            None
        }
    })
}

fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseValue::deserialize(deserializer)? {
        LooseValue::Text(s) => s,
        LooseValue::Number(n) => n.to_string(),
        LooseValue::Null => String::new(),
    })
}

fn serialize_amount<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match amount.to_f64() {
        Some(value) => serializer.serialize_f64(value),
        None => serializer.serialize_str(&amount.to_string()),
    }
}

/// Parse user or server supplied decimal text, tolerating exponent notation
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_amount_accepts_string_and_number() {
        let from_string: Transaction = serde_json::from_value(json!({
            "transaction_id": "t1",
            "title": "Coffee",
            "amount": "-4.50",
            "transaction_date": "2026-10-19T00:00:00",
            "category_id": "c1",
            "category_name": "Food",
            "vendor_id": "v1",
            "vendor_name": "Cafe",
            "attachment_url": null,
            "attachment_type": null
        }))
        .unwrap();
        assert_eq!(from_string.amount, Decimal::from_str("-4.50").unwrap());
        assert_eq!(from_string.date(), NaiveDate::from_ymd_opt(2026, 10, 19));
        assert!(from_string.attachment().is_none());
        assert!(from_string.amount < Decimal::ZERO);

        let from_number: Transaction = serde_json::from_value(json!({
            "transaction_id": "t2",
            "title": "Salary",
            "amount": 2500.0,
            "transaction_date": "2026-10-01"
        }))
        .unwrap();
        assert_eq!(from_number.amount, Decimal::from(2500));
    }

    #[test]
    fn test_unknown_attachment_type_does_not_break_list() {
        let envelope: ApiEnvelope<Vec<Transaction>> = serde_json::from_value(json!({
            "status": "success",
            "data": [
                {
                    "transaction_id": "t1",
                    "title": "Scan",
                    "amount": -12,
                    "transaction_date": "2026-10-18",
                    "attachment_url": "https://bucket.s3/u1/scan.pdf",
                    "attachment_type": "document"
                },
                {
                    "transaction_id": "t2",
                    "title": "Photo",
                    "amount": -8,
                    "transaction_date": "2026-10-17",
                    "attachment_url": "https://bucket.s3/u1/photo",
                    "attachment_type": "IMAGE/JPEG"
                },
                {
                    "transaction_id": "t3",
                    "title": "Voice",
                    "amount": -3,
                    "transaction_date": "2026-10-16",
                    "attachment_url": "https://bucket.s3/u1/note.webm",
                    "attachment_type": "Audio"
                }
            ]
        }))
        .unwrap();
        let transactions = envelope.into_data("Failed to load transactions").unwrap();
        assert_eq!(transactions.len(), 3);

        let kinds: Vec<AttachmentType> = transactions
            .iter()
            .map(|t| t.attachment().unwrap().attachment_type)
            .collect();
        assert_eq!(
            kinds,
            vec![AttachmentType::Pdf, AttachmentType::Image, AttachmentType::Audio]
        );
    }

    #[test]
    fn test_attachment_inferred_from_url() {
        let tx: Transaction = serde_json::from_value(json!({
            "transaction_id": "t1",
            "title": "Dinner",
            "amount": -30,
            "transaction_date": "2026-10-19",
            "attachment_url": "https://bucket.s3/u1/abc123.png"
        }))
        .unwrap();
        let attachment = tx.attachment().unwrap();
        assert_eq!(attachment.attachment_type, AttachmentType::Image);
        assert_eq!(attachment.file_name(), "abc123.png");
    }

    #[test]
    fn test_envelope_into_data() {
        let ok: ApiEnvelope<Vec<Category>> = serde_json::from_value(json!({
            "status": "success",
            "data": [{"category_id": "c1", "category_name": "Food"}],
            "count": 1
        }))
        .unwrap();
        assert_eq!(ok.into_data("Failed to load categories").unwrap().len(), 1);

        let failed: ApiEnvelope<Vec<Category>> = serde_json::from_value(json!({
            "status": "error",
            "message": "Missing required parameter: user_id"
        }))
        .unwrap();
        assert_eq!(
            failed.into_data("Failed to load categories").unwrap_err(),
            CoreError::Backend { message: "Missing required parameter: user_id".to_string() }
        );
    }

    #[test]
    fn test_payload_omits_absent_attachment() {
        let payload = TransactionPayload {
            user_id: "u1".to_string(),
            title: "Coffee".to_string(),
            amount: Decimal::from_str("-4.5").unwrap(),
            transaction_date: "2026-10-19".to_string(),
            category_id: "c1".to_string(),
            vendor_id: "v1".to_string(),
            attachment_url: None,
            attachment_type: None,
            transaction_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["amount"], json!(-4.5));
        assert!(value.get("attachment_url").is_none());
        assert!(value.get("transaction_id").is_none());

        let with_file = payload.with_attachment("https://s3/u1/r.pdf".to_string(), None);
        let value = serde_json::to_value(&with_file).unwrap();
        assert_eq!(value["attachment_type"], json!("pdf"));
    }

    #[test]
    fn test_invoice_extraction_tolerates_numbers_and_missing_fields() {
        let extraction: InvoiceExtraction = serde_json::from_value(json!({
            "title": "Groceries",
            "amount": 42.1,
            "vendor": "Mercadona"
        }))
        .unwrap();
        assert_eq!(extraction.amount, "42.1");
        assert_eq!(extraction.category, "");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 12.30 "), Some(Decimal::from_str("12.30").unwrap()));
        assert_eq!(parse_decimal("1e2"), Some(Decimal::from(100)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_profile_first_name() {
        let profile = UserProfile {
            name: "Ana María López".to_string(),
            email: "ana@example.com".to_string(),
            picture: String::new(),
            user_id: "u1".to_string(),
        };
        assert_eq!(profile.first_name(), "Ana");
        assert!(profile.has_user_id());
    }
}
