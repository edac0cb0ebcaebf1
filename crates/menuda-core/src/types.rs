//! Basic types shared by the models and the transaction form

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IMAGE_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(jpeg|jpg|png|gif)$").unwrap());
static PDF_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());
static AUDIO_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(mp3|wav|ogg)$").unwrap());

/// Coarse attachment kind, as tagged by the backend on upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    /// Receipt photos and other images, previewed inline
    Image,
    /// PDF documents
    Pdf,
    /// Voice notes
    Audio,
    /// Anything else
    File,
}

impl Default for AttachmentType {
    fn default() -> Self {
        AttachmentType::File
    }
}

impl AttachmentType {
    /// Classify by MIME type of a chosen file
    pub fn from_mime(content_type: &str) -> Self {
        let mime = content_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentType::Image
        } else if mime == "application/pdf" {
            AttachmentType::Pdf
        } else if mime.starts_with("audio/") {
            AttachmentType::Audio
        } else {
            AttachmentType::File
        }
    }

    /// Guess from the extension of a stored attachment URL
    pub fn from_url(url: &str) -> Self {
        // Ignore query strings on signed URLs
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if IMAGE_EXT.is_match(path) {
            AttachmentType::Image
        } else if PDF_EXT.is_match(path) {
            AttachmentType::Pdf
        } else if AUDIO_EXT.is_match(path) {
            AttachmentType::Audio
        } else {
            AttachmentType::File
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, AttachmentType::Image)
    }
}

impl std::str::FromStr for AttachmentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(AttachmentType::Image),
            "pdf" => Ok(AttachmentType::Pdf),
            "audio" => Ok(AttachmentType::Audio),
            "file" => Ok(AttachmentType::File),
            _ => Err(format!("Invalid attachment type: {}", s)),
        }
    }
}

impl std::fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentType::Image => write!(f, "image"),
            AttachmentType::Pdf => write!(f, "pdf"),
            AttachmentType::Audio => write!(f, "audio"),
            AttachmentType::File => write!(f, "file"),
        }
    }
}

/// Whether the transaction form creates a new record or edits an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

impl FormMode {
    /// Edit mode when a non-empty `id` query parameter is present
    pub fn from_query_id(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => FormMode::Edit { id: id.to_string() },
            _ => FormMode::Create,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, FormMode::Edit { .. })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            FormMode::Edit { id } => Some(id),
            FormMode::Create => None,
        }
    }

    pub fn page_title(&self) -> &'static str {
        match self {
            FormMode::Create => "New Transaction",
            FormMode::Edit { .. } => "Edit Transaction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_type_from_mime() {
        assert_eq!(AttachmentType::from_mime("image/jpeg"), AttachmentType::Image);
        assert_eq!(AttachmentType::from_mime("application/pdf"), AttachmentType::Pdf);
        assert_eq!(AttachmentType::from_mime("audio/ogg"), AttachmentType::Audio);
        assert_eq!(AttachmentType::from_mime("text/csv"), AttachmentType::File);
    }

    #[test]
    fn test_attachment_type_from_url() {
        assert_eq!(AttachmentType::from_url("https://s3/u/receipt.JPG"), AttachmentType::Image);
        assert_eq!(AttachmentType::from_url("https://s3/u/bill.pdf?sig=abc"), AttachmentType::Pdf);
        assert_eq!(AttachmentType::from_url("https://s3/u/note.wav"), AttachmentType::Audio);
        assert_eq!(AttachmentType::from_url("https://s3/u/data.csv"), AttachmentType::File);
        assert_eq!(AttachmentType::from_url("https://s3/u/pdf"), AttachmentType::File);
    }

    #[test]
    fn test_attachment_type_round_trip_names() {
        for name in ["image", "pdf", "audio", "file"] {
            let parsed: AttachmentType = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
        assert!("video".parse::<AttachmentType>().is_err());
    }

    #[test]
    fn test_form_mode_from_query() {
        assert_eq!(FormMode::from_query_id(None), FormMode::Create);
        assert_eq!(FormMode::from_query_id(Some("  ")), FormMode::Create);
        let mode = FormMode::from_query_id(Some("tx-1"));
        assert!(mode.is_edit());
        assert_eq!(mode.transaction_id(), Some("tx-1"));
        assert_eq!(mode.page_title(), "Edit Transaction");
    }
}
