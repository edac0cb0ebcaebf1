//! Transaction form state and submission validation
//!
//! [`TransactionForm`] holds what the detail page renders. Posted values come back as
//! a [`TransactionSubmission`] and are checked by
//! [`TransactionSubmission::validate`] before any request is made.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{parse_decimal, Attachment, Category, InvoiceExtraction, Transaction, TransactionPayload, Upload, Vendor};
use crate::types::{AttachmentType, FormMode};

/// Option value that reveals the "new name" input
pub const NEW_OPTION: &str = "new";

/// Date format used by `<input type="date">` and the backend
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ==================== Select fields ====================

/// Which reference-data select a field is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKind {
    Category,
    Vendor,
}

impl SelectKind {
    /// Label of the synthetic "create new" option
    pub fn new_option_label(&self) -> &'static str {
        match self {
            SelectKind::Category => "+ Create New Category",
            SelectKind::Vendor => "+ Create New Vendor",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            SelectKind::Category => "Select a category",
            SelectKind::Vendor => "Select a vendor",
        }
    }

    /// Form field holding the selected value
    pub fn field_name(&self) -> &'static str {
        match self {
            SelectKind::Category => "category",
            SelectKind::Vendor => "vendor",
        }
    }

    /// Form field holding the typed name when "new" is selected
    pub fn new_field_name(&self) -> &'static str {
        match self {
            SelectKind::Category => "new_category",
            SelectKind::Vendor => "new_vendor",
        }
    }

    fn required_message(&self) -> &'static str {
        match self {
            SelectKind::Category => "Category is required",
            SelectKind::Vendor => "Vendor is required",
        }
    }

    fn new_name_required_message(&self) -> &'static str {
        match self {
            SelectKind::Category => "New category name is required",
            SelectKind::Vendor => "New vendor name is required",
        }
    }
}

/// One `<option>` of a reference-data select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    /// Default category of a vendor option
    pub category_id: Option<String>,
}

impl From<&Category> for SelectOption {
    fn from(category: &Category) -> Self {
        Self {
            value: category.category_id.clone(),
            label: category.category_name.clone(),
            category_id: None,
        }
    }
}

impl From<&Vendor> for SelectOption {
    fn from(vendor: &Vendor) -> Self {
        Self {
            value: vendor.vendor_id.clone(),
            label: vendor.vendor_name.clone(),
            category_id: vendor.category_id.clone(),
        }
    }
}

/// Current value of a select
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Existing(String),
    New,
}

impl Selection {
    /// Interpret a posted select value
    pub fn from_value(value: &str) -> Self {
        match value.trim() {
            "" => Selection::None,
            NEW_OPTION => Selection::New,
            id => Selection::Existing(id.to_string()),
        }
    }

    /// Value to post back for this selection
    pub fn value(&self) -> &str {
        match self {
            Selection::None => "",
            Selection::Existing(id) => id,
            Selection::New => NEW_OPTION,
        }
    }
}

/// What a prefill or an edit asked to select, kept until the options arrive
#[derive(Debug, Clone, PartialEq, Eq)]
enum Wanted {
    Name(String),
    IdOrName { id: String, name: String },
}

/// Category or vendor select with its "create new" companion input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub kind: SelectKind,
    options: Vec<SelectOption>,
    pub selected: Selection,
    /// Text of the "new name" input
    pub new_name: String,
    wanted: Option<Wanted>,
}

impl SelectField {
    pub fn new(kind: SelectKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
            selected: Selection::None,
            new_name: String::new(),
            wanted: None,
        }
    }

    /// Loaded options, without the synthetic "new" entry
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Replace the options and re-apply any pending selection
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        self.options = options;
        self.resolve();
    }

    /// Select the option whose label matches `name` case-insensitively.
    /// With no match, "new" is selected and `name` is filled in.
    pub fn select_by_name(&mut self, name: &str) {
        self.wanted = Some(Wanted::Name(name.trim().to_string()));
        self.resolve();
    }

    /// Select by id, falling back to the label when the id is not listed
    pub fn select_by_id_or_name(&mut self, id: &str, name: &str) {
        self.wanted = Some(Wanted::IdOrName {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
        });
        self.resolve();
    }

    pub fn is_new(&self) -> bool {
        self.selected == Selection::New
    }

    pub fn selected_id(&self) -> Option<&str> {
        match &self.selected {
            Selection::Existing(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.value() == value
    }

    fn find_by_name(&self, name: &str) -> Option<&SelectOption> {
        let name = name.to_lowercase();
        self.options.iter().find(|o| o.label.trim().to_lowercase() == name)
    }

    fn resolve(&mut self) {
        let Some(wanted) = self.wanted.clone() else {
            return;
        };
        match wanted {
            Wanted::Name(name) => {
                if name.is_empty() {
                    return;
                }
                match self.find_by_name(&name).map(|o| o.value.clone()) {
                    Some(id) => {
                        self.selected = Selection::Existing(id);
                        self.new_name.clear();
                    }
                    None => {
                        self.selected = Selection::New;
                        self.new_name = name;
                    }
                }
            }
            Wanted::IdOrName { id, name } => {
                if !id.is_empty() && self.options.iter().any(|o| o.value == id) {
                    self.selected = Selection::Existing(id);
                } else if let Some(found) = self.find_by_name(&name).map(|o| o.value.clone()) {
                    self.selected = Selection::Existing(found);
                } else if !id.is_empty() {
                    // Keep the record's own id even if the list failed to load
                    let label = if name.is_empty() { id.clone() } else { name };
                    self.options.push(SelectOption {
                        value: id.clone(),
                        label,
                        category_id: None,
                    });
                    self.selected = Selection::Existing(id);
                } else if !name.is_empty() {
                    self.selected = Selection::New;
                    self.new_name = name;
                }
            }
        }
    }
}

// ==================== Prefill ====================

/// Query parameters that prefill the form, e.g. after a receipt scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefillParams {
    #[serde(default)]
    pub prefill: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub attachment_type: Option<String>,
}

impl PrefillParams {
    /// Parameters produced by a processed invoice and its stored file
    pub fn from_extraction(extraction: &InvoiceExtraction, attachment: &Attachment) -> Self {
        Self {
            prefill: Some("true".to_string()),
            title: Some(extraction.title.clone()),
            amount: Some(extraction.amount.clone()),
            date: Some(extraction.date.clone()),
            category: Some(extraction.category.clone()),
            vendor: Some(extraction.vendor.clone()),
            attachment_url: Some(attachment.url.clone()),
            attachment_type: Some(attachment.attachment_type.to_string()),
        }
    }

    pub fn is_prefill(&self) -> bool {
        self.prefill.as_deref() == Some("true")
    }

    /// Attachment carried in the query; both URL and type must be present
    pub fn attachment(&self) -> Option<Attachment> {
        let url = non_empty(self.attachment_url.as_deref())?;
        let kind = non_empty(self.attachment_type.as_deref())?;
        Some(Attachment {
            url: url.to_string(),
            attachment_type: kind.parse().unwrap_or_else(|_| AttachmentType::from_url(url)),
        })
    }

    /// Query string in the order the detail page expects
    pub fn to_query(&self) -> String {
        let pairs = [
            ("prefill", &self.prefill),
            ("title", &self.title),
            ("amount", &self.amount),
            ("date", &self.date),
            ("category", &self.category),
            ("vendor", &self.vendor),
            ("attachment_url", &self.attachment_url),
            ("attachment_type", &self.attachment_type),
        ];
        pairs
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| format!("{}={}", key, urlencoding::encode(v)))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ==================== Form state ====================

/// Everything needed to render the transaction detail form
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    pub mode: FormMode,
    pub title: String,
    pub amount: String,
    /// YYYY-MM-DD or empty
    pub date: String,
    pub category: SelectField,
    pub vendor: SelectField,
    pub attachment: Option<Attachment>,
}

impl TransactionForm {
    fn blank(mode: FormMode) -> Self {
        Self {
            mode,
            title: String::new(),
            amount: String::new(),
            date: String::new(),
            category: SelectField::new(SelectKind::Category),
            vendor: SelectField::new(SelectKind::Vendor),
            attachment: None,
        }
    }

    /// Empty create form dated today
    pub fn new_create(today: NaiveDate) -> Self {
        let mut form = Self::blank(FormMode::Create);
        form.date = today.format(DATE_FORMAT).to_string();
        form
    }

    /// Edit form waiting for the transaction to load
    pub fn new_edit(id: impl Into<String>) -> Self {
        Self::blank(FormMode::Edit { id: id.into() })
    }

    pub fn for_mode(mode: FormMode, today: NaiveDate) -> Self {
        match mode {
            FormMode::Create => Self::new_create(today),
            FormMode::Edit { id } => Self::new_edit(id),
        }
    }

    pub fn can_delete(&self) -> bool {
        self.mode.is_edit()
    }

    /// Apply query prefill. The attachment applies whenever both of its
    /// parameters are present; the other fields only with `prefill=true`.
    pub fn apply_prefill(&mut self, params: &PrefillParams) {
        if let Some(attachment) = params.attachment() {
            self.attachment = Some(attachment);
        }
        if !params.is_prefill() {
            return;
        }
        if let Some(title) = non_empty(params.title.as_deref()) {
            self.title = title.to_string();
        }
        if let Some(amount) = non_empty(params.amount.as_deref()) {
            self.amount = amount.to_string();
        }
        if let Some(date) = non_empty(params.date.as_deref()) {
            if NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok() {
                self.date = date.to_string();
            } else {
                log::debug!("Ignoring prefill date {:?}", date);
            }
        }
        if let Some(category) = non_empty(params.category.as_deref()) {
            self.category.select_by_name(category);
        }
        if let Some(vendor) = non_empty(params.vendor.as_deref()) {
            self.vendor.select_by_name(vendor);
        }
    }

    /// Fill the fields from an existing record
    pub fn populate_from(&mut self, transaction: &Transaction) {
        self.title = transaction.title.clone();
        self.amount = transaction.amount.normalize().to_string();
        self.date = transaction
            .date()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        self.category
            .select_by_id_or_name(&transaction.category_id, &transaction.category_name);
        self.vendor
            .select_by_id_or_name(&transaction.vendor_id, &transaction.vendor_name);
        self.attachment = transaction.attachment();
    }

    pub fn set_categories(&mut self, categories: &[Category]) {
        self.category
            .set_options(categories.iter().map(SelectOption::from).collect());
    }

    pub fn set_vendors(&mut self, vendors: &[Vendor]) {
        self.vendor.set_options(vendors.iter().map(SelectOption::from).collect());
    }
}

// ==================== Submission ====================

/// Raw values posted by the form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSubmission {
    /// Hidden id field, set in edit mode
    pub transaction_id: Option<String>,
    pub title: String,
    pub amount: String,
    pub transaction_date: String,
    /// Category select value: id, `"new"` or empty
    pub category: String,
    pub new_category: String,
    /// Vendor select value: id, `"new"` or empty
    pub vendor: String,
    pub new_vendor: String,
    /// Hidden fields describing the attachment already on the record
    pub attachment_url: String,
    pub attachment_type: String,
    pub remove_attachment: bool,
    /// Newly chosen file
    pub file: Option<Upload>,
}

/// A select resolved to an existing id or a name to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Existing(String),
    New(String),
}

/// Submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub mode: FormMode,
    pub title: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: Choice,
    pub vendor: Choice,
    /// Attachment to keep when no new file is uploaded
    pub existing_attachment: Option<Attachment>,
    pub file: Option<Upload>,
}

impl TransactionSubmission {
    pub fn mode(&self) -> FormMode {
        FormMode::from_query_id(self.transaction_id.as_deref())
    }

    /// Check required fields; the first problem found is reported
    pub fn validate(&self) -> CoreResult<ValidatedSubmission> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CoreError::validation("Title is required"));
        }

        let amount = parse_decimal(&self.amount)
            .filter(|a| !a.is_zero())
            .ok_or_else(|| CoreError::validation("Amount must be a valid non-zero number"))?;

        let date = NaiveDate::parse_from_str(self.transaction_date.trim(), DATE_FORMAT)
            .map_err(|_| CoreError::validation("Date must be YYYY-MM-DD"))?;

        let category = choice(SelectKind::Category, &self.category, &self.new_category)?;
        let vendor = choice(SelectKind::Vendor, &self.vendor, &self.new_vendor)?;

        let existing_attachment = if self.remove_attachment {
            None
        } else {
            non_empty(Some(&self.attachment_url)).map(|url| Attachment {
                url: url.to_string(),
                attachment_type: self
                    .attachment_type
                    .parse()
                    .unwrap_or_else(|_| AttachmentType::from_url(url)),
            })
        };

        Ok(ValidatedSubmission {
            mode: self.mode(),
            title: title.to_string(),
            amount,
            date,
            category,
            vendor,
            existing_attachment,
            file: self.file.clone().filter(|f| !f.is_empty()),
        })
    }
}

fn choice(kind: SelectKind, value: &str, new_name: &str) -> CoreResult<Choice> {
    match Selection::from_value(value) {
        Selection::None => Err(CoreError::validation(kind.required_message())),
        Selection::New => {
            let name = new_name.trim();
            if name.is_empty() {
                Err(CoreError::validation(kind.new_name_required_message()))
            } else {
                Ok(Choice::New(name.to_string()))
            }
        }
        Selection::Existing(id) => Ok(Choice::Existing(id)),
    }
}

impl ValidatedSubmission {
    /// Request body once category, vendor and attachment are settled
    pub fn payload(
        &self,
        user_id: &str,
        category_id: &str,
        vendor_id: &str,
        attachment: Option<&Attachment>,
    ) -> TransactionPayload {
        let payload = TransactionPayload {
            user_id: user_id.to_string(),
            title: self.title.clone(),
            amount: self.amount,
            transaction_date: self.date.format(DATE_FORMAT).to_string(),
            category_id: category_id.to_string(),
            vendor_id: vendor_id.to_string(),
            attachment_url: None,
            attachment_type: None,
            transaction_id: self.mode.transaction_id().map(str::to_string),
        };
        match attachment {
            Some(a) => payload.with_attachment(a.url.clone(), Some(a.attachment_type)),
            None => payload,
        }
    }
}
