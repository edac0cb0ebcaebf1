//! Transaction form workflow: load, submit, delete and receipt scanning
//!
//! Each operation is a short linear sequence of backend calls. Load failures
//! turn into notices on an otherwise usable form; submit, delete and invoice
//! failures are returned to the caller, which shows them as a toast.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use menuda_config::Config;

use crate::client::BackendApi;
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::form::{Choice, PrefillParams, TransactionForm, TransactionSubmission};
use crate::models::{Attachment, Transaction, Upload, UserProfile};
use crate::session::Session;
use crate::types::FormMode;

/// Transactions list page
pub const LIST_URL: &str = "/transactions";
/// Transaction detail (form) page
pub const DETAIL_URL: &str = "/transactions/detail";

pub const CATEGORIES_LOAD_ERROR: &str = "Error loading categories. Try refreshing the page.";
pub const VENDORS_LOAD_ERROR: &str = "Error loading vendors. Try refreshing the page.";

/// Form plus anything that went wrong while filling it
#[derive(Debug, Clone)]
pub struct LoadedForm {
    pub profile: UserProfile,
    pub form: TransactionForm,
    /// Messages to show as toasts; the form stays usable
    pub notices: Vec<String>,
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub transaction_id: String,
    /// Set when a chosen file could not be uploaded and the record was saved without it
    pub attachment_dropped: bool,
    pub redirect: String,
}

pub struct TransactionWorkflow {
    backend: Arc<dyn BackendApi>,
    session: Session,
    load_timeout: Duration,
    logger: Arc<dyn ErrorLogger>,
}

impl TransactionWorkflow {
    pub fn new(backend: Arc<dyn BackendApi>, session: Session) -> Self {
        Self {
            backend,
            session,
            load_timeout: Duration::from_millis(8000),
            logger: Arc::new(DefaultErrorLogger),
        }
    }

    pub fn from_config(backend: Arc<dyn BackendApi>, session: Session, config: &Config) -> Self {
        Self::new(backend, session).with_load_timeout(config.load_timeout())
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    fn report(&self, error: &CoreError, operation: &str, profile: &UserProfile) {
        let context = ErrorContext::new(operation).with_user_id(profile.user_id.clone());
        self.logger.log_error(error, &context);
    }

    // ==================== Load ====================

    /// Build the form for `mode`. Fails only when nobody is signed in.
    pub async fn load(&self, mode: FormMode, prefill: &PrefillParams, today: NaiveDate) -> CoreResult<LoadedForm> {
        let profile = self.session.require_profile()?;
        let user_id = profile.user_id.as_str();
        let mut form = TransactionForm::for_mode(mode.clone(), today);
        let mut notices = Vec::new();

        match mode {
            FormMode::Create => {
                form.apply_prefill(prefill);
                let (categories, vendors) = tokio::join!(
                    self.backend.list_categories(user_id),
                    self.backend.list_vendors(user_id)
                );
                match categories {
                    Ok(categories) => form.set_categories(&categories),
                    Err(e) => {
                        self.report(&e, "load_categories", &profile);
                        notices.push(CATEGORIES_LOAD_ERROR.to_string());
                    }
                }
                match vendors {
                    Ok(vendors) => form.set_vendors(&vendors),
                    Err(e) => {
                        self.report(&e, "load_vendors", &profile);
                        notices.push(VENDORS_LOAD_ERROR.to_string());
                    }
                }
            }
            FormMode::Edit { id } => {
                let batch = async {
                    tokio::join!(
                        self.backend.list_categories(user_id),
                        self.backend.list_vendors(user_id),
                        self.backend.get_transaction(user_id, &id)
                    )
                };
                match tokio::time::timeout(self.load_timeout, batch).await {
                    Err(_) => {
                        log::warn!("Loading transaction {} timed out after {:?}", id, self.load_timeout);
                        self.report(&CoreError::Timeout, "load_transaction", &profile);
                        notices.push(CoreError::Timeout.user_message());
                    }
                    Ok((categories, vendors, transaction)) => {
                        match categories {
                            Ok(categories) => form.set_categories(&categories),
                            Err(e) => {
                                self.report(&e, "load_categories", &profile);
                                notices.push(CATEGORIES_LOAD_ERROR.to_string());
                            }
                        }
                        match vendors {
                            Ok(vendors) => form.set_vendors(&vendors),
                            Err(e) => {
                                self.report(&e, "load_vendors", &profile);
                                notices.push(VENDORS_LOAD_ERROR.to_string());
                            }
                        }
                        match transaction {
                            Ok(transaction) => form.populate_from(&transaction),
                            Err(e) => {
                                self.report(&e, "load_transaction", &profile);
                                notices.push(format!("Error loading transaction details: {}", e.user_message()));
                            }
                        }
                    }
                }
                if form.attachment.is_none() {
                    form.attachment = prefill.attachment();
                }
            }
        }

        Ok(LoadedForm {
            profile,
            form,
            notices,
        })
    }

    /// All transactions of the signed-in user
    pub async fn transactions(&self) -> CoreResult<Vec<Transaction>> {
        let profile = self.session.require_profile()?;
        self.backend
            .list_transactions(&profile.user_id)
            .await
            .inspect_err(|e| self.report(e, "list_transactions", &profile))
    }

    // ==================== Submit ====================

    /// Validate and save. Exactly one create or update call is made on success.
    pub async fn submit(&self, submission: &TransactionSubmission) -> CoreResult<SubmitOutcome> {
        let profile = self.session.require_profile()?;
        let user_id = profile.user_id.as_str();
        let validated = submission.validate()?;

        let mut attachment_dropped = false;
        let attachment: Option<Attachment> = match &validated.file {
            Some(file) => match self.backend.upload_attachment(user_id, file).await {
                Ok(uploaded) => {
                    log::debug!("Uploaded {} as {}", file.file_name, uploaded.url);
                    Some(uploaded)
                }
                Err(e) => {
                    self.logger.log_warning(
                        &format!("Upload of {} failed, saving without attachment: {}", file.file_name, e),
                        &ErrorContext::new("upload_attachment").with_user_id(user_id),
                    );
                    attachment_dropped = true;
                    None
                }
            },
            None => validated.existing_attachment.clone(),
        };

        let category_id = match &validated.category {
            Choice::Existing(id) => id.clone(),
            Choice::New(name) => {
                let category = self.backend.create_category(user_id, name).await?;
                log::info!("Created category {} ({})", category.category_name, category.category_id);
                category.category_id
            }
        };

        let vendor_id = match &validated.vendor {
            Choice::Existing(id) => id.clone(),
            Choice::New(name) => {
                let vendor = self.backend.create_vendor(user_id, name, &category_id).await?;
                log::info!("Created vendor {} ({})", vendor.vendor_name, vendor.vendor_id);
                vendor.vendor_id
            }
        };

        let payload = validated.payload(user_id, &category_id, &vendor_id, attachment.as_ref());
        let transaction_id = match &validated.mode {
            FormMode::Create => self.backend.create_transaction(&payload).await?,
            FormMode::Edit { id } => {
                self.backend.update_transaction(id, &payload).await?;
                id.clone()
            }
        };
        log::info!("Saved transaction {}", transaction_id);

        Ok(SubmitOutcome {
            transaction_id,
            attachment_dropped,
            redirect: LIST_URL.to_string(),
        })
    }

    // ==================== Delete ====================

    /// Delete and return the page to go to next
    pub async fn delete(&self, transaction_id: &str) -> CoreResult<String> {
        let profile = self.session.require_profile()?;
        self.backend
            .delete_transaction(&profile.user_id, transaction_id)
            .await?;
        log::info!("Deleted transaction {}", transaction_id);
        Ok(LIST_URL.to_string())
    }

    // ==================== Receipt scanning ====================

    /// Extract fields from a receipt, store the file, and return the
    /// prefilled detail page URL
    pub async fn process_invoice(&self, upload: &Upload) -> CoreResult<String> {
        let profile = self.session.require_profile()?;
        if upload.is_empty() {
            return Err(CoreError::validation("Please choose a receipt image"));
        }
        let extraction = self.backend.process_invoice(&profile.user_id, upload).await?;
        let attachment = self.backend.upload_attachment(&profile.user_id, upload).await?;
        let params = PrefillParams::from_extraction(&extraction, &attachment);
        Ok(format!("{}?{}", DETAIL_URL, params.to_query()))
    }
}
