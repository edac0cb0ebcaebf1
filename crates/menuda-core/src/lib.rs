//! Session, backend client and transaction workflow for the Menuda front-end

pub mod auth;
pub mod client;
pub mod error;
pub mod form;
pub mod listing;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
pub mod retry;
pub mod session;
pub mod types;
pub mod workflow;

pub use client::{BackendApi, HttpBackend};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorContext, ErrorLogger, ErrorSeverity};
pub use form::{PrefillParams, SelectField, SelectKind, Selection, TransactionForm, TransactionSubmission};
pub use listing::{group_transactions, MoneyFormat, TransactionGroup, TransactionRow};
pub use models::{Attachment, Category, InvoiceExtraction, Transaction, Upload, UserProfile, Vendor};
pub use retry::{with_retry, RetryPolicy};
pub use session::{CacheRefresh, FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use types::{AttachmentType, FormMode};
pub use workflow::{LoadedForm, SubmitOutcome, TransactionWorkflow};
