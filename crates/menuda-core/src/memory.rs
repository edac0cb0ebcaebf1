//! In-memory [`BackendApi`] that records every call
//!
//! Used by the workflow and router tests to assert which requests were made
//! (and how many) without a running backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::client::BackendApi;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Attachment, Category, InvoiceExtraction, NewUser, Transaction, TransactionPayload, Upload, Vendor,
};

/// Backend endpoint, used to inject failures and delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CheckUser,
    ListCategories,
    CreateCategory,
    ListVendors,
    CreateVendor,
    ListTransactions,
    GetTransaction,
    CreateTransaction,
    UpdateTransaction,
    DeleteTransaction,
    UploadAttachment,
    ProcessInvoice,
}

/// A recorded request
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CheckUser { email: String },
    ListCategories,
    CreateCategory { name: String },
    ListVendors,
    CreateVendor { name: String, category_id: String },
    ListTransactions,
    GetTransaction { id: String },
    CreateTransaction(TransactionPayload),
    UpdateTransaction { id: String, payload: TransactionPayload },
    DeleteTransaction { id: String },
    UploadAttachment { file_name: String },
    ProcessInvoice { file_name: String },
}

impl BackendCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            BackendCall::CheckUser { .. } => Endpoint::CheckUser,
            BackendCall::ListCategories => Endpoint::ListCategories,
            BackendCall::CreateCategory { .. } => Endpoint::CreateCategory,
            BackendCall::ListVendors => Endpoint::ListVendors,
            BackendCall::CreateVendor { .. } => Endpoint::CreateVendor,
            BackendCall::ListTransactions => Endpoint::ListTransactions,
            BackendCall::GetTransaction { .. } => Endpoint::GetTransaction,
            BackendCall::CreateTransaction(_) => Endpoint::CreateTransaction,
            BackendCall::UpdateTransaction { .. } => Endpoint::UpdateTransaction,
            BackendCall::DeleteTransaction { .. } => Endpoint::DeleteTransaction,
            BackendCall::UploadAttachment { .. } => Endpoint::UploadAttachment,
            BackendCall::ProcessInvoice { .. } => Endpoint::ProcessInvoice,
        }
    }

    /// Whether the call changes backend state
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            BackendCall::ListCategories
                | BackendCall::ListVendors
                | BackendCall::ListTransactions
                | BackendCall::GetTransaction { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    user_id: String,
    categories: Vec<Category>,
    vendors: Vec<Vendor>,
    transactions: Vec<Transaction>,
    extraction: InvoiceExtraction,
    calls: Vec<BackendCall>,
    failures: HashMap<Endpoint, CoreError>,
    delays: HashMap<Endpoint, Duration>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn category_name(&self, id: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.category_id == id)
            .map(|c| c.category_name.clone())
            .unwrap_or_default()
    }

    fn vendor_name(&self, id: &str) -> String {
        self.vendors
            .iter()
            .find(|v| v.vendor_id == id)
            .map(|v| v.vendor_name.clone())
            .unwrap_or_default()
    }

    fn to_transaction(&self, id: String, payload: &TransactionPayload) -> Transaction {
        Transaction {
            transaction_id: id,
            title: payload.title.clone(),
            amount: payload.amount,
            transaction_date: payload.transaction_date.clone(),
            category_id: payload.category_id.clone(),
            category_name: self.category_name(&payload.category_id),
            vendor_id: payload.vendor_id.clone(),
            vendor_name: self.vendor_name(&payload.vendor_id),
            attachment_url: payload.attachment_url.clone(),
            attachment_type: payload.attachment_type,
        }
    }
}

/// Recording in-memory backend
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                user_id: "user-1".to_string(),
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_user_id(self, user_id: &str) -> Self {
        self.lock().user_id = user_id.to_string();
        self
    }

    pub fn with_category(self, id: &str, name: &str) -> Self {
        self.lock().categories.push(Category {
            category_id: id.to_string(),
            category_name: name.to_string(),
        });
        self
    }

    pub fn with_vendor(self, id: &str, name: &str, category_id: Option<&str>) -> Self {
        self.lock().vendors.push(Vendor {
            vendor_id: id.to_string(),
            vendor_name: name.to_string(),
            category_id: category_id.map(str::to_string),
        });
        self
    }

    pub fn with_transaction(self, transaction: Transaction) -> Self {
        self.lock().transactions.push(transaction);
        self
    }

    pub fn with_extraction(self, extraction: InvoiceExtraction) -> Self {
        self.lock().extraction = extraction;
        self
    }

    /// Make every call to `endpoint` fail with `error`
    pub fn fail(&self, endpoint: Endpoint, error: CoreError) {
        self.lock().failures.insert(endpoint, error);
    }

    /// Make every call to `endpoint` take at least `delay`
    pub fn delay(&self, endpoint: Endpoint, delay: Duration) {
        self.lock().delays.insert(endpoint, delay);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<BackendCall> {
        self.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|c| c.endpoint() == endpoint).count()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.lock().vendors.clone()
    }

    /// Record the call, then apply any configured delay and failure
    async fn enter(&self, call: BackendCall) -> CoreResult<()> {
        let endpoint = call.endpoint();
        let (delay, failure) = {
            let mut state = self.lock();
            state.calls.push(call);
            (
                state.delays.get(&endpoint).copied(),
                state.failures.get(&endpoint).cloned(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// What the backend answers for an unknown transaction id
fn not_found() -> CoreError {
    CoreError::Status {
        status: 404,
        message: "Transaction not found".to_string(),
    }
}

#[async_trait]
impl BackendApi for MemoryBackend {
    async fn check_user(&self, user: &NewUser) -> CoreResult<String> {
        self.enter(BackendCall::CheckUser { email: user.email.clone() }).await?;
        Ok(self.lock().user_id.clone())
    }

    async fn list_categories(&self, _user_id: &str) -> CoreResult<Vec<Category>> {
        self.enter(BackendCall::ListCategories).await?;
        Ok(self.categories())
    }

    async fn create_category(&self, _user_id: &str, name: &str) -> CoreResult<Category> {
        self.enter(BackendCall::CreateCategory { name: name.to_string() }).await?;
        let mut state = self.lock();
        let category = Category {
            category_id: state.next_id("cat"),
            category_name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn list_vendors(&self, _user_id: &str) -> CoreResult<Vec<Vendor>> {
        self.enter(BackendCall::ListVendors).await?;
        Ok(self.vendors())
    }

    async fn create_vendor(&self, _user_id: &str, name: &str, category_id: &str) -> CoreResult<Vendor> {
        self.enter(BackendCall::CreateVendor {
            name: name.to_string(),
            category_id: category_id.to_string(),
        })
        .await?;
        let mut state = self.lock();
        let vendor = Vendor {
            vendor_id: state.next_id("ven"),
            vendor_name: name.to_string(),
            category_id: Some(category_id.to_string()),
        };
        state.vendors.push(vendor.clone());
        Ok(vendor)
    }

    async fn list_transactions(&self, _user_id: &str) -> CoreResult<Vec<Transaction>> {
        self.enter(BackendCall::ListTransactions).await?;
        Ok(self.transactions())
    }

    async fn get_transaction(&self, _user_id: &str, transaction_id: &str) -> CoreResult<Transaction> {
        self.enter(BackendCall::GetTransaction { id: transaction_id.to_string() }).await?;
        self.lock()
            .transactions
            .iter()
            .find(|t| t.transaction_id == transaction_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_transaction(&self, payload: &TransactionPayload) -> CoreResult<String> {
        self.enter(BackendCall::CreateTransaction(payload.clone())).await?;
        let mut state = self.lock();
        let id = state.next_id("tx");
        let transaction = state.to_transaction(id.clone(), payload);
        state.transactions.push(transaction);
        Ok(id)
    }

    async fn update_transaction(&self, transaction_id: &str, payload: &TransactionPayload) -> CoreResult<()> {
        self.enter(BackendCall::UpdateTransaction {
            id: transaction_id.to_string(),
            payload: payload.clone(),
        })
        .await?;
        let mut state = self.lock();
        let updated = state.to_transaction(transaction_id.to_string(), payload);
        match state.transactions.iter_mut().find(|t| t.transaction_id == transaction_id) {
            Some(existing) => {
                *existing = updated;
                Ok(())
            }
            None => Err(not_found()),
        }
    }

    async fn delete_transaction(&self, _user_id: &str, transaction_id: &str) -> CoreResult<()> {
        self.enter(BackendCall::DeleteTransaction { id: transaction_id.to_string() }).await?;
        let mut state = self.lock();
        let before = state.transactions.len();
        state.transactions.retain(|t| t.transaction_id != transaction_id);
        if state.transactions.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn upload_attachment(&self, user_id: &str, upload: &Upload) -> CoreResult<Attachment> {
        self.enter(BackendCall::UploadAttachment { file_name: upload.file_name.clone() }).await?;
        Ok(Attachment {
            url: format!("https://files.menuda.test/{}/{}", user_id, upload.file_name),
            attachment_type: upload.attachment_type(),
        })
    }

    async fn process_invoice(&self, _user_id: &str, upload: &Upload) -> CoreResult<InvoiceExtraction> {
        self.enter(BackendCall::ProcessInvoice { file_name: upload.file_name.clone() }).await?;
        Ok(self.lock().extraction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_and_creates_records() {
        let backend = MemoryBackend::new().with_category("c1", "Food");
        let category = backend.create_category("user-1", "Travel").await.unwrap();
        assert_eq!(category.category_name, "Travel");
        assert_eq!(backend.list_categories("user-1").await.unwrap().len(), 2);
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::CreateCategory { name: "Travel".to_string() },
                BackendCall::ListCategories
            ]
        );
        assert_eq!(backend.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MemoryBackend::new();
        backend.fail(Endpoint::ListVendors, CoreError::Network { message: "down".to_string() });
        assert!(backend.list_vendors("user-1").await.is_err());
        assert_eq!(backend.count(Endpoint::ListVendors), 1);
    }
}
