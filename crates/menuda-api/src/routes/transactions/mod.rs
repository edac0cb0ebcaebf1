//! Transaction routes - List and create/edit/delete form
//!
//! Structure:
//! - api.rs: HTMX fragment and write endpoints
//! - page.rs: Full page rendering

pub mod api;
pub mod page;

pub use api::{htmx_transaction_delete, htmx_transaction_save, htmx_transactions_list};
pub use page::{page_transaction_detail, page_transactions};
