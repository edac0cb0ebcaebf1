//! Invoice routes - Receipt scanning from the quick-access menu

pub mod api;

pub use api::htmx_process_invoice;
