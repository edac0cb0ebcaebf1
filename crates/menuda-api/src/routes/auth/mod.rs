//! Auth routes - Google sign-in and logout

pub mod api;
pub mod page;

pub use api::{api_google_sign_in, api_logout};
pub use page::page_login;
