//! HTTP client wrapper and redirect-tracking fetch

pub mod client;
pub mod fetch;

pub use client::HttpClient;
pub use fetch::{fetch_page, FetchedPage};
