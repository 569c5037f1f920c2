pub mod client;
pub mod error;
pub mod types;

pub use client::SearchClient;
pub use error::SearchError;
