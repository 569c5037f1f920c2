pub mod client;
pub mod error;

pub use client::MappingClient;
pub use error::MappingError;
