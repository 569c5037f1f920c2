//! HTTP clients for the remote services behind the engine's source
//! traits: the GraphQL media catalog, the episode-mapping service, and
//! the title-search provider.

pub mod catalog;
pub mod mapping;
pub mod search;

pub use catalog::CatalogClient;
pub use mapping::MappingClient;
pub use search::SearchClient;
