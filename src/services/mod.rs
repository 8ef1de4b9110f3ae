//! Clients for the two external collaborators: the AI extraction service
//! and the persistence (catalog) service.

pub mod catalog;
pub mod extraction;

pub use catalog::CatalogClient;
pub use extraction::ExtractionClient;
