//! External collaborator clients and response normalization

pub mod media_store;
pub mod normalizer;
pub mod plantnet;

pub use media_store::MediaStoreClient;
pub use normalizer::{normalize, ProviderResponse};
pub use plantnet::PlantNetClient;
