pub mod client;
pub mod credential;
pub mod error;
pub mod manager;
pub mod scoped;

pub use client::DataClient;
pub use credential::Credential;
pub use error::StoreError;
pub use manager::PoolManager;
pub use scoped::{AdminDataClient, ScopedDataClient};
