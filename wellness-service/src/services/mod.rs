pub mod file_store;
pub mod gateway;
pub mod metrics;
pub mod providers;

pub use file_store::{FileStore, LocalFileStore, StagedFile, StoreError};
pub use gateway::{GatewayError, ModelGateway};
