pub mod config;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod store;
pub mod transport;
pub mod engine;
pub mod upload;

pub use error::ArtsyncError;
pub type Result<T> = std::result::Result<T, ArtsyncError>;
