//! Storage abstractions for the RAS model cataloger.
//!
//! Provides:
//! - The [`ObjectGateway`] contract every component uses to reach remote objects
//! - An `object_store`-backed implementation (S3/MinIO, or in-memory for tests)
//! - Bounded exponential-backoff retry around any gateway

pub mod gateway;
pub mod object_store;
pub mod retry;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use gateway::{ObjectGateway, ObjectSummary};
pub use retry::{with_retry, RetryPolicy, RetryingGateway};
