//! Storage backend abstraction for uploaded images.
//!
//! The backend only has to move opaque byte blobs around by namespace and key.
//! The local filesystem implementation is the one shipped with the server.

mod backend;
mod local;

pub use backend::{namespaces, StorageBackend, StorageError, StorageResult};
pub use local::LocalStorage;
