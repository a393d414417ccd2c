//! Backend Stores
//!
//! Contracts of the hosted platform the portal delegates to, plus
//! in-process implementations used by the server and the tests:
//!
//! - **identity**: credential accounts, sessions, password-reset delivery
//! - **records**: document collections with real-time ordered subscriptions
//! - **blobs**: binary objects with upload progress and download URLs
//! - **types**: collections, queries, records and snapshots
//! - **error**: classified backend errors
//!
//! # Architecture
//!
//! ```text
//! Mutation path:
//!   add/set/delete → collection map → snapshot per subscriber → channel
//!
//! Upload path:
//!   bytes → chunked write (progress) → rename → download URL
//! ```

pub mod blobs;
pub mod error;
pub mod identity;
pub mod records;
pub mod types;

#[cfg(test)]
pub(crate) mod faults;

pub use blobs::{BlobRef, BlobStore, LocalBlobStore, ProgressSender, UploadProgress, DEFAULT_CHUNK_SIZE};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use identity::{AuthUser, IdentityStore, MemoryIdentityStore, Session, MIN_PASSWORD_LENGTH};
pub use records::{MemoryRecordStore, RecordStore, SnapshotStream};
pub use types::{to_fields, Collection, Direction, OrderBy, Query, QuerySnapshot, Record};

use std::sync::Arc;

/// The three backend services, shared behind trait objects
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityStore>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backend {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            records,
            blobs,
        }
    }
}
