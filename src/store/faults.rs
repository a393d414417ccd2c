//! Fault-injecting store wrappers for tests
//!
//! Each wrapper delegates to the in-process implementation until a failure
//! is armed for an operation, then returns a [`StoreError`] of the armed
//! kind. The record wrapper also logs every delete it receives.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{
    AuthUser, Backend, BlobRef, BlobStore, Collection, ErrorKind, IdentityStore, LocalBlobStore,
    MemoryIdentityStore, MemoryRecordStore, ProgressSender, Query, Record, RecordStore, Session,
    SnapshotStream, StoreError, StoreResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOp {
    Subscribe,
    Add,
    Set,
    Get,
    Delete,
}

#[derive(Default)]
pub struct FaultyRecords {
    pub inner: MemoryRecordStore,
    failures: Mutex<HashMap<(RecordOp, Collection), ErrorKind>>,
    deletes: Mutex<Vec<(Collection, String)>>,
}

impl FaultyRecords {
    pub fn fail(&self, op: RecordOp, collection: Collection, kind: ErrorKind) {
        self.failures.lock().unwrap().insert((op, collection), kind);
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Every delete call received, including failed ones
    pub fn deletes(&self) -> Vec<(Collection, String)> {
        self.deletes.lock().unwrap().clone()
    }

    fn check(&self, op: RecordOp, collection: Collection) -> StoreResult<()> {
        match self.failures.lock().unwrap().get(&(op, collection)) {
            Some(kind) => Err(StoreError::new(*kind, format!("injected {:?} failure", op))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for FaultyRecords {
    async fn subscribe(&self, query: Query) -> StoreResult<SnapshotStream> {
        self.check(RecordOp::Subscribe, query.collection)?;
        self.inner.subscribe(query).await
    }

    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String> {
        self.check(RecordOp::Add, collection)?;
        self.inner.add(collection, data).await
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<()> {
        self.check(RecordOp::Set, collection)?;
        self.inner.set(collection, id, data).await
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        self.check(RecordOp::Get, collection)?;
        self.inner.get(collection, id).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.deletes
            .lock()
            .unwrap()
            .push((collection, id.to_string()));
        self.check(RecordOp::Delete, collection)?;
        self.inner.delete(collection, id).await
    }
}

pub struct FaultyBlobs {
    pub inner: LocalBlobStore,
    fail_put: Mutex<Option<ErrorKind>>,
    fail_delete: Mutex<Option<ErrorKind>>,
}

impl FaultyBlobs {
    pub fn new(inner: LocalBlobStore) -> Self {
        Self {
            inner,
            fail_put: Mutex::new(None),
            fail_delete: Mutex::new(None),
        }
    }

    pub fn fail_put(&self, kind: ErrorKind) {
        *self.fail_put.lock().unwrap() = Some(kind);
    }

    pub fn fail_delete(&self, kind: ErrorKind) {
        *self.fail_delete.lock().unwrap() = Some(kind);
    }
}

#[async_trait]
impl BlobStore for FaultyBlobs {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<BlobRef> {
        if let Some(kind) = *self.fail_put.lock().unwrap() {
            return Err(StoreError::new(kind, "injected put failure"));
        }
        self.inner.put(path, data, content_type, progress).await
    }

    async fn download_url(&self, blob: &BlobRef) -> StoreResult<String> {
        self.inner.download_url(blob).await
    }

    async fn fetch(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.inner.fetch(path).await
    }

    async fn delete_by_url(&self, url: &str) -> StoreResult<()> {
        if let Some(kind) = *self.fail_delete.lock().unwrap() {
            return Err(StoreError::new(kind, "injected delete failure"));
        }
        self.inner.delete_by_url(url).await
    }
}

pub struct FaultyIdentity {
    pub inner: MemoryIdentityStore,
    fail_reset: Mutex<Option<ErrorKind>>,
}

impl Default for FaultyIdentity {
    /// Hashes with the minimum Argon2 cost parameters
    fn default() -> Self {
        let params = argon2::Params::new(
            argon2::Params::MIN_M_COST,
            argon2::Params::MIN_T_COST,
            argon2::Params::MIN_P_COST,
            None,
        )
        .unwrap();
        Self {
            inner: MemoryIdentityStore::with_params(params),
            fail_reset: Mutex::new(None),
        }
    }
}

impl FaultyIdentity {
    pub fn fail_reset(&self, kind: ErrorKind) {
        *self.fail_reset.lock().unwrap() = Some(kind);
    }
}

#[async_trait]
impl IdentityStore for FaultyIdentity {
    async fn create_user(&self, email: &str, password: &str) -> StoreResult<AuthUser> {
        self.inner.create_user(email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session> {
        self.inner.sign_in(email, password).await
    }

    async fn current_user(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        self.inner.current_user(token).await
    }

    async fn send_password_reset(&self, email: &str) -> StoreResult<()> {
        if let Some(kind) = *self.fail_reset.lock().unwrap() {
            return Err(StoreError::new(kind, "injected reset failure"));
        }
        self.inner.send_password_reset(email).await
    }

    async fn sign_out(&self, token: &str) -> StoreResult<()> {
        self.inner.sign_out(token).await
    }
}

/// A backend whose three stores can be made to fail on demand
pub struct Harness {
    pub backend: Backend,
    pub identity: Arc<FaultyIdentity>,
    pub records: Arc<FaultyRecords>,
    pub blobs: Arc<FaultyBlobs>,
}

impl Harness {
    pub fn new(blob_root: &Path) -> Self {
        let identity = Arc::new(FaultyIdentity::default());
        let records = Arc::new(FaultyRecords::default());
        let blobs = Arc::new(FaultyBlobs::new(
            LocalBlobStore::new(blob_root, "http://localhost:8090").chunk_size(64 * 1024),
        ));
        let backend = Backend::new(identity.clone(), records.clone(), blobs.clone());
        Self {
            backend,
            identity,
            records,
            blobs,
        }
    }

    /// Create a signed-in administrator; returns its session
    pub async fn admin(&self, email: &str, password: &str) -> Session {
        let user = self.identity.inner.create_user(email, password).await.unwrap();
        let mut marker = Map::new();
        marker.insert("email".to_string(), Value::String(user.email.clone()));
        self.records
            .inner
            .set(Collection::Admins, &user.uid, marker)
            .await
            .unwrap();
        self.identity.inner.sign_in(email, password).await.unwrap()
    }
}
