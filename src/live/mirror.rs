//! Local mirror of a query result
//!
//! A disposable, read-only cache of one view's entities. It is only ever
//! replaced as a whole, so its order is always the order of the snapshot
//! it came from.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct LocalMirror<T> {
    items: Vec<T>,
}

impl<T> Default for LocalMirror<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Clone> LocalMirror<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current contents and take `items` in their given order
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Read a lock, recovering the data if a writer panicked
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write a lock, recovering the data if a writer panicked
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
