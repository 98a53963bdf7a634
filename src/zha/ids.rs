//! Request ID allocation
//!
//! Every application request sent to the hub carries a small positive integer
//! `id`. The allocator hands out the smallest ID not currently held, starting
//! at 1, and takes it back when the [`RequestId`] guard is dropped. IDs are
//! scoped to one connection; two allocators never share state.

use crate::error::{Result, ZhaError};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Exclusive upper bound of the request ID range `[1, MAX_REQUEST_ID)`.
pub const MAX_REQUEST_ID: u32 = 65000;

/// Connection-scoped set of in-flight request IDs.
///
/// Cloning yields another handle to the same set, so guards can be held across
/// tasks while the connection itself is borrowed elsewhere.
#[derive(Clone, Default)]
pub struct IdAllocator {
    inner: Arc<Mutex<Used>>,
}

/// Every ID below `low_water` is held.
#[derive(Default)]
struct Used {
    ids: BTreeSet<u32>,
    low_water: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the smallest unused ID. The ID is released when the returned
    /// guard is dropped.
    pub fn acquire(&self) -> Result<RequestId> {
        let mut used = self.lock();

        let start = used.low_water.max(1);
        let id = (start..MAX_REQUEST_ID)
            .find(|candidate| !used.ids.contains(candidate))
            .ok_or(ZhaError::ResourceExhausted {
                max: MAX_REQUEST_ID - 1,
            })?;
        used.ids.insert(id);
        used.low_water = id + 1;

        Ok(RequestId {
            id,
            allocator: self.clone(),
        })
    }

    /// Return `id` to the pool. Releasing an ID that is not held is a no-op.
    pub fn release(&self, id: u32) {
        let mut used = self.lock();
        if used.ids.remove(&id) {
            used.low_water = used.low_water.min(id);
        } else {
            debug!("Request ID {} released but was not held", id);
        }
    }

    pub fn is_in_use(&self, id: u32) -> bool {
        self.lock().ids.contains(&id)
    }

    pub fn in_use(&self) -> usize {
        self.lock().ids.len()
    }

    fn lock(&self) -> MutexGuard<'_, Used> {
        // Each critical section leaves the set consistent, so a poisoned lock
        // is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdAllocator")
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A held request ID, released on drop.
#[derive(Debug)]
pub struct RequestId {
    id: u32,
    allocator: IdAllocator,
}

impl RequestId {
    pub fn get(&self) -> u32 {
        self.id
    }
}

impl Drop for RequestId {
    fn drop(&mut self) {
        self.allocator.release(self.id);
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
