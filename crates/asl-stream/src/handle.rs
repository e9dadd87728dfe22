use std::collections::HashMap;
use std::sync::Arc;

use asl_types::StreamId;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::state::StreamState;

/// One stream's state behind its own lock.
///
/// Compare-and-append on a stream happens while holding this lock, so
/// commits to one stream are linearized while different streams never
/// contend. Never hold the guard across an `.await`.
#[derive(Debug)]
pub struct StreamHandle {
    id: StreamId,
    state: Mutex<StreamState>,
}

impl StreamHandle {
    pub fn new(state: StreamState) -> Self {
        Self {
            id: state.id().clone(),
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StreamState {
        self.state.lock().clone()
    }
}

/// The streams a node currently holds.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    handles: RwLock<HashMap<StreamId, Arc<StreamHandle>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &StreamId) -> Option<Arc<StreamHandle>> {
        self.handles.read().get(id).cloned()
    }

    /// Register `state` unless the stream is already held.
    ///
    /// Returns the handle and whether it was newly created. An existing
    /// handle is returned untouched.
    pub fn get_or_insert(&self, state: StreamState) -> (Arc<StreamHandle>, bool) {
        let mut handles = self.handles.write();
        if let Some(existing) = handles.get(state.id()) {
            return (Arc::clone(existing), false);
        }
        let handle = Arc::new(StreamHandle::new(state));
        handles.insert(handle.id().clone(), Arc::clone(&handle));
        (handle, true)
    }

    pub fn remove(&self, id: &StreamId) -> Option<Arc<StreamHandle>> {
        self.handles.write().remove(id)
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        self.handles.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<_> = self.handles.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
