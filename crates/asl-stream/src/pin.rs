use std::collections::BTreeMap;
use std::sync::Arc;

use asl_types::StreamId;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::StreamResult;

/// The set of streams a node keeps.
#[async_trait]
pub trait PinSet: Send + Sync {
    /// Pin a stream. With `force`, an existing pin is refreshed instead of
    /// being left alone. Returns whether anything changed.
    async fn add(&self, id: &StreamId, force: bool) -> StreamResult<bool>;

    /// Unpin a stream. Returns whether it was pinned.
    async fn remove(&self, id: &StreamId) -> StreamResult<bool>;

    /// Pinned streams in id order, or just `id` when given and pinned.
    async fn list(&self, id: Option<&StreamId>) -> StreamResult<PinList>;
}

/// A finite, restartable listing of pinned streams.
///
/// Items are produced one at a time from a snapshot taken when the listing
/// was created; later pin changes do not affect it.
#[derive(Clone, Debug)]
pub struct PinList {
    items: Arc<[StreamId]>,
    position: usize,
}

impl PinList {
    fn new(items: Vec<StreamId>) -> Self {
        Self {
            items: items.into(),
            position: 0,
        }
    }

    /// Start again from the first item.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Total number of items, independent of the iteration position.
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

impl Iterator for PinList {
    type Item = StreamId;

    fn next(&mut self) -> Option<StreamId> {
        let item = self.items.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.items.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PinList {}

/// Process-local [`PinSet`] for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryPinSet {
    /// Pinned stream -> pin generation (bumped by forced re-pins).
    pins: Mutex<BTreeMap<StreamId, u64>>,
}

impl InMemoryPinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `id` has been pinned or force-refreshed.
    pub fn generation(&self, id: &StreamId) -> Option<u64> {
        self.pins.lock().get(id).copied()
    }
}

#[async_trait]
impl PinSet for InMemoryPinSet {
    async fn add(&self, id: &StreamId, force: bool) -> StreamResult<bool> {
        let mut pins = self.pins.lock();
        match pins.get_mut(id) {
            Some(generation) if force => {
                *generation += 1;
                debug!(stream = %id, "pin refreshed");
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                pins.insert(id.clone(), 1);
                debug!(stream = %id, "pinned");
                Ok(true)
            }
        }
    }

    async fn remove(&self, id: &StreamId) -> StreamResult<bool> {
        let removed = self.pins.lock().remove(id).is_some();
        if removed {
            debug!(stream = %id, "unpinned");
        }
        Ok(removed)
    }

    async fn list(&self, id: Option<&StreamId>) -> StreamResult<PinList> {
        let pins = self.pins.lock();
        let items = match id {
            Some(id) if pins.contains_key(id) => vec![id.clone()],
            Some(_) => Vec::new(),
            None => pins.keys().cloned().collect(),
        };
        Ok(PinList::new(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_types::{Cid, StreamType};

    fn id(n: u8) -> StreamId {
        StreamId::new(StreamType::Tile, Cid::from_hash([n; 32]))
    }

    #[tokio::test]
    async fn add_is_idempotent_unless_forced() {
        let pins = InMemoryPinSet::new();
        assert!(pins.add(&id(1), false).await.unwrap());
        assert!(!pins.add(&id(1), false).await.unwrap());
        assert_eq!(pins.generation(&id(1)), Some(1));
        assert!(pins.add(&id(1), true).await.unwrap());
        assert_eq!(pins.generation(&id(1)), Some(2));
    }

    #[tokio::test]
    async fn remove_reports_membership() {
        let pins = InMemoryPinSet::new();
        pins.add(&id(1), false).await.unwrap();
        assert!(pins.remove(&id(1)).await.unwrap());
        assert!(!pins.remove(&id(1)).await.unwrap());
    }

    #[tokio::test]
    async fn listing_is_ordered_finite_and_restartable() {
        let pins = InMemoryPinSet::new();
        for n in [3, 1, 2] {
            pins.add(&id(n), false).await.unwrap();
        }

        let mut list = pins.list(None).await.unwrap();
        assert_eq!(list.len(), 3);
        let first: Vec<_> = list.by_ref().collect();
        assert_eq!(first, vec![id(1), id(2), id(3)]);
        assert_eq!(list.next(), None);

        pins.add(&id(4), false).await.unwrap();
        list.restart();
        assert_eq!(list.count(), 3);

        let single: Vec<_> = pins.list(Some(&id(2))).await.unwrap().collect();
        assert_eq!(single, vec![id(2)]);
        assert_eq!(pins.list(Some(&id(9))).await.unwrap().total(), 0);
    }
}
