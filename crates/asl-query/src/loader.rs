use asl_stream::{GenesisCommit, StreamState};
use asl_types::StreamId;
use async_trait::async_trait;

use crate::error::{QueryError, QueryResult};

/// Where the multi-query gets stream states from.
#[async_trait]
pub trait StreamLoader: Send + Sync {
    /// Load the current state of a stream.
    async fn load(&self, id: &StreamId) -> QueryResult<StreamState>;

    /// Materialize a stream from a supplied genesis commit without fetching.
    ///
    /// The default derives the stream id from `genesis`, checks it against
    /// `id` and builds a fresh state. Loaders that hold streams should
    /// prefer what they already have.
    async fn load_genesis(&self, id: &StreamId, genesis: GenesisCommit) -> QueryResult<StreamState> {
        let derived = genesis.stream_id()?;
        if &derived != id {
            return Err(QueryError::GenesisMismatch {
                expected: id.clone(),
                derived,
            });
        }
        Ok(StreamState::from_genesis(genesis)?)
    }
}
