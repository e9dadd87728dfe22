use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use asl_stream::{get, GenesisCommit, StreamState};
use asl_types::StreamId;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::loader::StreamLoader;
use crate::query::{stream_reference, MultiQuery};

/// Why a stream is in the work queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// Named by the batch; failing to load it fails the batch.
    Requested,
    /// Reached through a content path; failures are skipped.
    Linked,
}

type LoadOutcome = (StreamId, Origin, QueryResult<StreamState>);

/// Resolves multi-query batches against a [`StreamLoader`].
pub struct MultiQueryResolver {
    loader: Arc<dyn StreamLoader>,
    config: QueryConfig,
}

impl MultiQueryResolver {
    pub fn new(loader: Arc<dyn StreamLoader>, config: QueryConfig) -> Self {
        Self { loader, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Resolve a batch under the configured deadline.
    pub async fn resolve(
        &self,
        queries: Vec<MultiQuery>,
    ) -> QueryResult<BTreeMap<StreamId, StreamState>> {
        self.resolve_with_timeout(queries, self.config.timeout()).await
    }

    /// Resolve a batch under `timeout`.
    ///
    /// Either every requested stream is returned, or the batch fails. On
    /// timeout all outstanding loads are cancelled and nothing is returned.
    pub async fn resolve_with_timeout(
        &self,
        queries: Vec<MultiQuery>,
        timeout: Duration,
    ) -> QueryResult<BTreeMap<StreamId, StreamState>> {
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout_at(deadline, self.run(queries, deadline, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout = ?timeout, "multi-query deadline exceeded");
                Err(QueryError::Timeout(timeout))
            }
        }
    }

    async fn run(
        &self,
        queries: Vec<MultiQuery>,
        deadline: Instant,
        timeout: Duration,
    ) -> QueryResult<BTreeMap<StreamId, StreamState>> {
        let mut paths: HashMap<StreamId, Vec<String>> = HashMap::new();
        let mut scheduled: HashSet<StreamId> = HashSet::new();
        let mut pending: JoinSet<LoadOutcome> = JoinSet::new();
        let mut results = BTreeMap::new();

        for query in queries {
            paths
                .entry(query.stream_id.clone())
                .or_default()
                .extend(query.paths);
            if scheduled.insert(query.stream_id.clone()) {
                self.spawn_load(&mut pending, query.stream_id, query.genesis, Origin::Requested);
            }
        }

        while let Some(joined) = pending.join_next().await {
            let (id, origin, loaded) = joined.map_err(|e| QueryError::Task(e.to_string()))?;
            if Instant::now() >= deadline {
                return Err(QueryError::Timeout(timeout));
            }

            let state = match (loaded, origin) {
                (Ok(state), _) => state,
                (Err(err), Origin::Requested) => return Err(err),
                (Err(err), Origin::Linked) => {
                    warn!(stream = %id, error = %err, "skipping unloadable linked stream");
                    continue;
                }
            };

            for path in paths.get(&id).into_iter().flatten() {
                let Some(target) = get(state.content(), path).and_then(stream_reference) else {
                    continue;
                };
                if scheduled.insert(target.clone()) {
                    debug!(from = %id, path = %path, to = %target, "following stream reference");
                    self.spawn_load(&mut pending, target, None, Origin::Linked);
                }
            }
            results.insert(id, state);
        }

        Ok(results)
    }

    fn spawn_load(
        &self,
        pending: &mut JoinSet<LoadOutcome>,
        id: StreamId,
        genesis: Option<GenesisCommit>,
        origin: Origin,
    ) {
        let loader = Arc::clone(&self.loader);
        pending.spawn(async move {
            let loaded = match genesis {
                Some(genesis) => loader.load_genesis(&id, genesis).await,
                None => loader.load(&id).await,
            };
            (id, origin, loaded)
        });
    }
}
