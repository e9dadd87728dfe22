use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use asl_anchor::{
    AnchorValidator, EthereumAnchorValidator, InMemoryAnchorValidator, ValidatorSet,
};
use asl_conflict::{Applied, ConflictError, ConflictResolver, SyncStatus, DEFAULT_VALIDATION_TIMEOUT};
use asl_query::{MultiQuery, MultiQueryResolver, QueryConfig, QueryError, QueryResult, StreamLoader};
use asl_stream::{
    AnchorCommit, AnchorStatus, Commit, GenesisCommit, InMemoryPinSet, PinSet, StreamError,
    StreamHandle, StreamRegistry, StreamState,
};
use asl_types::StreamId;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::error::{SdkError, SdkResult};

/// A node holding streams.
///
/// Cloning is cheap; clones share the same streams, pins and validators.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    registry: StreamRegistry,
    resolver: ConflictResolver,
    pins: Arc<dyn PinSet>,
    remote: Option<Arc<dyn StreamLoader>>,
    query: QueryConfig,
    simulated_chain: Option<Arc<InMemoryAnchorValidator>>,
}

/// Assembles a [`Node`].
pub struct NodeBuilder {
    validators: ValidatorSet,
    validation_timeout: Duration,
    pins: Option<Arc<dyn PinSet>>,
    remote: Option<Arc<dyn StreamLoader>>,
    query: QueryConfig,
    simulated_chain: Option<Arc<InMemoryAnchorValidator>>,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self {
            validators: ValidatorSet::new(),
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            pins: None,
            remote: None,
            query: QueryConfig::default(),
            simulated_chain: None,
        }
    }
}

impl NodeBuilder {
    pub fn with_validator(mut self, validator: Arc<dyn AnchorValidator>) -> Self {
        self.validators.register(validator);
        self
    }

    /// Register an in-process chain and use it to fulfil anchor requests.
    pub fn with_simulated_chain(mut self, chain: Arc<InMemoryAnchorValidator>) -> Self {
        self.validators.register(chain.clone());
        self.simulated_chain = Some(chain);
        self
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn with_pin_set(mut self, pins: Arc<dyn PinSet>) -> Self {
        self.pins = Some(pins);
        self
    }

    /// Where streams this node does not hold are fetched from.
    pub fn with_remote(mut self, remote: Arc<dyn StreamLoader>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn build(self) -> Node {
        let resolver =
            ConflictResolver::new(self.validators).with_validation_timeout(self.validation_timeout);
        Node {
            inner: Arc::new(NodeInner {
                registry: StreamRegistry::new(),
                resolver,
                pins: self
                    .pins
                    .unwrap_or_else(|| Arc::new(InMemoryPinSet::new())),
                remote: self.remote,
                query: self.query,
                simulated_chain: self.simulated_chain,
            }),
        }
    }
}

impl Node {
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Build a node from configuration.
    ///
    /// The Ethereum validator is initialized against the configured chain;
    /// any error there is a configuration error and fails startup.
    pub async fn from_config(config: &NodeConfig) -> SdkResult<Self> {
        config.validate()?;
        let chain_id = config.chain_id()?;

        let ethereum = EthereumAnchorValidator::new(config.anchor.ethereum.clone())?;
        ethereum.init(chain_id.as_ref()).await?;

        let mut builder = Self::builder()
            .with_validator(Arc::new(ethereum))
            .with_validation_timeout(config.validation_timeout())
            .with_query_config(config.query.clone());
        if config.anchor.simulated {
            let chain = Arc::new(InMemoryAnchorValidator::new());
            chain.init(None).await?;
            builder = builder.with_simulated_chain(chain);
        }

        let node = builder.build();
        info!(
            chain = ?chain_id,
            namespaces = ?node.inner.resolver.validators().namespaces(),
            "node started"
        );
        Ok(node)
    }

    pub fn validators(&self) -> &ValidatorSet {
        self.inner.resolver.validators()
    }

    /// Streams currently held, in id order.
    pub fn streams(&self) -> Vec<StreamId> {
        self.inner.registry.ids()
    }

    /// A [`StreamLoader`] backed by this node, for use as another node's remote.
    pub fn loader(&self) -> Arc<dyn StreamLoader> {
        Arc::new(NodeLoader(self.clone()))
    }

    /// Start holding the stream `genesis` creates, optionally pinning it.
    ///
    /// Creating a stream this node already holds returns its current state.
    pub async fn create_stream(&self, genesis: GenesisCommit, pin: bool) -> SdkResult<StreamState> {
        let state = StreamState::from_genesis(genesis)?;
        let id = state.id().clone();
        let (handle, created) = self.inner.registry.get_or_insert(state);
        if created {
            debug!(stream = %id, "stream created");
        }
        if pin {
            self.inner.pins.add(&id, false).await?;
        }
        Ok(handle.snapshot())
    }

    /// Apply one commit to a held stream.
    pub async fn apply_commit(&self, id: &StreamId, commit: Commit) -> SdkResult<Applied> {
        let handle = self.handle(id)?;
        Ok(self.inner.resolver.apply(&handle, commit).await?)
    }

    /// Reconcile a held stream with a complete remote log, or start holding
    /// the stream that log describes.
    ///
    /// A stream this node does not hold yet is registered only after its
    /// log has been accepted, so a failed sync never leaves it behind.
    pub async fn sync_log(&self, id: &StreamId, commits: Vec<Commit>) -> SdkResult<SyncStatus> {
        if let Some(handle) = self.inner.registry.get(id) {
            return Ok(self.inner.resolver.apply_log(&handle, commits).await?);
        }

        let genesis = match commits.first() {
            Some(Commit::Genesis(genesis)) => genesis.clone(),
            Some(other) => {
                return Err(StreamError::GenesisExpected {
                    found: other.kind(),
                }
                .into())
            }
            None => return Err(StreamError::GenesisExpected { found: "no" }.into()),
        };
        let state = StreamState::from_genesis(genesis)?;
        if state.id() != id {
            return Err(ConflictError::ForeignLog {
                expected: id.clone(),
                found: state.id().clone(),
            }
            .into());
        }

        let detached = StreamHandle::new(state);
        let status = self.inner.resolver.apply_log(&detached, commits).await?;
        let synced = detached.snapshot();
        let (handle, created) = self.inner.registry.get_or_insert(synced.clone());
        if created {
            debug!(stream = %id, tip = %synced.tip(), "stream registered from synced log");
            return Ok(status);
        }
        // Registered by someone else meanwhile; reconcile with their state.
        Ok(self
            .inner
            .resolver
            .apply_log(&handle, synced.commits().cloned().collect())
            .await?)
    }

    /// Ask for the tip of a stream to be anchored.
    ///
    /// With a simulated chain the anchor is recorded and applied right away;
    /// otherwise the stream stays `Pending` until an anchor commit arrives.
    pub async fn request_anchor(&self, id: &StreamId) -> SdkResult<AnchorStatus> {
        let handle = self.handle(id)?;
        let tip = {
            let mut state = handle.lock();
            if !state.request_anchor() {
                return Ok(state.anchor_status());
            }
            state.tip()
        };
        debug!(stream = %id, tip = %tip, "anchor requested");

        if let Some(chain) = &self.inner.simulated_chain {
            let proof = chain.anchor(tip);
            let commit = AnchorCommit::new(id, tip, proof);
            self.inner.resolver.apply(&handle, commit.into()).await?;
        }
        let status = handle.lock().anchor_status();
        Ok(status)
    }

    /// Current state of a held stream.
    pub fn state(&self, id: &StreamId) -> SdkResult<StreamState> {
        Ok(self.handle(id)?.snapshot())
    }

    /// Current state of a stream, fetching it from the remote when it is
    /// not held. Fetched logs go through conflict resolution, so their
    /// anchors are validated before the stream is kept.
    pub async fn load(&self, id: &StreamId) -> SdkResult<StreamState> {
        if let Some(handle) = self.inner.registry.get(id) {
            return Ok(handle.snapshot());
        }
        let remote = self
            .inner
            .remote
            .as_ref()
            .ok_or_else(|| SdkError::StreamNotFound(id.clone()))?;
        let fetched = match remote.load(id).await {
            Ok(state) => state,
            Err(QueryError::NotFound(_)) => return Err(SdkError::StreamNotFound(id.clone())),
            Err(err) => return Err(err.into()),
        };
        let commits: Vec<Commit> = fetched.commits().cloned().collect();
        let status = self.sync_log(id, commits).await?;
        debug!(stream = %id, status = ?status, "stream fetched from remote");
        self.state(id)
    }

    /// Load a batch of streams and the streams their paths link to.
    pub async fn multi_query(
        &self,
        queries: Vec<MultiQuery>,
    ) -> SdkResult<BTreeMap<StreamId, StreamState>> {
        let resolver = MultiQueryResolver::new(self.loader(), self.inner.query.clone());
        Ok(resolver.resolve(queries).await?)
    }

    /// Pin a stream, loading it first if it is not held.
    pub async fn pin(&self, id: &StreamId, force: bool) -> SdkResult<bool> {
        self.load(id).await?;
        Ok(self.inner.pins.add(id, force).await?)
    }

    pub async fn unpin(&self, id: &StreamId) -> SdkResult<bool> {
        Ok(self.inner.pins.remove(id).await?)
    }

    /// Pinned streams in id order, or just `id` when given and pinned.
    pub async fn pinned(&self, id: Option<&StreamId>) -> SdkResult<Vec<StreamId>> {
        Ok(self.inner.pins.list(id).await?.collect())
    }

    fn handle(&self, id: &StreamId) -> SdkResult<Arc<StreamHandle>> {
        self.inner
            .registry
            .get(id)
            .ok_or_else(|| SdkError::StreamNotFound(id.clone()))
    }
}

struct NodeLoader(Node);

#[async_trait]
impl StreamLoader for NodeLoader {
    async fn load(&self, id: &StreamId) -> QueryResult<StreamState> {
        self.0.load(id).await.map_err(|err| into_query_error(id, err))
    }

    async fn load_genesis(&self, id: &StreamId, genesis: GenesisCommit) -> QueryResult<StreamState> {
        if let Some(handle) = self.0.inner.registry.get(id) {
            return Ok(handle.snapshot());
        }
        let derived = genesis.stream_id()?;
        if &derived != id {
            return Err(QueryError::GenesisMismatch {
                expected: id.clone(),
                derived,
            });
        }
        self.0
            .create_stream(genesis, false)
            .await
            .map_err(|err| into_query_error(id, err))
    }
}

fn into_query_error(id: &StreamId, err: SdkError) -> QueryError {
    match err {
        SdkError::StreamNotFound(missing) => QueryError::NotFound(missing),
        SdkError::Query(inner) => inner,
        SdkError::Stream(inner) => QueryError::Stream(inner),
        other => QueryError::Load {
            stream: id.clone(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_stream::{PatchOp, SignedCommit, StreamMetadata};
    use asl_types::StreamType;
    use serde_json::json;

    fn note(title: &str) -> GenesisCommit {
        GenesisCommit::new(
            StreamType::Tile,
            StreamMetadata::new("did:key:alice"),
            json!({ "title": title }),
        )
    }

    #[tokio::test]
    async fn create_is_idempotent_and_pins() {
        let node = Node::builder().build();
        let first = node.create_stream(note("a"), true).await.unwrap();
        let again = node.create_stream(note("a"), false).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(node.streams(), vec![first.id().clone()]);
        assert_eq!(node.pinned(None).await.unwrap(), vec![first.id().clone()]);
    }

    #[tokio::test]
    async fn unknown_stream_is_not_found() {
        let node = Node::builder().build();
        let id = note("missing").stream_id().unwrap();
        assert!(matches!(node.state(&id), Err(SdkError::StreamNotFound(_))));
        assert!(matches!(node.load(&id).await, Err(SdkError::StreamNotFound(_))));
        assert!(matches!(node.pin(&id, false).await, Err(SdkError::StreamNotFound(_))));
    }

    #[tokio::test]
    async fn request_anchor_without_chain_stays_pending() {
        let node = Node::builder().build();
        let state = node.create_stream(note("a"), false).await.unwrap();
        let status = node.request_anchor(state.id()).await.unwrap();
        assert_eq!(status, AnchorStatus::Pending);
        assert_eq!(node.request_anchor(state.id()).await.unwrap(), AnchorStatus::Pending);
    }

    #[tokio::test]
    async fn request_anchor_on_simulated_chain() {
        let chain = Arc::new(InMemoryAnchorValidator::new());
        let node = Node::builder().with_simulated_chain(chain.clone()).build();
        let state = node.create_stream(note("a"), false).await.unwrap();

        let status = node.request_anchor(state.id()).await.unwrap();
        assert_eq!(status, AnchorStatus::Anchored);
        assert_eq!(chain.height(), 1);

        let anchored = node.state(state.id()).unwrap();
        assert_eq!(anchored.len(), 2);
        assert_eq!(anchored.anchor_count(), 1);
        assert_eq!(anchored.anchor_proof().map(|p| p.root), Some(state.tip()));

        // Already anchored: no second block.
        assert_eq!(node.request_anchor(state.id()).await.unwrap(), AnchorStatus::Anchored);
        assert_eq!(chain.height(), 1);
    }

    #[tokio::test]
    async fn sync_log_rejects_foreign_and_headless_logs() {
        let node = Node::builder().build();
        let a = note("a");
        let b = note("b");
        let id_a = a.stream_id().unwrap();

        let err = node.sync_log(&id_a, vec![b.into()]).await.unwrap_err();
        assert!(matches!(err, SdkError::Conflict(ConflictError::ForeignLog { .. })));

        let signed = SignedCommit::new(&id_a, id_a.genesis(), vec![PatchOp::Remove {
            path: "/title".into(),
        }]);
        let err = node.sync_log(&id_a, vec![signed.into()]).await.unwrap_err();
        assert!(matches!(
            err,
            SdkError::Stream(StreamError::GenesisExpected { found: "signed" })
        ));
        assert!(node.streams().is_empty());
    }

    #[test]
    fn not_found_maps_to_query_not_found() {
        let id = note("x").stream_id().unwrap();
        let err = into_query_error(&id, SdkError::StreamNotFound(id.clone()));
        assert_eq!(err, QueryError::NotFound(id.clone()));

        let err = into_query_error(&id, SdkError::InvalidConfig("bad".into()));
        assert!(matches!(err, QueryError::Load { stream, .. } if stream == id));
    }

    #[tokio::test]
    async fn failed_sync_leaves_no_stream_behind() {
        let chain = Arc::new(InMemoryAnchorValidator::new());
        let node = Node::builder().with_validator(chain.clone()).build();
        let mut remote = StreamState::from_genesis(note("a")).unwrap();
        let id = remote.id().clone();
        let mut proof = chain.anchor(remote.tip());
        proof.block_number += 1;
        let forged = AnchorCommit::new(&id, remote.tip(), proof);
        remote.apply_anchor(Commit::Anchor(forged.clone()).cid().unwrap(), forged).unwrap();
        let forged_log: Vec<Commit> = remote.commits().cloned().collect();

        let err = node.sync_log(&id, forged_log.clone()).await.unwrap_err();
        assert!(matches!(err, SdkError::Conflict(ConflictError::InvalidAnchor { .. })));
        assert!(node.streams().is_empty());

        // A held stream stays held through a failed sync.
        node.create_stream(note("a"), false).await.unwrap();
        assert!(node.sync_log(&id, forged_log).await.is_err());
        assert_eq!(node.streams(), vec![id.clone()]);
        assert_eq!(node.state(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_syncs_keep_the_accepted_log() {
        let chain = Arc::new(InMemoryAnchorValidator::new());
        let node = Node::builder().with_validator(chain.clone()).build();
        let base = StreamState::from_genesis(note("a")).unwrap();
        let id = base.id().clone();

        let mut good = base.clone();
        let proof = chain.anchor(good.tip());
        let anchor = AnchorCommit::new(&id, good.tip(), proof);
        good.apply_anchor(Commit::Anchor(anchor.clone()).cid().unwrap(), anchor).unwrap();

        let mut bad = base;
        let mut proof = chain.anchor(bad.tip());
        proof.block_timestamp = 0;
        let anchor = AnchorCommit::new(&id, bad.tip(), proof);
        bad.apply_anchor(Commit::Anchor(anchor.clone()).cid().unwrap(), anchor).unwrap();

        for _ in 0..16 {
            let good_sync = {
                let node = node.clone();
                let id = id.clone();
                let log: Vec<Commit> = good.commits().cloned().collect();
                tokio::spawn(async move { node.sync_log(&id, log).await })
            };
            let bad_sync = {
                let node = node.clone();
                let id = id.clone();
                let log: Vec<Commit> = bad.commits().cloned().collect();
                tokio::spawn(async move { node.sync_log(&id, log).await })
            };
            assert!(good_sync.await.unwrap().is_ok());
            assert!(bad_sync.await.unwrap().is_err());
            assert_eq!(node.state(&id).unwrap().tip(), good.tip());
        }
    }
}
