use std::sync::Arc;

use asl_anchor::{AnchorError, ProofField};
use asl_sdk::{
    AnchorCommit, AnchorStatus, Applied, Commit, ConflictError, GenesisCommit,
    InMemoryAnchorValidator, MultiQuery, Node, NodeConfig, PatchOp, SdkError, SignedCommit,
    StreamId, StreamMetadata, StreamState, StreamType, SyncStatus,
};
use mockito::{Matcher, Server};
use serde_json::{json, Value};

fn genesis(content: Value) -> GenesisCommit {
    GenesisCommit::new(
        StreamType::Tile,
        StreamMetadata::new("did:key:alice"),
        content,
    )
}

fn set(state: &StreamState, path: &str, value: Value) -> Commit {
    SignedCommit::new(
        state.id(),
        state.tip(),
        vec![PatchOp::Replace {
            path: path.into(),
            value,
        }],
    )
    .into()
}

fn log_of(state: &StreamState) -> Vec<Commit> {
    state.commits().cloned().collect()
}

#[tokio::test]
async fn stale_and_forked_commits() {
    let node = Node::builder().build();
    let start = node.create_stream(genesis(json!({"n": 0})), true).await.unwrap();
    let id = start.id().clone();

    let applied = node.apply_commit(&id, set(&start, "/n", json!(1))).await.unwrap();
    assert!(matches!(applied, Applied::Appended { ref discarded, .. } if discarded.is_empty()));

    let again = node.apply_commit(&id, set(&start, "/n", json!(1))).await.unwrap();
    assert_eq!(again, Applied::Duplicate);

    // Builds on genesis, which is no longer the tip.
    let err = node.apply_commit(&id, set(&start, "/n", json!(2))).await.unwrap_err();
    assert!(matches!(&err, SdkError::Conflict(e) if e.is_stale_tip()));
    assert_eq!(node.state(&id).unwrap().content(), &json!({"n": 1}));

    let elsewhere = node.create_stream(genesis(json!({"n": 9})), false).await.unwrap();
    let unknown_prev = SignedCommit::new(&id, elsewhere.tip(), vec![]);
    let applied = node.apply_commit(&id, unknown_prev.into()).await.unwrap();
    assert_eq!(applied, Applied::Fork);
}

#[tokio::test]
async fn anchored_log_wins_on_sync() {
    let chain = Arc::new(InMemoryAnchorValidator::new());
    let a = Node::builder().with_simulated_chain(chain.clone()).build();
    let b = Node::builder().with_validator(chain.clone()).build();

    let start = a.create_stream(genesis(json!({"n": 0})), false).await.unwrap();
    let id = start.id().clone();
    assert_eq!(b.sync_log(&id, log_of(&start)).await.unwrap(), SyncStatus::UpToDate);

    b.apply_commit(&id, set(&start, "/n", json!(2))).await.unwrap();
    let b_only = b.state(&id).unwrap().tip();

    a.apply_commit(&id, set(&start, "/n", json!(1))).await.unwrap();
    assert_eq!(a.request_anchor(&id).await.unwrap(), AnchorStatus::Anchored);
    let a_log = a.state(&id).unwrap();

    let status = b.sync_log(&id, log_of(&a_log)).await.unwrap();
    assert_eq!(status, SyncStatus::Replaced { discarded: vec![b_only] });

    let synced = b.state(&id).unwrap();
    assert_eq!(synced.tip(), a_log.tip());
    assert_eq!(synced.content(), &json!({"n": 1}));
    assert_eq!(synced.anchor_status(), AnchorStatus::Anchored);

    // A stale prefix changes nothing.
    let status = a.sync_log(&id, log_of(&start)).await.unwrap();
    assert_eq!(status, SyncStatus::UpToDate);
}

#[tokio::test]
async fn forged_anchor_is_rejected() {
    let chain = Arc::new(InMemoryAnchorValidator::new());
    let node = Node::builder().with_validator(chain.clone()).build();
    let start = node.create_stream(genesis(json!({"n": 0})), false).await.unwrap();
    let id = start.id().clone();

    let mut proof = chain.anchor(start.tip());
    proof.block_number += 1;
    let err = node
        .apply_commit(&id, AnchorCommit::new(&id, start.tip(), proof).into())
        .await
        .unwrap_err();

    match err {
        SdkError::Conflict(ConflictError::InvalidAnchor { source, .. }) => {
            assert_eq!(source.mismatched_field(), Some(ProofField::BlockNumber));
        }
        other => panic!("unexpected error: {other}"),
    }
    let after = node.state(&id).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after.anchor_status(), AnchorStatus::NotRequested);
}

#[tokio::test]
async fn remote_streams_load_and_pin() {
    let chain = Arc::new(InMemoryAnchorValidator::new());
    let origin = Node::builder().with_simulated_chain(chain.clone()).build();
    let start = origin.create_stream(genesis(json!({"n": 0})), true).await.unwrap();
    let id = start.id().clone();
    origin.request_anchor(&id).await.unwrap();

    let replica = Node::builder()
        .with_validator(chain.clone())
        .with_remote(origin.loader())
        .build();
    assert!(replica.streams().is_empty());

    assert!(replica.pin(&id, false).await.unwrap());
    let loaded = replica.state(&id).unwrap();
    assert_eq!(loaded, origin.state(&id).unwrap());
    assert_eq!(replica.pinned(Some(&id)).await.unwrap(), vec![id.clone()]);

    assert!(replica.unpin(&id).await.unwrap());
    assert!(replica.pinned(None).await.unwrap().is_empty());

    let missing = genesis(json!({"n": "missing"})).stream_id().unwrap();
    assert!(matches!(replica.load(&missing).await, Err(SdkError::StreamNotFound(_))));
}

#[tokio::test]
async fn remote_anchor_without_validator_is_refused() {
    let chain = Arc::new(InMemoryAnchorValidator::new());
    let origin = Node::builder().with_simulated_chain(chain).build();
    let start = origin.create_stream(genesis(json!({"n": 0})), false).await.unwrap();
    origin.request_anchor(start.id()).await.unwrap();

    let replica = Node::builder().with_remote(origin.loader()).build();
    let err = replica.load(start.id()).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::Conflict(ConflictError::InvalidAnchor {
            source: AnchorError::NoProvider(_),
            ..
        })
    ));
    assert!(replica.streams().is_empty());
}

#[tokio::test]
async fn multi_query_follows_links_through_remote() {
    let origin = Node::builder().build();
    let friend = origin.create_stream(genesis(json!({"name": "bob"})), false).await.unwrap();
    let profile = origin
        .create_stream(
            genesis(json!({"name": "alice", "friend": friend.id().to_string()})),
            false,
        )
        .await
        .unwrap();

    let node = Node::builder().with_remote(origin.loader()).build();
    let local = node.create_stream(genesis(json!({"name": "carol"})), false).await.unwrap();

    let results = node
        .multi_query(vec![
            MultiQuery::new(profile.id().clone()).with_path("/friend"),
            MultiQuery::new(local.id().clone()),
        ])
        .await
        .unwrap();

    let ids: Vec<&StreamId> = results.keys().collect();
    let mut expected = vec![friend.id(), profile.id(), local.id()];
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(results[friend.id()].content()["name"], "bob");
}

#[tokio::test]
async fn multi_query_materializes_genesis_queries() {
    let node = Node::builder().build();
    let fresh = genesis(json!({"name": "dave"}));
    let id = fresh.stream_id().unwrap();

    let results = node
        .multi_query(vec![MultiQuery::from_genesis(fresh).unwrap()])
        .await
        .unwrap();
    assert_eq!(results[&id].len(), 1);
    assert_eq!(node.streams(), vec![id]);
}

async fn chain_id_server(result: &str) -> mockito::ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .match_body(Matcher::Regex(r#""method"\s*:\s*"eth_chainId""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string())
        .create_async()
        .await;
    server
}

#[tokio::test]
async fn from_config_checks_the_network() {
    let server = chain_id_server("0x1").await;
    let mut config = NodeConfig::default();
    config.anchor.chain_id = Some("eip155:1".into());
    config.anchor.ethereum.rpc_url = Some(server.url());
    config.anchor.simulated = true;

    let node = Node::from_config(&config).await.unwrap();
    assert_eq!(node.validators().namespaces(), vec!["eip155", "inmemory"]);

    let start = node.create_stream(genesis(json!({})), false).await.unwrap();
    assert_eq!(node.request_anchor(start.id()).await.unwrap(), AnchorStatus::Anchored);
}

#[tokio::test]
async fn from_config_fails_on_wrong_network() {
    let server = chain_id_server("0x5").await;
    let mut config = NodeConfig::default();
    config.anchor.chain_id = Some("eip155:1".into());
    config.anchor.ethereum.rpc_url = Some(server.url());

    let err = match Node::from_config(&config).await {
        Ok(_) => panic!("node started against the wrong network"),
        Err(err) => err,
    };
    assert!(matches!(err, SdkError::Anchor(AnchorError::NetworkMismatch { .. })));
}
