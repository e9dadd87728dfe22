use std::fmt;

use asl_stream::{Commit, StreamState};
use asl_types::Cid;
use serde::{Deserialize, Serialize};

/// What to do with a candidate commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Append it. Anchor commits still need their proof validated first.
    Accept,
    /// Already in the log; nothing to do.
    Duplicate,
    Reject(RejectReason),
    /// Extends a log we do not have. Fetch that log and compare.
    Fork,
}

/// Why a candidate was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum RejectReason {
    /// Links to an earlier commit of the local log, not the tip.
    StaleTip { prev: Cid, tip: Cid },
    /// Names a different genesis.
    WrongStream { genesis: Cid },
    /// A genesis commit that is not this stream's own.
    UnexpectedGenesis,
    /// An anchor that would discard already-anchored history.
    AnchoredHistory { anchored: Cid },
    /// An anchor whose proof commits to a different root than its prev.
    RootMismatch { root: Cid, prev: Cid },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleTip { .. } => f.write_str("stale tip: conflict resolution rejected the commit"),
            Self::WrongStream { genesis } => write!(f, "commit belongs to stream genesis {genesis}"),
            Self::UnexpectedGenesis => f.write_str("unexpected genesis commit"),
            Self::AnchoredHistory { anchored } => {
                write!(f, "anchor would discard anchored commit {anchored}")
            }
            Self::RootMismatch { root, prev } => {
                write!(f, "anchor proof root {root} does not match anchored commit {prev}")
            }
        }
    }
}

/// Decide what to do with `candidate` (content hash `cid`) given `local`.
///
/// Pure: no I/O, no proof validation. Callers holding the stream lock can
/// call it again to re-check a decision made before an `.await`.
pub fn resolve(local: &StreamState, cid: Cid, candidate: &Commit) -> Decision {
    if local.contains(&cid) {
        return Decision::Duplicate;
    }
    let Some(genesis) = candidate.genesis_link() else {
        return Decision::Reject(RejectReason::UnexpectedGenesis);
    };
    if genesis != local.id().genesis() {
        return Decision::Reject(RejectReason::WrongStream { genesis });
    }
    let Some(prev) = candidate.prev() else {
        return Decision::Reject(RejectReason::UnexpectedGenesis);
    };

    let tip = local.tip();
    let Some(position) = local.position(&prev) else {
        return Decision::Fork;
    };

    match candidate {
        Commit::Anchor(anchor) if anchor.proof.root != prev => {
            Decision::Reject(RejectReason::RootMismatch {
                root: anchor.proof.root,
                prev,
            })
        }
        Commit::Anchor(_) => {
            let later_anchor = local.log()[position + 1..]
                .iter()
                .find(|entry| entry.commit.is_anchor());
            match later_anchor {
                Some(entry) => Decision::Reject(RejectReason::AnchoredHistory {
                    anchored: entry.cid,
                }),
                None => Decision::Accept,
            }
        }
        _ if prev == tip => Decision::Accept,
        _ => Decision::Reject(RejectReason::StaleTip { prev, tip }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_stream::{AnchorCommit, GenesisCommit, PatchOp, SignedCommit, StreamMetadata};
    use asl_types::{AnchorProof, ChainId, Multihash, StreamType};
    use serde_json::json;

    fn state() -> StreamState {
        StreamState::from_genesis(GenesisCommit::new(
            StreamType::Tile,
            StreamMetadata::new("did:key:alice"),
            json!({"n": 0}),
        ))
        .unwrap()
    }

    fn signed(state: &StreamState, prev: Cid, n: i64) -> (Cid, Commit) {
        let commit: Commit = SignedCommit::new(
            state.id(),
            prev,
            vec![PatchOp::Replace {
                path: "/n".into(),
                value: json!(n),
            }],
        )
        .into();
        (commit.cid().unwrap(), commit)
    }

    fn anchor(state: &StreamState, prev: Cid) -> (Cid, Commit) {
        let commit: Commit = AnchorCommit::new(
            state.id(),
            prev,
            AnchorProof {
                chain_id: ChainId::eip155(1),
                tx_hash: Multihash::keccak256([1; 32]),
                root: prev,
                block_number: 1,
                block_timestamp: 1,
            },
        )
        .into();
        (commit.cid().unwrap(), commit)
    }

    fn push(state: &mut StreamState, (cid, commit): (Cid, Commit)) {
        match commit {
            Commit::Signed(c) => state.apply_signed(cid, c).unwrap(),
            Commit::Anchor(c) => {
                state.apply_anchor(cid, c).unwrap();
            }
            Commit::Genesis(_) => unreachable!(),
        }
    }

    #[test]
    fn extending_the_tip_is_accepted() {
        let s = state();
        let (cid, c) = signed(&s, s.tip(), 1);
        assert_eq!(resolve(&s, cid, &c), Decision::Accept);
    }

    #[test]
    fn known_commit_is_duplicate() {
        let mut s = state();
        let update = signed(&s, s.tip(), 1);
        push(&mut s, update.clone());
        assert_eq!(resolve(&s, update.0, &update.1), Decision::Duplicate);
        let genesis = s.log()[0].clone();
        assert_eq!(resolve(&s, genesis.cid, &genesis.commit), Decision::Duplicate);
    }

    #[test]
    fn stale_tip_is_rejected() {
        let mut s = state();
        let genesis = s.tip();
        let first = signed(&s, genesis, 1);
        push(&mut s, first.clone());

        let (cid, c) = signed(&s, genesis, 2);
        let decision = resolve(&s, cid, &c);
        assert_eq!(
            decision,
            Decision::Reject(RejectReason::StaleTip {
                prev: genesis,
                tip: first.0
            })
        );
        let Decision::Reject(reason) = decision else { unreachable!() };
        assert_eq!(reason.to_string(), "stale tip: conflict resolution rejected the commit");
    }

    #[test]
    fn unknown_prev_is_a_fork() {
        let s = state();
        let (cid, c) = signed(&s, Cid::from_hash([7; 32]), 1);
        assert_eq!(resolve(&s, cid, &c), Decision::Fork);
    }

    #[test]
    fn foreign_and_genesis_commits_are_rejected() {
        let s = state();
        let other = StreamState::from_genesis(GenesisCommit::new(
            StreamType::Tile,
            StreamMetadata::new("did:key:bob"),
            json!({}),
        ))
        .unwrap();
        let (cid, c) = signed(&other, other.tip(), 1);
        assert!(matches!(
            resolve(&s, cid, &c),
            Decision::Reject(RejectReason::WrongStream { .. })
        ));

        let foreign_genesis = other.log()[0].clone();
        assert_eq!(
            resolve(&s, foreign_genesis.cid, &foreign_genesis.commit),
            Decision::Reject(RejectReason::UnexpectedGenesis)
        );
    }

    #[test]
    fn anchor_may_link_to_earlier_entry() {
        let mut s = state();
        let genesis = s.tip();
        let update = signed(&s, genesis, 1);
        push(&mut s, update);

        let (cid, c) = anchor(&s, genesis);
        assert_eq!(resolve(&s, cid, &c), Decision::Accept);
    }

    #[test]
    fn anchor_behind_another_anchor_is_rejected() {
        let mut s = state();
        let genesis = s.tip();
        let first = anchor(&s, genesis);
        push(&mut s, first.clone());
        let update = signed(&s, s.tip(), 1);
        push(&mut s, update);

        let competing: Commit = AnchorCommit::new(
            s.id(),
            genesis,
            AnchorProof {
                chain_id: ChainId::eip155(1),
                tx_hash: Multihash::keccak256([2; 32]),
                root: genesis,
                block_number: 2,
                block_timestamp: 2,
            },
        )
        .into();
        let cid = competing.cid().unwrap();
        assert_eq!(
            resolve(&s, cid, &competing),
            Decision::Reject(RejectReason::AnchoredHistory { anchored: first.0 })
        );
    }

    #[test]
    fn anchor_proving_another_root_is_rejected() {
        let s = state();
        let genesis = s.tip();
        let other_root = Cid::from_hash([9; 32]);
        let foreign: Commit = AnchorCommit::new(
            s.id(),
            genesis,
            AnchorProof {
                chain_id: ChainId::eip155(1),
                tx_hash: Multihash::keccak256([3; 32]),
                root: other_root,
                block_number: 3,
                block_timestamp: 3,
            },
        )
        .into();
        let cid = foreign.cid().unwrap();
        let decision = resolve(&s, cid, &foreign);
        assert_eq!(
            decision,
            Decision::Reject(RejectReason::RootMismatch {
                root: other_root,
                prev: genesis
            })
        );
        let Decision::Reject(reason) = decision else { unreachable!() };
        assert_eq!(
            serde_json::to_value(&reason).unwrap()["reason"],
            json!("root-mismatch")
        );
    }
}
