use asl_types::{AnchorProof, Cid, CommitId, StreamId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commit::{AnchorCommit, Commit, GenesisCommit, SignedCommit, StreamMetadata};
use crate::error::{StreamError, StreamResult};
use crate::patch::apply_patch;

/// Where a stream stands with respect to anchoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnchorStatus {
    #[default]
    NotRequested,
    Pending,
    Anchored,
    Failed,
}

/// One applied commit and its content hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub cid: Cid,
    pub commit: Commit,
}

/// The materialized state of one stream.
///
/// The log is a gap-free chain from genesis to tip. `content` and
/// `metadata` are the fold of every commit in it. Every mutation either
/// succeeds completely or leaves the state unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamState {
    id: StreamId,
    log: Vec<LogEntry>,
    content: Value,
    metadata: StreamMetadata,
    anchor_status: AnchorStatus,
}

impl StreamState {
    /// Start a stream from its genesis commit.
    pub fn from_genesis(genesis: GenesisCommit) -> StreamResult<Self> {
        if genesis.header.controllers.is_empty() {
            return Err(StreamError::InvalidGenesis(
                "at least one controller is required".into(),
            ));
        }
        let id = genesis.stream_id()?;
        let content = genesis.content.clone();
        let metadata = genesis.header.clone();
        Ok(Self {
            log: vec![LogEntry {
                cid: id.genesis(),
                commit: Commit::Genesis(genesis),
            }],
            id,
            content,
            metadata,
            anchor_status: AnchorStatus::NotRequested,
        })
    }

    /// Rebuild a state by folding a complete log, genesis first.
    ///
    /// Anchor proofs are not re-validated here; a stored log only contains
    /// anchors that passed validation when they were applied.
    pub fn replay<I>(commits: I) -> StreamResult<Self>
    where
        I: IntoIterator<Item = Commit>,
    {
        let mut commits = commits.into_iter();
        let mut state = match commits.next() {
            Some(Commit::Genesis(genesis)) => Self::from_genesis(genesis)?,
            Some(other) => {
                return Err(StreamError::GenesisExpected {
                    found: other.kind(),
                })
            }
            None => return Err(StreamError::GenesisExpected { found: "no" }),
        };
        for commit in commits {
            let cid = commit.cid()?;
            match commit {
                Commit::Genesis(_) => {
                    return Err(StreamError::InvalidGenesis(format!(
                        "second genesis commit {cid} in the log of {}",
                        state.id
                    )))
                }
                Commit::Signed(signed) => state.apply_signed(cid, signed)?,
                Commit::Anchor(anchor) => {
                    state.require_tip(cid, anchor.prev)?;
                    state.apply_anchor(cid, anchor)?;
                }
            }
        }
        Ok(state)
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    pub fn anchor_status(&self) -> AnchorStatus {
        self.anchor_status
    }

    /// Content hash of the most recent commit.
    pub fn tip(&self) -> Cid {
        self.log
            .last()
            .map(|entry| entry.cid)
            .unwrap_or_else(|| self.id.genesis())
    }

    pub fn tip_commit_id(&self) -> CommitId {
        self.id.at_commit(self.tip())
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Never true: a state always holds its genesis commit.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Index of `cid` in the log.
    pub fn position(&self, cid: &Cid) -> Option<usize> {
        self.log.iter().position(|entry| entry.cid == *cid)
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.position(cid).is_some()
    }

    /// The commits in log order.
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.log.iter().map(|entry| &entry.commit)
    }

    pub fn anchor_count(&self) -> usize {
        self.log.iter().filter(|entry| entry.commit.is_anchor()).count()
    }

    /// Proof of the most recent anchor commit in the log.
    pub fn latest_anchor(&self) -> Option<&AnchorProof> {
        self.log.iter().rev().find_map(|entry| entry.commit.anchor_proof())
    }

    /// Proof of the tip, when the tip is an anchor commit.
    pub fn anchor_proof(&self) -> Option<&AnchorProof> {
        self.log.last().and_then(|entry| entry.commit.anchor_proof())
    }

    fn require_stream(&self, cid: Cid, genesis: Cid) -> StreamResult<()> {
        if genesis == self.id.genesis() {
            Ok(())
        } else {
            Err(StreamError::WrongStream {
                stream: self.id.clone(),
                commit: cid,
                genesis,
            })
        }
    }

    fn require_tip(&self, cid: Cid, prev: Cid) -> StreamResult<()> {
        let tip = self.tip();
        if prev == tip {
            Ok(())
        } else {
            Err(StreamError::TipMismatch {
                stream: self.id.clone(),
                commit: cid,
                prev,
                tip,
            })
        }
    }

    /// Append a signed commit. Its `prev` must be the current tip.
    pub fn apply_signed(&mut self, cid: Cid, commit: SignedCommit) -> StreamResult<()> {
        self.require_stream(cid, commit.genesis)?;
        self.require_tip(cid, commit.prev)?;

        let content = apply_patch(&self.content, &commit.patch)?;
        let metadata = match &commit.header {
            Some(update) => update.apply_to(&self.metadata),
            None => self.metadata.clone(),
        };

        self.content = content;
        self.metadata = metadata;
        self.log.push(LogEntry {
            cid,
            commit: Commit::Signed(commit),
        });
        // The tip is no longer the anchored commit.
        if matches!(self.anchor_status, AnchorStatus::Anchored | AnchorStatus::Failed) {
            self.anchor_status = AnchorStatus::NotRequested;
        }
        Ok(())
    }

    /// Append an anchor commit whose proof has already been validated.
    ///
    /// `prev` may name any entry of the log. Entries after it are the
    /// unanchored updates that lost the race; they are discarded and their
    /// hashes returned. Anchored history is never discarded.
    pub fn apply_anchor(&mut self, cid: Cid, commit: AnchorCommit) -> StreamResult<Vec<Cid>> {
        self.require_stream(cid, commit.genesis)?;
        if commit.proof.root != commit.prev {
            return Err(StreamError::RootMismatch {
                stream: self.id.clone(),
                commit: cid,
                root: commit.proof.root,
                prev: commit.prev,
            });
        }
        let position = self.position(&commit.prev).ok_or_else(|| StreamError::UnknownPrev {
            stream: self.id.clone(),
            commit: cid,
            prev: commit.prev,
        })?;

        let suffix = &self.log[position + 1..];
        if let Some(anchored) = suffix.iter().find(|entry| entry.commit.is_anchor()) {
            return Err(StreamError::AnchoredHistory {
                stream: self.id.clone(),
                commit: cid,
                anchored: anchored.cid,
            });
        }
        let discarded: Vec<Cid> = suffix.iter().map(|entry| entry.cid).collect();

        let mut next = if discarded.is_empty() {
            self.clone()
        } else {
            Self::replay(self.log[..=position].iter().map(|entry| entry.commit.clone()))?
        };
        next.log.push(LogEntry {
            cid,
            commit: Commit::Anchor(commit),
        });
        next.anchor_status = AnchorStatus::Anchored;
        *self = next;
        Ok(discarded)
    }

    /// Ask for the tip to be anchored. Returns `false` when the tip is
    /// already anchored or a request is outstanding.
    pub fn request_anchor(&mut self) -> bool {
        match self.anchor_status {
            AnchorStatus::Anchored if self.anchor_proof().is_some() => false,
            AnchorStatus::Pending => false,
            _ => {
                self.anchor_status = AnchorStatus::Pending;
                true
            }
        }
    }

    /// Record that the anchor attempt for `anchored` failed. Only affects a
    /// pending request for the current tip.
    pub fn mark_anchor_failed(&mut self, anchored: &Cid) -> bool {
        if self.anchor_status == AnchorStatus::Pending && *anchored == self.tip() {
            self.anchor_status = AnchorStatus::Failed;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{MetadataUpdate, PatchOp};
    use asl_types::{ChainId, Multihash, StreamType};
    use serde_json::json;

    fn genesis() -> GenesisCommit {
        GenesisCommit::new(
            StreamType::Tile,
            StreamMetadata::new("did:key:alice"),
            json!({"n": 0}),
        )
    }

    fn set_n(state: &StreamState, n: i64) -> (Cid, SignedCommit) {
        let commit = SignedCommit::new(
            state.id(),
            state.tip(),
            vec![PatchOp::Replace {
                path: "/n".into(),
                value: json!(n),
            }],
        );
        (Commit::Signed(commit.clone()).cid().unwrap(), commit)
    }

    fn anchor_on(state: &StreamState, prev: Cid, block: u64) -> (Cid, AnchorCommit) {
        let proof = AnchorProof {
            chain_id: ChainId::eip155(1),
            tx_hash: Multihash::keccak256([block as u8; 32]),
            root: prev,
            block_number: block,
            block_timestamp: 1_000 + block,
        };
        let commit = AnchorCommit::new(state.id(), prev, proof);
        (Commit::Anchor(commit.clone()).cid().unwrap(), commit)
    }

    #[test]
    fn genesis_state() {
        let state = StreamState::from_genesis(genesis()).unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state.tip(), state.id().genesis());
        assert!(state.tip_commit_id().is_genesis());
        assert_eq!(state.content(), &json!({"n": 0}));
        assert_eq!(state.anchor_status(), AnchorStatus::NotRequested);
        assert_eq!(state.anchor_count(), 0);
    }

    #[test]
    fn genesis_requires_controller() {
        let mut g = genesis();
        g.header.controllers.clear();
        assert!(matches!(
            StreamState::from_genesis(g),
            Err(StreamError::InvalidGenesis(_))
        ));
    }

    #[test]
    fn signed_commits_fold_into_content() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let (cid, commit) = set_n(&state, 1);
        state.apply_signed(cid, commit).unwrap();
        let (cid, commit) = set_n(&state, 2);
        let commit = commit.with_header(MetadataUpdate {
            family: Some("counter".into()),
            ..Default::default()
        });
        let cid2 = Commit::Signed(commit.clone()).cid().unwrap();
        assert_ne!(cid, cid2);
        state.apply_signed(cid2, commit).unwrap();

        assert_eq!(state.len(), 3);
        assert_eq!(state.tip(), cid2);
        assert_eq!(state.content(), &json!({"n": 2}));
        assert_eq!(state.metadata().family.as_deref(), Some("counter"));
    }

    #[test]
    fn stale_prev_is_rejected_without_change() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let (stale_cid, stale) = set_n(&state, 5);
        let (cid, commit) = set_n(&state, 1);
        state.apply_signed(cid, commit).unwrap();

        let before = state.clone();
        let err = state.apply_signed(stale_cid, stale).unwrap_err();
        assert!(matches!(err, StreamError::TipMismatch { tip, .. } if tip == cid));
        assert_eq!(state, before);
    }

    #[test]
    fn bad_patch_is_atomic() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let commit = SignedCommit::new(
            state.id(),
            state.tip(),
            vec![
                PatchOp::Replace {
                    path: "/n".into(),
                    value: json!(9),
                },
                PatchOp::Remove {
                    path: "/missing".into(),
                },
            ],
        );
        let cid = Commit::Signed(commit.clone()).cid().unwrap();
        let before = state.clone();
        assert!(state.apply_signed(cid, commit).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn commit_for_other_stream_is_rejected() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let mut other = genesis();
        other.content = json!({"other": true});
        let other_id = other.stream_id().unwrap();
        let commit = SignedCommit::new(&other_id, state.tip(), vec![]);
        let cid = Commit::Signed(commit.clone()).cid().unwrap();
        assert!(matches!(
            state.apply_signed(cid, commit),
            Err(StreamError::WrongStream { .. })
        ));
    }

    #[test]
    fn anchor_on_tip_marks_anchored() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let (cid, commit) = set_n(&state, 1);
        state.apply_signed(cid, commit).unwrap();
        assert!(state.request_anchor());
        assert!(!state.request_anchor());
        assert_eq!(state.anchor_status(), AnchorStatus::Pending);

        let (acid, anchor) = anchor_on(&state, state.tip(), 10);
        let discarded = state.apply_anchor(acid, anchor).unwrap();
        assert!(discarded.is_empty());
        assert_eq!(state.anchor_status(), AnchorStatus::Anchored);
        assert_eq!(state.anchor_proof().map(|p| p.block_number), Some(10));
        assert!(!state.request_anchor());

        let (cid, commit) = set_n(&state, 2);
        state.apply_signed(cid, commit).unwrap();
        assert_eq!(state.anchor_status(), AnchorStatus::NotRequested);
        assert_eq!(state.latest_anchor().map(|p| p.block_number), Some(10));
        assert!(state.anchor_proof().is_none());
    }

    #[test]
    fn anchor_on_earlier_entry_truncates_suffix() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let (c1, s1) = set_n(&state, 1);
        state.apply_signed(c1, s1).unwrap();
        let anchored_prev = state.tip();
        let (c2, s2) = set_n(&state, 2);
        state.apply_signed(c2, s2).unwrap();
        let (c3, s3) = set_n(&state, 3);
        state.apply_signed(c3, s3).unwrap();

        let (acid, anchor) = anchor_on(&state, anchored_prev, 7);
        let discarded = state.apply_anchor(acid, anchor).unwrap();
        assert_eq!(discarded, vec![c2, c3]);
        assert_eq!(state.len(), 3);
        assert_eq!(state.tip(), acid);
        assert_eq!(state.content(), &json!({"n": 1}));
    }

    #[test]
    fn anchored_history_is_never_discarded() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let genesis_cid = state.tip();
        let (a1, anchor1) = anchor_on(&state, genesis_cid, 1);
        state.apply_anchor(a1, anchor1).unwrap();

        let (a2, anchor2) = anchor_on(&state, genesis_cid, 2);
        let before = state.clone();
        let err = state.apply_anchor(a2, anchor2).unwrap_err();
        assert!(matches!(err, StreamError::AnchoredHistory { anchored, .. } if anchored == a1));
        assert_eq!(state, before);
    }

    #[test]
    fn anchor_must_prove_its_prev() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let genesis_cid = state.tip();
        let (_, mut anchor) = anchor_on(&state, genesis_cid, 1);
        anchor.proof.root = Cid::from_hash([4; 32]);
        let cid = Commit::Anchor(anchor.clone()).cid().unwrap();

        let before = state.clone();
        let err = state.apply_anchor(cid, anchor.clone()).unwrap_err();
        assert!(matches!(err, StreamError::RootMismatch { prev, .. } if prev == genesis_cid));
        assert_eq!(state, before);

        let log = vec![state.log()[0].commit.clone(), Commit::Anchor(anchor)];
        let err = StreamState::replay(log).unwrap_err();
        assert!(matches!(err, StreamError::RootMismatch { .. }));
    }

    #[test]
    fn failed_anchor_only_for_pending_tip() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let tip = state.tip();
        assert!(!state.mark_anchor_failed(&tip));
        state.request_anchor();
        assert!(!state.mark_anchor_failed(&Cid::from_hash([0; 32])));
        assert!(state.mark_anchor_failed(&tip));
        assert_eq!(state.anchor_status(), AnchorStatus::Failed);
        assert!(state.request_anchor());
    }

    #[test]
    fn replay_rebuilds_identical_state() {
        let mut state = StreamState::from_genesis(genesis()).unwrap();
        let (c1, s1) = set_n(&state, 1);
        state.apply_signed(c1, s1).unwrap();
        let (acid, anchor) = anchor_on(&state, state.tip(), 3);
        state.apply_anchor(acid, anchor).unwrap();
        let (c2, s2) = set_n(&state, 4);
        state.apply_signed(c2, s2).unwrap();

        let rebuilt = StreamState::replay(state.commits().cloned()).unwrap();
        assert_eq!(rebuilt.log(), state.log());
        assert_eq!(rebuilt.content(), state.content());
        assert_eq!(rebuilt.anchor_count(), 1);
    }

    #[test]
    fn replay_requires_genesis_first() {
        let state = StreamState::from_genesis(genesis()).unwrap();
        let (_, s1) = set_n(&state, 1);
        assert!(matches!(
            StreamState::replay([Commit::Signed(s1)]),
            Err(StreamError::GenesisExpected { found: "signed" })
        ));
        assert!(StreamState::replay(Vec::<Commit>::new()).is_err());
    }
}
