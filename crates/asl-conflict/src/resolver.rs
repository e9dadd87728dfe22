use std::time::Duration;

use asl_anchor::ValidatorSet;
use asl_stream::{Commit, StreamHandle, StreamState};
use asl_types::{AnchorProof, Cid, StreamId};
use tracing::{debug, info};

use crate::decision::{resolve, Decision, RejectReason};
use crate::error::{ConflictError, ConflictResult};
use crate::select::{select_log, LogChoice};

/// Upper bound on one anchor proof validation.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of applying one commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The commit is the new tip. `discarded` lists unanchored commits an
    /// anchor commit truncated.
    Appended { tip: Cid, discarded: Vec<Cid> },
    /// Already in the log.
    Duplicate,
    /// Extends a log this node does not have; sync that log instead.
    Fork,
}

/// Result of syncing a whole remote log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// The remote log is the local log or a prefix of it.
    UpToDate,
    /// The remote log extends the local one.
    FastForward,
    /// The remote log won; these local commits were dropped.
    Replaced { discarded: Vec<Cid> },
    /// The local log won.
    KeptLocal,
}

/// Applies commits and logs to streams, one stream lock at a time.
pub struct ConflictResolver {
    validators: ValidatorSet,
    validation_timeout: Duration,
}

impl ConflictResolver {
    pub fn new(validators: ValidatorSet) -> Self {
        Self {
            validators,
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Apply one commit to a stream.
    ///
    /// The decision is made under the stream lock, anchor proofs are
    /// validated without it, and the decision is made again under the lock
    /// before appending, so a tip that moved in between is never clobbered.
    pub async fn apply(&self, handle: &StreamHandle, commit: Commit) -> ConflictResult<Applied> {
        let cid = commit.cid()?;
        let stream = handle.id().clone();

        let decision = resolve(&handle.lock(), cid, &commit);
        if let Some(settled) = settle(&stream, cid, decision)? {
            return Ok(settled);
        }

        if let Some(proof) = commit.anchor_proof() {
            if let Err(source) = self.validate(proof).await {
                if let Some(prev) = commit.prev() {
                    if handle.lock().mark_anchor_failed(&prev) {
                        debug!(stream = %stream, commit = %cid, "anchor failed for pending tip");
                    }
                }
                return Err(ConflictError::InvalidAnchor {
                    stream,
                    commit: cid,
                    source,
                });
            }
        }

        let mut state = handle.lock();
        if let Some(settled) = settle(&stream, cid, resolve(&state, cid, &commit))? {
            return Ok(settled);
        }
        let discarded = match commit {
            Commit::Signed(signed) => {
                state.apply_signed(cid, signed)?;
                Vec::new()
            }
            Commit::Anchor(anchor) => state.apply_anchor(cid, anchor)?,
            Commit::Genesis(_) => {
                return Err(ConflictError::Rejected {
                    stream,
                    commit: cid,
                    reason: RejectReason::UnexpectedGenesis,
                })
            }
        };
        if !discarded.is_empty() {
            info!(stream = %stream, anchor = %cid, discarded = discarded.len(), "anchor truncated unanchored commits");
        }
        debug!(stream = %stream, tip = %cid, len = state.len(), "commit applied");
        Ok(Applied::Appended {
            tip: cid,
            discarded,
        })
    }

    /// Sync a complete remote log (genesis first) for the stream in `handle`.
    ///
    /// Remote anchor commits the local log lacks are validated first; any
    /// failure rejects the whole log.
    pub async fn apply_log(
        &self,
        handle: &StreamHandle,
        commits: Vec<Commit>,
    ) -> ConflictResult<SyncStatus> {
        let remote = StreamState::replay(commits)?;
        if remote.id() != handle.id() {
            return Err(ConflictError::ForeignLog {
                expected: handle.id().clone(),
                found: remote.id().clone(),
            });
        }

        let unseen_anchors: Vec<(Cid, AnchorProof)> = {
            let local = handle.lock();
            remote
                .log()
                .iter()
                .filter(|entry| !local.contains(&entry.cid))
                .filter_map(|entry| entry.commit.anchor_proof().map(|p| (entry.cid, p.clone())))
                .collect()
        };
        for (cid, proof) in &unseen_anchors {
            self.validate(proof)
                .await
                .map_err(|source| ConflictError::InvalidAnchor {
                    stream: remote.id().clone(),
                    commit: *cid,
                    source,
                })?;
        }

        let mut local = handle.lock();
        let status = match select_log(&local, &remote) {
            LogChoice::Local if local.contains(&remote.tip()) => SyncStatus::UpToDate,
            LogChoice::Local => SyncStatus::KeptLocal,
            LogChoice::Remote => {
                let discarded: Vec<Cid> = local
                    .log()
                    .iter()
                    .map(|entry| entry.cid)
                    .filter(|cid| !remote.contains(cid))
                    .collect();
                *local = remote;
                if discarded.is_empty() {
                    SyncStatus::FastForward
                } else {
                    SyncStatus::Replaced { discarded }
                }
            }
        };
        debug!(stream = %handle.id(), status = ?status, tip = %local.tip(), "log synced");
        Ok(status)
    }

    async fn validate(&self, proof: &AnchorProof) -> Result<(), asl_anchor::AnchorError> {
        self.validators.validate(proof, self.validation_timeout).await
    }
}

/// `Some` when the decision ends the operation, `None` to proceed.
fn settle(stream: &StreamId, cid: Cid, decision: Decision) -> ConflictResult<Option<Applied>> {
    match decision {
        Decision::Accept => Ok(None),
        Decision::Duplicate => Ok(Some(Applied::Duplicate)),
        Decision::Fork => {
            debug!(stream = %stream, commit = %cid, "commit extends an unknown log");
            Ok(Some(Applied::Fork))
        }
        Decision::Reject(reason) => {
            debug!(stream = %stream, commit = %cid, %reason, "commit rejected");
            Err(ConflictError::Rejected {
                stream: stream.clone(),
                commit: cid,
                reason,
            })
        }
    }
}
