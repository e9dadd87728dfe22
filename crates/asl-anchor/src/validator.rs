use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use asl_types::{AnchorProof, ChainId};
use async_trait::async_trait;

use crate::error::{AnchorError, AnchorResult};

/// Chain-inclusion check for one chain family.
///
/// Implementations are registered per CAIP-2 namespace (see
/// [`ValidatorSet`]), so supporting a new chain family never touches
/// conflict resolution.
#[async_trait]
pub trait AnchorValidator: Send + Sync {
    /// CAIP-2 namespace this validator handles, e.g. `eip155`.
    fn namespace(&self) -> &'static str;

    /// The chain fixed at `init`, if any.
    fn chain_id(&self) -> Option<ChainId>;

    /// One-time setup. With `Some(chain)`, confirm the configured network
    /// actually serves that chain. Errors here are configuration errors and
    /// fatal for startup. Calling `init` twice fails.
    async fn init(&self, chain_id: Option<&ChainId>) -> AnchorResult<()>;

    /// Confirm that `proof` is included on-chain as claimed.
    async fn validate_chain_inclusion(&self, proof: &AnchorProof) -> AnchorResult<()>;

    /// [`validate_chain_inclusion`](Self::validate_chain_inclusion) bounded by
    /// `timeout`. A timed-out validation leaves no partial cache state.
    async fn validate_with_timeout(
        &self,
        proof: &AnchorProof,
        timeout: Duration,
    ) -> AnchorResult<()> {
        tokio::time::timeout(timeout, self.validate_chain_inclusion(proof))
            .await
            .map_err(|_| AnchorError::Timeout(timeout))?
    }
}

/// Validators keyed by chain namespace.
#[derive(Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<&'static str, Arc<dyn AnchorValidator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator, replacing any previous one for its namespace.
    pub fn register(&mut self, validator: Arc<dyn AnchorValidator>) {
        self.validators.insert(validator.namespace(), validator);
    }

    pub fn with(mut self, validator: Arc<dyn AnchorValidator>) -> Self {
        self.register(validator);
        self
    }

    pub fn for_chain(&self, chain_id: &ChainId) -> AnchorResult<&Arc<dyn AnchorValidator>> {
        self.validators
            .get(chain_id.namespace())
            .ok_or_else(|| AnchorError::NoProvider(chain_id.clone()))
    }

    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.validators.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validate a proof with the validator for its chain namespace.
    pub async fn validate(&self, proof: &AnchorProof, timeout: Duration) -> AnchorResult<()> {
        self.for_chain(&proof.chain_id)?
            .validate_with_timeout(proof, timeout)
            .await
    }
}
