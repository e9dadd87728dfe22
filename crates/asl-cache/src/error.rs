use thiserror::Error;

/// Errors from cache construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache `{name}` must hold at least one entry")]
    ZeroCapacity { name: &'static str },
}

pub type CacheResult<T> = Result<T, CacheError>;
