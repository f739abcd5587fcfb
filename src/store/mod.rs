use thiserror::Error;

pub mod memory;
pub mod normalize;
pub mod port;
pub mod redis;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("document '{id}' is malformed: {reason}")]
    MalformedDocument { id: String, reason: String },

    #[error("document '{0}' not found")]
    NotFound(String),

    #[error("snapshot subscription closed")]
    SubscriptionClosed,
}
