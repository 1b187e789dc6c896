//! Service boundary used by command execution.
//!
//! Commands never mutate state themselves: they hand a typed request to one of
//! these traits and return whatever comes back. Implementations own all
//! business rules, including name uniqueness.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Market, MarketCreateRequest};

pub use memory::MarketStore;

/// Failure raised by a domain service. Opaque to the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail")]
pub enum ServiceError {
    #[error("{what} already exists")]
    AlreadyExists { what: String },
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl From<crate::persist::PersistError> for ServiceError {
    fn from(e: crate::persist::PersistError) -> Self {
        ServiceError::Storage {
            message: e.to_string(),
        }
    }
}

#[async_trait]
pub trait MarketService: Send + Sync {
    async fn create(&self, request: MarketCreateRequest) -> Result<Market, ServiceError>;

    /// All markets, optionally restricted to one profile, in creation order.
    async fn list(&self, profile_id: Option<u64>) -> Result<Vec<Market>, ServiceError>;
}

/// Service handles handed to the registry when commands are constructed.
#[derive(Clone)]
pub struct Services {
    pub markets: Arc<dyn MarketService>,
}

impl Services {
    pub fn in_memory() -> Self {
        Self {
            markets: Arc::new(MarketStore::in_memory()),
        }
    }
}
