//! Cache domain - Generic caching abstraction layer

mod key;
mod repository;

pub use key::{
    CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator, EMBEDDING_NAMESPACE,
    RESPONSE_NAMESPACE,
};
pub use repository::Cache;

#[cfg(test)]
pub use repository::mock::MockCache;
