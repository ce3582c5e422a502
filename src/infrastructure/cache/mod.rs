//! Cache infrastructure - Cache implementations

mod factory;
mod in_memory;

pub use factory::{
    QueryCaches, EMBEDDING_CAPACITY, EMBEDDING_TTL, RESPONSE_CAPACITY, RESPONSE_TTL,
};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
