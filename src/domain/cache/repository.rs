//! Cache trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Bounded key-value cache with a fixed time-to-live per instance
///
/// Expired entries behave as misses. Once capacity is exceeded the least
/// recently used entry is evicted.
#[async_trait]
pub trait Cache<V>: Send + Sync + Debug
where
    V: Clone + Send + Sync + 'static,
{
    /// Gets a live value, dropping it if it has expired
    async fn get(&self, key: &str) -> Result<Option<V>, DomainError>;

    /// Inserts or refreshes a value, resetting its insertion time
    async fn set(&self, key: &str, value: V) -> Result<(), DomainError>;

    /// Removes a single entry, returning whether it was present
    async fn invalidate(&self, key: &str) -> Result<bool, DomainError>;

    /// Removes all entries
    async fn clear(&self) -> Result<(), DomainError>;

    /// Approximate number of entries currently held
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
