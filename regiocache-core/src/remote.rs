use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::region::Region;
use crate::service_type::ServiceTypes;
use crate::wire::{RegionUpdate, SyncState};

/// A remote configuration source supporting batched differential fetches.
///
/// Given the hashes currently held for every known region, the source returns
/// an update for each region whose content differs. A half whose hash still
/// matches may be reported as [`Payload::Unchanged`](crate::wire::Payload)
/// and a region with nothing new may be left out entirely.
///
/// Implementations must decode the whole response before returning: a single
/// undecodable payload fails the call with [`RemoteError::Decode`] and no
/// update of that batch is applied.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn batch_fetch(&self, states: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError>;
}

/// Unbatched reads against the same configuration service, bypassing any cache.
///
/// Used when a cache miss is not acceptable to the caller; errors surface
/// directly to whoever asked.
#[async_trait]
pub trait DirectSource: Send + Sync {
    async fn read_region(&self, key: &str) -> Result<Region, RemoteError>;

    async fn read_service_types(&self, key: &str) -> Result<ServiceTypes, RemoteError>;
}

#[async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    async fn batch_fetch(&self, states: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
        (**self).batch_fetch(states).await
    }
}

#[async_trait]
impl<T: DirectSource + ?Sized> DirectSource for Arc<T> {
    async fn read_region(&self, key: &str) -> Result<Region, RemoteError> {
        (**self).read_region(key).await
    }

    async fn read_service_types(&self, key: &str) -> Result<ServiceTypes, RemoteError> {
        (**self).read_service_types(key).await
    }
}
